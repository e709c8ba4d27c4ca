use thiserror::Error;

/// Everything that can go wrong between a `Database` call and SQLite.
///
/// Malformed ids and timestamps read by the row mappers surface as `Sqlite`
/// conversion failures; ids looked up outside a mapper surface as `Id`.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// No platform data directory to put `vibesync.db` in.
    #[error("No data directory available for the VibeSync database")]
    NoDataDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Lookup by id matched no row.
    #[error("Record not found")]
    NotFound,

    /// A stored id column is not a UUID.
    #[error("Invalid id: {0}")]
    Id(#[from] uuid::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    /// A list column (intents, talk topics) failed to encode or decode.
    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Turn `QueryReturnedNoRows` into [`StoreError::NotFound`].
pub(crate) fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}
