//! Database migration runner.
//!
//! Migrations are executed in order on every [`Database::open_at`] call.
//! Each migration is guarded by the `user_version` pragma so it runs exactly
//! once.
//!
//! [`Database::open_at`]: crate::Database::open_at

pub mod v001_users_vibes;
pub mod v002_chats_rooms;
pub mod v003_group_plans_whispers;
pub mod v004_ready_to_listen;

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.  Bump this and add a new migration module whenever
/// the schema changes.
pub(crate) const CURRENT_VERSION: u32 = 4;

type Migration = fn(&Connection) -> rusqlite::Result<()>;

const MIGRATIONS: [(u32, &str, Migration); 4] = [
    (1, "v001_users_vibes", v001_users_vibes::up),
    (2, "v002_chats_rooms", v002_chats_rooms::up),
    (3, "v003_group_plans_whispers", v003_group_plans_whispers::up),
    (4, "v004_ready_to_listen", v004_ready_to_listen::up),
];

/// Run all pending migrations against the open connection.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    tracing::debug!(
        current_version = current,
        target_version = CURRENT_VERSION,
        "checking database migrations"
    );

    for (version, name, up) in MIGRATIONS {
        if current < version {
            tracing::info!(migration = name, "applying migration");
            up(conn).map_err(|e| StoreError::Migration(format!("{name}: {e}")))?;
            conn.pragma_update(None, "user_version", version)?;
        }
    }

    Ok(())
}
