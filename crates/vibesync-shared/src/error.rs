use thiserror::Error;

/// Malformed or out-of-range input, rejected before any state is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Energy level must be between 1 and 10 (got {0})")]
    EnergyOutOfRange(i64),

    #[error("Description must be 2-8 words (got {0})")]
    DescriptionWordCount(usize),

    #[error("Must select 1-2 intents (got {0})")]
    IntentCount(usize),

    #[error("Unknown intent: {0}")]
    UnknownIntent(String),

    #[error("Unknown interaction boundary: {0}")]
    UnknownBoundary(String),

    #[error("Context tag must be a single word")]
    InvalidContextTag,

    #[error("Must select 1-3 talk topics (got {0})")]
    TalkTopicCount(usize),

    #[error("{field} must be {max} characters or less")]
    TooLong { field: &'static str, max: usize },

    #[error("{0} cannot be empty")]
    Empty(&'static str),

    #[error("Text cannot contain phone numbers, names, addresses, or other personal information")]
    ContainsPii,

    #[error("Cannot target yourself")]
    SelfTarget,

    #[error("Invalid coordinates")]
    InvalidCoordinates,

    #[error("Invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Group formation could not assemble a room.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Not enough users available to create a chat room (eligible {eligible}, compatible {compatible}, need 3)")]
    NotEnoughUsers { eligible: usize, compatible: usize },
}
