//! # vibesync-shared
//!
//! Pure domain logic for VibeSync: vibe scoring, profile similarity, room
//! formation, GP ranking, creation quotas and conversion voting. Nothing in
//! this crate touches storage or the network; every time-dependent function
//! takes `now` explicitly.

pub mod constants;
pub mod discovery;
pub mod error;
pub mod geo;
pub mod matching;
pub mod pii;
pub mod planner;
pub mod quota;
pub mod types;
pub mod validation;
pub mod vibe_score;
pub mod voting;

pub use error::{PlanError, ValidationError};
pub use types::*;
