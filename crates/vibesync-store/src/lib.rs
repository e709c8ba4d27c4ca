//! # vibesync-store
//!
//! SQLite persistence for VibeSync.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for users, vibe
//! profiles, chats, chat rooms, group plans and the whisper wall. Writes that
//! several users can race on run inside `IMMEDIATE` transactions.

pub mod chats;
pub mod confessions;
pub mod database;
pub mod gps;
pub mod migrations;
pub mod models;
pub mod rooms;
pub mod users;
pub mod vibes;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
