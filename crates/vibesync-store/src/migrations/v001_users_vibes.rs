//! v001 -- Users, the social graph and vibe profiles.

use rusqlite::Connection;

const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id                TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    display_name      TEXT NOT NULL,
    token_hash        TEXT NOT NULL UNIQUE,        -- BLAKE3 hex of the bearer token
    latitude          REAL,
    longitude         REAL,
    last_active_at    TEXT,                        -- RFC-3339, refreshed by location updates
    gp_cooldown_until TEXT,
    created_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_last_active ON users(last_active_at);

CREATE TABLE IF NOT EXISTS follows (
    follower_id TEXT NOT NULL,
    followee_id TEXT NOT NULL,
    created_at  TEXT NOT NULL,

    PRIMARY KEY (follower_id, followee_id),
    FOREIGN KEY (follower_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (followee_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS blocks (
    blocker_id TEXT NOT NULL,
    blocked_id TEXT NOT NULL,
    created_at TEXT NOT NULL,

    PRIMARY KEY (blocker_id, blocked_id),
    FOREIGN KEY (blocker_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (blocked_id) REFERENCES users(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Vibe profiles (one per user, replaced in place)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS vibe_profiles (
    user_id              TEXT PRIMARY KEY NOT NULL,
    emoji                TEXT NOT NULL,
    description          TEXT NOT NULL,
    energy_level         INTEGER NOT NULL CHECK (energy_level BETWEEN 1 AND 10),
    current_intent       TEXT NOT NULL,            -- JSON array
    context_tag          TEXT,
    interaction_boundary TEXT NOT NULL,
    feeling_options      TEXT NOT NULL DEFAULT '[]',
    vibe_availability    TEXT NOT NULL DEFAULT '',
    personality_prompt   TEXT NOT NULL DEFAULT '',
    mood                 TEXT NOT NULL,
    energy               REAL NOT NULL,
    positivity           REAL NOT NULL,
    intent               TEXT NOT NULL,
    is_active            INTEGER NOT NULL DEFAULT 1,
    last_updated         TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_vibe_profiles_active ON vibe_profiles(is_active);
"#;

/// Apply the initial schema.
pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
