//! v003 -- Group plans, conversion votes, creation history and the whisper
//! wall.

use rusqlite::Connection;

const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Group plans
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS group_plans (
    id                      TEXT PRIMARY KEY NOT NULL,
    category                TEXT NOT NULL,
    sub_type                TEXT NOT NULL,
    specific_name           TEXT NOT NULL DEFAULT '',
    genre                   TEXT NOT NULL DEFAULT '',
    talk_topics             TEXT NOT NULL,             -- JSON array
    description             TEXT NOT NULL DEFAULT '',
    creation_reason         TEXT NOT NULL,
    reason_note             TEXT NOT NULL DEFAULT '',
    latitude                REAL NOT NULL,
    longitude               REAL NOT NULL,
    city                    TEXT NOT NULL DEFAULT '',
    zone                    TEXT NOT NULL DEFAULT '',
    created_by              TEXT NOT NULL,
    moderator               TEXT,
    status                  TEXT NOT NULL DEFAULT 'active',
    max_members             INTEGER NOT NULL,
    member_count            INTEGER NOT NULL DEFAULT 0,
    expires_at              TEXT NOT NULL,
    is_permanent            INTEGER NOT NULL DEFAULT 0,
    is_conversion_eligible  INTEGER NOT NULL DEFAULT 0,
    conversion_requested_at TEXT,
    converted_chat_id       TEXT,
    converted_at            TEXT,
    message_count           INTEGER NOT NULL DEFAULT 0,
    last_activity_at        TEXT NOT NULL,
    first_message_at        TEXT,
    created_at              TEXT NOT NULL,

    CHECK (member_count >= 0 AND member_count <= max_members),
    FOREIGN KEY (created_by) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_group_plans_status ON group_plans(status, expires_at);
CREATE INDEX IF NOT EXISTS idx_group_plans_creator ON group_plans(created_by, category, status);

CREATE TABLE IF NOT EXISTS gp_members (
    gp_id     TEXT NOT NULL,
    user_id   TEXT NOT NULL,
    joined_at TEXT NOT NULL,

    PRIMARY KEY (gp_id, user_id),
    FOREIGN KEY (gp_id) REFERENCES group_plans(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_gp_members_user ON gp_members(user_id);

CREATE TABLE IF NOT EXISTS gp_votes (
    gp_id    TEXT NOT NULL,
    user_id  TEXT NOT NULL,
    vote     TEXT NOT NULL CHECK (vote IN ('yes', 'no')),
    voted_at TEXT NOT NULL,

    PRIMARY KEY (gp_id, user_id),
    FOREIGN KEY (gp_id) REFERENCES group_plans(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS gp_creation_history (
    user_id    TEXT NOT NULL,
    gp_id      TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_gp_history_user ON gp_creation_history(user_id, created_at);

-- ----------------------------------------------------------------
-- Whisper wall
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS confessions (
    id             TEXT PRIMARY KEY NOT NULL,
    author_id      TEXT NOT NULL,
    text           TEXT NOT NULL,
    status         TEXT NOT NULL DEFAULT 'active',
    expires_at     TEXT NOT NULL,
    report_count   INTEGER NOT NULL DEFAULT 0,
    removed_at     TEXT,
    removed_reason TEXT,
    created_at     TEXT NOT NULL,

    FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_confessions_wall ON confessions(status, expires_at, created_at);
CREATE INDEX IF NOT EXISTS idx_confessions_author ON confessions(author_id, created_at);

CREATE TABLE IF NOT EXISTS confession_reports (
    confession_id TEXT NOT NULL,
    user_id       TEXT NOT NULL,
    reported_at   TEXT NOT NULL,

    PRIMARY KEY (confession_id, user_id),
    FOREIGN KEY (confession_id) REFERENCES confessions(id) ON DELETE CASCADE
);
"#;

/// Add group plan and whisper wall tables.
pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
