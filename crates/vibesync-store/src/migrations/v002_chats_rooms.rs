//! v002 -- Pairwise chats and four-person chat rooms.

use rusqlite::Connection;

const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Pairwise chats (and permanent chats spawned by GP conversion)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chats (
    id                      TEXT PRIMARY KEY NOT NULL,
    pair_key                TEXT UNIQUE,              -- "<lo>:<hi>" for 1:1 chats, NULL otherwise
    expires_at              TEXT NOT NULL,
    is_locked               INTEGER NOT NULL DEFAULT 0,
    is_permanently_unlocked INTEGER NOT NULL DEFAULT 0,
    source_gp_id            TEXT,
    matched_at              TEXT NOT NULL,
    created_at              TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chats_expiry ON chats(is_locked, expires_at);

CREATE TABLE IF NOT EXISTS chat_participants (
    chat_id  TEXT NOT NULL,
    user_id  TEXT NOT NULL,
    position INTEGER NOT NULL,

    PRIMARY KEY (chat_id, user_id),
    FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_chat_participants_user ON chat_participants(user_id);

CREATE TABLE IF NOT EXISTS chat_messages (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,    -- submission order
    id         TEXT NOT NULL UNIQUE,
    chat_id    TEXT NOT NULL,
    sender_id  TEXT NOT NULL,
    text       TEXT NOT NULL,
    is_read    INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,

    FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_chat_messages_chat ON chat_messages(chat_id, seq);

-- ----------------------------------------------------------------
-- Chat rooms
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chat_rooms (
    id                 TEXT PRIMARY KEY NOT NULL,
    expires_at         TEXT NOT NULL,
    is_expired         INTEGER NOT NULL DEFAULT 0,
    low_energy         INTEGER NOT NULL,
    mid_energy         INTEGER NOT NULL,
    high_energy        INTEGER NOT NULL,
    average_similarity INTEGER NOT NULL,
    created_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chat_rooms_expiry ON chat_rooms(is_expired, expires_at);

CREATE TABLE IF NOT EXISTS room_participants (
    room_id  TEXT NOT NULL,
    user_id  TEXT NOT NULL,
    position INTEGER NOT NULL,

    PRIMARY KEY (room_id, user_id),
    FOREIGN KEY (room_id) REFERENCES chat_rooms(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_room_participants_user ON room_participants(user_id);

CREATE TABLE IF NOT EXISTS room_messages (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    id         TEXT NOT NULL UNIQUE,
    room_id    TEXT NOT NULL,
    sender_id  TEXT NOT NULL,
    text       TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (room_id) REFERENCES chat_rooms(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_room_messages_room ON room_messages(room_id, seq);

CREATE TABLE IF NOT EXISTS room_message_reads (
    message_id TEXT NOT NULL,
    user_id    TEXT NOT NULL,

    PRIMARY KEY (message_id, user_id),
    FOREIGN KEY (message_id) REFERENCES room_messages(id) ON DELETE CASCADE
);
"#;

/// Add chat and room tables.
pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
