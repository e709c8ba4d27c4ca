//! v004 -- Per-user "ready to listen" flag.

use rusqlite::Connection;

const UP_SQL: &str = r#"
ALTER TABLE users ADD COLUMN ready_to_listen INTEGER NOT NULL DEFAULT 0;
"#;

/// Add the ready-to-listen flag to users.
pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
