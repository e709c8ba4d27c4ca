//! Pairwise chats, their messages, and permanent chats spawned by GP
//! conversion.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use vibesync_shared::constants::{PAIRWISE_CHAT_TTL_HOURS, PERMANENT_CHAT_TTL_DAYS};
use vibesync_shared::{ChatId, GpId, MessageId, UserId};

use crate::database::{parse_ts, parse_uuid, trunc_ms, ts, Database};
use crate::error::{not_found, Result};
use crate::models::{Chat, ChatMessage};

const CHAT_COLUMNS: &str =
    "id, expires_at, is_locked, is_permanently_unlocked, source_gp_id, matched_at, created_at";

const MESSAGE_COLUMNS: &str = "id, chat_id, sender_id, text, is_read, created_at";

/// Order-independent key for the unordered pair `{a, b}`.
pub fn pair_key(a: UserId, b: UserId) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{lo}:{hi}")
}

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Return the chat between `a` and `b`, creating it if needed.
    ///
    /// The unique `pair_key` makes concurrent first contacts converge on a
    /// single row; the boolean is `true` only for the caller that inserted it.
    /// Permanent unlock is recomputed from the follow graph either way.
    pub fn get_or_create_chat(&mut self, a: UserId, b: UserId, now: DateTime<Utc>) -> Result<(Chat, bool)> {
        let now = trunc_ms(now);
        let key = pair_key(a, b);
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let id = ChatId::new();
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO chats (id, pair_key, expires_at, matched_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![
                id.to_string(),
                key,
                ts(now + Duration::hours(PAIRWISE_CHAT_TTL_HOURS)),
                ts(now),
            ],
        )? > 0;

        if inserted {
            insert_participants(&tx, id, &[a, b])?;
        }

        refresh_unlock(&tx, a, b)?;

        let chat_id: String = tx.query_row(
            "SELECT id FROM chats WHERE pair_key = ?1",
            params![key],
            |row| row.get(0),
        )?;
        let chat = load_chat(&tx, ChatId::parse(&chat_id)?)?;
        tx.commit()?;

        if inserted {
            tracing::debug!(chat = %chat.id, "pairwise chat created");
        }
        Ok((chat, inserted))
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_chat(&self, id: ChatId) -> Result<Chat> {
        load_chat(self.conn(), id)
    }

    /// The caller's chats, most recently active first.
    pub fn list_chats_for_user(&self, user: UserId, limit: usize) -> Result<Vec<Chat>> {
        let mut stmt = self.conn().prepare(
            "SELECT c.id
             FROM chats c
             JOIN chat_participants p ON p.chat_id = c.id
             WHERE p.user_id = ?1
             ORDER BY COALESCE(
                 (SELECT MAX(m.created_at) FROM chat_messages m WHERE m.chat_id = c.id),
                 c.created_at
             ) DESC
             LIMIT ?2",
        )?;
        let ids = stmt.query_map(params![user.to_string(), limit as i64], |row| {
            let raw: String = row.get(0)?;
            parse_uuid(0, &raw).map(ChatId)
        })?;

        let mut chats = Vec::new();
        for id in ids {
            chats.push(self.get_chat(id?)?);
        }
        Ok(chats)
    }

    /// Messages in submission order.
    pub fn list_chat_messages(&self, chat: ChatId) -> Result<Vec<ChatMessage>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE chat_id = ?1 ORDER BY seq ASC"
        ))?;
        let rows = stmt.query_map(params![chat.to_string()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    pub fn last_chat_message(&self, chat: ChatId) -> Result<Option<ChatMessage>> {
        Ok(self
            .conn()
            .query_row(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM chat_messages
                     WHERE chat_id = ?1 ORDER BY seq DESC LIMIT 1"
                ),
                params![chat.to_string()],
                row_to_message,
            )
            .optional()?)
    }

    /// Messages in `chat` sent by someone else and not yet read.
    pub fn unread_in_chat(&self, chat: ChatId, reader: UserId) -> Result<u32> {
        let n: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM chat_messages
             WHERE chat_id = ?1 AND sender_id != ?2 AND is_read = 0",
            params![chat.to_string(), reader.to_string()],
            |row| row.get(0),
        )?;
        Ok(n as u32)
    }

    /// Unread messages across all of `reader`'s chats.
    pub fn unread_total(&self, reader: UserId) -> Result<u32> {
        let n: i64 = self.conn().query_row(
            "SELECT COUNT(*)
             FROM chat_messages m
             JOIN chat_participants p ON p.chat_id = m.chat_id
             WHERE p.user_id = ?1 AND m.sender_id != ?1 AND m.is_read = 0",
            params![reader.to_string()],
            |row| row.get(0),
        )?;
        Ok(n as u32)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Append a message. The caller has already checked membership and lock
    /// state.
    pub fn append_chat_message(
        &self,
        chat: ChatId,
        sender: UserId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<ChatMessage> {
        let message = ChatMessage {
            id: MessageId::new(),
            chat_id: chat,
            sender,
            text: text.to_string(),
            read: false,
            created_at: trunc_ms(now),
        };
        self.conn().execute(
            "INSERT INTO chat_messages (id, chat_id, sender_id, text, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![
                message.id.to_string(),
                chat.to_string(),
                sender.to_string(),
                message.text,
                ts(message.created_at),
            ],
        )?;
        Ok(message)
    }

    /// Mark everything `reader` received in `chat` as read.
    pub fn mark_chat_read(&self, chat: ChatId, reader: UserId) -> Result<usize> {
        Ok(self.conn().execute(
            "UPDATE chat_messages SET is_read = 1
             WHERE chat_id = ?1 AND sender_id != ?2 AND is_read = 0",
            params![chat.to_string(), reader.to_string()],
        )?)
    }

    /// Recompute the permanent unlock of the chat between `a` and `b` from the
    /// follow graph. Returns `true` if the chat is permanently unlocked.
    pub fn refresh_permanent_unlock(&self, a: UserId, b: UserId) -> Result<bool> {
        refresh_unlock(self.conn(), a, b)
    }

    /// Lock a single chat if it has run out, e.g. when read before a sweep.
    pub fn lock_chat_if_expired(&self, chat: ChatId, now: DateTime<Utc>) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE chats SET is_locked = 1
             WHERE id = ?1 AND is_locked = 0 AND is_permanently_unlocked = 0 AND expires_at <= ?2",
            params![chat.to_string(), ts(now)],
        )?;
        Ok(affected > 0)
    }

    /// Sweep: lock every non-permanent chat past its expiry. Idempotent.
    pub fn expire_chats(&self, now: DateTime<Utc>) -> Result<usize> {
        let affected = self.conn().execute(
            "UPDATE chats SET is_locked = 1
             WHERE is_locked = 0 AND is_permanently_unlocked = 0 AND expires_at <= ?1",
            params![ts(now)],
        )?;
        Ok(affected)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create the permanent chat for a converted GP inside the caller's
/// transaction.
pub(crate) fn insert_permanent_chat(
    conn: &Connection,
    participants: &[UserId],
    gp: GpId,
    matched_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<ChatId> {
    let id = ChatId::new();
    conn.execute(
        "INSERT INTO chats (id, pair_key, expires_at, is_locked, is_permanently_unlocked,
                            source_gp_id, matched_at, created_at)
         VALUES (?1, NULL, ?2, 0, 1, ?3, ?4, ?5)",
        params![
            id.to_string(),
            ts(now + Duration::days(PERMANENT_CHAT_TTL_DAYS)),
            gp.to_string(),
            ts(matched_at),
            ts(now),
        ],
    )?;
    insert_participants(conn, id, participants)?;
    Ok(id)
}

fn insert_participants(conn: &Connection, chat: ChatId, users: &[UserId]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO chat_participants (chat_id, user_id, position) VALUES (?1, ?2, ?3)",
    )?;
    for (position, user) in users.iter().enumerate() {
        stmt.execute(params![chat.to_string(), user.to_string(), position as i64])?;
    }
    Ok(())
}

fn refresh_unlock(conn: &Connection, a: UserId, b: UserId) -> Result<bool> {
    let mutual: i64 = conn.query_row(
        "SELECT COUNT(*) FROM follows
         WHERE (follower_id = ?1 AND followee_id = ?2)
            OR (follower_id = ?2 AND followee_id = ?1)",
        params![a.to_string(), b.to_string()],
        |row| row.get(0),
    )?;

    if mutual == 2 {
        conn.execute(
            "UPDATE chats SET is_permanently_unlocked = 1, is_locked = 0 WHERE pair_key = ?1",
            params![pair_key(a, b)],
        )?;
        return Ok(true);
    }

    let unlocked: Option<i64> = conn
        .query_row(
            "SELECT is_permanently_unlocked FROM chats WHERE pair_key = ?1",
            params![pair_key(a, b)],
            |row| row.get(0),
        )
        .optional()?;
    Ok(unlocked == Some(1))
}

fn load_chat(conn: &Connection, id: ChatId) -> Result<Chat> {
    let mut chat = conn
        .query_row(
            &format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = ?1"),
            params![id.to_string()],
            row_to_chat,
        )
        .map_err(not_found)?;

    let mut stmt = conn.prepare(
        "SELECT user_id FROM chat_participants WHERE chat_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![id.to_string()], |row| {
        let raw: String = row.get(0)?;
        parse_uuid(0, &raw).map(UserId)
    })?;
    for row in rows {
        chat.participants.push(row?);
    }
    Ok(chat)
}

fn row_to_chat(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chat> {
    let id: String = row.get(0)?;
    let expires: String = row.get(1)?;
    let is_locked: i64 = row.get(2)?;
    let permanent: i64 = row.get(3)?;
    let source_gp: Option<String> = row.get(4)?;
    let matched: String = row.get(5)?;
    let created: String = row.get(6)?;

    Ok(Chat {
        id: ChatId(parse_uuid(0, &id)?),
        participants: Vec::new(),
        expires_at: parse_ts(1, &expires)?,
        is_locked: is_locked != 0,
        is_permanently_unlocked: permanent != 0,
        source_gp: source_gp.map(|s| parse_uuid(4, &s).map(GpId)).transpose()?,
        matched_at: parse_ts(5, &matched)?,
        created_at: parse_ts(6, &created)?,
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessage> {
    let id: String = row.get(0)?;
    let chat: String = row.get(1)?;
    let sender: String = row.get(2)?;
    let is_read: i64 = row.get(4)?;
    let created: String = row.get(5)?;

    Ok(ChatMessage {
        id: MessageId(parse_uuid(0, &id)?),
        chat_id: ChatId(parse_uuid(1, &chat)?),
        sender: UserId(parse_uuid(2, &sender)?),
        text: row.get(3)?,
        read: is_read != 0,
        created_at: parse_ts(5, &created)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, Database, UserId, UserId) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("chats.db")).unwrap();
        let now = Utc::now();
        let a = db.create_user("a", "ha", now).unwrap().id;
        let b = db.create_user("b", "hb", now).unwrap().id;
        (dir, db, a, b)
    }

    #[test]
    fn test_pair_key_is_order_independent() {
        let a = UserId::new();
        let b = UserId::new();
        assert_eq!(pair_key(a, b), pair_key(b, a));
    }

    #[test]
    fn test_second_create_returns_same_chat() {
        let (_dir, mut db, a, b) = setup();
        let now = Utc::now();

        let (first, is_new) = db.get_or_create_chat(a, b, now).unwrap();
        assert!(is_new);
        assert_eq!(first.participants, vec![a, b]);
        assert_eq!(first.expires_at, trunc_ms(now) + Duration::hours(24));

        let (second, is_new) = db.get_or_create_chat(b, a, now).unwrap();
        assert!(!is_new);
        assert_eq!(first.id, second.id);

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM chats", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_mutual_follow_unlocks_permanently() {
        let (_dir, mut db, a, b) = setup();
        let now = Utc::now();
        db.get_or_create_chat(a, b, now).unwrap();

        db.follow(a, b, now).unwrap();
        assert!(!db.refresh_permanent_unlock(a, b).unwrap());
        db.follow(b, a, now).unwrap();
        assert!(db.refresh_permanent_unlock(a, b).unwrap());

        let later = now + Duration::hours(48);
        assert_eq!(db.expire_chats(later).unwrap(), 0);
        let (chat, _) = db.get_or_create_chat(a, b, later).unwrap();
        assert!(chat.is_permanently_unlocked);
        assert!(!chat.is_locked_at(later));
        assert_eq!(chat.time_remaining_ms(later), None);
    }

    #[test]
    fn test_expiry_sweep_is_idempotent() {
        let (_dir, mut db, a, b) = setup();
        let now = Utc::now();
        let (chat, _) = db.get_or_create_chat(a, b, now).unwrap();

        assert_eq!(db.expire_chats(now + Duration::hours(1)).unwrap(), 0);
        let later = now + Duration::hours(25);
        assert_eq!(db.expire_chats(later).unwrap(), 1);
        assert_eq!(db.expire_chats(later).unwrap(), 0);
        assert!(db.get_chat(chat.id).unwrap().is_locked);
    }

    #[test]
    fn test_messages_and_unread_counts() {
        let (_dir, mut db, a, b) = setup();
        let now = Utc::now();
        let (chat, _) = db.get_or_create_chat(a, b, now).unwrap();

        db.append_chat_message(chat.id, a, "hey", now).unwrap();
        db.append_chat_message(chat.id, a, "you there?", now).unwrap();
        db.append_chat_message(chat.id, b, "yes", now).unwrap();

        let texts: Vec<String> = db
            .list_chat_messages(chat.id)
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["hey", "you there?", "yes"]);

        assert_eq!(db.unread_in_chat(chat.id, b).unwrap(), 2);
        assert_eq!(db.unread_total(a).unwrap(), 1);
        assert_eq!(db.mark_chat_read(chat.id, b).unwrap(), 2);
        assert_eq!(db.unread_total(b).unwrap(), 0);
        assert_eq!(db.last_chat_message(chat.id).unwrap().unwrap().text, "yes");
        assert_eq!(db.list_chats_for_user(a, 50).unwrap().len(), 1);
    }
}
