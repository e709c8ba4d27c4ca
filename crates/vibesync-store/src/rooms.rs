//! Four-person chat rooms.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use vibesync_shared::constants::CHAT_ROOM_TTL_HOURS;
use vibesync_shared::planner::{RoomPlan, VibeDiversity};
use vibesync_shared::{MessageId, RoomId, UserId};

use crate::database::{parse_ts, parse_uuid, trunc_ms, ts, Database};
use crate::error::{not_found, Result};
use crate::models::{ChatRoom, RoomMessage};

const ROOM_COLUMNS: &str =
    "id, expires_at, is_expired, low_energy, mid_energy, high_energy, average_similarity, created_at";

impl Database {
    /// The newest live room `user` belongs to, if any.
    pub fn active_room_for_user(&self, user: UserId, now: DateTime<Utc>) -> Result<Option<ChatRoom>> {
        let id: Option<String> = self
            .conn()
            .query_row(
                "SELECT r.id
                 FROM chat_rooms r
                 JOIN room_participants p ON p.room_id = r.id
                 WHERE p.user_id = ?1 AND r.is_expired = 0 AND r.expires_at > ?2
                 ORDER BY r.created_at DESC
                 LIMIT 1",
                params![user.to_string(), ts(now)],
                |row| row.get(0),
            )
            .optional()?;

        match id {
            Some(id) => Ok(Some(self.get_room(RoomId::parse(&id)?)?)),
            None => Ok(None),
        }
    }

    /// Everyone currently in a live room.
    pub fn users_in_live_rooms(&self, now: DateTime<Utc>) -> Result<HashSet<UserId>> {
        let mut stmt = self.conn().prepare(
            "SELECT DISTINCT p.user_id
             FROM room_participants p
             JOIN chat_rooms r ON r.id = p.room_id
             WHERE r.is_expired = 0 AND r.expires_at > ?1",
        )?;
        let rows = stmt.query_map(params![ts(now)], |row| {
            let raw: String = row.get(0)?;
            parse_uuid(0, &raw).map(UserId)
        })?;

        let mut users = HashSet::new();
        for row in rows {
            users.insert(row?);
        }
        Ok(users)
    }

    /// Persist a planned room. Expires [`CHAT_ROOM_TTL_HOURS`] from `now`.
    pub fn create_room(&mut self, plan: &RoomPlan, now: DateTime<Utc>) -> Result<ChatRoom> {
        let now = trunc_ms(now);
        let room = ChatRoom {
            id: RoomId::new(),
            participants: plan.participants.clone(),
            expires_at: now + Duration::hours(CHAT_ROOM_TTL_HOURS),
            is_expired: false,
            vibe_diversity: plan.vibe_diversity,
            average_similarity: plan.average_similarity,
            created_at: now,
        };

        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO chat_rooms (id, expires_at, is_expired, low_energy, mid_energy,
                                     high_energy, average_similarity, created_at)
             VALUES (?1, ?2, 0, ?3, ?4, ?5, ?6, ?7)",
            params![
                room.id.to_string(),
                ts(room.expires_at),
                room.vibe_diversity.low_energy,
                room.vibe_diversity.mid_energy,
                room.vibe_diversity.high_energy,
                room.average_similarity,
                ts(now),
            ],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO room_participants (room_id, user_id, position) VALUES (?1, ?2, ?3)",
            )?;
            for (position, user) in room.participants.iter().enumerate() {
                stmt.execute(params![room.id.to_string(), user.to_string(), position as i64])?;
            }
        }
        tx.commit()?;

        tracing::debug!(room = %room.id, size = room.participants.len(), "chat room created");
        Ok(room)
    }

    pub fn get_room(&self, id: RoomId) -> Result<ChatRoom> {
        load_room(self.conn(), id)
    }

    /// Rooms `user` has been in, newest first.
    pub fn list_rooms_for_user(&self, user: UserId) -> Result<Vec<ChatRoom>> {
        let mut stmt = self.conn().prepare(
            "SELECT r.id
             FROM chat_rooms r
             JOIN room_participants p ON p.room_id = r.id
             WHERE p.user_id = ?1
             ORDER BY r.created_at DESC",
        )?;
        let ids = stmt.query_map(params![user.to_string()], |row| {
            let raw: String = row.get(0)?;
            parse_uuid(0, &raw).map(RoomId)
        })?;

        let mut rooms = Vec::new();
        for id in ids {
            rooms.push(self.get_room(id?)?);
        }
        Ok(rooms)
    }

    /// Messages in submission order, each with its readers.
    pub fn list_room_messages(&self, room: RoomId) -> Result<Vec<RoomMessage>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, room_id, sender_id, text, created_at
             FROM room_messages WHERE room_id = ?1 ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map(params![room.to_string()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }

        let mut readers = self.conn().prepare(
            "SELECT user_id FROM room_message_reads WHERE message_id = ?1 ORDER BY rowid ASC",
        )?;
        for message in &mut messages {
            let rows = readers.query_map(params![message.id.to_string()], |row| {
                let raw: String = row.get(0)?;
                parse_uuid(0, &raw).map(UserId)
            })?;
            for row in rows {
                message.read_by.push(row?);
            }
        }
        Ok(messages)
    }

    /// Append a message; the sender has read it by definition.
    pub fn append_room_message(
        &mut self,
        room: RoomId,
        sender: UserId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<RoomMessage> {
        let message = RoomMessage {
            id: MessageId::new(),
            room_id: room,
            sender,
            text: text.to_string(),
            read_by: vec![sender],
            created_at: trunc_ms(now),
        };

        let tx = self.conn_mut().transaction()?;
        tx.execute(
            "INSERT INTO room_messages (id, room_id, sender_id, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id.to_string(),
                room.to_string(),
                sender.to_string(),
                message.text,
                ts(message.created_at),
            ],
        )?;
        tx.execute(
            "INSERT INTO room_message_reads (message_id, user_id) VALUES (?1, ?2)",
            params![message.id.to_string(), sender.to_string()],
        )?;
        tx.commit()?;
        Ok(message)
    }

    /// Add `reader` to every message in the room they have not read yet.
    pub fn mark_room_read(&self, room: RoomId, reader: UserId) -> Result<usize> {
        Ok(self.conn().execute(
            "INSERT OR IGNORE INTO room_message_reads (message_id, user_id)
             SELECT id, ?2 FROM room_messages WHERE room_id = ?1",
            params![room.to_string(), reader.to_string()],
        )?)
    }

    /// Flag a single room as expired. Returns `true` if it changed.
    pub fn expire_room(&self, id: RoomId) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE chat_rooms SET is_expired = 1 WHERE id = ?1 AND is_expired = 0",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// Sweep: flag every room past its expiry. Idempotent.
    pub fn expire_rooms(&self, now: DateTime<Utc>) -> Result<usize> {
        Ok(self.conn().execute(
            "UPDATE chat_rooms SET is_expired = 1 WHERE is_expired = 0 AND expires_at <= ?1",
            params![ts(now)],
        )?)
    }
}

fn load_room(conn: &Connection, id: RoomId) -> Result<ChatRoom> {
    let mut room = conn
        .query_row(
            &format!("SELECT {ROOM_COLUMNS} FROM chat_rooms WHERE id = ?1"),
            params![id.to_string()],
            row_to_room,
        )
        .map_err(not_found)?;

    let mut stmt = conn.prepare(
        "SELECT user_id FROM room_participants WHERE room_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![id.to_string()], |row| {
        let raw: String = row.get(0)?;
        parse_uuid(0, &raw).map(UserId)
    })?;
    for row in rows {
        room.participants.push(row?);
    }
    Ok(room)
}

fn row_to_room(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatRoom> {
    let id: String = row.get(0)?;
    let expires: String = row.get(1)?;
    let is_expired: i64 = row.get(2)?;
    let created: String = row.get(7)?;

    Ok(ChatRoom {
        id: RoomId(parse_uuid(0, &id)?),
        participants: Vec::new(),
        expires_at: parse_ts(1, &expires)?,
        is_expired: is_expired != 0,
        vibe_diversity: VibeDiversity {
            low_energy: row.get(3)?,
            mid_energy: row.get(4)?,
            high_energy: row.get(5)?,
        },
        average_similarity: row.get(6)?,
        created_at: parse_ts(7, &created)?,
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoomMessage> {
    let id: String = row.get(0)?;
    let room: String = row.get(1)?;
    let sender: String = row.get(2)?;
    let created: String = row.get(4)?;

    Ok(RoomMessage {
        id: MessageId(parse_uuid(0, &id)?),
        room_id: RoomId(parse_uuid(1, &room)?),
        sender: UserId(parse_uuid(2, &sender)?),
        text: row.get(3)?,
        read_by: Vec::new(),
        created_at: parse_ts(4, &created)?,
    })
}
