//! Users, follows and blocks.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use vibesync_shared::geo::GeoPoint;
use vibesync_shared::planner::BlockList;
use vibesync_shared::UserId;

use crate::database::{parse_opt_ts, parse_ts, parse_uuid, trunc_ms, ts, Database};
use crate::error::{not_found, Result};
use crate::models::User;

const USER_COLUMNS: &str =
    "id, display_name, latitude, longitude, last_active_at, gp_cooldown_until, created_at, \
     ready_to_listen";

impl Database {
    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Register a user. `token_hash` is the hex BLAKE3 digest of their
    /// bearer token; the token itself is never stored.
    pub fn create_user(&self, display_name: &str, token_hash: &str, now: DateTime<Utc>) -> Result<User> {
        let now = trunc_ms(now);
        let user = User {
            id: UserId::new(),
            display_name: display_name.to_string(),
            location: None,
            last_active_at: None,
            gp_cooldown_until: None,
            ready_to_listen: false,
            created_at: now,
        };
        self.conn().execute(
            "INSERT INTO users (id, display_name, token_hash, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user.id.to_string(), user.display_name, token_hash, ts(now)],
        )?;
        Ok(user)
    }

    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                row_to_user,
            )
            .map_err(not_found)
    }

    pub fn user_exists(&self, id: UserId) -> Result<bool> {
        let found: Option<i64> = self
            .conn()
            .query_row(
                "SELECT 1 FROM users WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Resolve a bearer token hash to its user.
    pub fn user_for_token_hash(&self, token_hash: &str) -> Result<Option<UserId>> {
        let id: Option<String> = self
            .conn()
            .query_row(
                "SELECT id FROM users WHERE token_hash = ?1",
                params![token_hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(|s| UserId::parse(&s)).transpose()?)
    }

    /// Record the user's position and mark them active.
    pub fn update_location(&self, id: UserId, point: GeoPoint, now: DateTime<Utc>) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE users SET latitude = ?2, longitude = ?3, last_active_at = ?4 WHERE id = ?1",
            params![id.to_string(), point.latitude, point.longitude, ts(now)],
        )?;
        if affected == 0 {
            return Err(crate::StoreError::NotFound);
        }
        Ok(())
    }

    pub fn set_ready_to_listen(&self, id: UserId, ready: bool) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE users SET ready_to_listen = ?2 WHERE id = ?1",
            params![id.to_string(), ready],
        )?;
        if affected == 0 {
            return Err(crate::StoreError::NotFound);
        }
        Ok(())
    }

    /// Users seen at or after `since`.
    pub fn count_active_users(&self, since: DateTime<Utc>) -> Result<u64> {
        let n: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE last_active_at >= ?1",
            params![ts(since)],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    // ------------------------------------------------------------------
    // Follows
    // ------------------------------------------------------------------

    /// Returns `true` if the follow is new.
    pub fn follow(&self, follower: UserId, followee: UserId, now: DateTime<Utc>) -> Result<bool> {
        let affected = self.conn().execute(
            "INSERT OR IGNORE INTO follows (follower_id, followee_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![follower.to_string(), followee.to_string(), ts(now)],
        )?;
        Ok(affected > 0)
    }

    /// Returns `true` if a follow was removed.
    pub fn unfollow(&self, follower: UserId, followee: UserId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
            params![follower.to_string(), followee.to_string()],
        )?;
        Ok(affected > 0)
    }

    pub fn is_following(&self, follower: UserId, followee: UserId) -> Result<bool> {
        let found: Option<i64> = self
            .conn()
            .query_row(
                "SELECT 1 FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                params![follower.to_string(), followee.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn is_mutual_follow(&self, a: UserId, b: UserId) -> Result<bool> {
        Ok(self.is_following(a, b)? && self.is_following(b, a)?)
    }

    // ------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------

    /// Blocking also drops follows in both directions.
    pub fn block(&mut self, blocker: UserId, blocked: UserId, now: DateTime<Utc>) -> Result<bool> {
        let tx = self.conn_mut().transaction()?;
        let affected = tx.execute(
            "INSERT OR IGNORE INTO blocks (blocker_id, blocked_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![blocker.to_string(), blocked.to_string(), ts(now)],
        )?;
        tx.execute(
            "DELETE FROM follows
             WHERE (follower_id = ?1 AND followee_id = ?2)
                OR (follower_id = ?2 AND followee_id = ?1)",
            params![blocker.to_string(), blocked.to_string()],
        )?;
        tx.commit()?;
        Ok(affected > 0)
    }

    pub fn unblock(&self, blocker: UserId, blocked: UserId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM blocks WHERE blocker_id = ?1 AND blocked_id = ?2",
            params![blocker.to_string(), blocked.to_string()],
        )?;
        Ok(affected > 0)
    }

    pub fn is_blocked_either(&self, a: UserId, b: UserId) -> Result<bool> {
        let found: Option<i64> = self
            .conn()
            .query_row(
                "SELECT 1 FROM blocks
                 WHERE (blocker_id = ?1 AND blocked_id = ?2)
                    OR (blocker_id = ?2 AND blocked_id = ?1)",
                params![a.to_string(), b.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Everyone `user` blocked or was blocked by.
    pub fn blocked_either_way(&self, user: UserId) -> Result<HashSet<UserId>> {
        let mut stmt = self.conn().prepare(
            "SELECT blocked_id FROM blocks WHERE blocker_id = ?1
             UNION
             SELECT blocker_id FROM blocks WHERE blocked_id = ?1",
        )?;
        let rows = stmt.query_map(params![user.to_string()], |row| {
            let raw: String = row.get(0)?;
            parse_uuid(0, &raw).map(UserId)
        })?;

        let mut out = HashSet::new();
        for row in rows {
            out.insert(row?);
        }
        Ok(out)
    }

    /// The whole block table, for sweeps that plan many users at once.
    pub fn block_list(&self) -> Result<BlockList> {
        let mut stmt = self.conn().prepare("SELECT blocker_id, blocked_id FROM blocks")?;
        let rows = stmt.query_map([], |row| {
            let a: String = row.get(0)?;
            let b: String = row.get(1)?;
            Ok((UserId(parse_uuid(0, &a)?), UserId(parse_uuid(1, &b)?)))
        })?;

        let mut pairs = Vec::new();
        for row in rows {
            pairs.push(row?);
        }
        Ok(pairs.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let latitude: Option<f64> = row.get(2)?;
    let longitude: Option<f64> = row.get(3)?;
    let created: String = row.get(6)?;

    let location = match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint {
            latitude,
            longitude,
        }),
        _ => None,
    };

    Ok(User {
        id: UserId(parse_uuid(0, &id)?),
        display_name: row.get(1)?,
        location,
        last_active_at: parse_opt_ts(4, row.get(4)?)?,
        gp_cooldown_until: parse_opt_ts(5, row.get(5)?)?,
        ready_to_listen: row.get(7)?,
        created_at: parse_ts(6, &created)?,
    })
}
