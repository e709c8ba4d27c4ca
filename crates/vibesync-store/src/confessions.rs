//! Whisper wall: anonymous, short-lived posts removed after enough reports.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension, TransactionBehavior};

use vibesync_shared::constants::{CONFESSION_REPORT_LIMIT, CONFESSION_TTL_HOURS};
use vibesync_shared::{ConfessionId, ConfessionStatus, UserId};

use crate::database::{parse_enum, parse_ts, parse_uuid, trunc_ms, ts, Database};
use crate::error::{not_found, Result};
use crate::models::Confession;

const CONFESSION_COLUMNS: &str =
    "id, author_id, text, status, expires_at, report_count, removed_reason, created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    AlreadyReported,
    Reported { report_count: u32, removed: bool },
}

impl Database {
    /// Creation time of `author`'s newest still-active post made at or after
    /// `since`.
    pub fn latest_active_confession_at(
        &self,
        author: UserId,
        since: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = self
            .conn()
            .query_row(
                "SELECT created_at FROM confessions
                 WHERE author_id = ?1 AND status = 'active' AND created_at >= ?2
                 ORDER BY created_at DESC LIMIT 1",
                params![author.to_string(), ts(since)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.map(|s| parse_ts(0, &s)).transpose()?)
    }

    pub fn create_confession(&self, author: UserId, text: &str, now: DateTime<Utc>) -> Result<Confession> {
        let now = trunc_ms(now);
        let confession = Confession {
            id: ConfessionId::new(),
            author,
            text: text.to_string(),
            status: ConfessionStatus::Active,
            expires_at: now + Duration::hours(CONFESSION_TTL_HOURS),
            report_count: 0,
            removed_reason: None,
            created_at: now,
        };
        self.conn().execute(
            "INSERT INTO confessions (id, author_id, text, status, expires_at, report_count, created_at)
             VALUES (?1, ?2, ?3, 'active', ?4, 0, ?5)",
            params![
                confession.id.to_string(),
                author.to_string(),
                confession.text,
                ts(confession.expires_at),
                ts(now),
            ],
        )?;
        Ok(confession)
    }

    pub fn get_confession(&self, id: ConfessionId) -> Result<Confession> {
        self.conn()
            .query_row(
                &format!("SELECT {CONFESSION_COLUMNS} FROM confessions WHERE id = ?1"),
                params![id.to_string()],
                row_to_confession,
            )
            .map_err(not_found)
    }

    /// Visible posts, newest first.
    pub fn list_wall(&self, now: DateTime<Utc>, offset: usize, limit: usize) -> Result<Vec<Confession>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CONFESSION_COLUMNS} FROM confessions
             WHERE status = 'active' AND expires_at > ?1 AND report_count < ?2
             ORDER BY created_at DESC
             LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt.query_map(
            params![ts(now), CONFESSION_REPORT_LIMIT, limit as i64, offset as i64],
            row_to_confession,
        )?;

        let mut wall = Vec::new();
        for row in rows {
            wall.push(row?);
        }
        Ok(wall)
    }

    pub fn count_wall(&self, now: DateTime<Utc>) -> Result<u64> {
        let n: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM confessions
             WHERE status = 'active' AND expires_at > ?1 AND report_count < ?2",
            params![ts(now), CONFESSION_REPORT_LIMIT],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    /// One report per user per post; the post is removed once it reaches the
    /// report limit.
    pub fn report_confession(
        &mut self,
        id: ConfessionId,
        reporter: UserId,
        now: DateTime<Utc>,
    ) -> Result<ReportOutcome> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.query_row(
            "SELECT 1 FROM confessions WHERE id = ?1",
            params![id.to_string()],
            |row| row.get::<_, i64>(0),
        )
        .map_err(not_found)?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO confession_reports (confession_id, user_id, reported_at)
             VALUES (?1, ?2, ?3)",
            params![id.to_string(), reporter.to_string(), ts(now)],
        )?;
        if inserted == 0 {
            return Ok(ReportOutcome::AlreadyReported);
        }

        tx.execute(
            "UPDATE confessions
             SET report_count = (SELECT COUNT(*) FROM confession_reports WHERE confession_id = ?1)
             WHERE id = ?1",
            params![id.to_string()],
        )?;
        let removed = tx.execute(
            "UPDATE confessions
             SET status = 'removed', removed_at = ?2, removed_reason = 'reported'
             WHERE id = ?1 AND status = 'active' AND report_count >= ?3",
            params![id.to_string(), ts(now), CONFESSION_REPORT_LIMIT],
        )? > 0;
        let report_count: u32 = tx.query_row(
            "SELECT report_count FROM confessions WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        tx.commit()?;

        if removed {
            tracing::info!(confession = %id, "whisper removed after reports");
        }
        Ok(ReportOutcome::Reported {
            report_count,
            removed,
        })
    }

    /// Sweep: expire active posts past their horizon, then remove active
    /// posts at the report limit. Returns `(expired, removed)`.
    pub fn expire_confessions(&mut self, now: DateTime<Utc>) -> Result<(usize, usize)> {
        let tx = self.conn_mut().transaction()?;
        let expired = tx.execute(
            "UPDATE confessions
             SET status = 'expired', removed_at = ?1, removed_reason = 'expired'
             WHERE status = 'active' AND expires_at <= ?1",
            params![ts(now)],
        )?;
        let removed = tx.execute(
            "UPDATE confessions
             SET status = 'removed', removed_at = ?1, removed_reason = 'reported'
             WHERE status = 'active' AND report_count >= ?2",
            params![ts(now), CONFESSION_REPORT_LIMIT],
        )?;
        tx.commit()?;
        Ok((expired, removed))
    }
}

fn row_to_confession(row: &rusqlite::Row<'_>) -> rusqlite::Result<Confession> {
    let id: String = row.get(0)?;
    let author: String = row.get(1)?;
    let status: String = row.get(3)?;
    let expires: String = row.get(4)?;
    let created: String = row.get(7)?;

    Ok(Confession {
        id: ConfessionId(parse_uuid(0, &id)?),
        author: UserId(parse_uuid(1, &author)?),
        text: row.get(2)?,
        status: parse_enum(3, &status)?,
        expires_at: parse_ts(4, &expires)?,
        report_count: row.get(5)?,
        removed_reason: row.get(6)?,
        created_at: parse_ts(7, &created)?,
    })
}
