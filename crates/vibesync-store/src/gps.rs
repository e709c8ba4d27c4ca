//! Group plans: creation under quota, membership, activity, conversion
//! voting and the expiry sweep.
//!
//! Every operation that mutates membership or the vote ledger runs inside an
//! `IMMEDIATE` transaction and re-reads the GP first, so concurrent callers
//! on separate connections serialise through SQLite's write lock.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};

use vibesync_shared::constants::{GP_COOLDOWN_MINUTES, GP_MAX_MEMBERS, GP_TTL_HOURS};
use vibesync_shared::geo::GeoPoint;
use vibesync_shared::quota::{QuotaInputs, QuotaRejection};
use vibesync_shared::validation::ValidGp;
use vibesync_shared::voting::{
    is_eligible, pick_moderator, tally, Ballot, EligibilityThresholds, VoteTally,
};
use vibesync_shared::{ChatId, GpCategory, GpId, GpStatus, UserId, VoteChoice};

use crate::chats::insert_permanent_chat;
use crate::database::{
    parse_enum, parse_json, parse_opt_ts, parse_ts, parse_uuid, trunc_ms, ts, Database,
};
use crate::error::{not_found, Result};
use crate::models::GroupPlan;

const GP_COLUMNS: &str = "id, category, sub_type, specific_name, genre, talk_topics, description,
    creation_reason, reason_note, latitude, longitude, city, zone, created_by, moderator, status,
    max_members, expires_at, is_permanent, is_conversion_eligible, conversion_requested_at,
    converted_chat_id, converted_at, message_count, last_activity_at, first_message_at, created_at";

/// Kilometres per degree of latitude, for the bounding-box prefilter.
const KM_PER_DEGREE: f64 = 111.0;

#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(GroupPlan),
    Rejected(QuotaRejection),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    Joined(GroupPlan),
    AlreadyMember,
    Full,
    NotActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    NotMember,
    /// `failed` is set when the leave emptied an active GP.
    Left { failed: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityOutcome {
    NotMember,
    Updated { eligible: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversionCheck {
    NotMember,
    NotEligible,
    Eligible(GroupPlan),
}

#[derive(Debug, Clone, PartialEq)]
pub enum VoteOutcome {
    NotMember,
    NotEligible,
    Recorded {
        tally: VoteTally,
        converted_chat: Option<ChatId>,
    },
}

/// Optional narrowing for the explore listing.
#[derive(Debug, Clone, Default)]
pub struct ExploreFilter {
    pub category: Option<GpCategory>,
    /// Case-insensitive substring of the sub-type.
    pub sub_type: Option<String>,
    /// Exact talk topic.
    pub topic: Option<String>,
}

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Create a GP for `creator` if `gate` accepts the quota inputs read in
    /// the same transaction. On success the creator is the sole member, a
    /// creation-history entry is appended and the cooldown is set.
    pub fn create_gp<F>(
        &mut self,
        creator: UserId,
        draft: &ValidGp,
        now: DateTime<Utc>,
        active_since: DateTime<Utc>,
        gate: F,
    ) -> Result<CreateOutcome>
    where
        F: FnOnce(&QuotaInputs) -> std::result::Result<(), QuotaRejection>,
    {
        let now = trunc_ms(now);
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let inputs = read_quota_inputs(&tx, creator, Some(draft.category), now, active_since)?;
        if let Err(rejection) = gate(&inputs) {
            tracing::debug!(user = %creator, reason = rejection.reason(), "GP creation refused");
            return Ok(CreateOutcome::Rejected(rejection));
        }

        let id = GpId::new();
        tx.execute(
            &format!(
                "INSERT INTO group_plans ({GP_COLUMNS}, member_count) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, NULL, 'active',
                    ?15, ?16, 0, 0, NULL, NULL, NULL, 0, ?17, NULL, ?17, 1)"
            ),
            params![
                id.to_string(),
                draft.category.as_str(),
                draft.sub_type,
                draft.specific_name,
                draft.genre,
                serde_json::to_string(&draft.talk_topics)?,
                draft.description,
                draft.creation_reason,
                draft.reason_note,
                draft.location.latitude,
                draft.location.longitude,
                draft.city,
                draft.zone,
                creator.to_string(),
                GP_MAX_MEMBERS,
                ts(now + Duration::hours(GP_TTL_HOURS)),
                ts(now),
            ],
        )?;
        tx.execute(
            "INSERT INTO gp_members (gp_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
            params![id.to_string(), creator.to_string(), ts(now)],
        )?;
        tx.execute(
            "INSERT INTO gp_creation_history (user_id, gp_id, created_at) VALUES (?1, ?2, ?3)",
            params![creator.to_string(), id.to_string(), ts(now)],
        )?;
        tx.execute(
            "UPDATE users SET gp_cooldown_until = ?2 WHERE id = ?1",
            params![
                creator.to_string(),
                ts(now + Duration::minutes(GP_COOLDOWN_MINUTES))
            ],
        )?;

        let gp = load_gp(&tx, id)?;
        tx.commit()?;

        tracing::info!(gp = %id, user = %creator, category = %gp.category, "GP created");
        Ok(CreateOutcome::Created(gp))
    }

    /// Quota inputs for the read-only limits report.
    pub fn quota_inputs(
        &self,
        user: UserId,
        category: Option<GpCategory>,
        now: DateTime<Utc>,
        active_since: DateTime<Utc>,
    ) -> Result<QuotaInputs> {
        read_quota_inputs(self.conn(), user, category, now, active_since)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_gp(&self, id: GpId) -> Result<GroupPlan> {
        load_gp(self.conn(), id)
    }

    /// Joinable GPs within `radius_km` of `origin` that `user` is not in,
    /// newest first, with their distance.
    pub fn active_gps_near(
        &self,
        user: UserId,
        origin: GeoPoint,
        radius_km: f64,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<(GroupPlan, f64)>> {
        let lat_span = radius_km / KM_PER_DEGREE;
        let mut stmt = self.conn().prepare(
            "SELECT id FROM group_plans
             WHERE status = 'active' AND expires_at > ?1 AND is_permanent = 0
               AND latitude BETWEEN ?2 AND ?3
               AND id NOT IN (SELECT gp_id FROM gp_members WHERE user_id = ?4)
             ORDER BY created_at DESC",
        )?;
        let ids = stmt.query_map(
            params![
                ts(now),
                origin.latitude - lat_span,
                origin.latitude + lat_span,
                user.to_string()
            ],
            |row| {
                let raw: String = row.get(0)?;
                parse_uuid(0, &raw).map(GpId)
            },
        )?;

        let mut found = Vec::new();
        for id in ids {
            let gp = self.get_gp(id?)?;
            let distance = origin.distance_km(&gp.location);
            if distance <= radius_km {
                found.push((gp, distance));
                if found.len() >= limit {
                    break;
                }
            }
        }
        Ok(found)
    }

    /// Joinable GPs `user` is not in, newest first, narrowed by `filter`.
    pub fn explore_candidates(
        &self,
        user: UserId,
        filter: &ExploreFilter,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<GroupPlan>> {
        let mut sql = String::from(
            "SELECT id FROM group_plans
             WHERE status = 'active' AND expires_at > ?1 AND is_permanent = 0
               AND id NOT IN (SELECT gp_id FROM gp_members WHERE user_id = ?2)",
        );
        let mut args = vec![ts(now), user.to_string()];

        if let Some(category) = filter.category {
            args.push(category.as_str().to_string());
            sql.push_str(&format!(" AND category = ?{}", args.len()));
        }
        if let Some(sub_type) = &filter.sub_type {
            args.push(sub_type.clone());
            sql.push_str(&format!(" AND sub_type LIKE '%' || ?{} || '%'", args.len()));
        }
        if let Some(topic) = &filter.topic {
            args.push(topic.clone());
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM json_each(talk_topics) WHERE value = ?{})",
                args.len()
            ));
        }
        sql.push_str(&format!(" ORDER BY created_at DESC LIMIT {limit}"));

        let mut stmt = self.conn().prepare(&sql)?;
        let ids = stmt.query_map(params_from_iter(args.iter()), |row| {
            let raw: String = row.get(0)?;
            parse_uuid(0, &raw).map(GpId)
        })?;

        let mut gps = Vec::new();
        for id in ids {
            gps.push(self.get_gp(id?)?);
        }
        Ok(gps)
    }

    /// GPs `user` belongs to that are still running or permanent, newest
    /// first.
    pub fn gps_for_member(&self, user: UserId, now: DateTime<Utc>) -> Result<Vec<GroupPlan>> {
        let mut stmt = self.conn().prepare(
            "SELECT g.id FROM group_plans g
             JOIN gp_members m ON m.gp_id = g.id
             WHERE m.user_id = ?1
               AND (g.is_permanent = 1 OR (g.status = 'active' AND g.expires_at > ?2))
             ORDER BY g.created_at DESC",
        )?;
        let ids = stmt.query_map(params![user.to_string(), ts(now)], |row| {
            let raw: String = row.get(0)?;
            parse_uuid(0, &raw).map(GpId)
        })?;

        let mut gps = Vec::new();
        for id in ids {
            gps.push(self.get_gp(id?)?);
        }
        Ok(gps)
    }

    pub fn get_ballots(&self, gp: GpId) -> Result<Vec<Ballot>> {
        read_ballots(self.conn(), gp)
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Join `gp`. The slot is claimed with a conditional increment bounded by
    /// `max_members`, so at most one of several racing joiners gets the last
    /// seat.
    pub fn join_gp(&mut self, gp: GpId, user: UserId, now: DateTime<Utc>) -> Result<JoinOutcome> {
        let now = trunc_ms(now);
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = load_gp(&tx, gp)?;
        if current.status != GpStatus::Active || current.expires_at <= now {
            return Ok(JoinOutcome::NotActive);
        }
        if current.is_member(user) {
            return Ok(JoinOutcome::AlreadyMember);
        }

        let claimed = tx.execute(
            "UPDATE group_plans
             SET member_count = member_count + 1, last_activity_at = ?2
             WHERE id = ?1 AND member_count < max_members
               AND status = 'active' AND expires_at > ?2",
            params![gp.to_string(), ts(now)],
        )?;
        if claimed == 0 {
            return Ok(JoinOutcome::Full);
        }

        tx.execute(
            "INSERT INTO gp_members (gp_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
            params![gp.to_string(), user.to_string(), ts(now)],
        )?;
        let joined = load_gp(&tx, gp)?;
        tx.commit()?;

        tracing::debug!(gp = %gp, user = %user, members = joined.members.len(), "joined GP");
        Ok(JoinOutcome::Joined(joined))
    }

    /// Leave `gp`. A leave that empties an active GP fails it; a departing
    /// moderator is cleared.
    pub fn leave_gp(&mut self, gp: GpId, user: UserId, now: DateTime<Utc>) -> Result<LeaveOutcome> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = load_gp(&tx, gp)?;
        if !current.is_member(user) {
            return Ok(LeaveOutcome::NotMember);
        }

        tx.execute(
            "DELETE FROM gp_members WHERE gp_id = ?1 AND user_id = ?2",
            params![gp.to_string(), user.to_string()],
        )?;
        tx.execute(
            "UPDATE group_plans
             SET member_count = member_count - 1,
                 last_activity_at = ?2,
                 moderator = CASE WHEN moderator = ?3 THEN NULL ELSE moderator END
             WHERE id = ?1",
            params![gp.to_string(), ts(now), user.to_string()],
        )?;
        let failed = tx.execute(
            "UPDATE group_plans SET status = 'failed'
             WHERE id = ?1 AND status = 'active' AND member_count = 0",
            params![gp.to_string()],
        )? > 0;
        tx.commit()?;

        if failed {
            tracing::info!(gp = %gp, "GP emptied and marked failed");
        }
        Ok(LeaveOutcome::Left { failed })
    }

    // ------------------------------------------------------------------
    // Activity and conversion
    // ------------------------------------------------------------------

    /// Touch `gp`'s activity, optionally raising its message count (it never
    /// goes down). Flags the GP as conversion-eligible the first time it
    /// qualifies while still running.
    pub fn record_activity(
        &mut self,
        gp: GpId,
        user: UserId,
        message_count: Option<u32>,
        now: DateTime<Utc>,
        thresholds: &EligibilityThresholds,
    ) -> Result<ActivityOutcome> {
        let now = trunc_ms(now);
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut current = load_gp(&tx, gp)?;
        if !current.is_member(user) {
            return Ok(ActivityOutcome::NotMember);
        }

        current.last_activity_at = now;
        if let Some(count) = message_count {
            current.message_count = current.message_count.max(count);
        }
        if current.first_message_at.is_none() && current.message_count > 0 {
            current.first_message_at = Some(now);
        }
        let newly_eligible = !current.is_permanent_conversion_eligible
            && is_eligible(thresholds, &current.activity_facts(now), now);

        tx.execute(
            "UPDATE group_plans
             SET last_activity_at = ?2, message_count = MAX(message_count, ?3), first_message_at = ?4
             WHERE id = ?1",
            params![
                gp.to_string(),
                ts(now),
                current.message_count,
                current.first_message_at.map(ts),
            ],
        )?;
        if newly_eligible {
            flag_eligible(&tx, gp, now)?;
            current.is_permanent_conversion_eligible = true;
        }
        tx.commit()?;

        Ok(ActivityOutcome::Updated {
            eligible: current.is_permanent_conversion_eligible,
        })
    }

    /// A member asks for conversion: succeeds only if the GP qualifies now.
    pub fn request_conversion_check(
        &mut self,
        gp: GpId,
        user: UserId,
        now: DateTime<Utc>,
        thresholds: &EligibilityThresholds,
    ) -> Result<ConversionCheck> {
        let now = trunc_ms(now);
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = load_gp(&tx, gp)?;
        if !current.is_member(user) {
            return Ok(ConversionCheck::NotMember);
        }
        if !is_eligible(thresholds, &current.activity_facts(now), now) {
            return Ok(ConversionCheck::NotEligible);
        }

        flag_eligible(&tx, gp, now)?;
        let updated = load_gp(&tx, gp)?;
        tx.commit()?;
        Ok(ConversionCheck::Eligible(updated))
    }

    /// Record `user`'s ballot (last write wins) and convert the GP if the
    /// quorum is met.
    pub fn cast_vote(
        &mut self,
        gp: GpId,
        user: UserId,
        vote: VoteChoice,
        now: DateTime<Utc>,
    ) -> Result<VoteOutcome> {
        let now = trunc_ms(now);
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = load_gp(&tx, gp)?;
        if !current.is_member(user) {
            return Ok(VoteOutcome::NotMember);
        }
        if current.effective_status(now) != GpStatus::Active || !current.is_permanent_conversion_eligible {
            return Ok(VoteOutcome::NotEligible);
        }

        tx.execute(
            "INSERT INTO gp_votes (gp_id, user_id, vote, voted_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(gp_id, user_id) DO UPDATE SET
                vote = excluded.vote,
                voted_at = excluded.voted_at",
            params![gp.to_string(), user.to_string(), vote.as_str(), ts(now)],
        )?;

        let ballots = read_ballots(&tx, gp)?;
        let result = tally(&ballots, &current.members);

        let mut converted_chat = None;
        if result.approved {
            let chat = insert_permanent_chat(&tx, &current.members, gp, current.created_at, now)?;
            tx.execute(
                "UPDATE group_plans
                 SET status = 'converted', is_permanent = 1, converted_chat_id = ?2,
                     converted_at = ?3, moderator = COALESCE(?4, moderator)
                 WHERE id = ?1",
                params![
                    gp.to_string(),
                    chat.to_string(),
                    ts(now),
                    pick_moderator(&current.members, current.created_by).map(|m| m.to_string()),
                ],
            )?;
            converted_chat = Some(chat);
        }
        tx.commit()?;

        if let Some(chat) = converted_chat {
            tracing::info!(gp = %gp, chat = %chat, yes = result.yes_votes, "GP converted to permanent chat");
        }
        Ok(VoteOutcome::Recorded {
            tally: result,
            converted_chat,
        })
    }

    // ------------------------------------------------------------------
    // Sweep
    // ------------------------------------------------------------------

    /// Expire running GPs past their horizon, then fail active GPs with no
    /// members. Returns `(expired, failed)`; a re-run returns `(0, 0)`.
    pub fn expire_gps(&mut self, now: DateTime<Utc>) -> Result<(usize, usize)> {
        let tx = self.conn_mut().transaction()?;
        let expired = tx.execute(
            "UPDATE group_plans SET status = 'expired'
             WHERE status = 'active' AND is_permanent = 0 AND expires_at <= ?1",
            params![ts(now)],
        )?;
        let failed = tx.execute(
            "UPDATE group_plans SET status = 'failed'
             WHERE status = 'active' AND member_count = 0",
            [],
        )?;
        tx.commit()?;
        Ok((expired, failed))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_quota_inputs(
    conn: &Connection,
    user: UserId,
    category: Option<GpCategory>,
    now: DateTime<Utc>,
    active_since: DateTime<Utc>,
) -> Result<QuotaInputs> {
    // Two days back covers the local day under any UTC offset.
    let mut stmt = conn.prepare(
        "SELECT created_at FROM gp_creation_history
         WHERE user_id = ?1 AND created_at >= ?2
         ORDER BY created_at ASC",
    )?;
    let rows = stmt.query_map(
        params![user.to_string(), ts(now - Duration::days(2))],
        |row| {
            let raw: String = row.get(0)?;
            parse_ts(0, &raw)
        },
    )?;
    let mut creation_history = Vec::new();
    for row in rows {
        creation_history.push(row?);
    }

    let cooldown_until: Option<String> = conn
        .query_row(
            "SELECT gp_cooldown_until FROM users WHERE id = ?1",
            params![user.to_string()],
            |row| row.get(0),
        )
        .optional()?
        .flatten();

    let has_active_in_category = match category {
        Some(category) => conn
            .query_row(
                "SELECT 1 FROM group_plans
                 WHERE created_by = ?1 AND category = ?2 AND status = 'active'
                   AND (expires_at > ?3 OR is_permanent = 1 OR is_conversion_eligible = 1)
                 LIMIT 1",
                params![user.to_string(), category.as_str(), ts(now)],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .is_some(),
        None => false,
    };

    let active_users: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE last_active_at >= ?1",
        params![ts(active_since)],
        |row| row.get(0),
    )?;
    let active_groups: i64 = conn.query_row(
        "SELECT COUNT(*) FROM group_plans WHERE status = 'active' AND expires_at > ?1",
        params![ts(now)],
        |row| row.get(0),
    )?;

    Ok(QuotaInputs {
        creation_history,
        cooldown_until: parse_opt_ts(0, cooldown_until)?,
        category,
        has_active_in_category,
        active_users: active_users as u64,
        active_groups: active_groups as u64,
    })
}

fn flag_eligible(conn: &Connection, gp: GpId, now: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE group_plans SET is_conversion_eligible = 1, conversion_requested_at = ?2
         WHERE id = ?1",
        params![gp.to_string(), ts(now)],
    )?;
    Ok(())
}

fn read_ballots(conn: &Connection, gp: GpId) -> Result<Vec<Ballot>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, vote, voted_at FROM gp_votes WHERE gp_id = ?1 ORDER BY rowid ASC",
    )?;
    let rows = stmt.query_map(params![gp.to_string()], |row| {
        let user: String = row.get(0)?;
        let vote: String = row.get(1)?;
        let voted_at: String = row.get(2)?;
        Ok(Ballot {
            user: UserId(parse_uuid(0, &user)?),
            vote: parse_enum(1, &vote)?,
            voted_at: parse_ts(2, &voted_at)?,
        })
    })?;

    let mut ballots = Vec::new();
    for row in rows {
        ballots.push(row?);
    }
    Ok(ballots)
}

fn load_gp(conn: &Connection, id: GpId) -> Result<GroupPlan> {
    let mut gp = conn
        .query_row(
            &format!("SELECT {GP_COLUMNS} FROM group_plans WHERE id = ?1"),
            params![id.to_string()],
            row_to_gp,
        )
        .map_err(not_found)?;

    let mut stmt =
        conn.prepare("SELECT user_id FROM gp_members WHERE gp_id = ?1 ORDER BY rowid ASC")?;
    let rows = stmt.query_map(params![id.to_string()], |row| {
        let raw: String = row.get(0)?;
        parse_uuid(0, &raw).map(UserId)
    })?;
    for row in rows {
        gp.members.push(row?);
    }
    Ok(gp)
}

fn row_to_gp(row: &rusqlite::Row<'_>) -> rusqlite::Result<GroupPlan> {
    let id: String = row.get(0)?;
    let category: String = row.get(1)?;
    let talk_topics: String = row.get(5)?;
    let created_by: String = row.get(13)?;
    let moderator: Option<String> = row.get(14)?;
    let status: String = row.get(15)?;
    let expires: String = row.get(17)?;
    let is_permanent: i64 = row.get(18)?;
    let eligible: i64 = row.get(19)?;
    let converted_chat: Option<String> = row.get(21)?;
    let last_activity: String = row.get(24)?;
    let created: String = row.get(26)?;

    Ok(GroupPlan {
        id: GpId(parse_uuid(0, &id)?),
        category: parse_enum(1, &category)?,
        sub_type: row.get(2)?,
        specific_name: row.get(3)?,
        genre: row.get(4)?,
        talk_topics: parse_json(5, &talk_topics)?,
        description: row.get(6)?,
        creation_reason: row.get(7)?,
        reason_note: row.get(8)?,
        location: GeoPoint {
            latitude: row.get(9)?,
            longitude: row.get(10)?,
        },
        city: row.get(11)?,
        zone: row.get(12)?,
        created_by: UserId(parse_uuid(13, &created_by)?),
        moderator: moderator.map(|m| parse_uuid(14, &m).map(UserId)).transpose()?,
        status: parse_enum(15, &status)?,
        max_members: row.get(16)?,
        members: Vec::new(),
        expires_at: parse_ts(17, &expires)?,
        is_permanent: is_permanent != 0,
        is_permanent_conversion_eligible: eligible != 0,
        conversion_requested_at: parse_opt_ts(20, row.get(20)?)?,
        converted_chat: converted_chat
            .map(|c| parse_uuid(21, &c).map(ChatId))
            .transpose()?,
        converted_at: parse_opt_ts(22, row.get(22)?)?,
        message_count: row.get(23)?,
        last_activity_at: parse_ts(24, &last_activity)?,
        first_message_at: parse_opt_ts(25, row.get(25)?)?,
        created_at: parse_ts(26, &created)?,
    })
}
