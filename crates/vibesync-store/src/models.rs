//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` so handlers can return it directly.

use chrono::{DateTime, Utc};
use serde::Serialize;

use vibesync_shared::discovery::GpSnapshot;
use vibesync_shared::geo::GeoPoint;
use vibesync_shared::matching::MatchProfile;
use vibesync_shared::planner::VibeDiversity;
use vibesync_shared::vibe_score::VibeScore;
use vibesync_shared::voting::ActivityFacts;
use vibesync_shared::{
    ChatId, ConfessionId, ConfessionStatus, GpCategory, GpId, GpStatus, MessageId, RoomId, UserId,
};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub location: Option<GeoPoint>,
    /// Last location refresh; drives the active-user count.
    pub last_active_at: Option<DateTime<Utc>>,
    pub gp_cooldown_until: Option<DateTime<Utc>>,
    /// Open to being approached for a listening chat.
    pub ready_to_listen: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Vibe profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VibeProfile {
    pub user: UserId,
    pub emoji: String,
    pub description: String,
    pub energy_level: u8,
    pub current_intent: Vec<String>,
    pub context_tag: Option<String>,
    pub interaction_boundary: String,
    pub feeling_options: Vec<String>,
    pub vibe_availability: String,
    pub personality_prompt: String,
    pub vibe_score: VibeScore,
    pub is_active: bool,
    pub last_updated: DateTime<Utc>,
}

impl VibeProfile {
    pub fn match_profile(&self) -> MatchProfile {
        MatchProfile {
            vibe_score: self.vibe_score.clone(),
            energy_level: self.energy_level,
            current_intent: self.current_intent.clone(),
            context_tag: self.context_tag.clone(),
            interaction_boundary: self.interaction_boundary.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pairwise chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: ChatId,
    pub participants: Vec<UserId>,
    pub expires_at: DateTime<Utc>,
    pub is_locked: bool,
    pub is_permanently_unlocked: bool,
    /// Set when the chat was spawned by a GP conversion.
    pub source_gp: Option<GpId>,
    pub matched_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    pub fn has_participant(&self, user: UserId) -> bool {
        self.participants.contains(&user)
    }

    /// Lock state as of `now`, regardless of whether a sweep has run yet.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        if self.is_permanently_unlocked {
            return false;
        }
        self.is_locked || self.expires_at <= now
    }

    /// `None` once permanently unlocked.
    pub fn time_remaining_ms(&self, now: DateTime<Utc>) -> Option<i64> {
        if self.is_permanently_unlocked {
            None
        } else {
            Some((self.expires_at - now).num_milliseconds().max(0))
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender: UserId,
    pub text: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Chat room
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: RoomId,
    pub participants: Vec<UserId>,
    pub expires_at: DateTime<Utc>,
    pub is_expired: bool,
    pub vibe_diversity: VibeDiversity,
    pub average_similarity: u8,
    pub created_at: DateTime<Utc>,
}

impl ChatRoom {
    pub fn has_participant(&self, user: UserId) -> bool {
        self.participants.contains(&user)
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired && self.expires_at > now
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessage {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender: UserId,
    pub text: String,
    pub read_by: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Group plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupPlan {
    pub id: GpId,
    pub category: GpCategory,
    pub sub_type: String,
    pub specific_name: String,
    pub genre: String,
    pub talk_topics: Vec<String>,
    pub description: String,
    pub creation_reason: String,
    pub reason_note: String,
    pub location: GeoPoint,
    pub city: String,
    pub zone: String,
    pub created_by: UserId,
    pub moderator: Option<UserId>,
    pub status: GpStatus,
    pub max_members: u32,
    /// In join order; the creator is first until they leave.
    pub members: Vec<UserId>,
    pub expires_at: DateTime<Utc>,
    pub is_permanent: bool,
    pub is_permanent_conversion_eligible: bool,
    pub conversion_requested_at: Option<DateTime<Utc>>,
    pub converted_chat: Option<ChatId>,
    pub converted_at: Option<DateTime<Utc>>,
    pub message_count: u32,
    pub last_activity_at: DateTime<Utc>,
    pub first_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl GroupPlan {
    pub fn is_member(&self, user: UserId) -> bool {
        self.members.contains(&user)
    }

    pub fn member_count(&self) -> u32 {
        self.members.len() as u32
    }

    pub fn snapshot(&self) -> GpSnapshot {
        GpSnapshot {
            id: self.id,
            member_count: self.member_count(),
            max_members: self.max_members,
            expires_at: self.expires_at,
            last_activity_at: self.last_activity_at,
            message_count: self.message_count,
            created_at: self.created_at,
        }
    }

    /// `status`, except that an active, non-permanent GP past its horizon
    /// reads as expired before the sweep has caught up with it.
    pub fn effective_status(&self, now: DateTime<Utc>) -> GpStatus {
        if self.status == GpStatus::Active && !self.is_permanent && self.expires_at <= now {
            GpStatus::Expired
        } else {
            self.status
        }
    }

    pub fn activity_facts(&self, now: DateTime<Utc>) -> ActivityFacts {
        ActivityFacts {
            status: self.effective_status(now),
            member_count: self.members.len(),
            message_count: self.message_count,
            first_message_at: self.first_message_at,
        }
    }

    /// Whole minutes left, floored at zero.
    pub fn minutes_left(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_minutes().max(0)
    }
}

// ---------------------------------------------------------------------------
// Whisper wall
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Confession {
    pub id: ConfessionId,
    /// Kept for rate limiting and report handling only.
    #[serde(skip_serializing)]
    pub author: UserId,
    pub text: String,
    pub status: ConfessionStatus,
    pub expires_at: DateTime<Utc>,
    pub report_count: u32,
    pub removed_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
