//! Permanent conversion of a GP: eligibility, ballots and quorum.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    CONVERSION_QUORUM_PERCENT, DEFAULT_ELIGIBLE_MIN_MEMBERS, DEFAULT_ELIGIBLE_MIN_MESSAGES,
    DEFAULT_ELIGIBLE_MIN_MINUTES,
};
use crate::types::{GpStatus, UserId, VoteChoice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityThresholds {
    pub min_members: usize,
    pub min_messages: u32,
    pub min_minutes: i64,
}

impl Default for EligibilityThresholds {
    fn default() -> Self {
        Self {
            min_members: DEFAULT_ELIGIBLE_MIN_MEMBERS,
            min_messages: DEFAULT_ELIGIBLE_MIN_MESSAGES,
            min_minutes: DEFAULT_ELIGIBLE_MIN_MINUTES,
        }
    }
}

/// GP state consulted by the eligibility predicate.
#[derive(Debug, Clone, Copy)]
pub struct ActivityFacts {
    pub status: GpStatus,
    pub member_count: usize,
    pub message_count: u32,
    pub first_message_at: Option<DateTime<Utc>>,
}

pub fn is_eligible(
    thresholds: &EligibilityThresholds,
    facts: &ActivityFacts,
    now: DateTime<Utc>,
) -> bool {
    if facts.status != GpStatus::Active {
        return false;
    }
    let Some(first) = facts.first_message_at else {
        return false;
    };
    facts.member_count >= thresholds.min_members
        && facts.message_count >= thresholds.min_messages
        && now - first >= Duration::minutes(thresholds.min_minutes)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub user: UserId,
    pub vote: VoteChoice,
    pub voted_at: DateTime<Utc>,
}

/// Insert or overwrite `user`'s ballot.
pub fn record_vote(ballots: &mut Vec<Ballot>, user: UserId, vote: VoteChoice, now: DateTime<Utc>) {
    match ballots.iter_mut().find(|b| b.user == user) {
        Some(existing) => {
            existing.vote = vote;
            existing.voted_at = now;
        }
        None => ballots.push(Ballot {
            user,
            vote,
            voted_at: now,
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub yes_votes: usize,
    pub no_votes: usize,
    pub total_votes: usize,
    pub total_members: usize,
    /// Yes-votes as a whole percentage of current membership.
    pub yes_percentage: u32,
    pub approved: bool,
}

/// Count ballots of current members and apply the quorum.
///
/// The denominator is the whole membership, so abstentions count against
/// conversion. Ballots from users who have since left are ignored.
pub fn tally(ballots: &[Ballot], members: &[UserId]) -> VoteTally {
    let current: Vec<&Ballot> = ballots.iter().filter(|b| members.contains(&b.user)).collect();
    let yes = current.iter().filter(|b| b.vote == VoteChoice::Yes).count();
    let no = current.len() - yes;
    let total_members = members.len();

    let yes_percentage = if total_members == 0 {
        0
    } else {
        ((yes as f64 / total_members as f64) * 100.0).round() as u32
    };
    let approved =
        total_members > 0 && (yes as u64) * 100 >= u64::from(CONVERSION_QUORUM_PERCENT) * total_members as u64;

    VoteTally {
        yes_votes: yes,
        no_votes: no,
        total_votes: current.len(),
        total_members,
        yes_percentage,
        approved,
    }
}

/// First member in join order who is not the creator.
pub fn pick_moderator(members: &[UserId], creator: UserId) -> Option<UserId> {
    members.iter().copied().find(|m| *m != creator)
}
