//! GP discovery ranking and explore ordering.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::constants::{GP_DISCOVERY_LIMIT, GP_RADIUS_STEPS_KM};
use crate::types::GpId;

/// The parts of an active GP that ranking looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct GpSnapshot {
    pub id: GpId,
    pub member_count: u32,
    pub max_members: u32,
    pub expires_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub message_count: u32,
    pub created_at: DateTime<Utc>,
}

impl GpSnapshot {
    pub fn members_needed(&self) -> u32 {
        self.max_members.saturating_sub(self.member_count)
    }

    pub fn hours_remaining(&self, now: DateTime<Utc>) -> f64 {
        (self.expires_at - now).num_milliseconds() as f64 / 3_600_000.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedGp {
    pub gp: GpSnapshot,
    /// Kilometres, rounded to one decimal.
    pub distance_km: f64,
    pub priority_score: i32,
}

pub fn priority_score(gp: &GpSnapshot, distance_km: f64, now: DateTime<Utc>) -> i32 {
    let mut score = 0;

    match gp.members_needed() {
        1 => score += 100,
        2 => score += 80,
        0 => score -= 50,
        _ => {}
    }

    let hours_remaining = gp.hours_remaining(now);
    if hours_remaining > 1.5 {
        score += 50;
    } else if hours_remaining < 0.5 {
        score -= 30;
    }

    if distance_km < 5.0 {
        score += 40;
    } else if distance_km < 10.0 {
        score += 30;
    } else if distance_km < 25.0 {
        score += 20;
    } else if distance_km < 50.0 {
        score += 10;
    }

    let idle_hours = (now - gp.last_activity_at).num_milliseconds() as f64 / 3_600_000.0;
    if idle_hours < 0.5 {
        score += 20;
    } else if idle_hours < 1.0 {
        score += 10;
    }

    if gp.message_count > 10 {
        score += 15;
    } else if gp.message_count > 5 {
        score += 10;
    }

    score
}

/// Walk the radius steps, returning the first non-empty candidate set.
///
/// `fetch` is called once per step with the radius in km and must return the
/// candidates within it (already limited and ordered by the caller).
pub fn expand_radius<T, E, F>(mut fetch: F) -> Result<Vec<T>, E>
where
    F: FnMut(f64) -> Result<Vec<T>, E>,
{
    for radius in GP_RADIUS_STEPS_KM {
        let found = fetch(radius)?;
        if !found.is_empty() {
            return Ok(found);
        }
    }
    Ok(Vec::new())
}

/// Score candidates and keep the best ones, highest score first.
pub fn rank_for_discovery(candidates: Vec<(GpSnapshot, f64)>, now: DateTime<Utc>) -> Vec<RankedGp> {
    let mut ranked: Vec<RankedGp> = candidates
        .into_iter()
        .map(|(gp, distance)| RankedGp {
            priority_score: priority_score(&gp, distance, now),
            distance_km: (distance * 10.0).round() / 10.0,
            gp,
        })
        .collect();
    ranked.sort_by(|a, b| b.priority_score.cmp(&a.priority_score));
    ranked.truncate(GP_DISCOVERY_LIMIT);
    ranked
}

/// Explore ordering: nearly-full groups first, then more time left, then
/// nearer, then most recently active.
pub fn explore_order(
    a: (&GpSnapshot, Option<f64>),
    b: (&GpSnapshot, Option<f64>),
    now: DateTime<Utc>,
) -> Ordering {
    let (a_gp, a_dist) = a;
    let (b_gp, b_dist) = b;
    let a_needed = a_gp.members_needed();
    let b_needed = b_gp.members_needed();

    if a_needed != b_needed {
        return match (a_needed <= 2, b_needed <= 2) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => a_needed.cmp(&b_needed),
        };
    }

    let a_hours = a_gp.hours_remaining(now);
    let b_hours = b_gp.hours_remaining(now);
    if (a_hours - b_hours).abs() > 0.1 {
        return b_hours.partial_cmp(&a_hours).unwrap_or(Ordering::Equal);
    }

    if let (Some(a_d), Some(b_d)) = (a_dist, b_dist) {
        return a_d.partial_cmp(&b_d).unwrap_or(Ordering::Equal);
    }

    b_gp.last_activity_at.cmp(&a_gp.last_activity_at)
}
