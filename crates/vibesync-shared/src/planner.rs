//! Chat room formation.
//!
//! Picks three companions for a requester out of a pool of active vibe
//! profiles: similarity-qualified first, spread across energy bands second,
//! best remaining matches last.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::constants::{CHAT_ROOM_OTHERS, ROOM_MIN_SIMILARITY};
use crate::error::PlanError;
use crate::matching::{calculate_similarity, MatchProfile};
use crate::types::{EnergyBand, UserId};

/// A user with an active vibe profile.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub user: UserId,
    pub profile: MatchProfile,
}

/// Blocks in either direction between two users.
#[derive(Debug, Clone, Default)]
pub struct BlockList {
    pairs: HashSet<(UserId, UserId)>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `blocker` blocked `blocked`.
    pub fn insert(&mut self, blocker: UserId, blocked: UserId) {
        self.pairs.insert((blocker, blocked));
    }

    pub fn is_blocked_either(&self, a: UserId, b: UserId) -> bool {
        self.pairs.contains(&(a, b)) || self.pairs.contains(&(b, a))
    }

    /// Every user `user` blocked or was blocked by.
    pub fn related_to(&self, user: UserId) -> HashSet<UserId> {
        self.pairs
            .iter()
            .filter_map(|(a, b)| {
                if *a == user {
                    Some(*b)
                } else if *b == user {
                    Some(*a)
                } else {
                    None
                }
            })
            .collect()
    }
}

impl FromIterator<(UserId, UserId)> for BlockList {
    fn from_iter<I: IntoIterator<Item = (UserId, UserId)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub user: UserId,
    pub similarity: u8,
    pub energy_level: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VibeDiversity {
    pub low_energy: u32,
    pub mid_energy: u32,
    pub high_energy: u32,
}

impl VibeDiversity {
    pub fn from_levels(levels: impl IntoIterator<Item = u8>) -> Self {
        let mut diversity = Self::default();
        for level in levels {
            match EnergyBand::from_level(level) {
                Some(EnergyBand::Low) => diversity.low_energy += 1,
                Some(EnergyBand::Mid) => diversity.mid_energy += 1,
                Some(EnergyBand::High) => diversity.high_energy += 1,
                None => {}
            }
        }
        diversity
    }
}

/// A room ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomPlan {
    /// Requester first, then the chosen companions in pick order.
    pub participants: Vec<UserId>,
    pub companions: Vec<ScoredCandidate>,
    pub vibe_diversity: VibeDiversity,
    pub average_similarity: u8,
}

/// Plan a room for `requester`.
///
/// `excluded` holds users that must not be picked (blocked users, users
/// already in a live room). The requester is always excluded.
pub fn plan_room(
    requester: &PoolEntry,
    pool: &[PoolEntry],
    excluded: &HashSet<UserId>,
) -> Result<RoomPlan, PlanError> {
    let eligible: Vec<&PoolEntry> = pool
        .iter()
        .filter(|c| c.user != requester.user && !excluded.contains(&c.user))
        .collect();

    let mut scored: Vec<ScoredCandidate> = eligible
        .iter()
        .map(|c| ScoredCandidate {
            user: c.user,
            similarity: calculate_similarity(&requester.profile, &c.profile).similarity,
            energy_level: c.profile.energy_level,
        })
        .filter(|c| c.similarity >= ROOM_MIN_SIMILARITY)
        .collect();

    if scored.len() < CHAT_ROOM_OTHERS {
        return Err(PlanError::NotEnoughUsers {
            eligible: eligible.len(),
            compatible: scored.len(),
        });
    }

    // stable: equal scores keep pool order
    scored.sort_by(|a, b| b.similarity.cmp(&a.similarity));

    let mut chosen: Vec<ScoredCandidate> = Vec::with_capacity(CHAT_ROOM_OTHERS);
    for band in [EnergyBand::Low, EnergyBand::Mid, EnergyBand::High] {
        if chosen.len() >= CHAT_ROOM_OTHERS {
            break;
        }
        if let Some(best) = scored
            .iter()
            .find(|c| EnergyBand::from_level(c.energy_level) == Some(band))
        {
            if !chosen.iter().any(|p| p.user == best.user) {
                chosen.push(*best);
            }
        }
    }

    for candidate in &scored {
        if chosen.len() >= CHAT_ROOM_OTHERS {
            break;
        }
        if !chosen.iter().any(|p| p.user == candidate.user) {
            chosen.push(*candidate);
        }
    }

    let total: u32 = chosen.iter().map(|c| u32::from(c.similarity)).sum();
    let average_similarity = (f64::from(total) / chosen.len() as f64).round() as u8;

    let vibe_diversity = VibeDiversity::from_levels(
        std::iter::once(requester.profile.energy_level).chain(chosen.iter().map(|c| c.energy_level)),
    );

    let mut participants = Vec::with_capacity(CHAT_ROOM_OTHERS + 1);
    participants.push(requester.user);
    participants.extend(chosen.iter().map(|c| c.user));

    Ok(RoomPlan {
        participants,
        companions: chosen,
        vibe_diversity,
        average_similarity,
    })
}

/// Plan rooms for every pool member who is not already in a live room.
///
/// Users are visited in pool order; once placed in a planned room a user is
/// not considered again. Users for whom no room can be formed are skipped.
pub fn plan_rooms_for_pool(
    pool: &[PoolEntry],
    already_roomed: &HashSet<UserId>,
    blocks: &BlockList,
) -> Vec<RoomPlan> {
    let needing: Vec<PoolEntry> = pool
        .iter()
        .filter(|e| !already_roomed.contains(&e.user))
        .cloned()
        .collect();

    let mut processed: HashSet<UserId> = HashSet::new();
    let mut plans = Vec::new();

    for entry in &needing {
        if processed.contains(&entry.user) {
            continue;
        }

        let mut excluded = blocks.related_to(entry.user);
        excluded.extend(processed.iter().copied());

        match plan_room(entry, &needing, &excluded) {
            Ok(plan) => {
                processed.extend(plan.participants.iter().copied());
                plans.push(plan);
            }
            Err(e) => {
                tracing::debug!(user = %entry.user, error = %e, "no room formed in sweep");
            }
        }
    }

    plans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Mood;
    use crate::vibe_score::VibeScore;

    /// Profiles that differ only in energy level; all pairwise similarities
    /// land well above the room threshold when levels are close.
    fn entry(level: u8) -> PoolEntry {
        entry_with(level, Mood::Happy, "Fast replies")
    }

    fn entry_with(level: u8, mood: Mood, boundary: &str) -> PoolEntry {
        PoolEntry {
            user: UserId::new(),
            profile: MatchProfile {
                vibe_score: VibeScore {
                    mood,
                    energy: 50.0,
                    positivity: 70.0,
                    intent: "make_a_friend".into(),
                },
                energy_level: level,
                current_intent: vec!["Make a friend".into()],
                context_tag: None,
                interaction_boundary: boundary.into(),
            },
        }
    }

    /// Far from the requester on every axis.
    fn incompatible(level: u8) -> PoolEntry {
        PoolEntry {
            user: UserId::new(),
            profile: MatchProfile {
                vibe_score: VibeScore {
                    mood: Mood::Angry,
                    energy: 100.0,
                    positivity: 0.0,
                    intent: "rant_vent".into(),
                },
                energy_level: level,
                current_intent: vec!["No talking, just vibe".into()],
                context_tag: None,
                interaction_boundary: "Slow replies".into(),
            },
        }
    }

    #[test]
    fn test_not_enough_users_with_two_qualifying() {
        let requester = entry(5);
        let pool = vec![entry(5), entry(6), incompatible(10)];
        let err = plan_room(&requester, &pool, &HashSet::new()).unwrap_err();
        assert_eq!(
            err,
            PlanError::NotEnoughUsers {
                eligible: 3,
                compatible: 2
            }
        );
    }

    #[test]
    fn test_picks_one_per_energy_band_first() {
        let requester = entry(5);
        let low = entry(3);
        let mid_a = entry(5);
        let mid_b = entry(6);
        let high = entry(8);
        let pool = vec![mid_a.clone(), mid_b.clone(), low.clone(), high.clone()];

        let plan = plan_room(&requester, &pool, &HashSet::new()).unwrap();
        assert_eq!(plan.participants.len(), 4);
        assert_eq!(plan.participants[0], requester.user);
        // low band, then mid band (best mid is the identical level), then high
        assert_eq!(plan.participants[1], low.user);
        assert_eq!(plan.participants[2], mid_a.user);
        assert_eq!(plan.participants[3], high.user);
        assert!(!plan.participants.contains(&mid_b.user));
        assert_eq!(
            plan.vibe_diversity,
            VibeDiversity {
                low_energy: 1,
                mid_energy: 2,
                high_energy: 1
            }
        );
    }

    #[test]
    fn test_fills_from_best_overall_when_bands_missing() {
        let requester = entry(5);
        let a = entry(5);
        let b = entry(6);
        let c = entry(4);
        let d = entry(7);
        let pool = vec![d.clone(), c.clone(), b.clone(), a.clone()];

        let plan = plan_room(&requester, &pool, &HashSet::new()).unwrap();
        // only mid band present: its best pick, then the next best overall
        assert_eq!(plan.companions[0].user, a.user);
        assert_eq!(plan.companions.len(), 3);
        let sims: Vec<u8> = plan.companions.iter().map(|c| c.similarity).collect();
        assert!(sims[1] >= sims[2]);
        let expected = (sims.iter().map(|s| *s as f64).sum::<f64>() / 3.0).round() as u8;
        assert_eq!(plan.average_similarity, expected);
    }

    #[test]
    fn test_excluded_users_are_never_picked() {
        let requester = entry(5);
        let pool = vec![entry(5), entry(5), entry(5), entry(5)];
        let mut excluded = HashSet::new();
        excluded.insert(pool[0].user);
        excluded.insert(pool[1].user);

        let err = plan_room(&requester, &pool, &excluded).unwrap_err();
        assert!(matches!(err, PlanError::NotEnoughUsers { eligible: 2, .. }));
    }

    #[test]
    fn test_requester_in_pool_is_ignored() {
        let requester = entry(5);
        let pool = vec![requester.clone(), entry(5), entry(5), entry(5)];
        let plan = plan_room(&requester, &pool, &HashSet::new()).unwrap();
        assert_eq!(
            plan.participants.iter().filter(|u| **u == requester.user).count(),
            1
        );
    }

    #[test]
    fn test_pool_planning_places_each_user_once() {
        let pool: Vec<PoolEntry> = (0..9).map(|i| entry(4 + (i % 3) as u8)).collect();
        let plans = plan_rooms_for_pool(&pool, &HashSet::new(), &BlockList::new());
        assert_eq!(plans.len(), 2);

        let mut seen = HashSet::new();
        for plan in &plans {
            assert_eq!(plan.participants.len(), 4);
            for p in &plan.participants {
                assert!(seen.insert(*p), "user placed twice");
            }
        }
    }

    #[test]
    fn test_pool_planning_respects_blocks_and_existing_rooms() {
        let pool: Vec<PoolEntry> = (0..6).map(|_| entry(5)).collect();
        let mut roomed = HashSet::new();
        roomed.insert(pool[5].user);

        let mut blocks = BlockList::new();
        blocks.insert(pool[1].user, pool[0].user);

        let plans = plan_rooms_for_pool(&pool, &roomed, &blocks);
        // pool[0] rooms with 2, 3 and 4; pool[1] is left with nobody
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].participants[0], pool[0].user);
        assert!(!plans[0].participants.contains(&pool[1].user));
        assert!(!plans[0].participants.contains(&pool[5].user));
    }
}
