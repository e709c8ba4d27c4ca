//! Vibe similarity engine.
//!
//! Six sub-scores (0-100) are combined with fixed weights, plus a bonus
//! when both users tagged the same context. The result is clamped to 100
//! and labelled with at most one match category. Callers decide what
//! threshold counts as a match.

use serde::{Deserialize, Serialize};

use crate::types::Mood;
use crate::vibe_score::VibeScore;

const WEIGHT_MOOD: f64 = 0.20;
const WEIGHT_ENERGY: f64 = 0.15;
const WEIGHT_POSITIVITY: f64 = 0.15;
const WEIGHT_INTENT: f64 = 0.20;
const WEIGHT_ENERGY_LEVEL: f64 = 0.15;
const WEIGHT_BOUNDARY: f64 = 0.10;

const CONTEXT_BONUS: f64 = 20.0;

const RELATED_MOODS: &[(Mood, &[Mood])] = &[
    (Mood::Happy, &[Mood::Hype, Mood::Social, Mood::Love]),
    (Mood::Sad, &[Mood::Lonely, Mood::Anxious]),
    (Mood::Chill, &[Mood::Happy, Mood::Creative]),
    (Mood::Hype, &[Mood::Happy, Mood::Social]),
    (Mood::Creative, &[Mood::Chill, Mood::Happy]),
    (Mood::Social, &[Mood::Happy, Mood::Hype]),
    (Mood::Lonely, &[Mood::Sad, Mood::Anxious]),
    (Mood::Love, &[Mood::Happy, Mood::Social]),
];

const RELATED_INTENTS: &[(&str, &[&str])] = &[
    ("chill_conversation", &["make_a_friend", "share_thoughts"]),
    ("make_a_friend", &["chill_conversation", "share_thoughts", "want_to_laugh"]),
    ("share_thoughts", &["chill_conversation", "make_a_friend", "need_advice"]),
    ("rant_vent", &["need_advice", "share_thoughts"]),
    ("get_motivated", &["need_advice", "want_to_laugh"]),
    ("need_advice", &["share_thoughts", "rant_vent"]),
    ("want_to_laugh", &["make_a_friend", "get_motivated"]),
    ("no_talking_just_vibe", &["chill_conversation"]),
];

/// Closed list of communication-style preferences.
pub const INTERACTION_BOUNDARIES: [&str; 6] = [
    "Fast replies",
    "Slow replies",
    "Short messages only",
    "Voice notes okay",
    "Deep conversations",
    "Light and fun only",
];

/// Closed list of selectable intents.
pub const INTENT_OPTIONS: [&str; 8] = [
    "Chill conversation",
    "Make a friend",
    "Share thoughts",
    "Rant / vent",
    "Get motivated",
    "Need advice",
    "Want to laugh",
    "No talking, just vibe",
];

const COMPATIBLE_BOUNDARIES: &[(&str, &[&str])] = &[
    ("Fast replies", &["Fast replies", "Short messages only"]),
    ("Slow replies", &["Slow replies", "Deep conversations"]),
    ("Short messages only", &["Short messages only", "Fast replies", "Light and fun only"]),
    ("Voice notes okay", &["Voice notes okay", "Deep conversations"]),
    ("Deep conversations", &["Deep conversations", "Slow replies", "Voice notes okay"]),
    ("Light and fun only", &["Light and fun only", "Short messages only", "Fast replies"]),
];

const INCOMPATIBLE_BOUNDARIES: &[(&str, &str)] = &[
    ("Fast replies", "Slow replies"),
    ("Deep conversations", "Short messages only"),
    ("Light and fun only", "Deep conversations"),
];

/// The slice of a vibe profile the engine looks at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchProfile {
    pub vibe_score: VibeScore,
    pub energy_level: u8,
    pub current_intent: Vec<String>,
    pub context_tag: Option<String>,
    pub interaction_boundary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchCategory {
    #[serde(rename = "Mood Twins")]
    MoodTwins,
    #[serde(rename = "Near Your Energy")]
    NearYourEnergy,
    #[serde(rename = "Similar Vibes")]
    SimilarVibes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchBreakdown {
    pub mood: u8,
    pub energy: u8,
    pub positivity: u8,
    pub intent: u8,
    pub energy_level: u8,
    pub boundary: u8,
    pub context_bonus: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub similarity: u8,
    pub category: Option<MatchCategory>,
    pub breakdown: MatchBreakdown,
}

fn mood_similarity(a: Mood, b: Mood) -> f64 {
    if a == b {
        return 100.0;
    }
    let related = |x: Mood, y: Mood| {
        RELATED_MOODS
            .iter()
            .any(|(m, others)| *m == x && others.contains(&y))
    };
    if related(a, b) || related(b, a) {
        60.0
    } else {
        20.0
    }
}

fn energy_similarity(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs();
    match diff {
        d if d == 0.0 => 100.0,
        d if d <= 10.0 => 90.0,
        d if d <= 20.0 => 75.0,
        d if d <= 30.0 => 60.0,
        d if d <= 40.0 => 45.0,
        d if d <= 50.0 => 30.0,
        _ => 15.0,
    }
}

fn positivity_similarity(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs();
    match diff {
        d if d == 0.0 => 100.0,
        d if d <= 10.0 => 85.0,
        d if d <= 20.0 => 70.0,
        d if d <= 30.0 => 55.0,
        d if d <= 40.0 => 40.0,
        _ => 25.0,
    }
}

fn energy_level_similarity(a: u8, b: u8) -> f64 {
    match (i16::from(a) - i16::from(b)).abs() {
        0 => 100.0,
        1 => 90.0,
        2 => 75.0,
        3 => 60.0,
        4 => 45.0,
        5 => 30.0,
        _ => 15.0,
    }
}

/// Lowercase, collapse runs of whitespace, `/` and `,` into one `_`, trim `_`.
pub fn normalize_intent(intent: &str) -> String {
    let mut out = String::with_capacity(intent.len());
    let mut pending_sep = false;
    for ch in intent.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() || ch == '/' || ch == ',' || ch == '_' {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('_');
        }
        pending_sep = false;
        out.push(ch);
    }
    out
}

fn intent_similarity(a: &[String], b: &[String]) -> f64 {
    let a: Vec<String> = a.iter().map(|s| normalize_intent(s)).collect();
    let b: Vec<String> = b.iter().map(|s| normalize_intent(s)).collect();

    let exact = a.iter().filter(|i| b.contains(i)).count();
    if exact > 0 {
        if a.len() == 2 && b.len() == 2 && exact == 2 {
            return 100.0;
        }
        return 85.0;
    }

    let related_to = |x: &str, y: &str| {
        RELATED_INTENTS
            .iter()
            .any(|(k, others)| *k == x && others.contains(&y))
    };
    for x in &a {
        for y in &b {
            if related_to(x, y) || related_to(y, x) {
                return 65.0;
            }
        }
    }

    25.0
}

fn boundary_compatibility(a: &str, b: &str) -> f64 {
    if a == b {
        return 100.0;
    }

    let compatible = COMPATIBLE_BOUNDARIES.iter().any(|(key, values)| {
        key.eq_ignore_ascii_case(a) && values.iter().any(|v| v.eq_ignore_ascii_case(b))
    });
    if compatible {
        return 80.0;
    }

    let incompatible = INCOMPATIBLE_BOUNDARIES.iter().any(|(x, y)| {
        (x.eq_ignore_ascii_case(a) && y.eq_ignore_ascii_case(b))
            || (y.eq_ignore_ascii_case(a) && x.eq_ignore_ascii_case(b))
    });
    if incompatible {
        return 30.0;
    }

    60.0
}

fn context_bonus(a: Option<&str>, b: Option<&str>) -> f64 {
    match (a.map(str::trim), b.map(str::trim)) {
        (Some(x), Some(y)) if !x.is_empty() && !y.is_empty() && x.to_lowercase() == y.to_lowercase() => {
            CONTEXT_BONUS
        }
        _ => 0.0,
    }
}

/// Score how well two vibe profiles fit together.
///
/// Pure and deterministic. The category is decided on the unrounded total.
pub fn calculate_similarity(a: &MatchProfile, b: &MatchProfile) -> MatchResult {
    let mood = mood_similarity(a.vibe_score.mood, b.vibe_score.mood);
    let energy = energy_similarity(a.vibe_score.energy, b.vibe_score.energy);
    let positivity = positivity_similarity(a.vibe_score.positivity, b.vibe_score.positivity);
    let intent = intent_similarity(&a.current_intent, &b.current_intent);
    let energy_level = energy_level_similarity(a.energy_level, b.energy_level);
    let boundary = boundary_compatibility(&a.interaction_boundary, &b.interaction_boundary);
    let bonus = context_bonus(a.context_tag.as_deref(), b.context_tag.as_deref());

    let weighted = mood * WEIGHT_MOOD
        + energy * WEIGHT_ENERGY
        + positivity * WEIGHT_POSITIVITY
        + intent * WEIGHT_INTENT
        + energy_level * WEIGHT_ENERGY_LEVEL
        + boundary * WEIGHT_BOUNDARY;
    let similarity = (weighted + bonus).clamp(0.0, 100.0);

    let level_gap = (i16::from(a.energy_level) - i16::from(b.energy_level)).abs();
    let category = if similarity >= 85.0 && mood >= 90.0 {
        Some(MatchCategory::MoodTwins)
    } else if energy_level >= 80.0 && level_gap <= 2 {
        Some(MatchCategory::NearYourEnergy)
    } else if similarity >= 70.0 {
        Some(MatchCategory::SimilarVibes)
    } else {
        None
    };

    MatchResult {
        similarity: similarity.round() as u8,
        category,
        breakdown: MatchBreakdown {
            mood: mood as u8,
            energy: energy as u8,
            positivity: positivity as u8,
            intent: intent as u8,
            energy_level: energy_level as u8,
            boundary: boundary as u8,
            context_bonus: bonus as u8,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vibe_score::{calculate_vibe_score, VibeInput};

    fn profile(emoji: &str, description: &str, level: u8, intents: &[&str], boundary: &str) -> MatchProfile {
        let intents: Vec<String> = intents.iter().map(|s| s.to_string()).collect();
        let vibe_score = calculate_vibe_score(&VibeInput {
            emoji,
            description,
            energy_level: level,
            current_intent: &intents,
            context_tag: None,
        });
        MatchProfile {
            vibe_score,
            energy_level: level,
            current_intent: intents,
            context_tag: None,
            interaction_boundary: boundary.to_string(),
        }
    }

    #[test]
    fn test_normalize_intent() {
        assert_eq!(normalize_intent("Rant / vent"), "rant_vent");
        assert_eq!(normalize_intent("No talking, just vibe"), "no_talking_just_vibe");
        assert_eq!(normalize_intent("  Make a   friend "), "make_a_friend");
        assert_eq!(normalize_intent("make_a_friend"), "make_a_friend");
    }

    #[test]
    fn test_self_similarity() {
        let p = profile("😊", "feeling good today", 6, &["Make a friend"], "Fast replies");
        let result = calculate_similarity(&p, &p.clone());
        assert!(result.similarity >= 85);
        assert_eq!(result.breakdown.mood, 100);
        assert_eq!(result.category, Some(MatchCategory::MoodTwins));
    }

    #[test]
    fn test_two_matching_intents_score_full() {
        let a = profile("😊", "hello there", 5, &["Make a friend", "Need advice"], "Fast replies");
        let b = profile("😊", "hello there", 5, &["Need advice", "Make a friend"], "Fast replies");
        assert_eq!(calculate_similarity(&a, &b).breakdown.intent, 100);

        let c = profile("😊", "hello there", 5, &["Need advice"], "Fast replies");
        assert_eq!(calculate_similarity(&a, &c).breakdown.intent, 85);

        let d = profile("😊", "hello there", 5, &["Chill conversation"], "Fast replies");
        // make_a_friend relates to chill_conversation
        assert_eq!(calculate_similarity(&a, &d).breakdown.intent, 65);

        let e = profile("😊", "hello there", 5, &["Get motivated"], "Fast replies");
        let f = profile("😊", "hello there", 5, &["No talking, just vibe"], "Fast replies");
        assert_eq!(calculate_similarity(&e, &f).breakdown.intent, 25);
    }

    #[test]
    fn test_boundary_tables() {
        assert_eq!(boundary_compatibility("Fast replies", "Fast replies"), 100.0);
        assert_eq!(boundary_compatibility("Fast replies", "Short messages only"), 80.0);
        assert_eq!(boundary_compatibility("Slow replies", "Fast replies"), 30.0);
        assert_eq!(boundary_compatibility("Voice notes okay", "Fast replies"), 60.0);
    }

    #[test]
    fn test_mood_adjacency() {
        assert_eq!(mood_similarity(Mood::Happy, Mood::Love), 60.0);
        assert_eq!(mood_similarity(Mood::Anxious, Mood::Sad), 60.0);
        assert_eq!(mood_similarity(Mood::Angry, Mood::Love), 20.0);
    }

    #[test]
    fn test_context_bonus_case_insensitive() {
        let mut a = profile("😊", "hello there", 5, &["Make a friend"], "Fast replies");
        let mut b = profile("😢", "hello there", 2, &["Rant / vent"], "Slow replies");
        let base = calculate_similarity(&a, &b);
        a.context_tag = Some("Work".into());
        b.context_tag = Some("work".into());
        let boosted = calculate_similarity(&a, &b);
        assert_eq!(boosted.breakdown.context_bonus, 20);
        assert!(boosted.similarity > base.similarity);

        b.context_tag = Some(String::new());
        assert_eq!(calculate_similarity(&a, &b).breakdown.context_bonus, 0);
    }

    #[test]
    fn test_similarity_bounds_over_grid() {
        let emojis = ["😊", "😢", "🔥", "🎨", "🥰", "😰", "🦀"];
        let boundaries = INTERACTION_BOUNDARIES;
        let mut profiles = Vec::new();
        for (i, emoji) in emojis.iter().enumerate() {
            for level in [1u8, 4, 7, 10] {
                let boundary = boundaries[(i + level as usize) % boundaries.len()];
                let intent = INTENT_OPTIONS[(i * 3 + level as usize) % INTENT_OPTIONS.len()];
                let mut p = profile(emoji, "happy tired chill night", level, &[intent], boundary);
                p.context_tag = Some("Work".into());
                profiles.push(p);
            }
        }
        for a in &profiles {
            for b in &profiles {
                let r = calculate_similarity(a, b);
                assert!(r.similarity <= 100);
                assert_eq!(r, calculate_similarity(a, b));
            }
        }
    }

    #[test]
    fn test_energy_level_gap_is_monotonic() {
        let base = profile("😌", "calm quiet evening", 1, &["Share thoughts"], "Slow replies");
        let mut previous = u8::MAX;
        for level in 1..=10u8 {
            let mut other = base.clone();
            other.energy_level = level;
            let sim = calculate_similarity(&base, &other).similarity;
            assert!(sim <= previous, "level {level}: {sim} > {previous}");
            previous = sim;
        }
    }

    #[test]
    fn test_near_your_energy_category() {
        let a = profile("😢", "rough day honestly", 5, &["Rant / vent"], "Slow replies");
        let b = profile("🎨", "making some art", 6, &["Want to laugh"], "Fast replies");
        let r = calculate_similarity(&a, &b);
        assert_eq!(r.category, Some(MatchCategory::NearYourEnergy));
        assert!(r.similarity < 85);
    }

    #[test]
    fn test_category_serializes_as_label() {
        let json = serde_json::to_string(&Some(MatchCategory::MoodTwins)).unwrap();
        assert_eq!(json, "\"Mood Twins\"");
        let none: Option<MatchCategory> = None;
        assert_eq!(serde_json::to_string(&none).unwrap(), "null");
    }
}
