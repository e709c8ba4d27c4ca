//! Vibe score calculation.
//!
//! Turns the raw self-report (emoji, short description, energy slider,
//! intents) into the normalized vector the similarity engine compares.
//! Every function here is total over already-validated input.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::types::Mood;

/// Emoji membership per mood. An emoji listed under several moods resolves
/// to the first one in this order.
const EMOTION_CATEGORIES: &[(Mood, &[&str])] = &[
    (Mood::Happy, &["😊", "😄", "😃", "😁", "😆", "🥳", "😎", "🤩"]),
    (Mood::Sad, &["😢", "😭", "😔", "😞", "😟", "😕", "🙁", "☹️"]),
    (Mood::Chill, &["😌", "😴", "😑", "😐", "🙂", "😊", "🧘", "🌊"]),
    (Mood::Hype, &["🔥", "💯", "⚡", "🚀", "💪", "🎉", "✨", "🌟"]),
    (Mood::Creative, &["🎨", "🎭", "🎪", "🎬", "📝", "✍️", "💡", "🧠"]),
    (Mood::Social, &["👥", "🤝", "💬", "🎤", "🎵", "🎶", "🎧", "📱"]),
    (Mood::Lonely, &["😔", "😞", "😟", "😕", "🙁", "😢", "💔", "🌙"]),
    (Mood::Love, &["❤️", "💕", "💖", "💗", "💓", "😍", "🥰", "😘"]),
    (Mood::Angry, &["😠", "😡", "🤬", "💢", "😤", "😾", "👿", "🔥"]),
    (Mood::Anxious, &["😰", "😨", "😱", "😓", "😥", "😟", "😖", "😣"]),
];

const EMOJI_POSITIVITY: &[(&str, f64)] = &[
    ("😊", 85.0), ("😄", 90.0), ("😃", 90.0), ("😁", 95.0), ("😆", 95.0), ("🥳", 100.0),
    ("😎", 80.0), ("🤩", 95.0), ("😢", 15.0), ("😭", 10.0), ("😔", 25.0), ("😞", 20.0),
    ("😟", 30.0), ("😕", 35.0), ("🙁", 30.0), ("☹️", 25.0), ("😌", 70.0), ("😴", 50.0),
    ("😑", 50.0), ("😐", 50.0), ("🙂", 75.0), ("🧘", 65.0), ("🌊", 60.0), ("🔥", 85.0),
    ("💯", 90.0), ("⚡", 85.0), ("🚀", 90.0), ("💪", 80.0), ("🎉", 95.0), ("✨", 85.0),
    ("🌟", 85.0), ("🎨", 70.0), ("🎭", 70.0), ("🎪", 80.0), ("🎬", 75.0), ("📝", 65.0),
    ("✍️", 70.0), ("💡", 75.0), ("🧠", 70.0), ("👥", 75.0), ("🤝", 80.0), ("💬", 70.0),
    ("🎤", 80.0), ("🎵", 75.0), ("🎶", 75.0), ("🎧", 70.0), ("📱", 60.0), ("💔", 20.0),
    ("🌙", 40.0), ("❤️", 90.0), ("💕", 95.0), ("💖", 95.0), ("💗", 90.0), ("💓", 90.0),
    ("😍", 95.0), ("🥰", 100.0), ("😘", 90.0), ("😠", 20.0), ("😡", 15.0), ("🤬", 10.0),
    ("💢", 20.0), ("😤", 30.0), ("😾", 25.0), ("👿", 15.0), ("😰", 35.0), ("😨", 30.0),
    ("😱", 25.0), ("😓", 40.0), ("😥", 35.0), ("😖", 30.0), ("😣", 35.0),
];

/// Small nudges on top of the slider; the slider is the primary signal.
const EMOJI_ENERGY: &[(&str, f64)] = &[
    ("🔥", 5.0), ("💯", 3.0), ("⚡", 8.0), ("🚀", 5.0), ("💪", 3.0), ("🎉", 5.0),
    ("✨", 2.0), ("🌟", 2.0), ("😆", 3.0), ("😄", 2.0), ("😃", 2.0), ("😁", 3.0),
    ("🥳", 5.0), ("😎", 1.0), ("🤩", 3.0), ("😴", -8.0), ("😌", -3.0), ("🧘", -5.0),
    ("😢", -3.0), ("😭", -5.0), ("😔", -5.0), ("😞", -5.0), ("😟", -3.0),
];

const POSITIVE_WORDS: &[&str] = &[
    "happy", "great", "amazing", "wonderful", "blessed", "grateful", "joy", "excited", "pumped",
    "fire", "lit", "love", "beautiful", "perfect", "fantastic", "awesome", "incredible", "best",
    "good", "nice", "sweet",
];

const NEGATIVE_WORDS: &[&str] = &[
    "sad", "down", "blue", "lonely", "hurt", "broken", "tired", "exhausted", "stressed",
    "anxious", "worried", "scared", "angry", "frustrated", "bad", "terrible", "awful",
    "horrible", "worst", "hate", "disappointed",
];

/// Keyword table for intent detection when no explicit intent was chosen.
/// Order matters: ties go to the earlier entry.
const INTENT_KEYWORDS: &[(&str, &[&str])] = &[
    ("chill", &["chill", "relax", "calm", "peaceful", "zen", "mellow", "quiet"]),
    ("social", &["social", "party", "friends", "together", "hang", "meet", "connect"]),
    ("sad", &["sad", "down", "blue", "melancholy", "lonely", "missing", "hurt"]),
    ("hype", &["hype", "excited", "pumped", "energetic", "fire", "lit", "amazing"]),
    ("creative", &["creative", "inspired", "artistic", "making", "building", "creating"]),
    ("lonely", &["lonely", "alone", "isolated", "missing", "empty", "void"]),
    ("happy", &["happy", "joy", "great", "wonderful", "amazing", "blessed", "grateful"]),
];

const DEFAULT_EMOJI_POSITIVITY: f64 = 50.0;
const KEYWORD_BASELINE: f64 = 50.0;
const KEYWORD_STEP: f64 = 10.0;
const KEYWORD_CAP: f64 = 50.0;
const EMOJI_WEIGHT: f64 = 0.6;
const KEYWORD_WEIGHT: f64 = 0.4;

fn mood_table() -> &'static HashMap<&'static str, Mood> {
    static TABLE: OnceLock<HashMap<&'static str, Mood>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut map = HashMap::new();
        for (mood, emojis) in EMOTION_CATEGORIES {
            for emoji in emojis.iter() {
                map.entry(*emoji).or_insert(*mood);
            }
        }
        map
    })
}

fn positivity_table() -> &'static HashMap<&'static str, f64> {
    static TABLE: OnceLock<HashMap<&'static str, f64>> = OnceLock::new();
    TABLE.get_or_init(|| EMOJI_POSITIVITY.iter().copied().collect())
}

fn energy_table() -> &'static HashMap<&'static str, f64> {
    static TABLE: OnceLock<HashMap<&'static str, f64>> = OnceLock::new();
    TABLE.get_or_init(|| EMOJI_ENERGY.iter().copied().collect())
}

/// Raw self-report as submitted by the user, already range-checked.
#[derive(Debug, Clone)]
pub struct VibeInput<'a> {
    pub emoji: &'a str,
    pub description: &'a str,
    pub energy_level: u8,
    pub current_intent: &'a [String],
    pub context_tag: Option<&'a str>,
}

/// Normalized vibe vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VibeScore {
    pub mood: Mood,
    /// 0-100.
    pub energy: f64,
    /// 0-100.
    pub positivity: f64,
    pub intent: String,
}

/// Map an emoji to its emotion category, `Neutral` when unknown.
pub fn emotion_category(emoji: &str) -> Mood {
    mood_table()
        .get(emoji.trim())
        .copied()
        .unwrap_or(Mood::Neutral)
}

/// Detect an intent from free text by keyword hits.
pub fn extract_intent(description: &str) -> String {
    let lowered = description.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();

    let mut best = "neutral";
    let mut best_hits = 0;
    for (intent, keywords) in INTENT_KEYWORDS {
        let hits = keywords
            .iter()
            .filter(|kw| words.iter().any(|w| w.contains(*kw)))
            .count();
        if hits > best_hits {
            best_hits = hits;
            best = intent;
        }
    }
    best.to_string()
}

/// Lowercase and join whitespace runs with `_`.
pub fn normalize_intent_label(label: &str) -> String {
    label
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

fn keyword_score(description: &str) -> f64 {
    let lowered = description.to_lowercase();
    let mut positive = 0i64;
    let mut negative = 0i64;
    for word in lowered.split_whitespace() {
        if POSITIVE_WORDS.iter().any(|pw| word.contains(pw)) {
            positive += 1;
        }
        if NEGATIVE_WORDS.iter().any(|nw| word.contains(nw)) {
            negative += 1;
        }
    }

    let net = (positive - negative) as f64;
    if net > 0.0 {
        KEYWORD_BASELINE + (net * KEYWORD_STEP).min(KEYWORD_CAP)
    } else {
        KEYWORD_BASELINE - (-net * KEYWORD_STEP).min(KEYWORD_CAP)
    }
}

fn positivity(description: &str, emoji: &str) -> f64 {
    let emoji_score = positivity_table()
        .get(emoji.trim())
        .copied()
        .unwrap_or(DEFAULT_EMOJI_POSITIVITY);
    (emoji_score * EMOJI_WEIGHT + keyword_score(description) * KEYWORD_WEIGHT).round()
}

fn energy(level: u8, emoji: &str) -> f64 {
    let base = (f64::from(level) - 1.0) * (100.0 / 9.0);
    let adjustment = energy_table().get(emoji.trim()).copied().unwrap_or(0.0);
    (base + adjustment).clamp(0.0, 100.0)
}

/// Compute the vibe vector for a validated self-report.
pub fn calculate_vibe_score(input: &VibeInput<'_>) -> VibeScore {
    let intent = match input.current_intent.first() {
        Some(first) => normalize_intent_label(first),
        None => extract_intent(input.description),
    };

    VibeScore {
        mood: emotion_category(input.emoji),
        energy: energy(input.energy_level, input.emoji),
        positivity: positivity(input.description, input.emoji),
        intent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(emoji: &'a str, description: &'a str, level: u8, intents: &'a [String]) -> VibeInput<'a> {
        VibeInput {
            emoji,
            description,
            energy_level: level,
            current_intent: intents,
            context_tag: None,
        }
    }

    #[test]
    fn test_mood_lookup_prefers_first_category() {
        // listed under both happy and chill
        assert_eq!(emotion_category("😊"), Mood::Happy);
        // listed under both hype and angry
        assert_eq!(emotion_category("🔥"), Mood::Hype);
        assert_eq!(emotion_category("🥰"), Mood::Love);
        assert_eq!(emotion_category("🦀"), Mood::Neutral);
    }

    #[test]
    fn test_energy_remap_and_clamp() {
        let none: Vec<String> = vec!["Chill conversation".into()];
        assert_eq!(calculate_vibe_score(&input("🦀", "just two", 1, &none)).energy, 0.0);
        assert_eq!(calculate_vibe_score(&input("🦀", "just two", 10, &none)).energy, 100.0);
        // 10 + positive nudge stays clamped
        assert_eq!(calculate_vibe_score(&input("⚡", "just two", 10, &none)).energy, 100.0);
        // 1 + negative nudge stays clamped
        assert_eq!(calculate_vibe_score(&input("😴", "just two", 1, &none)).energy, 0.0);
        let mid = calculate_vibe_score(&input("😴", "just two", 5, &none)).energy;
        assert!((mid - (4.0 * 100.0 / 9.0 - 8.0)).abs() < 1e-9);
    }

    #[test]
    fn test_positivity_blend() {
        let intents: Vec<String> = vec!["Want to laugh".into()];
        // emoji 100, two positive words -> 70; 0.6*100 + 0.4*70 = 88
        let score = calculate_vibe_score(&input("🥳", "feeling happy and great", 7, &intents));
        assert_eq!(score.positivity, 88.0);

        // unknown emoji 50, one negative word -> 40; 30 + 16 = 46
        let score = calculate_vibe_score(&input("🦀", "pretty tired today", 3, &intents));
        assert_eq!(score.positivity, 46.0);
    }

    #[test]
    fn test_keyword_score_is_capped() {
        assert_eq!(keyword_score("happy great amazing wonderful blessed grateful joy"), 100.0);
        assert_eq!(keyword_score("sad down blue lonely hurt broken tired"), 0.0);
    }

    #[test]
    fn test_intent_from_first_choice() {
        let intents: Vec<String> = vec!["Make a friend".into(), "Need advice".into()];
        let score = calculate_vibe_score(&input("😊", "hello there", 5, &intents));
        assert_eq!(score.intent, "make_a_friend");
    }

    #[test]
    fn test_intent_extracted_from_description() {
        assert_eq!(extract_intent("want to relax and stay calm"), "chill");
        assert_eq!(extract_intent("party with friends tonight"), "social");
        assert_eq!(extract_intent("nothing matches here"), "neutral");
        // "amazing" hits both hype and happy once; hype comes first
        assert_eq!(extract_intent("amazing"), "hype");

        let none: Vec<String> = Vec::new();
        let score = calculate_vibe_score(&input("😊", "so pumped and excited", 9, &none));
        assert_eq!(score.intent, "hype");
    }

    #[test]
    fn test_calculator_is_deterministic() {
        let intents: Vec<String> = vec!["Share thoughts".into()];
        let a = calculate_vibe_score(&input("🌙", "quiet night thinking", 4, &intents));
        let b = calculate_vibe_score(&input("🌙", "quiet night thinking", 4, &intents));
        assert_eq!(a, b);
        assert_eq!(a.energy.to_bits(), b.energy.to_bits());
        assert_eq!(a.positivity.to_bits(), b.positivity.to_bits());
    }
}
