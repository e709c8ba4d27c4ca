//! Request schemas and their boundary validation.
//!
//! Everything a handler accepts from a client is deserialised into one of
//! these loosely-typed drafts first, then turned into a checked value. Core
//! logic only ever sees the checked form.

use serde::Deserialize;

use crate::constants::{
    CONFESSION_MAX_CHARS, DESCRIPTION_MAX_WORDS, DESCRIPTION_MIN_WORDS, ENERGY_LEVEL_MAX,
    ENERGY_LEVEL_MIN, GP_MAX_DESCRIPTION_CHARS, GP_MAX_REASON_NOTE_CHARS, GP_MAX_TALK_TOPICS,
    GP_MIN_TALK_TOPICS, MAX_MESSAGE_CHARS,
};
use crate::error::ValidationError;
use crate::geo::GeoPoint;
use crate::matching::{normalize_intent, INTENT_OPTIONS, INTERACTION_BOUNDARIES};
use crate::pii::contains_pii;
use crate::types::GpCategory;

// ---------------------------------------------------------------------------
// Vibe profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VibeSubmission {
    pub emoji: Option<String>,
    pub description: Option<String>,
    pub energy_level: Option<i64>,
    pub current_intent: Option<Vec<String>>,
    pub context_tag: Option<String>,
    pub interaction_boundary: Option<String>,
    #[serde(default)]
    pub feeling_options: Vec<String>,
    pub vibe_availability: Option<String>,
    pub personality_prompt: Option<String>,
}

/// A vibe submission that passed every check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidVibe {
    pub emoji: String,
    pub description: String,
    pub energy_level: u8,
    /// Canonical labels from the intent list.
    pub current_intent: Vec<String>,
    pub context_tag: Option<String>,
    pub interaction_boundary: String,
    pub feeling_options: Vec<String>,
    pub vibe_availability: String,
    pub personality_prompt: String,
}

impl VibeSubmission {
    pub fn validate(self) -> Result<ValidVibe, ValidationError> {
        let emoji = required(self.emoji, "emoji")?;
        let description = required(self.description, "description")?;
        let energy_level = self
            .energy_level
            .ok_or(ValidationError::MissingField("energyLevel"))?;
        let current_intent = self
            .current_intent
            .ok_or(ValidationError::MissingField("currentIntent"))?;
        let interaction_boundary = required(self.interaction_boundary, "interactionBoundary")?;

        if energy_level < i64::from(ENERGY_LEVEL_MIN) || energy_level > i64::from(ENERGY_LEVEL_MAX) {
            return Err(ValidationError::EnergyOutOfRange(energy_level));
        }

        if current_intent.is_empty() || current_intent.len() > 2 {
            return Err(ValidationError::IntentCount(current_intent.len()));
        }
        let current_intent = current_intent
            .iter()
            .map(|i| canonical_intent(i))
            .collect::<Result<Vec<_>, _>>()?;

        let words = description.split_whitespace().count();
        if !(DESCRIPTION_MIN_WORDS..=DESCRIPTION_MAX_WORDS).contains(&words) {
            return Err(ValidationError::DescriptionWordCount(words));
        }

        if !INTERACTION_BOUNDARIES.contains(&interaction_boundary.as_str()) {
            return Err(ValidationError::UnknownBoundary(interaction_boundary));
        }

        let context_tag = match self.context_tag.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(tag) if tag.split_whitespace().count() == 1 => Some(tag.to_string()),
            Some(_) => return Err(ValidationError::InvalidContextTag),
        };

        Ok(ValidVibe {
            emoji,
            description,
            energy_level: energy_level as u8,
            current_intent,
            context_tag,
            interaction_boundary,
            feeling_options: self.feeling_options,
            vibe_availability: self.vibe_availability.unwrap_or_default(),
            personality_prompt: self.personality_prompt.unwrap_or_default(),
        })
    }
}

/// Map a client intent to its canonical label, ignoring case and separators.
fn canonical_intent(raw: &str) -> Result<String, ValidationError> {
    let wanted = normalize_intent(raw);
    INTENT_OPTIONS
        .iter()
        .find(|option| normalize_intent(option) == wanted)
        .map(|option| option.to_string())
        .ok_or_else(|| ValidationError::UnknownIntent(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Group plans
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: Option<String>,
    pub zone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpDraft {
    pub category: Option<String>,
    pub sub_type: Option<String>,
    pub specific_name: Option<String>,
    pub genre: Option<String>,
    pub talk_topics: Option<Vec<String>>,
    pub description: Option<String>,
    pub creation_reason: Option<String>,
    pub reason_note: Option<String>,
    pub location: Option<GpLocation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidGp {
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
}

impl GpDraft {
    pub fn validate(self) -> Result<ValidGp, ValidationError> {
        let category_raw = required(self.category, "category")?;
        let sub_type = required(self.sub_type, "subType")?;
        let talk_topics = self
            .talk_topics
            .ok_or(ValidationError::MissingField("talkTopics"))?;
        let creation_reason = required(self.creation_reason, "creationReason")?;
        let location = self.location.ok_or(ValidationError::MissingField("location"))?;

        let category: GpCategory = category_raw
            .parse()
            .map_err(|_| ValidationError::InvalidValue {
                field: "category",
                value: category_raw.clone(),
            })?;

        let talk_topics: Vec<String> = talk_topics
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if !(GP_MIN_TALK_TOPICS..=GP_MAX_TALK_TOPICS).contains(&talk_topics.len()) {
            return Err(ValidationError::TalkTopicCount(talk_topics.len()));
        }

        let description = self.description.unwrap_or_default();
        check_max_chars(&description, GP_MAX_DESCRIPTION_CHARS, "Description")?;
        let reason_note = self.reason_note.unwrap_or_default();
        check_max_chars(&reason_note, GP_MAX_REASON_NOTE_CHARS, "Reason note")?;

        let point = GeoPoint::new(
            location.latitude.unwrap_or(0.0),
            location.longitude.unwrap_or(0.0),
        )?;

        Ok(ValidGp {
            category,
            sub_type,
            specific_name: self.specific_name.unwrap_or_default(),
            genre: self.genre.unwrap_or_default(),
            talk_topics,
            description,
            creation_reason,
            reason_note,
            location: point,
            city: location.city.unwrap_or_default(),
            zone: location.zone.unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Free text
// ---------------------------------------------------------------------------

/// Trimmed chat / room message, 1 to 1000 characters.
pub fn message_text(raw: &str) -> Result<String, ValidationError> {
    bounded_text(raw, MAX_MESSAGE_CHARS, "Message")
}

/// Trimmed whisper-wall post, 1 to 300 characters, free of personal details.
pub fn confession_text(raw: &str) -> Result<String, ValidationError> {
    let text = bounded_text(raw, CONFESSION_MAX_CHARS, "Confession")?;
    if contains_pii(&text) {
        return Err(ValidationError::ContainsPii);
    }
    Ok(text)
}

fn bounded_text(raw: &str, max: usize, field: &'static str) -> Result<String, ValidationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    check_max_chars(text, max, field)?;
    Ok(text.to_string())
}

fn check_max_chars(text: &str, max: usize, field: &'static str) -> Result<(), ValidationError> {
    if text.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vibe() -> VibeSubmission {
        VibeSubmission {
            emoji: Some("😊".into()),
            description: Some("feeling pretty good today".into()),
            energy_level: Some(7),
            current_intent: Some(vec!["make a friend".into()]),
            context_tag: Some("coffee".into()),
            interaction_boundary: Some("Fast replies".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_vibe_canonicalises_intents() {
        let v = vibe().validate().unwrap();
        assert_eq!(v.current_intent, vec!["Make a friend".to_string()]);
        assert_eq!(v.energy_level, 7);
        assert_eq!(v.context_tag.as_deref(), Some("coffee"));
    }

    #[test]
    fn test_vibe_rejections() {
        let err = VibeSubmission { energy_level: Some(11), ..vibe() }.validate().unwrap_err();
        assert_eq!(err, ValidationError::EnergyOutOfRange(11));

        let err = VibeSubmission { description: Some("tired".into()), ..vibe() }
            .validate()
            .unwrap_err();
        assert_eq!(err, ValidationError::DescriptionWordCount(1));

        let err = VibeSubmission {
            description: Some("one two three four five six seven eight nine".into()),
            ..vibe()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, ValidationError::DescriptionWordCount(9));

        let err = VibeSubmission { current_intent: Some(vec![]), ..vibe() }
            .validate()
            .unwrap_err();
        assert_eq!(err, ValidationError::IntentCount(0));

        let err = VibeSubmission {
            current_intent: Some(vec!["world domination".into()]),
            ..vibe()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownIntent(_)));

        let err = VibeSubmission {
            interaction_boundary: Some("Telepathy".into()),
            ..vibe()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownBoundary(_)));

        let err = VibeSubmission { context_tag: Some("two words".into()), ..vibe() }
            .validate()
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidContextTag);

        let err = VibeSubmission { emoji: None, ..vibe() }.validate().unwrap_err();
        assert_eq!(err, ValidationError::MissingField("emoji"));
    }

    #[test]
    fn test_vibe_submission_from_json() {
        let json = r#"{
            "emoji": "🔥",
            "description": "ready to go",
            "energyLevel": 9,
            "currentIntent": ["Get motivated", "want_to_laugh"],
            "interactionBoundary": "Short messages only"
        }"#;
        let v: VibeSubmission = serde_json::from_str(json).unwrap();
        let v = v.validate().unwrap();
        assert_eq!(v.current_intent, vec!["Get motivated", "Want to laugh"]);
        assert_eq!(v.context_tag, None);
    }

    fn gp() -> GpDraft {
        GpDraft {
            category: Some("Movie GP".into()),
            sub_type: Some("Watch party".into()),
            talk_topics: Some(vec!["Sci-fi".into(), "Soundtracks".into()]),
            creation_reason: Some("Bored tonight".into()),
            location: Some(GpLocation {
                latitude: Some(48.85),
                longitude: Some(2.35),
                city: Some("Paris".into()),
                zone: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_gp() {
        let g = gp().validate().unwrap();
        assert_eq!(g.category, GpCategory::Movie);
        assert_eq!(g.talk_topics.len(), 2);
        assert_eq!(g.city, "Paris");
    }

    #[test]
    fn test_gp_rejections() {
        let err = GpDraft { category: Some("Sports GP".into()), ..gp() }
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { field: "category", .. }));

        let err = GpDraft {
            talk_topics: Some(vec!["a".into(), "b".into(), "c".into(), "d".into()]),
            ..gp()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, ValidationError::TalkTopicCount(4));

        let err = GpDraft { description: Some("x".repeat(201)), ..gp() }
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLong {
                field: "Description",
                max: 200
            }
        );

        let err = GpDraft { reason_note: Some("x".repeat(101)), ..gp() }
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { max: 100, .. }));

        let err = GpDraft { location: None, ..gp() }.validate().unwrap_err();
        assert_eq!(err, ValidationError::MissingField("location"));
    }

    #[test]
    fn test_text_bounds() {
        assert_eq!(message_text("  hello  ").unwrap(), "hello");
        assert_eq!(message_text("   ").unwrap_err(), ValidationError::Empty("Message"));
        assert!(message_text(&"a".repeat(1000)).is_ok());
        assert!(message_text(&"a".repeat(1001)).is_err());

        assert!(confession_text(&"é".repeat(300)).is_ok());
        assert!(confession_text(&"é".repeat(301)).is_err());
        assert_eq!(
            confession_text("my name is Jordan and I hate Mondays").unwrap_err(),
            ValidationError::ContainsPii
        );
    }
}
