//! Client for the external text-generation service.
//!
//! Everything built on top of it is advisory: icebreakers fall back to a
//! canned list, description suggestions fall back to the user's own text and
//! moderation fails open, so a slow or missing service never turns into a
//! user-facing error.

use std::time::Duration;

use axum::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use vibesync_shared::constants::{DESCRIPTION_MAX_WORDS, DESCRIPTION_MIN_WORDS};
use vibesync_store::VibeProfile;

const MAX_ICEBREAKERS: usize = 5;
const MAX_DESCRIPTION_SUGGESTIONS: usize = 3;

const CANNED_ICEBREAKERS: [&str; 5] = [
    "Hey! Your vibe caught my attention 😊",
    "Love your energy! How's your day?",
    "Your vibe feels relatable! What's up?",
    "Feeling the same way! Want to chat?",
    "That's a mood! What's the story?",
];

#[derive(Debug, Error)]
pub enum TextError {
    #[error("text service is not configured")]
    Disabled,

    #[error("text service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("text service returned an empty reply")]
    Empty,
}

/// A prompt in, free text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: String) -> Result<String, TextError>;
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    text: String,
}

/// POSTs `{"prompt": …}` and expects `{"text": …}` back.
pub struct HttpTextGenerator {
    client: reqwest::Client,
    url: String,
}

impl HttpTextGenerator {
    pub fn new(url: String, timeout: Duration) -> Result<Self, TextError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vibesync-server/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: String) -> Result<String, TextError> {
        let reply: GenerateResponse = self
            .client
            .post(&self.url)
            .json(&GenerateRequest { prompt: &prompt })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = reply.text.trim().to_string();
        if text.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(text)
    }
}

/// Used when no service is configured; every call takes the fallback path.
pub struct DisabledTextGenerator;

#[async_trait]
impl TextGenerator for DisabledTextGenerator {
    async fn generate(&self, _prompt: String) -> Result<String, TextError> {
        Err(TextError::Disabled)
    }
}

// ---------------------------------------------------------------------------
// Advisory helpers
// ---------------------------------------------------------------------------

pub fn canned_icebreakers() -> Vec<String> {
    CANNED_ICEBREAKERS.iter().map(|s| s.to_string()).collect()
}

/// Up to five openers for `mine` talking to `theirs`.
pub async fn icebreakers(
    generator: &dyn TextGenerator,
    mine: &VibeProfile,
    theirs: &VibeProfile,
) -> Vec<String> {
    let prompt = format!(
        "Generate 5 short, friendly icebreaker messages for two people chatting.\n\
         Person 1: {} \"{}\" (energy {}/10, intent: {})\n\
         Person 2: {} \"{}\" (energy {}/10, intent: {})\n\
         Keep each under 15 words. Reply with a JSON array of strings only.",
        mine.emoji,
        mine.description,
        mine.energy_level,
        mine.current_intent.join(", "),
        theirs.emoji,
        theirs.description,
        theirs.energy_level,
        theirs.current_intent.join(", "),
    );

    match generator.generate(prompt).await {
        Ok(reply) => {
            let parsed = parse_string_array(&reply, MAX_ICEBREAKERS);
            if parsed.is_empty() {
                warn!("unparsable icebreaker reply, using canned list");
                canned_icebreakers()
            } else {
                parsed
            }
        }
        Err(TextError::Disabled) => canned_icebreakers(),
        Err(e) => {
            warn!(error = %e, "icebreaker generation failed, using canned list");
            canned_icebreakers()
        }
    }
}

/// The draft a user is about to post as their vibe.
pub struct DescriptionDraft<'a> {
    pub emoji: &'a str,
    pub description: &'a str,
    pub energy_level: u8,
    pub current_intent: &'a [String],
}

/// Up to three rewrites of a vibe description, each a valid 2-8 word
/// description. Falls back to the draft's own text.
pub async fn enhance_description(generator: &dyn TextGenerator, draft: &DescriptionDraft<'_>) -> Vec<String> {
    let prompt = format!(
        "Generate 3 alternative 6-7 word descriptions for a vibe card based on:\n\
         - Emoji: {}\n\
         - Current description: \"{}\"\n\
         - Energy level: {}/10\n\
         - Intent: {}\n\
         Keep the same mood and energy, vary the wording, 2-8 words each.\n\
         Reply with a JSON array of 3 strings only.",
        draft.emoji,
        draft.description,
        draft.energy_level,
        draft.current_intent.join(", "),
    );
    let fallback = || vec![draft.description.trim().to_string()];

    match generator.generate(prompt).await {
        Ok(reply) => {
            let suggestions: Vec<String> = parse_string_array(&reply, usize::MAX)
                .into_iter()
                .filter(|s| {
                    (DESCRIPTION_MIN_WORDS..=DESCRIPTION_MAX_WORDS)
                        .contains(&s.split_whitespace().count())
                })
                .take(MAX_DESCRIPTION_SUGGESTIONS)
                .collect();
            if suggestions.is_empty() {
                warn!("no usable description suggestions, echoing draft");
                fallback()
            } else {
                suggestions
            }
        }
        Err(TextError::Disabled) => fallback(),
        Err(e) => {
            warn!(error = %e, "description enhancement failed, echoing draft");
            fallback()
        }
    }
}

/// First JSON array of strings in `reply`, trimmed, blanks dropped.
fn parse_string_array(reply: &str, max: usize) -> Vec<String> {
    let Some(json) = slice_between(reply, '[', ']') else {
        return Vec::new();
    };
    serde_json::from_str::<Vec<String>>(json)
        .unwrap_or_default()
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .take(max)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Moderation {
    pub is_safe: bool,
    #[serde(default)]
    pub reason: String,
}

impl Moderation {
    fn safe() -> Self {
        Self {
            is_safe: true,
            reason: String::new(),
        }
    }
}

/// Screen a whisper-wall post. Anything other than a clear "unsafe" verdict
/// counts as safe.
pub async fn moderate(generator: &dyn TextGenerator, text: &str) -> Moderation {
    let prompt = format!(
        "You moderate an anonymous, supportive confession wall.\n\
         Flag harassment, threats, hate speech, sexual content or self-harm encouragement.\n\
         Text: \"{text}\"\n\
         Reply with JSON only: {{\"isSafe\": true|false, \"reason\": \"...\"}}"
    );

    match generator.generate(prompt).await {
        Ok(reply) => slice_between(&reply, '{', '}')
            .and_then(|json| serde_json::from_str::<Moderation>(json).ok())
            .unwrap_or_else(|| {
                warn!("unparsable moderation reply, allowing post");
                Moderation::safe()
            }),
        Err(TextError::Disabled) => Moderation::safe(),
        Err(e) => {
            warn!(error = %e, "moderation unavailable, allowing post");
            Moderation::safe()
        }
    }
}

fn slice_between(s: &str, open: char, close: char) -> Option<&str> {
    let start = s.find(open)?;
    let end = s.rfind(close)?;
    (end > start).then(|| &s[start..=end])
}
