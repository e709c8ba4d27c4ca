use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Opaque user identity handed out by the identity provider.
    UserId
);
entity_id!(ChatId);
entity_id!(RoomId);
entity_id!(GpId);
entity_id!(ConfessionId);
entity_id!(MessageId);

// ---------------------------------------------------------------------------
// Mood
// ---------------------------------------------------------------------------

/// Emotion category derived from the profile emoji.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Chill,
    Hype,
    Creative,
    Social,
    Lonely,
    Love,
    Angry,
    Anxious,
    Neutral,
}

impl Mood {
    pub const ALL: [Mood; 11] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Chill,
        Mood::Hype,
        Mood::Creative,
        Mood::Social,
        Mood::Lonely,
        Mood::Love,
        Mood::Angry,
        Mood::Anxious,
        Mood::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Chill => "chill",
            Mood::Hype => "hype",
            Mood::Creative => "creative",
            Mood::Social => "social",
            Mood::Lonely => "lonely",
            Mood::Love => "love",
            Mood::Angry => "angry",
            Mood::Anxious => "anxious",
            Mood::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown mood: {s}"))
    }
}

// ---------------------------------------------------------------------------
// Energy band
// ---------------------------------------------------------------------------

/// Coarse bucket of the 1-10 energy slider used for room diversity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnergyBand {
    Low,
    Mid,
    High,
}

impl EnergyBand {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1..=3 => Some(Self::Low),
            4..=7 => Some(Self::Mid),
            8..=10 => Some(Self::High),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Group plans
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GpCategory {
    #[serde(rename = "Vibe GP")]
    Vibe,
    #[serde(rename = "Movie GP")]
    Movie,
    #[serde(rename = "Anime GP")]
    Anime,
    #[serde(rename = "Other GP")]
    Other,
}

impl GpCategory {
    pub const ALL: [GpCategory; 4] = [
        GpCategory::Vibe,
        GpCategory::Movie,
        GpCategory::Anime,
        GpCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GpCategory::Vibe => "Vibe GP",
            GpCategory::Movie => "Movie GP",
            GpCategory::Anime => "Anime GP",
            GpCategory::Other => "Other GP",
        }
    }
}

impl fmt::Display for GpCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GpCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GpCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown GP category: {s}"))
    }
}

/// GP lifecycle. Transitions only leave `Active`; terminal states never revert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GpStatus {
    Active,
    Expired,
    Failed,
    Converted,
}

impl GpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GpStatus::Active => "active",
            GpStatus::Expired => "expired",
            GpStatus::Failed => "failed",
            GpStatus::Converted => "converted",
        }
    }

    pub fn can_transition_to(&self, next: GpStatus) -> bool {
        matches!(
            (self, next),
            (GpStatus::Active, GpStatus::Expired)
                | (GpStatus::Active, GpStatus::Failed)
                | (GpStatus::Active, GpStatus::Converted)
        )
    }
}

impl FromStr for GpStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "failed" => Ok(Self::Failed),
            "converted" => Ok(Self::Converted),
            other => Err(format!("unknown GP status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Yes,
    No,
}

impl VoteChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteChoice::Yes => "yes",
            VoteChoice::No => "no",
        }
    }
}

impl FromStr for VoteChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" => Ok(Self::Yes),
            "no" => Ok(Self::No),
            other => Err(format!("unknown vote: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Whisper wall
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfessionStatus {
    Active,
    Removed,
    Expired,
}

impl ConfessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfessionStatus::Active => "active",
            ConfessionStatus::Removed => "removed",
            ConfessionStatus::Expired => "expired",
        }
    }
}

impl FromStr for ConfessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "removed" => Ok(Self::Removed),
            "expired" => Ok(Self::Expired),
            other => Err(format!("unknown confession status: {other}")),
        }
    }
}
