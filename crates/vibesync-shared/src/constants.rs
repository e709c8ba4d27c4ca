//! Domain constants shared by the store and the server.

/// Minimum number of words in a vibe description.
pub const DESCRIPTION_MIN_WORDS: usize = 2;

/// Maximum number of words in a vibe description.
pub const DESCRIPTION_MAX_WORDS: usize = 8;

/// Inclusive bounds of the self-declared energy slider.
pub const ENERGY_LEVEL_MIN: u8 = 1;
pub const ENERGY_LEVEL_MAX: u8 = 10;

/// A profile older than this gets a soft refresh reminder (never deactivated).
pub const VIBE_REFRESH_HOURS: i64 = 12;

/// Pairwise chats lock this long after creation unless permanently unlocked.
pub const PAIRWISE_CHAT_TTL_HOURS: i64 = 24;

/// Chats spawned by a permanent GP conversion.
pub const PERMANENT_CHAT_TTL_DAYS: i64 = 365;

/// Chat rooms expire this long after creation.
pub const CHAT_ROOM_TTL_HOURS: i64 = 4;

/// Re-requesting a room returns the existing one while more than this remains.
pub const CHAT_ROOM_REUSE_MIN_MINUTES: i64 = 60;

/// Participants besides the requester in a chat room.
pub const CHAT_ROOM_OTHERS: usize = 3;

/// Total chat room size.
pub const CHAT_ROOM_SIZE: usize = CHAT_ROOM_OTHERS + 1;

/// Minimum similarity for room formation.
pub const ROOM_MIN_SIMILARITY: u8 = 60;

/// Minimum similarity for 1:1 discovery.
pub const DISCOVERY_MIN_SIMILARITY: u8 = 70;

/// Maximum length of a chat / room message.
pub const MAX_MESSAGE_CHARS: usize = 1000;

// ---------------------------------------------------------------------------
// Group plans
// ---------------------------------------------------------------------------

pub const GP_MAX_MEMBERS: u32 = 5;
pub const GP_TTL_HOURS: i64 = 3;
pub const GP_DAILY_CAP: usize = 2;
pub const GP_COOLDOWN_MINUTES: i64 = 60;
pub const GP_MIN_TALK_TOPICS: usize = 1;
pub const GP_MAX_TALK_TOPICS: usize = 3;
pub const GP_MAX_DESCRIPTION_CHARS: usize = 200;
pub const GP_MAX_REASON_NOTE_CHARS: usize = 100;

/// A user counts towards system capacity when seen within this window.
pub const ACTIVE_USER_WINDOW_MINUTES: i64 = 30;

/// Below this many active users the system cap is fixed.
pub const SMALL_POPULATION_USERS: u64 = 5;

/// System cap while the population is small.
pub const SMALL_POPULATION_MAX_GROUPS: u64 = 3;

/// Active users per allowed group otherwise.
pub const USERS_PER_GROUP: f64 = 2.5;

/// GP discovery radius steps, in kilometres.
pub const GP_RADIUS_STEPS_KM: [f64; 5] = [10.0, 25.0, 50.0, 100.0, 500.0];

/// Candidates considered per radius step.
pub const GP_RADIUS_FETCH_LIMIT: usize = 50;

/// GPs returned by discovery.
pub const GP_DISCOVERY_LIMIT: usize = 7;

// ---------------------------------------------------------------------------
// Permanent conversion
// ---------------------------------------------------------------------------

/// Yes-votes required, as a percentage of current membership.
pub const CONVERSION_QUORUM_PERCENT: u32 = 70;

pub const DEFAULT_ELIGIBLE_MIN_MEMBERS: usize = 3;
pub const DEFAULT_ELIGIBLE_MIN_MESSAGES: u32 = 10;
pub const DEFAULT_ELIGIBLE_MIN_MINUTES: i64 = 30;

// ---------------------------------------------------------------------------
// Whisper wall
// ---------------------------------------------------------------------------

pub const CONFESSION_MAX_CHARS: usize = 300;
pub const CONFESSION_TTL_HOURS: i64 = 6;
pub const CONFESSION_COOLDOWN_HOURS: i64 = 6;
pub const CONFESSION_REPORT_LIMIT: u32 = 3;
pub const CONFESSION_WALL_LIMIT: usize = 50;

/// Earth radius used by the haversine distance.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// ---------------------------------------------------------------------------
// Daily advice
// ---------------------------------------------------------------------------

pub const DAILY_ADVICE: [&str; 15] = [
    "Say hi to someone new today. The worst case is a short chat.",
    "Your energy sets the room. Bring the version of you that you'd want to meet.",
    "Ask one question and actually listen to the answer.",
    "It's fine to log off when a conversation stops feeling good.",
    "Share something you're into. Your people find you that way.",
    "A low-energy day is still a valid vibe. Post it honestly.",
    "Compliment something someone chose, not something they were born with.",
    "Boundaries aren't walls. Say what you're up for and what you're not.",
    "If a chat goes quiet, let it. Not every match needs to last.",
    "Try a plan outside your usual category this week.",
    "Put the phone down for a bit after a heavy conversation.",
    "Be the one who answers the icebreaker with more than one word.",
    "Nobody's vibe is wrong. Some just don't sync, and that's okay.",
    "Show up to the group plan you joined, even if it's just to say hi.",
    "Small talk is a warm-up, not a waste of time.",
];
