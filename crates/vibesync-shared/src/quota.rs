//! GP creation limits and whisper-wall posting cooldown.
//!
//! Everything here is evaluated against counts the caller has already read
//! from storage, so the same rules back both the creation path and the
//! read-only pre-flight report.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use serde::Serialize;

use crate::constants::{
    CONFESSION_COOLDOWN_HOURS, GP_DAILY_CAP, SMALL_POPULATION_MAX_GROUPS, SMALL_POPULATION_USERS,
    USERS_PER_GROUP,
};
use crate::types::GpCategory;

/// Why a creation was refused. Serialises with a machine-readable `reason`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum QuotaRejection {
    DailyLimit { today: usize, limit: usize },
    #[serde(rename_all = "camelCase")]
    Cooldown { minutes_remaining: i64 },
    CategoryActive { category: GpCategory },
    SystemCapacity { current: u64, max: u64 },
    #[serde(rename_all = "camelCase")]
    ConfessionCooldown { minutes_remaining: i64 },
}

impl QuotaRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            QuotaRejection::DailyLimit { .. } => "daily_limit",
            QuotaRejection::Cooldown { .. } => "cooldown",
            QuotaRejection::CategoryActive { .. } => "category_active",
            QuotaRejection::SystemCapacity { .. } => "system_capacity",
            QuotaRejection::ConfessionCooldown { .. } => "confession_cooldown",
        }
    }

    pub fn message(&self) -> String {
        match self {
            QuotaRejection::DailyLimit { limit, .. } => {
                format!("You can create maximum {limit} GPs per day")
            }
            QuotaRejection::Cooldown { minutes_remaining } => {
                format!("Please wait {minutes_remaining} minutes before creating another GP")
            }
            QuotaRejection::CategoryActive { category } => format!(
                "You already have an active {category}. Please wait for it to end or fail before creating another."
            ),
            QuotaRejection::SystemCapacity { .. } => {
                "Too many groups active right now. Try joining one instead.".to_string()
            }
            QuotaRejection::ConfessionCooldown { .. } => {
                "Your heart already spoke. Come back later".to_string()
            }
        }
    }
}

/// Everything the four GP checks need, read by the caller beforehand.
#[derive(Debug, Clone)]
pub struct QuotaInputs {
    pub creation_history: Vec<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
    /// `None` when no category was asked about (pre-flight without one).
    pub category: Option<GpCategory>,
    pub has_active_in_category: bool,
    pub active_users: u64,
    pub active_groups: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLimit {
    pub can_create: bool,
    pub creations_remaining: usize,
    pub today_creations: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownLimit {
    pub active: bool,
    pub minutes_remaining: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryLimit {
    pub has_active: bool,
    pub category: Option<GpCategory>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemLimit {
    pub limit_reached: bool,
    pub current_groups: u64,
    pub max_groups: u64,
    pub active_users: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsReport {
    pub can_create: bool,
    pub daily: DailyLimit,
    pub cooldown: CooldownLimit,
    pub category: CategoryLimit,
    pub system: SystemLimit,
}

/// `[local midnight, local midnight + 1 day - 1ms]` for the day containing `now`.
pub fn day_window(now: DateTime<Utc>, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let local = now.with_timezone(&offset);
    let start = local
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| offset.from_local_datetime(&midnight).single())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now);
    let end = start + Duration::days(1) - Duration::milliseconds(1);
    (start, end)
}

pub fn creations_today(history: &[DateTime<Utc>], now: DateTime<Utc>, offset: FixedOffset) -> usize {
    let (start, end) = day_window(now, offset);
    history.iter().filter(|t| **t >= start && **t <= end).count()
}

pub fn max_active_groups(active_users: u64) -> u64 {
    if active_users < SMALL_POPULATION_USERS {
        SMALL_POPULATION_MAX_GROUPS
    } else {
        (active_users as f64 / USERS_PER_GROUP).floor() as u64
    }
}

/// Whole minutes until `until`, rounded up. Zero once it has passed.
pub fn minutes_until(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = (until - now).num_milliseconds();
    if ms <= 0 {
        0
    } else {
        (ms + 59_999) / 60_000
    }
}

/// Run the four checks in order; the first failure is returned.
pub fn check_gp_creation(
    inputs: &QuotaInputs,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<(), QuotaRejection> {
    let today = creations_today(&inputs.creation_history, now, offset);
    if today >= GP_DAILY_CAP {
        return Err(QuotaRejection::DailyLimit {
            today,
            limit: GP_DAILY_CAP,
        });
    }

    if let Some(until) = inputs.cooldown_until.filter(|u| *u > now) {
        return Err(QuotaRejection::Cooldown {
            minutes_remaining: minutes_until(until, now),
        });
    }

    if inputs.has_active_in_category {
        if let Some(category) = inputs.category {
            return Err(QuotaRejection::CategoryActive { category });
        }
    }

    let max = max_active_groups(inputs.active_users);
    if inputs.active_groups >= max {
        return Err(QuotaRejection::SystemCapacity {
            current: inputs.active_groups,
            max,
        });
    }

    Ok(())
}

/// Read-only mirror of [`check_gp_creation`] with every check reported.
pub fn limits_report(inputs: &QuotaInputs, now: DateTime<Utc>, offset: FixedOffset) -> LimitsReport {
    let today = creations_today(&inputs.creation_history, now, offset);
    let cooldown_minutes = inputs
        .cooldown_until
        .map(|u| minutes_until(u, now))
        .unwrap_or(0);
    let has_active = inputs.category.is_some() && inputs.has_active_in_category;
    let max = max_active_groups(inputs.active_users);

    let daily = DailyLimit {
        can_create: today < GP_DAILY_CAP,
        creations_remaining: GP_DAILY_CAP.saturating_sub(today),
        today_creations: today,
    };
    let cooldown = CooldownLimit {
        active: cooldown_minutes > 0,
        minutes_remaining: cooldown_minutes,
    };
    let system = SystemLimit {
        limit_reached: inputs.active_groups >= max,
        current_groups: inputs.active_groups,
        max_groups: max,
        active_users: inputs.active_users,
    };

    LimitsReport {
        can_create: daily.can_create && !cooldown.active && !has_active && !system.limit_reached,
        daily,
        cooldown,
        category: CategoryLimit {
            has_active,
            category: inputs.category,
        },
        system,
    }
}

/// A user may post again once their latest active confession is 6h old.
pub fn check_confession_cooldown(
    latest_active_post: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), QuotaRejection> {
    let Some(posted_at) = latest_active_post else {
        return Ok(());
    };
    let next_allowed = posted_at + Duration::hours(CONFESSION_COOLDOWN_HOURS);
    if next_allowed > now {
        return Err(QuotaRejection::ConfessionCooldown {
            minutes_remaining: minutes_until(next_allowed, now),
        });
    }
    Ok(())
}
