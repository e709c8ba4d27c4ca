//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

use vibesync_shared::voting::EligibilityThresholds;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `None` (platform data directory).
    pub database_path: Option<PathBuf>,

    /// Bearer secret guarding the sweep endpoints.
    /// Env: `INTERNAL_API_KEY`
    /// Default: empty (sweeps open, development only).
    pub internal_api_key: Option<String>,

    /// Admin API bearer token. Required to register users.
    /// Env: `ADMIN_TOKEN`
    /// Default: empty (admin API disabled).
    pub admin_token: Option<String>,

    /// Text-generation endpoint.
    /// Env: `TEXT_SERVICE_URL`
    /// Default: empty (canned fallbacks only).
    pub text_service_url: Option<String>,

    /// Env: `TEXT_SERVICE_TIMEOUT_SECS`
    /// Default: 8 seconds.
    pub text_service_timeout: Duration,

    /// Offset that defines the local day for the daily GP cap.
    /// Env: `QUOTA_UTC_OFFSET_MINUTES`
    /// Default: UTC.
    pub quota_offset: FixedOffset,

    /// Env: `GP_ELIGIBLE_MIN_MEMBERS`, `GP_ELIGIBLE_MIN_MESSAGES`,
    /// `GP_ELIGIBLE_MIN_MINUTES`
    pub eligibility: EligibilityThresholds,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            database_path: None,
            internal_api_key: None,
            admin_token: None,
            text_service_url: None,
            text_service_timeout: Duration::from_secs(8),
            quota_offset: Utc.fix(),
            eligibility: EligibilityThresholds::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = get("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = get("DATABASE_PATH").filter(|p| !p.is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        config.internal_api_key = get("INTERNAL_API_KEY").filter(|k| !k.is_empty());
        config.admin_token = get("ADMIN_TOKEN").filter(|t| !t.is_empty());
        config.text_service_url = get("TEXT_SERVICE_URL").filter(|u| !u.is_empty());

        if let Some(secs) = parse_var::<u64>(&get, "TEXT_SERVICE_TIMEOUT_SECS") {
            config.text_service_timeout = Duration::from_secs(secs);
        }

        if let Some(minutes) = parse_var::<i32>(&get, "QUOTA_UTC_OFFSET_MINUTES") {
            match minutes.checked_mul(60).and_then(FixedOffset::east_opt) {
                Some(offset) => config.quota_offset = offset,
                None => tracing::warn!(minutes, "QUOTA_UTC_OFFSET_MINUTES out of range, using UTC"),
            }
        }

        if let Some(n) = parse_var(&get, "GP_ELIGIBLE_MIN_MEMBERS") {
            config.eligibility.min_members = n;
        }
        if let Some(n) = parse_var(&get, "GP_ELIGIBLE_MIN_MESSAGES") {
            config.eligibility.min_messages = n;
        }
        if let Some(n) = parse_var(&get, "GP_ELIGIBLE_MIN_MINUTES") {
            config.eligibility.min_minutes = n;
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }
}

fn parse_var<T: std::str::FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = get(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid value, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.text_service_timeout, Duration::from_secs(8));
        assert_eq!(config.eligibility.min_members, 3);
        assert!(config.internal_api_key.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("ADMIN_TOKEN", "secret"),
            ("INTERNAL_API_KEY", ""),
            ("QUOTA_UTC_OFFSET_MINUTES", "-300"),
            ("GP_ELIGIBLE_MIN_MESSAGES", "4"),
        ]));
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.admin_token.as_deref(), Some("secret"));
        assert!(config.internal_api_key.is_none());
        assert_eq!(config.quota_offset.local_minus_utc(), -300 * 60);
        assert_eq!(config.eligibility.min_messages, 4);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HTTP_ADDR", "not-an-addr"),
            ("TEXT_SERVICE_TIMEOUT_SECS", "soon"),
            ("QUOTA_UTC_OFFSET_MINUTES", "100000"),
        ]));
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.text_service_timeout, Duration::from_secs(8));
        assert_eq!(config.quota_offset.local_minus_utc(), 0);
    }
}
