//! Bearer-token identity and the shared-secret guards for admin and sweep
//! endpoints.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use rand::RngCore;
use subtle::ConstantTimeEq;

use vibesync_shared::UserId;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::error::ServerError;

/// The authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer(&parts.headers).ok_or(ServerError::Unauthorized)?;
        let hash = token_hash(token);
        let db = state.db.lock().await;
        db.user_for_token_hash(&hash)?
            .map(AuthUser)
            .ok_or(ServerError::Unauthorized)
    }
}

/// The token from an `Authorization: Bearer <token>` header.
pub fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// A fresh 256-bit token, hex encoded.
pub fn issue_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Only this digest is stored.
pub fn token_hash(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

pub fn verify_admin_token(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ServerError> {
    let Some(ref expected) = config.admin_token else {
        return Err(ServerError::Forbidden(
            "Admin API is disabled (no ADMIN_TOKEN configured)".into(),
        ));
    };

    if !secret_matches(bearer(headers).unwrap_or(""), expected) {
        return Err(ServerError::Forbidden("Invalid admin token".into()));
    }
    Ok(())
}

/// Sweep endpoints are open when no `INTERNAL_API_KEY` is configured.
pub fn verify_internal_key(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ServerError> {
    let Some(ref expected) = config.internal_api_key else {
        return Ok(());
    };

    if !secret_matches(bearer(headers).unwrap_or(""), expected) {
        return Err(ServerError::Unauthorized);
    }
    Ok(())
}

fn secret_matches(given: &str, expected: &str) -> bool {
    let given = given.as_bytes();
    let expected = expected.as_bytes();
    given.len() == expected.len() && given.ct_eq(expected).unwrap_u8() == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(auth: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert("authorization", HeaderValue::from_str(auth).unwrap());
        map
    }

    #[test]
    fn test_bearer_parsing() {
        assert_eq!(bearer(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer(&headers("Basic abc")), None);
        assert_eq!(bearer(&headers("Bearer ")), None);
        assert_eq!(bearer(&HeaderMap::new()), None);
    }

    #[test]
    fn test_tokens_are_unique_and_hashed() {
        let a = issue_token();
        let b = issue_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_ne!(token_hash(&a), a);
        assert_eq!(token_hash(&a), token_hash(&a));
    }

    #[test]
    fn test_internal_key_guard() {
        let open = ServerConfig::default();
        assert!(verify_internal_key(&HeaderMap::new(), &open).is_ok());

        let guarded = ServerConfig {
            internal_api_key: Some("cron-secret".into()),
            ..ServerConfig::default()
        };
        assert!(verify_internal_key(&headers("Bearer cron-secret"), &guarded).is_ok());
        assert!(verify_internal_key(&headers("Bearer nope"), &guarded).is_err());
        assert!(verify_internal_key(&HeaderMap::new(), &guarded).is_err());
    }

    #[test]
    fn test_admin_disabled_without_token() {
        let config = ServerConfig::default();
        assert!(matches!(
            verify_admin_token(&headers("Bearer x"), &config),
            Err(ServerError::Forbidden(_))
        ));
    }
}
