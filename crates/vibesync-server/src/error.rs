use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use vibesync_shared::quota::QuotaRejection;
use vibesync_shared::{PlanError, ValidationError};
use vibesync_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{message}")]
    QuotaExceeded {
        reason: &'static str,
        message: String,
        detail: serde_json::Value,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Expired(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::Expired(_) => StatusCode::GONE,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match self {
            ServerError::QuotaExceeded {
                reason,
                message,
                detail,
            } => serde_json::json!({
                "success": false,
                "message": message,
                "reason": reason,
                "detail": detail,
            }),
            ServerError::Internal(e) => {
                tracing::error!(error = %e, "request failed");
                serde_json::json!({
                    "success": false,
                    "message": "Internal server error",
                })
            }
            other => serde_json::json!({
                "success": false,
                "message": other.to_string(),
            }),
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ServerError::NotFound("Not found".into()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<ValidationError> for ServerError {
    fn from(e: ValidationError) -> Self {
        ServerError::Validation(e.to_string())
    }
}

impl From<PlanError> for ServerError {
    fn from(e: PlanError) -> Self {
        ServerError::Conflict(e.to_string())
    }
}

impl From<QuotaRejection> for ServerError {
    fn from(rejection: QuotaRejection) -> Self {
        let detail = serde_json::to_value(&rejection).unwrap_or(serde_json::Value::Null);
        ServerError::QuotaExceeded {
            reason: rejection.reason(),
            message: rejection.message(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_quota_rejection_carries_reason() {
        let err: ServerError = QuotaRejection::Cooldown {
            minutes_remaining: 42,
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["reason"], "cooldown");
        assert_eq!(body["detail"]["minutesRemaining"], 42);
    }

    #[tokio::test]
    async fn test_internal_errors_are_opaque() {
        let response = ServerError::Internal("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["message"], "Internal server error");
    }

    #[test]
    fn test_store_not_found_maps_to_404() {
        let err: ServerError = StoreError::NotFound.into();
        assert!(matches!(err, ServerError::NotFound(_)));
    }
}
