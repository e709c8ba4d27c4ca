//! HTTP API.
//!
//! Every route except `/health` and the admin and sweep endpoints requires an
//! [`AuthUser`](crate::auth::AuthUser). Successful responses carry
//! `"success": true`; failures are rendered by [`ServerError`].

pub mod chats;
pub mod gps;
pub mod rooms;
pub mod users;
pub mod vibes;
pub mod whisper;

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::Method,
    routing::get,
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use vibesync_store::Database;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::text_service::TextGenerator;

#[derive(Clone)]
pub struct AppState {
    /// Never hold this guard across a text-service call.
    pub db: Arc<Mutex<Database>>,
    pub config: Arc<ServerConfig>,
    pub text: Arc<dyn TextGenerator>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig, text: Arc<dyn TextGenerator>) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(config),
            text,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .merge(users::routes())
        .merge(vibes::routes())
        .merge(chats::routes())
        .merge(rooms::routes())
        .merge(gps::routes())
        .merge(whisper::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `Json` whose rejections render as a [`ServerError::Validation`].
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| ServerError::Validation(e.body_text()))?;
        Ok(ApiJson(value))
    }
}

/// Parse an id from a path segment or request field.
pub(crate) fn parse_id<T>(
    raw: &str,
    parse: impl Fn(&str) -> Result<T, uuid::Error>,
    field: &'static str,
) -> Result<T, ServerError> {
    parse(raw.trim()).map_err(|_| ServerError::Validation(format!("Invalid {field}")))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    //! In-process harness: a router over a throwaway database, driven with
    //! `oneshot`.

    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::text_service::DisabledTextGenerator;

    pub const ADMIN: &str = "admin-secret";

    pub struct TestApp {
        pub state: AppState,
        _dir: tempfile::TempDir,
    }

    pub struct TestUser {
        pub id: String,
        pub token: String,
    }

    impl TestApp {
        pub fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let db = Database::open_at(&dir.path().join("api.db")).unwrap();
            let config = ServerConfig {
                admin_token: Some(ADMIN.into()),
                ..ServerConfig::default()
            };
            let state = AppState::new(db, config, Arc::new(DisabledTextGenerator));
            Self { state, _dir: dir }
        }

        pub async fn call(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = build_router(self.state.clone())
                .oneshot(request)
                .await
                .unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            (status, value)
        }

        pub async fn register(&self, name: &str) -> TestUser {
            let (status, body) = self
                .call(
                    "POST",
                    "/admin/users",
                    Some(ADMIN),
                    Some(json!({ "displayName": name })),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "{body}");
            TestUser {
                id: body["user"]["id"].as_str().unwrap().to_string(),
                token: body["token"].as_str().unwrap().to_string(),
            }
        }

        /// Register a user with an active vibe profile.
        pub async fn vibing(&self, name: &str, emoji: &str, energy: u8) -> TestUser {
            let user = self.register(name).await;
            let (status, body) = self
                .call(
                    "POST",
                    "/vibe",
                    Some(&user.token),
                    Some(json!({
                        "emoji": emoji,
                        "description": "feeling good and relaxed today",
                        "energyLevel": energy,
                        "currentIntent": ["Chill conversation"],
                        "interactionBoundary": "Fast replies",
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "{body}");
            user
        }
    }
}
