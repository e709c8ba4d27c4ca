//! The whisper wall: anonymous posts that vanish after six hours.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use vibesync_shared::constants::{CONFESSION_COOLDOWN_HOURS, CONFESSION_WALL_LIMIT};
use vibesync_shared::quota::check_confession_cooldown;
use vibesync_shared::validation::confession_text;
use vibesync_shared::ConfessionId;
use vibesync_store::confessions::ReportOutcome;

use super::{parse_id, ApiJson, AppState};
use crate::auth::{verify_internal_key, AuthUser};
use crate::error::ServerError;
use crate::text_service;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/whisper", post(post_whisper).get(wall))
        .route("/whisper/report", post(report))
        .route("/whisper/expire", post(expire_whispers))
}

#[derive(Deserialize)]
struct WhisperRequest {
    text: String,
}

async fn post_whisper(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<WhisperRequest>,
) -> Result<Json<Value>, ServerError> {
    let text = confession_text(&req.text)?;
    let window = Duration::hours(CONFESSION_COOLDOWN_HOURS);

    {
        let now = Utc::now();
        let db = state.db.lock().await;
        check_confession_cooldown(db.latest_active_confession_at(me, now - window)?, now)?;
    }

    let verdict = text_service::moderate(state.text.as_ref(), &text).await;
    if !verdict.is_safe {
        warn!(user = %me, reason = %verdict.reason, "Whisper rejected by moderation");
        return Err(ServerError::Validation(
            "This whisper goes against the wall's guidelines".into(),
        ));
    }

    // Re-checked under the lock: moderation ran without it.
    let now = Utc::now();
    let db = state.db.lock().await;
    check_confession_cooldown(db.latest_active_confession_at(me, now - window)?, now)?;
    let confession = db.create_confession(me, &text, now)?;

    info!(confession = %confession.id, "Whisper posted");
    Ok(Json(json!({ "success": true, "confession": confession })))
}

#[derive(Deserialize)]
struct WallQuery {
    page: Option<usize>,
    limit: Option<usize>,
}

async fn wall(
    AuthUser(_me): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<WallQuery>,
) -> Result<Json<Value>, ServerError> {
    let now = Utc::now();
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(CONFESSION_WALL_LIMIT)
        .clamp(1, CONFESSION_WALL_LIMIT);

    let db = state.db.lock().await;
    let confessions = db.list_wall(now, (page - 1) * limit, limit)?;
    let total = db.count_wall(now)?;

    Ok(Json(json!({
        "success": true,
        "confessions": confessions,
        "page": page,
        "total": total,
        "hasMore": ((page * limit) as u64) < total,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRequest {
    confession_id: String,
}

async fn report(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ReportRequest>,
) -> Result<Json<Value>, ServerError> {
    let id = parse_id(&req.confession_id, ConfessionId::parse, "confession id")?;
    let outcome = state
        .db
        .lock()
        .await
        .report_confession(id, me, Utc::now())
        .map_err(|e| match e {
            vibesync_store::StoreError::NotFound => ServerError::NotFound("Whisper not found".into()),
            other => other.into(),
        })?;

    match outcome {
        ReportOutcome::AlreadyReported => {
            Err(ServerError::Conflict("You already reported this whisper".into()))
        }
        ReportOutcome::Reported {
            report_count,
            removed,
        } => Ok(Json(json!({
            "success": true,
            "reportCount": report_count,
            "removed": removed,
        }))),
    }
}

async fn expire_whispers(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Value>, ServerError> {
    verify_internal_key(&headers, &state.config)?;

    let (expired, removed) = state.db.lock().await.expire_confessions(Utc::now())?;
    info!(expired, removed, "Whisper expiry sweep");
    Ok(Json(json!({
        "success": true,
        "expiredCount": expired,
        "removedCount": removed,
    })))
}
