use axum::{
    extract::State,
    http::HeaderMap,
    routing::{patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use vibesync_shared::geo::GeoPoint;
use vibesync_shared::{UserId, ValidationError};

use super::{parse_id, ApiJson, AppState};
use crate::auth::{issue_token, token_hash, verify_admin_token, AuthUser};
use crate::error::ServerError;

const MAX_DISPLAY_NAME_CHARS: usize = 50;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", post(admin_create_user))
        .route("/users/location", post(update_location))
        .route("/users/follow", post(follow))
        .route("/users/block", post(block))
        .route("/users/unblock", post(unblock))
        .route("/users/ready-to-listen", patch(ready_to_listen))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserRequest {
    display_name: String,
}

async fn admin_create_user(
    headers: HeaderMap,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<Json<Value>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let name = req.display_name.trim();
    if name.is_empty() {
        return Err(ValidationError::Empty("displayName").into());
    }
    if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
        return Err(ValidationError::TooLong {
            field: "displayName",
            max: MAX_DISPLAY_NAME_CHARS,
        }
        .into());
    }

    let token = issue_token();
    let user = state
        .db
        .lock()
        .await
        .create_user(name, &token_hash(&token), Utc::now())?;

    info!(user = %user.id, "User registered");
    Ok(Json(json!({ "success": true, "user": user, "token": token })))
}

#[derive(Deserialize)]
struct LocationRequest {
    latitude: f64,
    longitude: f64,
}

async fn update_location(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LocationRequest>,
) -> Result<Json<Value>, ServerError> {
    let point = GeoPoint::new(req.latitude, req.longitude)?;
    state.db.lock().await.update_location(me, point, Utc::now())?;
    Ok(Json(json!({ "success": true, "location": point })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadyToListenRequest {
    ready_to_listen: bool,
}

async fn ready_to_listen(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ReadyToListenRequest>,
) -> Result<Json<Value>, ServerError> {
    state.db.lock().await.set_ready_to_listen(me, req.ready_to_listen)?;
    Ok(Json(json!({ "success": true, "readyToListen": req.ready_to_listen })))
}

#[derive(Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum FollowAction {
    #[default]
    Follow,
    Unfollow,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FollowRequest {
    user_id: String,
    #[serde(default)]
    action: FollowAction,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetRequest {
    user_id: String,
}

/// Resolve a target user id that must exist and differ from `me`.
pub(crate) fn other_user(
    db: &vibesync_store::Database,
    me: UserId,
    raw: &str,
) -> Result<UserId, ServerError> {
    let other = parse_id(raw, UserId::parse, "user id")?;
    if other == me {
        return Err(ValidationError::SelfTarget.into());
    }
    if !db.user_exists(other)? {
        return Err(ServerError::NotFound("User not found".into()));
    }
    Ok(other)
}

async fn follow(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<FollowRequest>,
) -> Result<Json<Value>, ServerError> {
    let db = state.db.lock().await;
    let other = other_user(&db, me, &req.user_id)?;

    match req.action {
        FollowAction::Follow => {
            if db.is_blocked_either(me, other)? {
                return Err(ServerError::Forbidden("Cannot follow this user".into()));
            }
            db.follow(me, other, Utc::now())?;
        }
        FollowAction::Unfollow => {
            db.unfollow(me, other)?;
        }
    }

    let mutual = db.is_mutual_follow(me, other)?;
    let chat_unlocked = mutual && db.refresh_permanent_unlock(me, other)?;
    if chat_unlocked {
        info!(user = %me, other = %other, "Chat permanently unlocked by mutual follow");
    }

    Ok(Json(json!({
        "success": true,
        "following": req.action == FollowAction::Follow,
        "mutual": mutual,
        "chatUnlocked": chat_unlocked,
    })))
}

async fn block(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TargetRequest>,
) -> Result<Json<Value>, ServerError> {
    let mut db = state.db.lock().await;
    let other = other_user(&db, me, &req.user_id)?;
    let newly = db.block(me, other, Utc::now())?;
    if newly {
        info!(user = %me, blocked = %other, "User blocked");
    }
    Ok(Json(json!({ "success": true, "blocked": true })))
}

async fn unblock(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TargetRequest>,
) -> Result<Json<Value>, ServerError> {
    let db = state.db.lock().await;
    let other = other_user(&db, me, &req.user_id)?;
    db.unblock(me, other)?;
    Ok(Json(json!({ "success": true, "blocked": false })))
}
