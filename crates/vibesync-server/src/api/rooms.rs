//! Four-person chat rooms formed by vibe similarity.

use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use vibesync_shared::constants::CHAT_ROOM_REUSE_MIN_MINUTES;
use vibesync_shared::planner::{plan_room, plan_rooms_for_pool, PoolEntry};
use vibesync_shared::validation::message_text;
use vibesync_shared::{RoomId, UserId};
use vibesync_store::{ChatRoom, Database};

use super::{parse_id, ApiJson, AppState};
use crate::auth::{verify_internal_key, AuthUser};
use crate::error::ServerError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(list_rooms))
        .route("/rooms/generate", post(generate_room))
        .route("/rooms/expire", post(expire_rooms))
        .route("/rooms/:id", get(get_room))
        .route("/rooms/:id/messages", post(send_message))
        .route("/rooms/:id/read", post(mark_read))
}

fn vibe_pool(db: &Database) -> Result<Vec<PoolEntry>, ServerError> {
    Ok(db
        .list_active_profiles()?
        .into_iter()
        .map(|p| PoolEntry {
            user: p.user,
            profile: p.match_profile(),
        })
        .collect())
}

async fn generate_room(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Value>, ServerError> {
    let now = Utc::now();
    let mut db = state.db.lock().await;

    let current = db.active_room_for_user(me, now)?;
    if let Some(current) = &current {
        if current.expires_at - now > Duration::minutes(CHAT_ROOM_REUSE_MIN_MINUTES) {
            return Ok(Json(json!({ "success": true, "room": current, "isNew": false })));
        }
    }

    let mine = db
        .get_active_vibe_profile(me)?
        .ok_or_else(|| ServerError::Validation("Set your vibe before joining a chat room".into()))?;

    // The room being replaced frees its participants for the new plan.
    let mut excluded: HashSet<UserId> = db.users_in_live_rooms(now)?;
    if let Some(current) = &current {
        for p in &current.participants {
            excluded.remove(p);
        }
    }
    excluded.extend(db.blocked_either_way(me)?);

    let requester = PoolEntry {
        user: me,
        profile: mine.match_profile(),
    };
    let plan = plan_room(&requester, &vibe_pool(&db)?, &excluded)?;

    if let Some(current) = &current {
        db.expire_room(current.id)?;
        debug!(room = %current.id, "Room near its end replaced on re-request");
    }
    let room = db.create_room(&plan, now)?;

    info!(room = %room.id, user = %me, similarity = room.average_similarity, "Chat room created");
    Ok(Json(json!({ "success": true, "room": room, "isNew": true })))
}

async fn list_rooms(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Value>, ServerError> {
    let now = Utc::now();
    let mut rooms = state.db.lock().await.list_rooms_for_user(me)?;
    for room in &mut rooms {
        room.is_expired = !room.is_live(now);
    }
    Ok(Json(json!({ "success": true, "rooms": rooms })))
}

/// Load a room the caller is in, flipping it to expired if its time is up.
fn load_for(db: &Database, id: RoomId, me: UserId, now: DateTime<Utc>) -> Result<ChatRoom, ServerError> {
    let mut room = db
        .get_room(id)
        .map_err(|_| ServerError::NotFound("Chat room not found".into()))?;
    if !room.has_participant(me) {
        return Err(ServerError::Forbidden("Not a participant of this chat room".into()));
    }
    if !room.is_expired && !room.is_live(now) {
        db.expire_room(id)?;
        room.is_expired = true;
    }
    Ok(room)
}

async fn get_room(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<Value>, ServerError> {
    let id = parse_id(&raw, RoomId::parse, "room id")?;
    let db = state.db.lock().await;
    let room = load_for(&db, id, me, Utc::now())?;
    let messages = db.list_room_messages(id)?;
    Ok(Json(json!({ "success": true, "room": room, "messages": messages })))
}

#[derive(Deserialize)]
struct MessageRequest {
    text: String,
}

async fn send_message(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    Path(raw): Path<String>,
    ApiJson(req): ApiJson<MessageRequest>,
) -> Result<Json<Value>, ServerError> {
    let id = parse_id(&raw, RoomId::parse, "room id")?;
    let text = message_text(&req.text)?;
    let now = Utc::now();
    let mut db = state.db.lock().await;

    let room = load_for(&db, id, me, now)?;
    if room.is_expired {
        return Err(ServerError::Expired("This chat room has expired".into()));
    }

    let message = db.append_room_message(id, me, &text, now)?;
    Ok(Json(json!({ "success": true, "message": message })))
}

async fn mark_read(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<Value>, ServerError> {
    let id = parse_id(&raw, RoomId::parse, "room id")?;
    let db = state.db.lock().await;
    load_for(&db, id, me, Utc::now())?;
    let marked = db.mark_room_read(id, me)?;
    Ok(Json(json!({ "success": true, "markedCount": marked })))
}

/// Sweep: expire rooms past their horizon, then form new rooms for active
/// users left without one.
async fn expire_rooms(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Value>, ServerError> {
    verify_internal_key(&headers, &state.config)?;

    let now = Utc::now();
    let mut db = state.db.lock().await;

    let expired = db.expire_rooms(now)?;
    let roomed = db.users_in_live_rooms(now)?;
    let blocks = db.block_list()?;
    let plans = plan_rooms_for_pool(&vibe_pool(&db)?, &roomed, &blocks);

    let mut created = 0;
    for plan in &plans {
        db.create_room(plan, now)?;
        created += 1;
    }

    info!(expired, created, "Chat room expiry sweep");
    Ok(Json(json!({
        "success": true,
        "expiredCount": expired,
        "createdCount": created,
    })))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::TestApp;
    use axum::http::StatusCode;
    use chrono::{Duration, SecondsFormat, Utc};
    use serde_json::json;

    #[tokio::test]
    async fn test_generate_needs_three_compatible_users() {
        let app = TestApp::new();
        let a = app.vibing("a", "😊", 6).await;
        app.vibing("b", "😊", 6).await;
        app.vibing("c", "😊", 6).await;

        let (status, body) = app.call("POST", "/rooms/generate", Some(&a.token), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["message"].as_str().unwrap().contains("Not enough users"));

        let (_, rooms) = app.call("GET", "/rooms", Some(&a.token), None).await;
        assert!(rooms["rooms"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_is_idempotent_while_fresh() {
        let app = TestApp::new();
        let a = app.vibing("a", "😊", 6).await;
        let b = app.vibing("b", "😊", 5).await;
        app.vibing("c", "😊", 7).await;
        app.vibing("d", "😊", 6).await;

        let (status, first) = app.call("POST", "/rooms/generate", Some(&a.token), None).await;
        assert_eq!(status, StatusCode::OK, "{first}");
        assert_eq!(first["isNew"], true);
        assert_eq!(first["room"]["participants"].as_array().unwrap().len(), 4);

        let (_, again) = app.call("POST", "/rooms/generate", Some(&a.token), None).await;
        assert_eq!(again["isNew"], false);
        assert_eq!(again["room"]["id"], first["room"]["id"]);

        let room_id = first["room"]["id"].as_str().unwrap();
        let (status, _) = app
            .call(
                "POST",
                &format!("/rooms/{room_id}/messages"),
                Some(&b.token),
                Some(json!({ "text": "hello room" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, opened) = app
            .call("GET", &format!("/rooms/{room_id}"), Some(&a.token), None)
            .await;
        assert_eq!(opened["messages"][0]["readBy"], json!([b.id]));

        let (_, read) = app
            .call("POST", &format!("/rooms/{room_id}/read"), Some(&a.token), None)
            .await;
        assert_eq!(read["markedCount"], 1);
    }

    #[tokio::test]
    async fn test_failed_regeneration_keeps_ending_room() {
        let app = TestApp::new();
        let a = app.vibing("a", "😊", 6).await;
        for name in ["b", "c", "d"] {
            app.vibing(name, "😊", 6).await;
        }
        let (_, first) = app.call("POST", "/rooms/generate", Some(&a.token), None).await;
        let room_id = first["room"]["id"].as_str().unwrap().to_string();

        {
            let db = app.state.db.lock().await;
            let ending = (Utc::now() + Duration::minutes(30)).to_rfc3339_opts(SecondsFormat::Millis, true);
            db.conn()
                .execute(&format!("UPDATE chat_rooms SET expires_at = '{ending}' WHERE id = '{room_id}'"), [])
                .unwrap();
            db.conn()
                .execute(&format!("UPDATE vibe_profiles SET is_active = 0 WHERE user_id != '{}'", a.id), [])
                .unwrap();
        }

        let (status, _) = app.call("POST", "/rooms/generate", Some(&a.token), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, rooms) = app.call("GET", "/rooms", Some(&a.token), None).await;
        assert_eq!(rooms["rooms"][0]["id"], room_id.as_str());
        assert_eq!(rooms["rooms"][0]["isExpired"], false);
    }

    #[tokio::test]
    async fn test_sweep_reports_counts() {
        let app = TestApp::new();
        for name in ["a", "b", "c", "d"] {
            app.vibing(name, "😊", 6).await;
        }

        let (status, first) = app.call("POST", "/rooms/expire", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["expiredCount"], 0);
        assert_eq!(first["createdCount"], 1);

        let (_, second) = app.call("POST", "/rooms/expire", None, None).await;
        assert_eq!(second["expiredCount"], 0);
        assert_eq!(second["createdCount"], 0);
    }
}
