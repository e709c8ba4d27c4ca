//! Pairwise chats. Expiry is evaluated whenever a chat is read, so a locked
//! chat looks locked even before the sweep has run.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use vibesync_shared::validation::message_text;
use vibesync_shared::{ChatId, UserId};
use vibesync_store::{Chat, ChatMessage, Database};

use super::users::other_user;
use super::{parse_id, ApiJson, AppState};
use crate::auth::{verify_internal_key, AuthUser};
use crate::error::ServerError;

const CHAT_LIST_LIMIT: usize = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/chats", post(create_chat).get(list_chats))
        .route("/chats/unread", get(unread_count))
        .route("/chats/expire", post(expire_chats))
        .route("/chats/:id", get(get_chat))
        .route("/chats/:id/messages", post(send_message))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatView {
    #[serde(flatten)]
    chat: Chat,
    /// Milliseconds; `None` once permanently unlocked.
    time_remaining: Option<i64>,
    other_participant: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unread_messages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_message: Option<ChatMessage>,
}

impl ChatView {
    fn new(chat: Chat, me: UserId, now: DateTime<Utc>) -> Self {
        Self {
            time_remaining: chat.time_remaining_ms(now),
            other_participant: chat.participants.iter().copied().find(|p| *p != me),
            chat,
            unread_messages: None,
            last_message: None,
        }
    }
}

/// Load a chat the caller takes part in, locking it first if it has run out.
fn load_for(db: &Database, id: ChatId, me: UserId, now: DateTime<Utc>) -> Result<Chat, ServerError> {
    let mut chat = db
        .get_chat(id)
        .map_err(|_| ServerError::NotFound("Chat not found".into()))?;
    if !chat.has_participant(me) {
        return Err(ServerError::Forbidden("Not a participant of this chat".into()));
    }
    if db.lock_chat_if_expired(id, now)? {
        info!(chat = %id, "Chat locked on read");
    }
    chat.is_locked = chat.is_locked_at(now);
    Ok(chat)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateChatRequest {
    other_user_id: String,
}

async fn create_chat(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateChatRequest>,
) -> Result<Json<Value>, ServerError> {
    let now = Utc::now();
    let mut db = state.db.lock().await;
    let other = other_user(&db, me, &req.other_user_id)?;
    if db.is_blocked_either(me, other)? {
        return Err(ServerError::Forbidden("Cannot chat with this user".into()));
    }

    let (mut chat, is_new) = db.get_or_create_chat(me, other, now)?;
    chat.is_locked = chat.is_locked_at(now);
    if is_new {
        info!(chat = %chat.id, user = %me, other = %other, "Chat created");
    }

    Ok(Json(json!({
        "success": true,
        "chat": ChatView::new(chat, me, now),
        "isNew": is_new,
    })))
}

async fn list_chats(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Value>, ServerError> {
    let now = Utc::now();
    let db = state.db.lock().await;

    let mut views = Vec::new();
    for chat in db.list_chats_for_user(me, CHAT_LIST_LIMIT)? {
        let chat = load_for(&db, chat.id, me, now)?;
        let id = chat.id;
        let mut view = ChatView::new(chat, me, now);
        view.unread_messages = Some(db.unread_in_chat(id, me)?);
        view.last_message = db.last_chat_message(id)?;
        views.push(view);
    }

    Ok(Json(json!({ "success": true, "chats": views })))
}

async fn unread_count(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Value>, ServerError> {
    let unread = state.db.lock().await.unread_total(me)?;
    Ok(Json(json!({ "success": true, "unreadCount": unread })))
}

async fn get_chat(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<Value>, ServerError> {
    let id = parse_id(&raw, ChatId::parse, "chat id")?;
    let now = Utc::now();
    let db = state.db.lock().await;

    let chat = load_for(&db, id, me, now)?;
    db.mark_chat_read(id, me)?;
    let messages = db.list_chat_messages(id)?;

    Ok(Json(json!({
        "success": true,
        "chat": ChatView::new(chat, me, now),
        "messages": messages,
    })))
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
    let id = parse_id(&raw, ChatId::parse, "chat id")?;
    let text = message_text(&req.text)?;
    let now = Utc::now();
    let db = state.db.lock().await;

    let chat = load_for(&db, id, me, now)?;
    if chat.is_locked {
        return Err(ServerError::Expired(
            "This chat has expired. Follow each other to unlock it permanently.".into(),
        ));
    }

    let message = db.append_chat_message(id, me, &text, now)?;
    Ok(Json(json!({ "success": true, "message": message })))
}

async fn expire_chats(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Value>, ServerError> {
    verify_internal_key(&headers, &state.config)?;

    let locked = state.db.lock().await.expire_chats(Utc::now())?;
    info!(count = locked, "Chat expiry sweep");
    Ok(Json(json!({ "success": true, "lockedCount": locked })))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::TestApp;
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use vibesync_shared::UserId;

    #[tokio::test]
    async fn test_chat_is_unique_per_pair() {
        let app = TestApp::new();
        let a = app.register("a").await;
        let b = app.register("b").await;

        let (status, first) = app
            .call("POST", "/chats", Some(&a.token), Some(json!({ "otherUserId": b.id })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["isNew"], true);
        assert_eq!(first["chat"]["otherParticipant"], b.id);

        let (_, second) = app
            .call("POST", "/chats", Some(&b.token), Some(json!({ "otherUserId": a.id })))
            .await;
        assert_eq!(second["isNew"], false);
        assert_eq!(second["chat"]["id"], first["chat"]["id"]);

        let (status, _) = app
            .call("POST", "/chats", Some(&a.token), Some(json!({ "otherUserId": a.id })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_messages_and_unread_counts() {
        let app = TestApp::new();
        let a = app.register("a").await;
        let b = app.register("b").await;
        let outsider = app.register("c").await;

        let (_, created) = app
            .call("POST", "/chats", Some(&a.token), Some(json!({ "otherUserId": b.id })))
            .await;
        let chat_id = created["chat"]["id"].as_str().unwrap().to_string();
        let messages_uri = format!("/chats/{chat_id}/messages");

        let (status, _) = app
            .call("POST", &messages_uri, Some(&a.token), Some(json!({ "text": "hey!" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app
            .call("POST", &messages_uri, Some(&a.token), Some(json!({ "text": "   " })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = app
            .call("POST", &messages_uri, Some(&outsider.token), Some(json!({ "text": "hi" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, unread) = app.call("GET", "/chats/unread", Some(&b.token), None).await;
        assert_eq!(unread["unreadCount"], 1);

        let (_, listed) = app.call("GET", "/chats", Some(&b.token), None).await;
        assert_eq!(listed["chats"][0]["unreadMessages"], 1);
        assert_eq!(listed["chats"][0]["lastMessage"]["text"], "hey!");

        let (_, opened) = app
            .call("GET", &format!("/chats/{chat_id}"), Some(&b.token), None)
            .await;
        assert_eq!(opened["messages"].as_array().unwrap().len(), 1);
        let (_, unread) = app.call("GET", "/chats/unread", Some(&b.token), None).await;
        assert_eq!(unread["unreadCount"], 0);
    }

    #[tokio::test]
    async fn test_expired_chat_rejects_messages() {
        let app = TestApp::new();
        let a = app.register("a").await;
        let b = app.register("b").await;

        let chat = {
            let mut db = app.state.db.lock().await;
            let a_id = UserId::parse(&a.id).unwrap();
            let b_id = UserId::parse(&b.id).unwrap();
            db.get_or_create_chat(a_id, b_id, Utc::now() - Duration::hours(25))
                .unwrap()
                .0
        };

        let (status, body) = app
            .call(
                "POST",
                &format!("/chats/{}/messages", chat.id),
                Some(&a.token),
                Some(json!({ "text": "still there?" })),
            )
            .await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(body["success"], false);

        let (_, sweep) = app.call("POST", "/chats/expire", None, None).await;
        assert_eq!(sweep["lockedCount"], 0);
    }
}
