//! Vibe profiles, 1:1 matching, the mood heatmap, icebreakers, description
//! suggestions and the daily advice card.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use vibesync_shared::constants::{DAILY_ADVICE, DISCOVERY_MIN_SIMILARITY, VIBE_REFRESH_HOURS};
use vibesync_shared::matching::{calculate_similarity, MatchCategory, MatchResult};
use vibesync_shared::validation::VibeSubmission;
use vibesync_shared::vibe_score::{calculate_vibe_score, VibeInput};
use vibesync_shared::constants::{ENERGY_LEVEL_MAX, ENERGY_LEVEL_MIN};
use vibesync_shared::{Mood, UserId, ValidationError};
use vibesync_store::VibeProfile;

use super::users::other_user;
use super::{parse_id, ApiJson, AppState};
use crate::auth::AuthUser;
use crate::error::ServerError;
use crate::text_service;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/vibe", post(submit_vibe))
        .route("/vibe/me", get(my_vibe))
        .route("/vibe/user/:id", get(user_vibe))
        .route("/vibe/matches", get(vibe_matches))
        .route("/vibe/heatmap", get(heatmap))
        .route("/ai/icebreakers", post(icebreakers))
        .route("/ai/enhance-description", post(enhance_description))
        .route("/advice/daily", get(daily_advice))
}

async fn submit_vibe(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    ApiJson(submission): ApiJson<VibeSubmission>,
) -> Result<Json<Value>, ServerError> {
    let vibe = submission.validate()?;
    let score = calculate_vibe_score(&VibeInput {
        emoji: &vibe.emoji,
        description: &vibe.description,
        energy_level: vibe.energy_level,
        current_intent: &vibe.current_intent,
        context_tag: vibe.context_tag.as_deref(),
    });

    let (profile, replaced) = state
        .db
        .lock()
        .await
        .upsert_vibe_profile(me, &vibe, &score, Utc::now())?;

    debug!(user = %me, mood = %profile.vibe_score.mood, replaced, "Vibe saved");
    Ok(Json(json!({
        "success": true,
        "vibeProfile": profile,
        "isNew": !replaced,
    })))
}

async fn my_vibe(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Value>, ServerError> {
    let profile = state
        .db
        .lock()
        .await
        .get_vibe_profile(me)?
        .ok_or_else(|| ServerError::NotFound("No vibe set yet".into()))?;

    let needs_refresh = Utc::now() - profile.last_updated >= Duration::hours(VIBE_REFRESH_HOURS);
    Ok(Json(json!({
        "success": true,
        "vibeProfile": profile,
        "needsRefresh": needs_refresh,
    })))
}

async fn user_vibe(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<Value>, ServerError> {
    let other = parse_id(&raw, UserId::parse, "user id")?;
    let db = state.db.lock().await;

    let hidden = other != me && db.is_blocked_either(me, other)?;
    let profile = if hidden {
        None
    } else {
        db.get_active_vibe_profile(other)?
    };
    let profile = profile.ok_or_else(|| ServerError::NotFound("Vibe not found".into()))?;
    let ready_to_listen = db.get_user(other)?.ready_to_listen;

    Ok(Json(json!({
        "success": true,
        "vibeProfile": profile,
        "readyToListen": ready_to_listen,
    })))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VibeMatch {
    user_id: UserId,
    vibe_profile: VibeProfile,
    #[serde(flatten)]
    result: MatchResult,
}

async fn vibe_matches(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Value>, ServerError> {
    let db = state.db.lock().await;
    let mine = db
        .get_active_vibe_profile(me)?
        .ok_or_else(|| ServerError::Validation("Set your vibe first".into()))?;
    let blocked = db.blocked_either_way(me)?;
    let mine = mine.match_profile();

    let mut found: Vec<VibeMatch> = db
        .list_active_profiles()?
        .into_iter()
        .filter(|p| p.user != me && !blocked.contains(&p.user))
        .filter_map(|p| {
            let result = calculate_similarity(&mine, &p.match_profile());
            (result.similarity >= DISCOVERY_MIN_SIMILARITY).then(|| VibeMatch {
                user_id: p.user,
                vibe_profile: p,
                result,
            })
        })
        .collect();
    drop(db);

    found.sort_by(|a, b| b.result.similarity.cmp(&a.result.similarity));

    let in_category = |category: Option<MatchCategory>| -> Vec<&VibeMatch> {
        found.iter().filter(|m| m.result.category == category).collect()
    };
    let mood_twins = in_category(Some(MatchCategory::MoodTwins));
    let near_energy = in_category(Some(MatchCategory::NearYourEnergy));
    let similar_vibes: Vec<&VibeMatch> = found
        .iter()
        .filter(|m| {
            !matches!(
                m.result.category,
                Some(MatchCategory::MoodTwins) | Some(MatchCategory::NearYourEnergy)
            )
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "total": found.len(),
        "matches": &found,
        "moodTwins": mood_twins,
        "nearEnergy": near_energy,
        "similarVibes": similar_vibes,
    })))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MoodCell {
    mood: Mood,
    count: u32,
    average_energy: f64,
}

async fn heatmap(
    AuthUser(_me): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Value>, ServerError> {
    let profiles = state.db.lock().await.list_active_profiles()?;

    let mut buckets: BTreeMap<Mood, (u32, u32)> = BTreeMap::new();
    for p in &profiles {
        let entry = buckets.entry(p.vibe_score.mood).or_default();
        entry.0 += 1;
        entry.1 += u32::from(p.energy_level);
    }

    let mut cells: Vec<MoodCell> = buckets
        .into_iter()
        .map(|(mood, (count, energy_sum))| MoodCell {
            mood,
            count,
            average_energy: (f64::from(energy_sum) / f64::from(count) * 10.0).round() / 10.0,
        })
        .collect();
    cells.sort_by(|a, b| b.count.cmp(&a.count));

    Ok(Json(json!({
        "success": true,
        "totalActive": profiles.len(),
        "moods": cells,
    })))
}

async fn daily_advice(AuthUser(_me): AuthUser) -> Json<Value> {
    let advice = DAILY_ADVICE
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_default();
    Json(json!({ "success": true, "advice": advice }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IcebreakerRequest {
    other_user_id: String,
}

async fn icebreakers(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<IcebreakerRequest>,
) -> Result<Json<Value>, ServerError> {
    let (mine, theirs) = {
        let db = state.db.lock().await;
        let other = other_user(&db, me, &req.other_user_id)?;
        if db.is_blocked_either(me, other)? {
            return Err(ServerError::Forbidden("Cannot message this user".into()));
        }
        let mine = db
            .get_active_vibe_profile(me)?
            .ok_or_else(|| ServerError::Validation("Set your vibe first".into()))?;
        let theirs = db
            .get_active_vibe_profile(other)?
            .ok_or_else(|| ServerError::NotFound("Vibe not found".into()))?;
        (mine, theirs)
    };

    let lines = text_service::icebreakers(state.text.as_ref(), &mine, &theirs).await;
    Ok(Json(json!({ "success": true, "icebreakers": lines })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnhanceRequest {
    emoji: Option<String>,
    description: Option<String>,
    energy_level: Option<i64>,
    current_intent: Option<Vec<String>>,
}

async fn enhance_description(
    AuthUser(_me): AuthUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EnhanceRequest>,
) -> Result<Json<Value>, ServerError> {
    let filled = |v: Option<String>, field| {
        v.filter(|s| !s.trim().is_empty())
            .ok_or(ValidationError::MissingField(field))
    };
    let emoji = filled(req.emoji, "emoji")?;
    let description = filled(req.description, "description")?;
    let energy_level = req
        .energy_level
        .ok_or(ValidationError::MissingField("energyLevel"))?;
    if !(i64::from(ENERGY_LEVEL_MIN)..=i64::from(ENERGY_LEVEL_MAX)).contains(&energy_level) {
        return Err(ValidationError::EnergyOutOfRange(energy_level).into());
    }
    let current_intent = req
        .current_intent
        .filter(|i| !i.is_empty())
        .ok_or(ValidationError::MissingField("currentIntent"))?;

    let draft = text_service::DescriptionDraft {
        emoji: &emoji,
        description: &description,
        energy_level: energy_level as u8,
        current_intent: &current_intent,
    };
    let suggestions = text_service::enhance_description(state.text.as_ref(), &draft).await;
    Ok(Json(json!({ "success": true, "suggestions": suggestions })))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::TestApp;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_submit_and_replace_vibe() {
        let app = TestApp::new();
        let a = app.vibing("a", "😊", 6).await;

        let (status, body) = app.call("GET", "/vibe/me", Some(&a.token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["vibeProfile"]["vibeScore"]["mood"], "happy");
        assert_eq!(body["needsRefresh"], false);

        let (status, body) = app
            .call(
                "POST",
                "/vibe",
                Some(&a.token),
                Some(json!({
                    "emoji": "😴",
                    "description": "tired",
                    "energyLevel": 2,
                    "currentIntent": ["Chill conversation"],
                    "interactionBoundary": "Slow replies",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

        let (status, body) = app
            .call(
                "POST",
                "/vibe",
                Some(&a.token),
                Some(json!({
                    "emoji": "😴",
                    "description": "so tired tonight",
                    "energyLevel": 2,
                    "currentIntent": ["Chill conversation"],
                    "interactionBoundary": "Slow replies",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isNew"], false);
    }

    #[tokio::test]
    async fn test_enhance_description_echoes_draft_without_service() {
        let app = TestApp::new();
        let a = app.register("a").await;

        let (status, body) = app
            .call(
                "POST",
                "/ai/enhance-description",
                Some(&a.token),
                Some(json!({
                    "emoji": "🤩",
                    "description": "buzzing after the concert",
                    "energyLevel": 9,
                    "currentIntent": ["Hype each other up"],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["suggestions"], json!(["buzzing after the concert"]));

        let (status, _) = app
            .call(
                "POST",
                "/ai/enhance-description",
                Some(&a.token),
                Some(json!({ "emoji": "🤩", "energyLevel": 9, "currentIntent": ["x"] })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .call("POST", "/ai/enhance-description", None, Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_matches_exclude_blocked_users() {
        let app = TestApp::new();
        let a = app.vibing("a", "😊", 6).await;
        let b = app.vibing("b", "😊", 6).await;
        let c = app.vibing("c", "😊", 6).await;

        let (status, body) = app.call("GET", "/vibe/matches", Some(&a.token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["moodTwins"].as_array().unwrap().len(), 2);

        app.call("POST", "/users/block", Some(&c.token), Some(json!({ "userId": a.id })))
            .await;
        let (_, body) = app.call("GET", "/vibe/matches", Some(&a.token), None).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["matches"][0]["userId"], b.id);
        assert!(body["matches"][0]["similarity"].as_u64().unwrap() >= 70);

        let (status, _) = app
            .call("GET", &format!("/vibe/user/{}", c.id), Some(&a.token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_heatmap_and_canned_icebreakers() {
        let app = TestApp::new();
        let a = app.vibing("a", "😊", 6).await;
        let b = app.vibing("b", "😊", 8).await;

        let (_, body) = app.call("GET", "/vibe/heatmap", Some(&a.token), None).await;
        assert_eq!(body["totalActive"], 2);
        assert_eq!(body["moods"][0]["mood"], "happy");
        assert_eq!(body["moods"][0]["averageEnergy"], 7.0);

        let (status, body) = app
            .call("POST", "/ai/icebreakers", Some(&a.token), Some(json!({ "otherUserId": b.id })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["icebreakers"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_daily_advice_comes_from_the_list() {
        let app = TestApp::new();
        let a = app.register("a").await;

        let (status, body) = app.call("GET", "/advice/daily", Some(&a.token), None).await;
        assert_eq!(status, StatusCode::OK);
        let advice = body["advice"].as_str().unwrap();
        assert!(vibesync_shared::constants::DAILY_ADVICE.contains(&advice));

        let (status, _) = app.call("GET", "/advice/daily", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
