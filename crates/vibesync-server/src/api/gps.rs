//! Group plans: creation under quota, discovery, membership, activity and
//! permanent conversion.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use vibesync_shared::constants::{ACTIVE_USER_WINDOW_MINUTES, GP_RADIUS_FETCH_LIMIT};
use vibesync_shared::discovery::{expand_radius, explore_order, rank_for_discovery};
use vibesync_shared::quota::{check_gp_creation, limits_report};
use vibesync_shared::validation::GpDraft;
use vibesync_shared::voting::{is_eligible, tally};
use vibesync_shared::{GpCategory, GpId, VoteChoice};
use vibesync_store::gps::{
    ActivityOutcome, ConversionCheck, CreateOutcome, ExploreFilter, JoinOutcome, LeaveOutcome,
    VoteOutcome,
};
use vibesync_store::GroupPlan;

use super::{parse_id, ApiJson, AppState};
use crate::auth::{verify_internal_key, AuthUser};
use crate::error::ServerError;

const EXPLORE_DEFAULT_LIMIT: usize = 20;
const EXPLORE_MAX_LIMIT: usize = 50;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/gp", post(create_gp))
        .route("/gp/check-limits", get(check_limits))
        .route("/gp/discover", get(discover))
        .route("/gp/explore", get(explore))
        .route("/gp/mine", get(my_gps))
        .route("/gp/join", post(join_gp))
        .route("/gp/leave", post(leave_gp))
        .route("/gp/activity", post(record_activity))
        .route("/gp/convert", post(convert).get(conversion_status))
        .route("/gp/expire", post(expire_gps))
}

fn active_since(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::minutes(ACTIVE_USER_WINDOW_MINUTES)
}

fn parse_category(raw: &str) -> Result<GpCategory, ServerError> {
    raw.parse()
        .map_err(|_| ServerError::Validation(format!("Invalid category: {raw}")))
}

/// A GP as listed to a prospective member.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GpListing {
    #[serde(flatten)]
    gp: GroupPlan,
    /// Minutes.
    time_left: i64,
    members_needed: u32,
    /// Kilometres, one decimal; `None` without a caller location.
    distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority_score: Option<i32>,
}

impl GpListing {
    fn new(gp: GroupPlan, distance: Option<f64>, now: DateTime<Utc>) -> Self {
        Self {
            time_left: gp.minutes_left(now),
            members_needed: gp.snapshot().members_needed(),
            distance: distance.map(|d| (d * 10.0).round() / 10.0),
            priority_score: None,
            gp,
        }
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

async fn create_gp(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    ApiJson(draft): ApiJson<GpDraft>,
) -> Result<Json<Value>, ServerError> {
    let draft = draft.validate()?;
    let now = Utc::now();
    let offset = state.config.quota_offset;

    let outcome = state.db.lock().await.create_gp(
        me,
        &draft,
        now,
        active_since(now),
        |inputs| check_gp_creation(inputs, now, offset),
    )?;

    match outcome {
        CreateOutcome::Created(gp) => Ok(Json(json!({ "success": true, "gp": gp }))),
        CreateOutcome::Rejected(rejection) => Err(rejection.into()),
    }
}

#[derive(Deserialize)]
struct LimitsQuery {
    category: Option<String>,
}

async fn check_limits(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<LimitsQuery>,
) -> Result<Json<Value>, ServerError> {
    let category = query
        .category
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(parse_category)
        .transpose()?;
    let now = Utc::now();

    let inputs = state
        .db
        .lock()
        .await
        .quota_inputs(me, category, now, active_since(now))?;
    let report = limits_report(&inputs, now, state.config.quota_offset);

    Ok(Json(json!({ "success": true, "limits": report })))
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

async fn discover(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Value>, ServerError> {
    let now = Utc::now();
    let db = state.db.lock().await;
    let origin = db
        .get_user(me)?
        .location
        .ok_or_else(|| ServerError::Validation("Share your location to discover GPs".into()))?;

    let candidates = expand_radius(|radius| {
        db.active_gps_near(me, origin, radius, GP_RADIUS_FETCH_LIMIT, now)
    })?;
    drop(db);

    let mut by_id: HashMap<GpId, GroupPlan> = HashMap::new();
    let snapshots = candidates
        .into_iter()
        .map(|(gp, distance)| {
            let snapshot = gp.snapshot();
            by_id.insert(gp.id, gp);
            (snapshot, distance)
        })
        .collect();

    let listings: Vec<GpListing> = rank_for_discovery(snapshots, now)
        .into_iter()
        .filter_map(|ranked| {
            let gp = by_id.remove(&ranked.gp.id)?;
            let mut listing = GpListing::new(gp, Some(ranked.distance_km), now);
            listing.priority_score = Some(ranked.priority_score);
            Some(listing)
        })
        .collect();

    Ok(Json(json!({ "success": true, "gps": listings })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExploreQuery {
    category: Option<String>,
    sub_type: Option<String>,
    topic: Option<String>,
    /// Hours.
    min_time_remaining: Option<f64>,
    /// Kilometres.
    max_distance: Option<f64>,
    page: Option<usize>,
    limit: Option<usize>,
}

async fn explore(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ExploreQuery>,
) -> Result<Json<Value>, ServerError> {
    let now = Utc::now();
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(EXPLORE_DEFAULT_LIMIT)
        .clamp(1, EXPLORE_MAX_LIMIT);

    let filter = ExploreFilter {
        category: query
            .category
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(parse_category)
            .transpose()?,
        sub_type: query.sub_type.filter(|s| !s.trim().is_empty()),
        topic: query.topic.filter(|t| !t.trim().is_empty()),
    };

    let (origin, candidates) = {
        let db = state.db.lock().await;
        let origin = db.get_user(me)?.location;
        let candidates = db.explore_candidates(me, &filter, page * limit * 2, now)?;
        (origin, candidates)
    };
    if query.max_distance.is_some() && origin.is_none() {
        return Err(ServerError::Validation(
            "Share your location to filter by distance".into(),
        ));
    }

    let mut found: Vec<(GroupPlan, Option<f64>)> = candidates
        .into_iter()
        .map(|gp| {
            let distance = origin.map(|o| o.distance_km(&gp.location));
            (gp, distance)
        })
        .filter(|(gp, distance)| {
            let enough_time = query
                .min_time_remaining
                .map_or(true, |hours| gp.snapshot().hours_remaining(now) >= hours);
            let near_enough = match (query.max_distance, distance) {
                (Some(max), Some(d)) => *d <= max,
                _ => true,
            };
            enough_time && near_enough
        })
        .collect();

    found.sort_by(|a, b| explore_order((&a.0.snapshot(), a.1), (&b.0.snapshot(), b.1), now));

    let total = found.len();
    let listings: Vec<GpListing> = found
        .into_iter()
        .skip((page - 1) * limit)
        .take(limit)
        .map(|(gp, distance)| GpListing::new(gp, distance, now))
        .collect();

    Ok(Json(json!({
        "success": true,
        "gps": listings,
        "page": page,
        "limit": limit,
        "total": total,
        "hasMore": page * limit < total,
    })))
}

async fn my_gps(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Value>, ServerError> {
    let now = Utc::now();
    let gps = state.db.lock().await.gps_for_member(me, now)?;
    let listings: Vec<GpListing> = gps
        .into_iter()
        .map(|gp| GpListing::new(gp, None, now))
        .collect();
    Ok(Json(json!({ "success": true, "gps": listings })))
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GpRequest {
    gp_id: String,
}

async fn join_gp(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GpRequest>,
) -> Result<Json<Value>, ServerError> {
    let id = parse_id(&req.gp_id, GpId::parse, "GP id")?;
    let outcome = state.db.lock().await.join_gp(id, me, Utc::now())?;

    match outcome {
        JoinOutcome::Joined(gp) => {
            info!(gp = %id, user = %me, members = gp.member_count(), "GP joined");
            Ok(Json(json!({ "success": true, "gp": gp })))
        }
        JoinOutcome::AlreadyMember => {
            Err(ServerError::Conflict("You are already a member of this GP".into()))
        }
        JoinOutcome::Full => Err(ServerError::Conflict("This GP is full".into())),
        JoinOutcome::NotActive => {
            Err(ServerError::Validation("This GP is no longer active".into()))
        }
    }
}

async fn leave_gp(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GpRequest>,
) -> Result<Json<Value>, ServerError> {
    let id = parse_id(&req.gp_id, GpId::parse, "GP id")?;
    let outcome = state.db.lock().await.leave_gp(id, me, Utc::now())?;

    match outcome {
        LeaveOutcome::NotMember => {
            Err(ServerError::Forbidden("You are not a member of this GP".into()))
        }
        LeaveOutcome::Left { failed } => {
            if failed {
                info!(gp = %id, "GP failed after last member left");
            }
            Ok(Json(json!({ "success": true, "failed": failed })))
        }
    }
}

// ---------------------------------------------------------------------------
// Activity and conversion
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityRequest {
    gp_id: String,
    message_count: Option<u32>,
}

async fn record_activity(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ActivityRequest>,
) -> Result<Json<Value>, ServerError> {
    let id = parse_id(&req.gp_id, GpId::parse, "GP id")?;
    let outcome = state.db.lock().await.record_activity(
        id,
        me,
        req.message_count,
        Utc::now(),
        &state.config.eligibility,
    )?;

    match outcome {
        ActivityOutcome::NotMember => {
            Err(ServerError::Forbidden("You are not a member of this GP".into()))
        }
        ActivityOutcome::Updated { eligible } => Ok(Json(json!({
            "success": true,
            "isPermanentConversionEligible": eligible,
        }))),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum ConvertAction {
    Check,
    Vote,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConvertRequest {
    gp_id: String,
    action: ConvertAction,
    vote: Option<String>,
}

async fn convert(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ConvertRequest>,
) -> Result<Json<Value>, ServerError> {
    let id = parse_id(&req.gp_id, GpId::parse, "GP id")?;
    let now = Utc::now();
    let not_member = || ServerError::Forbidden("You are not a member of this GP".into());

    match req.action {
        ConvertAction::Check => {
            let outcome = state.db.lock().await.request_conversion_check(
                id,
                me,
                now,
                &state.config.eligibility,
            )?;
            match outcome {
                ConversionCheck::NotMember => Err(not_member()),
                ConversionCheck::NotEligible => Err(ServerError::Validation(
                    "This GP does not meet the requirements for permanent conversion yet".into(),
                )),
                ConversionCheck::Eligible(gp) => Ok(Json(json!({
                    "success": true,
                    "eligible": true,
                    "gp": gp,
                }))),
            }
        }
        ConvertAction::Vote => {
            let raw = req
                .vote
                .as_deref()
                .ok_or_else(|| ServerError::Validation("vote is required".into()))?;
            let vote: VoteChoice = raw
                .parse()
                .map_err(|_| ServerError::Validation(format!("Invalid vote: {raw}")))?;

            let outcome = state.db.lock().await.cast_vote(id, me, vote, now)?;
            match outcome {
                VoteOutcome::NotMember => Err(not_member()),
                VoteOutcome::NotEligible => Err(ServerError::Validation(
                    "Voting is not open for this GP".into(),
                )),
                VoteOutcome::Recorded {
                    tally,
                    converted_chat,
                } => Ok(Json(json!({
                    "success": true,
                    "tally": tally,
                    "converted": converted_chat.is_some(),
                    "chatId": converted_chat,
                }))),
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusQuery {
    gp_id: String,
}

/// Read-only view of a GP's conversion: whether it qualifies, the running
/// tally and the caller's own ballot.
async fn conversion_status(
    AuthUser(me): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Value>, ServerError> {
    let id = parse_id(&query.gp_id, GpId::parse, "GP id")?;
    let now = Utc::now();
    let db = state.db.lock().await;

    let gp = db
        .get_gp(id)
        .map_err(|_| ServerError::NotFound("GP not found".into()))?;
    let ballots = db.get_ballots(id)?;
    let user_vote = ballots.iter().find(|b| b.user == me).map(|b| b.vote);

    Ok(Json(json!({
        "success": true,
        "isEligible": is_eligible(&state.config.eligibility, &gp.activity_facts(now), now),
        "isConversionEligible": gp.is_permanent_conversion_eligible,
        "voteResult": tally(&ballots, &gp.members),
        "userVote": user_vote,
        "isPermanent": gp.is_permanent,
    })))
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

async fn expire_gps(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Value>, ServerError> {
    verify_internal_key(&headers, &state.config)?;

    let (expired, failed) = state.db.lock().await.expire_gps(Utc::now())?;
    info!(expired, failed, "GP expiry sweep");
    Ok(Json(json!({
        "success": true,
        "expiredCount": expired,
        "failedCount": failed,
    })))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{TestApp, TestUser};
    use axum::http::StatusCode;
    use chrono::{DateTime, Duration, SecondsFormat, Utc};
    use serde_json::{json, Value};

    fn draft(category: &str) -> Value {
        json!({
            "category": category,
            "subType": "Sci-fi",
            "specificName": "Dune",
            "talkTopics": ["worldbuilding"],
            "description": "Rewatch and chat",
            "creationReason": "bored",
            "location": { "latitude": 48.8566, "longitude": 2.3522, "city": "Paris" },
        })
    }

    async fn located(app: &TestApp, name: &str) -> TestUser {
        let user = app.register(name).await;
        let (status, _) = app
            .call(
                "POST",
                "/users/location",
                Some(&user.token),
                Some(json!({ "latitude": 48.86, "longitude": 2.35 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        user
    }

    #[tokio::test]
    async fn test_create_then_cooldown_rejection() {
        let app = TestApp::new();
        let a = located(&app, "a").await;

        let (status, body) = app.call("POST", "/gp", Some(&a.token), Some(draft("Movie GP"))).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["gp"]["members"].as_array().unwrap().len(), 1);
        assert_eq!(body["gp"]["status"], "active");

        let (status, body) = app.call("POST", "/gp", Some(&a.token), Some(draft("Anime GP"))).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["reason"], "cooldown");

        let (_, limits) = app
            .call("GET", "/gp/check-limits?category=Movie%20GP", Some(&a.token), None)
            .await;
        assert_eq!(limits["limits"]["canCreate"], false);
        assert_eq!(limits["limits"]["category"]["hasActive"], true);
        assert_eq!(limits["limits"]["daily"]["todayCreations"], 1);

        let (status, _) = app
            .call("GET", "/gp/check-limits?category=Book", Some(&a.token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_draft_is_rejected() {
        let app = TestApp::new();
        let a = app.register("a").await;
        let mut body = draft("Movie GP");
        body["talkTopics"] = json!(["a", "b", "c", "d"]);
        let (status, _) = app.call("POST", "/gp", Some(&a.token), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_discover_join_and_leave() {
        let app = TestApp::new();
        let creator = located(&app, "creator").await;
        let joiner = located(&app, "joiner").await;

        let (_, created) = app
            .call("POST", "/gp", Some(&creator.token), Some(draft("Vibe GP")))
            .await;
        let gp_id = created["gp"]["id"].as_str().unwrap().to_string();

        let (status, found) = app.call("GET", "/gp/discover", Some(&joiner.token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["gps"][0]["id"], gp_id.as_str());
        assert_eq!(found["gps"][0]["membersNeeded"], 4);
        assert!(found["gps"][0]["distance"].as_f64().unwrap() < 5.0);

        let (_, own) = app.call("GET", "/gp/discover", Some(&creator.token), None).await;
        assert!(own["gps"].as_array().unwrap().is_empty());

        let (status, _) = app
            .call("POST", "/gp/join", Some(&joiner.token), Some(json!({ "gpId": gp_id })))
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app
            .call("POST", "/gp/join", Some(&joiner.token), Some(json!({ "gpId": gp_id })))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, mine) = app.call("GET", "/gp/mine", Some(&joiner.token), None).await;
        assert_eq!(mine["gps"].as_array().unwrap().len(), 1);

        let (_, left) = app
            .call("POST", "/gp/leave", Some(&joiner.token), Some(json!({ "gpId": gp_id })))
            .await;
        assert_eq!(left["failed"], false);
        let (_, left) = app
            .call("POST", "/gp/leave", Some(&creator.token), Some(json!({ "gpId": gp_id })))
            .await;
        assert_eq!(left["failed"], true);
    }

    #[tokio::test]
    async fn test_explore_filters_and_requires_location_for_distance() {
        let app = TestApp::new();
        let creator = located(&app, "creator").await;
        let browser = app.register("browser").await;
        app.call("POST", "/gp", Some(&creator.token), Some(draft("Movie GP"))).await;

        let (_, all) = app.call("GET", "/gp/explore", Some(&browser.token), None).await;
        assert_eq!(all["total"], 1);
        assert_eq!(all["gps"][0]["distance"], Value::Null);

        let (_, by_topic) = app
            .call("GET", "/gp/explore?topic=pacing", Some(&browser.token), None)
            .await;
        assert_eq!(by_topic["total"], 0);

        let (_, by_sub_type) = app
            .call("GET", "/gp/explore?subType=sci", Some(&browser.token), None)
            .await;
        assert_eq!(by_sub_type["total"], 1);

        let (_, by_time) = app
            .call("GET", "/gp/explore?minTimeRemaining=4", Some(&browser.token), None)
            .await;
        assert_eq!(by_time["total"], 0);

        let (status, _) = app
            .call("GET", "/gp/explore?maxDistance=10", Some(&browser.token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_conversion_requires_eligibility_and_membership() {
        let app = TestApp::new();
        let creator = located(&app, "creator").await;
        let outsider = app.register("outsider").await;
        let (_, created) = app
            .call("POST", "/gp", Some(&creator.token), Some(draft("Vibe GP")))
            .await;
        let gp_id = created["gp"]["id"].as_str().unwrap().to_string();

        let (status, _) = app
            .call("POST", "/gp/convert", Some(&creator.token), Some(json!({ "gpId": gp_id, "action": "check" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .call("POST", "/gp/convert", Some(&creator.token), Some(json!({ "gpId": gp_id, "action": "vote", "vote": "yes" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .call("POST", "/gp/convert", Some(&outsider.token), Some(json!({ "gpId": gp_id, "action": "vote", "vote": "yes" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, activity) = app
            .call("POST", "/gp/activity", Some(&creator.token), Some(json!({ "gpId": gp_id, "messageCount": 12 })))
            .await;
        assert_eq!(activity["isPermanentConversionEligible"], false);
    }

    fn stamp(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    async fn seed(app: &TestApp, sql: String) {
        app.state.db.lock().await.conn().execute(&sql, []).unwrap();
    }

    #[tokio::test]
    async fn test_conversion_status_shows_tally_and_own_vote() {
        let app = TestApp::new();
        let creator = located(&app, "creator").await;
        let b = located(&app, "b").await;
        let c = located(&app, "c").await;
        let outsider = app.register("outsider").await;

        let (_, created) = app
            .call("POST", "/gp", Some(&creator.token), Some(draft("Vibe GP")))
            .await;
        let gp_id = created["gp"]["id"].as_str().unwrap().to_string();
        for user in [&b, &c] {
            app.call("POST", "/gp/join", Some(&user.token), Some(json!({ "gpId": gp_id })))
                .await;
        }
        let status_uri = format!("/gp/convert?gpId={gp_id}");

        let (status, before) = app.call("GET", &status_uri, Some(&b.token), None).await;
        assert_eq!(status, StatusCode::OK, "{before}");
        assert_eq!(before["isEligible"], false);
        assert_eq!(before["userVote"], Value::Null);
        assert_eq!(before["isPermanent"], false);

        seed(
            &app,
            format!(
                "UPDATE group_plans SET message_count = 12, first_message_at = '{}'
                 WHERE id = '{gp_id}'",
                stamp(Utc::now() - Duration::hours(1))
            ),
        )
        .await;
        let (status, _) = app
            .call("POST", "/gp/convert", Some(&b.token), Some(json!({ "gpId": gp_id, "action": "check" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app
            .call("POST", "/gp/convert", Some(&b.token), Some(json!({ "gpId": gp_id, "action": "vote", "vote": "yes" })))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, after) = app.call("GET", &status_uri, Some(&b.token), None).await;
        assert_eq!(after["isEligible"], true);
        assert_eq!(after["isConversionEligible"], true);
        assert_eq!(after["userVote"], "yes");
        assert_eq!(after["voteResult"]["yesVotes"], 1);
        assert_eq!(after["voteResult"]["totalMembers"], 3);
        assert_eq!(after["voteResult"]["approved"], false);

        let (_, theirs) = app.call("GET", &status_uri, Some(&outsider.token), None).await;
        assert_eq!(theirs["userVote"], Value::Null);

        let (status, _) = app.call("GET", "/gp/convert?gpId=nope", Some(&b.token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let missing = format!("/gp/convert?gpId={}", vibesync_shared::GpId::new());
        let (status, _) = app.call("GET", &missing, Some(&b.token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sweep_expires_and_fails_once() {
        let app = TestApp::new();
        let a = located(&app, "a").await;
        let b = located(&app, "b").await;

        let (_, stale) = app.call("POST", "/gp", Some(&a.token), Some(draft("Movie GP"))).await;
        let (_, empty) = app.call("POST", "/gp", Some(&b.token), Some(draft("Anime GP"))).await;
        let stale_id = stale["gp"]["id"].as_str().unwrap().to_string();
        let empty_id = empty["gp"]["id"].as_str().unwrap().to_string();

        seed(
            &app,
            format!(
                "UPDATE group_plans SET expires_at = '{}' WHERE id = '{stale_id}'",
                stamp(Utc::now() - Duration::minutes(1))
            ),
        )
        .await;
        seed(&app, format!("UPDATE group_plans SET member_count = 0 WHERE id = '{empty_id}'")).await;

        let (status, first) = app.call("POST", "/gp/expire", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!((first["expiredCount"].as_u64(), first["failedCount"].as_u64()), (Some(1), Some(1)));

        let (_, second) = app.call("POST", "/gp/expire", None, None).await;
        assert_eq!((second["expiredCount"].as_u64(), second["failedCount"].as_u64()), (Some(0), Some(0)));

        let (_, mine) = app.call("GET", "/gp/mine", Some(&a.token), None).await;
        assert!(mine["gps"].as_array().unwrap().is_empty());
    }
}
