use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde_json::json;

use super::{AppState, x_cache};
use crate::cache::ResultsCache;
use crate::error::PollError;
use crate::models::{BulkRequest, PollResults, VoteRequest};
use crate::tally::bulk;

// POST /api/poll: validates and records one vote, returns the updated
// aggregate.
pub async fn cast_vote(
    State(state): State<AppState>,
    Json(req): Json<VoteRequest>,
) -> Result<Json<PollResults>, PollError> {
    if req.poll_id.is_empty() {
        return Err(PollError::MissingParam("pollId"));
    }
    if req.option.is_empty() {
        return Err(PollError::MissingParam("option"));
    }

    let results = state.store.vote(&req.poll_id, &req.option).await?;
    Ok(Json(results))
}

// POST /api/poll/vote is the cookie-marking variant: a per-poll cookie marks
// the browser as having voted, and a repeat submission is rejected with 409.
pub async fn cast_vote_with_cookie(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<VoteRequest>,
) -> Result<(CookieJar, Json<PollResults>), PollError> {
    if req.poll_id.is_empty() {
        return Err(PollError::MissingParam("poll_id"));
    }
    if req.option.is_empty() {
        return Err(PollError::MissingParam("option"));
    }

    let cookie_name = format!("voted_{}", req.poll_id);
    if jar.get(&cookie_name).is_some() {
        return Err(PollError::AlreadyVoted);
    }

    let results = state.store.vote(&req.poll_id, &req.option).await?;

    let mut cookie = Cookie::new(cookie_name, "1");
    cookie.set_path("/");
    Ok((jar.add(cookie), Json(results)))
}

// POST /api/poll/results/bulk: result sets for many poll ids in one round
// trip, served from the short-TTL cache when the same id set was computed
// recently.
pub async fn bulk_results(State(state): State<AppState>, Json(req): Json<BulkRequest>) -> Response {
    let key = ResultsCache::key(&req.ids);

    let hit = state.results_cache.lock().unwrap().get(&key);
    if let Some(cached) = hit {
        return (
            [
                (header::CONTENT_TYPE, "application/json"),
                (x_cache(), "HIT"),
            ],
            cached.body,
        )
            .into_response();
    }

    let data = bulk::resolve_bulk(Arc::clone(&state.store), &req.ids).await;
    let body = serde_json::to_vec(&json!({ "data": data }))
        .unwrap_or_else(|_| br#"{"data":{}}"#.to_vec());

    state
        .results_cache
        .lock()
        .unwrap()
        .insert(key, body.clone());

    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (x_cache(), "MISS"),
        ],
        body,
    )
        .into_response()
}
