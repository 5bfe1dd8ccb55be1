pub mod vote;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, HeaderName, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::cache::{ResultsCache, feed::FeedCache};
use crate::error::PollError;
use crate::registry::Registry;
use crate::store::VoteStore;

// Intermediaries may cache the feed for ten minutes and serve it stale for
// up to an hour while revalidating.
const FEED_CACHE_CONTROL: &str = "public, max-age=600, stale-while-revalidate=3600";

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub store: Arc<dyn VoteStore>,
    pub results_cache: Arc<Mutex<ResultsCache>>,
    pub feed: Arc<FeedCache>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/poll/all", get(all_polls))
        .route("/api/poll/by-tag", get(polls_by_tag))
        .route("/api/poll", get(poll_results).post(vote::cast_vote))
        .route("/api/poll/results/bulk", post(vote::bulk_results))
        .route("/api/poll/vote", post(vote::cast_vote_with_cookie))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// Full poll feed. Clients advertising gzip get the process-wide compressed
// buffer; everyone else gets identity JSON rendered fresh.
async fn all_polls(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if accepts_gzip(&headers) {
        let registry = Arc::clone(&state.registry);
        let body = state.feed.get_or_refresh(|| {
            serde_json::to_vec(&json!({ "polls": registry.active() }))
                .unwrap_or_else(|_| br#"{"polls":[]}"#.to_vec())
        });

        return (
            [
                (header::CONTENT_TYPE, "application/json"),
                (header::CONTENT_ENCODING, "gzip"),
                (header::CACHE_CONTROL, FEED_CACHE_CONTROL),
            ],
            body,
        )
            .into_response();
    }

    (
        [(header::CACHE_CONTROL, FEED_CACHE_CONTROL)],
        Json(json!({ "polls": state.registry.active() })),
    )
        .into_response()
}

async fn polls_by_tag(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, PollError> {
    let tag = params
        .get("tag")
        .or_else(|| params.get("slug"))
        .filter(|t| !t.is_empty())
        .ok_or(PollError::MissingParam("tag"))?;

    Ok(Json(json!({ "polls": state.registry.by_tag(tag) })))
}

// Single-poll results. Unknown ids read as an empty tally, not an error.
async fn poll_results(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, PollError> {
    let id = params
        .get("id")
        .filter(|id| !id.is_empty())
        .ok_or(PollError::MissingParam("id"))?;

    Ok(Json(state.store.results(id).await).into_response())
}

fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("gzip"))
}

pub(crate) fn x_cache() -> HeaderName {
    HeaderName::from_static("x-cache")
}
