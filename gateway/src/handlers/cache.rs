//! Admin feed-cache introspection/maintenance (spec.md §6.1, §4.1).

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use feed_cache::FeedType;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

use super::require_principal;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cache/status", get(status))
        .route("/cache/clear", post(clear))
        .route("/cache/refresh", post(refresh))
}

#[derive(Serialize)]
struct FeedStatus {
    feed: &'static str,
    last_updated: Option<chrono::DateTime<chrono::Utc>>,
    count: usize,
    status: feed_cache::CacheStatus,
}

async fn status(State(state): State<AppState>) -> Json<Vec<FeedStatus>> {
    let mut out = Vec::new();
    for feed_type in FeedType::all() {
        let meta = state.feed_cache.status(feed_type).await;
        out.push(FeedStatus {
            feed: feed_type.as_str(),
            last_updated: meta.last_updated,
            count: meta.count,
            status: meta.status,
        });
    }
    Json(out)
}

async fn clear(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    let principal = require_principal(&state, &headers).await?;
    if !state.is_admin(&principal.user_id) {
        return Err(ApiError::Forbidden("admin only".to_string()));
    }
    for feed_type in FeedType::all() {
        state.feed_cache.clear(feed_type).await?;
    }
    Ok(Json(serde_json::json!({ "status": "cleared" })))
}

async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    let principal = require_principal(&state, &headers).await?;
    if !state.is_admin(&principal.user_id) {
        return Err(ApiError::Forbidden("admin only".to_string()));
    }
    for feed_type in FeedType::all() {
        state.feed_cache.clear(feed_type).await?;
    }
    Ok(Json(serde_json::json!({ "status": "refresh_requested" })))
}
