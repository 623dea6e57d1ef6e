//! Read-only pass-through of cached public feeds (spec.md §6.1).

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use domain_model::DisasterEvent;
use feed_cache::FeedType;

use crate::state::AppState;

const CACHE_CONTROL_5MIN: &str = "public, max-age=300";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/public-data/wildfires", get(wildfires))
        .route("/public-data/weather-alerts", get(weather_alerts))
        .route("/public-data/all", get(all))
}

async fn wildfires(State(state): State<AppState>) -> impl IntoResponse {
    let data = state.feed_cache.get_cached_data(FeedType::NasaFirms).await;
    with_cache_header(data)
}

async fn weather_alerts(State(state): State<AppState>) -> impl IntoResponse {
    let data = state.feed_cache.get_cached_data(FeedType::Noaa).await;
    with_cache_header(data)
}

async fn all(State(state): State<AppState>) -> impl IntoResponse {
    let mut data = Vec::new();
    for feed_type in FeedType::all() {
        data.extend(state.feed_cache.get_cached_data(feed_type).await);
    }
    with_cache_header(data)
}

fn with_cache_header(data: Vec<DisasterEvent>) -> impl IntoResponse {
    ([(header::CACHE_CONTROL, CACHE_CONTROL_5MIN)], Json(data))
}
