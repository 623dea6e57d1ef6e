//! Per-user map display settings (spec.md §6.1, §6.2).

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use domain_model::alerts::{MapSettings, MAX_ZOOM_RADIUS_MI, MIN_ZOOM_RADIUS_MI};
use store::DocumentStoreExt;

use crate::error::ApiError;
use crate::rate_limit::Limit;
use crate::state::AppState;

use super::{check_rate_limit, require_principal};

pub fn router() -> Router<AppState> {
    Router::new().route("/settings/map", get(get_map_settings).put(put_map_settings))
}

fn map_settings_path(user_id: &str) -> String {
    format!("user_map_settings/{user_id}")
}

async fn get_map_settings(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<MapSettings>, ApiError> {
    let principal = require_principal(&state, &headers).await?;
    check_rate_limit(&state, "settings_map_hourly", &principal.user_id, Limit::per_hour(100)).await?;
    let settings = state.store.get_typed::<MapSettings>(&map_settings_path(&principal.user_id)).await?.unwrap_or_default();
    Ok(Json(settings))
}

async fn put_map_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut settings): Json<MapSettings>,
) -> Result<Json<MapSettings>, ApiError> {
    let principal = require_principal(&state, &headers).await?;
    check_rate_limit(&state, "settings_map_20min", &principal.user_id, Limit::per_minutes(20, 60)).await?;
    settings.zoom_radius_mi = settings.zoom_radius_mi.clamp(MIN_ZOOM_RADIUS_MI, MAX_ZOOM_RADIUS_MI);
    state.store.set_typed(&map_settings_path(&principal.user_id), &settings).await?;
    Ok(Json(settings))
}
