//! Proximity alert scan/preferences/history (spec.md §6.1, §4.6).

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use domain_model::alerts::{AlertPreferences, MAX_ALERT_RADIUS_MI, MIN_ALERT_RADIUS_MI};
use geo_core::GeoPoint;
use proximity_alerts::{ScanRequest, ScanResult};
use serde::Deserialize;
use store::DocumentStoreExt;

use crate::error::ApiError;
use crate::rate_limit::Limit;
use crate::state::AppState;

use super::{check_rate_limit, client_key, optional_principal, require_principal};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/alerts/proximity", get(proximity))
        .route("/alerts/preferences", get(get_preferences).put(put_preferences))
        .route("/alerts/{alert_id}/acknowledge", post(acknowledge))
        .route("/alerts/history", get(history))
}

fn preferences_path(user_id: &str) -> String {
    format!("user_alert_preferences/{user_id}")
}

#[derive(Deserialize)]
struct ProximityQuery {
    lat: f64,
    lon: f64,
    radius_mi: f64,
}

async fn proximity(State(state): State<AppState>, headers: HeaderMap, Query(query): Query<ProximityQuery>) -> Result<Json<ScanResult>, ApiError> {
    let principal = optional_principal(&state, &headers).await?;
    let key = client_key(&headers, principal.as_ref());
    check_rate_limit(&state, "alerts_proximity_hourly", &key, Limit::per_hour(600)).await?;

    if !(MIN_ALERT_RADIUS_MI..=MAX_ALERT_RADIUS_MI).contains(&query.radius_mi) {
        return Err(ApiError::Validation(format!("radius_mi must be between {MIN_ALERT_RADIUS_MI} and {MAX_ALERT_RADIUS_MI}")));
    }
    if !(-90.0..=90.0).contains(&query.lat) || !(-180.0..=180.0).contains(&query.lon) {
        return Err(ApiError::Validation("invalid lat/lon".to_string()));
    }

    let scan = state
        .proximity_alerts
        .scan(&ScanRequest {
            location: GeoPoint::new(query.lat, query.lon),
            radius_mi: query.radius_mi,
            severity_filter: None,
            disaster_types: None,
        })
        .await;

    if let Some(principal) = principal {
        let prefs = state
            .store
            .get_typed::<AlertPreferences>(&preferences_path(&principal.user_id))
            .await?
            .unwrap_or_default();
        let _ = state
            .proximity_alerts
            .materialize_notifications(&principal.user_id, &scan.alerts, &prefs.quiet_hours, Utc::now())
            .await?;
    }

    Ok(Json(scan))
}

async fn get_preferences(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<AlertPreferences>, ApiError> {
    let principal = require_principal(&state, &headers).await?;
    check_rate_limit(&state, "alerts_preferences_hourly", &principal.user_id, Limit::per_hour(100)).await?;
    let prefs = state.store.get_typed::<AlertPreferences>(&preferences_path(&principal.user_id)).await?.unwrap_or_default();
    Ok(Json(prefs))
}

async fn put_preferences(State(state): State<AppState>, headers: HeaderMap, Json(mut prefs): Json<AlertPreferences>) -> Result<Json<AlertPreferences>, ApiError> {
    let principal = require_principal(&state, &headers).await?;
    check_rate_limit(&state, "alerts_preferences_20min", &principal.user_id, Limit::per_minutes(20, 60)).await?;
    prefs.clamp_radius();
    state.store.set_typed(&preferences_path(&principal.user_id), &prefs).await?;
    Ok(Json(prefs))
}

async fn acknowledge(State(state): State<AppState>, headers: HeaderMap, Path(alert_id): Path<String>) -> Result<Json<serde_json::Value>, ApiError> {
    let principal = require_principal(&state, &headers).await?;
    check_rate_limit(&state, "alerts_ack_hourly", &principal.user_id, Limit::per_hour(100)).await?;
    let acknowledged = state.proximity_alerts.acknowledge(&principal.user_id, &alert_id, Utc::now()).await?;
    if !acknowledged {
        return Err(ApiError::NotFound(format!("notification {alert_id}")));
    }
    Ok(Json(serde_json::json!({ "status": "acknowledged" })))
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn history(State(state): State<AppState>, headers: HeaderMap, Query(query): Query<HistoryQuery>) -> Result<Json<Vec<domain_model::alerts::Notification>>, ApiError> {
    let principal = require_principal(&state, &headers).await?;
    check_rate_limit(&state, "alerts_history_hourly", &principal.user_id, Limit::per_hour(100)).await?;
    let limit = query.limit.unwrap_or(50).min(200);
    let mut notifications = state.proximity_alerts.list_notifications(&principal.user_id, Utc::now()).await;
    notifications.truncate(limit);
    Ok(Json(notifications))
}
