//! Disaster-aware route planning (spec.md §1 "disaster-aware route
//! planning" query surface, §4.8). Supplements the distilled HTTP table,
//! which named the feature in scope but omitted its route; returns 503 when
//! no routing provider was configured at startup (`ORS_API_KEY` unset).

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use domain_model::route::Route;
use geo_core::GeoPoint;
use serde::Deserialize;

use crate::error::ApiError;
use crate::rate_limit::Limit;
use crate::state::AppState;

use super::{check_rate_limit, client_key, optional_principal};

pub fn router() -> Router<AppState> {
    Router::new().route("/routes/calculate", get(calculate))
}

#[derive(Deserialize)]
struct CalculateQuery {
    origin_lat: f64,
    origin_lon: f64,
    destination_lat: f64,
    destination_lon: f64,
    alternatives: Option<u8>,
}

async fn calculate(State(state): State<AppState>, headers: HeaderMap, Query(query): Query<CalculateQuery>) -> Result<Json<Vec<Route>>, ApiError> {
    let principal = optional_principal(&state, &headers).await?;
    let key = client_key(&headers, principal.as_ref());
    check_rate_limit(&state, "routes_calculate_hourly", &key, Limit::per_hour(120)).await?;

    let routes = state.routes.as_ref().ok_or_else(|| ApiError::Unavailable("route service not configured".to_string()))?;
    let result = routes
        .calculate_routes(
            GeoPoint::new(query.origin_lat, query.origin_lon),
            GeoPoint::new(query.destination_lat, query.destination_lon),
            query.alternatives.unwrap_or(1).clamp(1, 3),
        )
        .await?;

    Ok(Json(result))
}
