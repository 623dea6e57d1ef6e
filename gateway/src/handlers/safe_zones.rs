//! Safe-zone lookup + threat check (spec.md §1 "safe-zone lookup" query
//! surface, §4.7). Supplements the distilled HTTP table, which named the
//! feature in scope but omitted its route.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use domain_model::event::{DisasterType, Severity};
use domain_model::safe_zone::SafeZoneType;
use feed_cache::FeedType;
use geo_core::GeoPoint;
use safe_zones::{NearestZone, ThreatCandidate, ZoneSafetyResult};
use serde::Deserialize;

use crate::error::ApiError;
use crate::rate_limit::Limit;
use crate::state::AppState;

use super::{check_rate_limit, client_key, optional_principal};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/safe-zones/nearby", get(nearby))
        .route("/safe-zones/{zone_id}/safety", get(safety))
}

fn parse_zone_type(raw: &str) -> Option<SafeZoneType> {
    match raw {
        "evacuation_center" => Some(SafeZoneType::EvacuationCenter),
        "hospital" => Some(SafeZoneType::Hospital),
        "fire_station" => Some(SafeZoneType::FireStation),
        "emergency_shelter" => Some(SafeZoneType::EmergencyShelter),
        "police_station" => Some(SafeZoneType::PoliceStation),
        "community_center" => Some(SafeZoneType::CommunityCenter),
        _ => None,
    }
}

#[derive(Deserialize)]
struct NearbyQuery {
    lat: f64,
    lon: f64,
    limit: Option<usize>,
    max_distance_mi: Option<f64>,
    zone_types: Option<String>,
    include_external: Option<bool>,
}

async fn nearby(State(state): State<AppState>, headers: HeaderMap, Query(query): Query<NearbyQuery>) -> Result<Json<Vec<NearestZone>>, ApiError> {
    let principal = optional_principal(&state, &headers).await?;
    let key = client_key(&headers, principal.as_ref());
    check_rate_limit(&state, "safe_zones_nearby_hourly", &key, Limit::per_hour(600)).await?;

    let zone_types = query
        .zone_types
        .as_deref()
        .map(|raw| raw.split(',').filter_map(parse_zone_type).collect::<Vec<_>>());

    let zones = state
        .safe_zones
        .get_nearest_safe_zones(
            GeoPoint::new(query.lat, query.lon),
            query.limit.unwrap_or(10).min(50),
            query.max_distance_mi.unwrap_or(25.0),
            zone_types.as_deref(),
            query.include_external.unwrap_or(false),
        )
        .await?;

    Ok(Json(zones))
}

#[derive(Deserialize)]
struct SafetyQuery {
    threat_radius_mi: Option<f64>,
}

async fn safety(State(state): State<AppState>, Path(zone_id): Path<String>, Query(query): Query<SafetyQuery>) -> Result<Json<ZoneSafetyResult>, ApiError> {
    let threat_radius_mi = query.threat_radius_mi.unwrap_or(3.1);
    let mut candidates = Vec::new();
    for feed_type in FeedType::all() {
        for event in state.feed_cache.get_cached_data(feed_type).await {
            if matches!(event.severity, Severity::High | Severity::Critical) || matches!(event.disaster_type, DisasterType::Earthquake | DisasterType::Wildfire) {
                candidates.push(ThreatCandidate {
                    id: event.id,
                    disaster_type: event.disaster_type,
                    severity: event.severity,
                    location: GeoPoint::new(event.latitude, event.longitude),
                });
            }
        }
    }

    let result = state.safe_zones.is_zone_safe(&zone_id, &candidates, threat_radius_mi).await?;
    Ok(Json(result))
}
