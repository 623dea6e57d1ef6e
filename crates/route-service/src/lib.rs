//! Route Service (spec.md §4.8): disaster-buffer avoidance polygons,
//! primary/fallback/baseline provider orchestration, and safety scoring.

use chrono::{DateTime, Utc};
use domain_model::event::{DisasterType, Severity};
use domain_model::route::{Route, RouteProvider as RouteProviderKind};
use domain_model::DisasterEvent;
use external_services::routing::{ProviderRoute, RouteRequest, RoutingError, RoutingProvider};
use feed_cache::{FeedCacheManager, FeedType};
use geo_core::{BoundingBox, GeoPoint, Polygon};
use std::sync::Arc;
use store::{DocumentStore, DocumentStoreExt};
use thiserror::Error;

/// ~50 km, spec.md §4.8.1's padding around the origin-destination pair.
const BBOX_PADDING_MI: f64 = 31.0;
const ACTIVE_WINDOW_HOURS: i64 = 48;
const NEARBY_THREAT_RADIUS_MI: f64 = 6.2;
const ROUTE_SAMPLE_POINTS: usize = 24;

#[derive(Error, Debug)]
pub enum RouteServiceError {
    #[error("invalid coordinates")]
    InvalidCoordinates,
    #[error("no routing provider produced a route")]
    NoRoute,
    #[error("document store error: {0}")]
    Store(#[from] store::StoreError),
}

fn buffer_radius_mi(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 5.0,
        Severity::High => 3.0,
        Severity::Medium => 2.0,
        Severity::Low => 1.0,
    }
}

fn is_candidate_type(disaster_type: DisasterType, severity: Severity) -> bool {
    match disaster_type {
        DisasterType::Wildfire | DisasterType::Earthquake | DisasterType::Flood | DisasterType::Hurricane | DisasterType::Tornado | DisasterType::Volcano => true,
        DisasterType::WeatherAlert => matches!(severity, Severity::High | Severity::Critical),
        DisasterType::Drought | DisasterType::Other => false,
    }
}

struct Candidate {
    id: String,
    disaster_type: DisasterType,
    severity: Severity,
    location: GeoPoint,
}

pub struct RouteService {
    store: Arc<dyn DocumentStore>,
    feed_cache: Arc<FeedCacheManager>,
    primary: Arc<dyn RoutingProvider>,
    fallback: Arc<dyn RoutingProvider>,
    baseline: Arc<dyn RoutingProvider>,
}

impl RouteService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        feed_cache: Arc<FeedCacheManager>,
        primary: Arc<dyn RoutingProvider>,
        fallback: Arc<dyn RoutingProvider>,
        baseline: Arc<dyn RoutingProvider>,
    ) -> Self {
        Self { store, feed_cache, primary, fallback, baseline }
    }

    async fn active_candidates(&self, bbox: BoundingBox, now: DateTime<Utc>) -> Vec<Candidate> {
        let cutoff = now - chrono::Duration::hours(ACTIVE_WINDOW_HOURS);
        let mut candidates = Vec::new();

        for feed_type in FeedType::all() {
            for event in self.feed_cache.get_cached_data(feed_type).await {
                push_if_active(&mut candidates, &event, bbox, cutoff);
            }
        }

        let reports = self.store.list_prefix("reports/").await.unwrap_or_default();
        for (_, v) in reports {
            if let Ok(report) = serde_json::from_value::<domain_model::UserReport>(v) {
                push_if_active(&mut candidates, &report.event, bbox, cutoff);
            }
        }

        candidates
    }

    /// Builds avoidance polygons per spec.md §4.8.1, applying the
    /// origin-exclusion invariant: a polygon containing the origin is
    /// omitted so an evacuating user still gets routed out.
    fn build_polygons(candidates: &[Candidate], origin: GeoPoint) -> Vec<(Polygon, &Candidate)> {
        candidates
            .iter()
            .filter_map(|c| {
                let polygon = Polygon::circle(c.location, buffer_radius_mi(c.severity));
                if polygon.contains(origin) {
                    None
                } else {
                    Some((polygon, c))
                }
            })
            .collect()
    }

    /// Caps the polygon list to `max` entries, keeping the most severe and
    /// nearest-to-route first, logging what was dropped (spec.md §4.11 —
    /// no silent truncation).
    fn cap_polygons(mut polygons: Vec<(Polygon, &Candidate)>, origin: GeoPoint, destination: GeoPoint, max: usize) -> Vec<Polygon> {
        if polygons.len() <= max {
            return polygons.into_iter().map(|(p, _)| p).collect();
        }
        let midpoint = GeoPoint::new((origin.latitude + destination.latitude) / 2.0, (origin.longitude + destination.longitude) / 2.0);
        polygons.sort_by(|(_, a), (_, b)| {
            b.severity.cmp(&a.severity).then_with(|| {
                let da = midpoint.distance_mi(&a.location);
                let db = midpoint.distance_mi(&b.location);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
        });
        let dropped = polygons.len() - max;
        tracing::warn!(dropped, kept = max, "disaster list exceeds provider polygon cap, dropping least severe/nearest");
        polygons.into_iter().take(max).map(|(p, _)| p).collect()
    }

    pub async fn calculate_routes(&self, origin: GeoPoint, destination: GeoPoint, alternatives: u8) -> Result<Vec<Route>, RouteServiceError> {
        if !origin.is_valid() || !destination.is_valid() {
            return Err(RouteServiceError::InvalidCoordinates);
        }
        let alternatives = alternatives.clamp(1, 3);

        let now = Utc::now();
        let bbox = BoundingBox::around_pair(origin, destination, BBOX_PADDING_MI);
        let candidates = self.active_candidates(bbox, now).await;
        let polygons_with_source = Self::build_polygons(&candidates, origin);

        let primary_polygons = Self::cap_polygons(polygons_with_source.iter().map(|(p, c)| (p.clone(), *c)).collect(), origin, destination, self.primary.max_polygons());

        // Baseline is requested in parallel with primary, not after — its
        // result is needed regardless of whether avoidance succeeds
        // (spec.md §4.11).
        let primary_request = RouteRequest { origin, destination, avoid_polygons: primary_polygons.clone(), alternatives };
        let baseline_request = RouteRequest { origin, destination, avoid_polygons: Vec::new(), alternatives: 1 };

        let (primary_result, baseline_result) = tokio::join!(self.primary.route(&primary_request), self.baseline.route(&baseline_request));

        let mut routes = Vec::new();

        match primary_result {
            Ok(provider_routes) => routes.extend(provider_routes.into_iter().map(|r| (r, RouteProviderKind::Ors, None, false))),
            Err(e) => {
                tracing::warn!(provider = self.primary.name(), error = %e, "primary routing provider failed, trying fallback");
                match self.try_fallback(origin, destination, &polygons_with_source, alternatives).await {
                    Ok((fallback_routes, warning)) => {
                        routes.extend(fallback_routes.into_iter().map(|r| (r, RouteProviderKind::Here, warning.clone(), false)))
                    }
                    Err(e) => tracing::warn!(provider = self.fallback.name(), error = %e, "fallback routing provider also failed"),
                }
            }
        }

        if let Ok(mut baseline_routes) = baseline_result {
            // `BaselineRoutingProvider` calls through to ORS with an empty
            // avoidance set, so it's honestly tagged as the same vendor. Only
            // one baseline comparison route is kept regardless of how many
            // the provider returned.
            if let Some(baseline_route) = baseline_routes.drain(..1).next() {
                routes.push((baseline_route, RouteProviderKind::Ors, None, true));
            }
        }

        if routes.is_empty() {
            return Err(RouteServiceError::NoRoute);
        }

        let direct_distance_mi = origin.distance_mi(&destination);
        let mut normalized: Vec<Route> = routes
            .into_iter()
            .enumerate()
            .map(|(i, (provider_route, provider_kind, warning, is_baseline))| {
                normalize_route(i, provider_route, provider_kind, warning, is_baseline, &candidates, direct_distance_mi, origin, destination, now)
            })
            .collect();

        mark_best(&mut normalized);
        Ok(normalized)
    }

    async fn try_fallback(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        polygons_with_source: &[(Polygon, &Candidate)],
        alternatives: u8,
    ) -> Result<(Vec<ProviderRoute>, Option<String>), RoutingError> {
        let fallback_polygons = Self::cap_polygons(polygons_with_source.iter().map(|(p, c)| (p.clone(), *c)).collect(), origin, destination, self.fallback.max_polygons());

        let request = RouteRequest { origin, destination, avoid_polygons: fallback_polygons, alternatives };
        match self.fallback.route(&request).await {
            Ok(routes) => Ok((routes, None)),
            Err(RoutingError::RequestTooLarge) => {
                let bare_request = RouteRequest { origin, destination, avoid_polygons: Vec::new(), alternatives };
                let routes = self.fallback.route(&bare_request).await?;
                Ok((routes, Some("avoidance polygons omitted: request exceeded provider size limit".to_string())))
            }
            Err(e) => Err(e),
        }
    }
}

fn push_if_active(candidates: &mut Vec<Candidate>, event: &DisasterEvent, bbox: BoundingBox, cutoff: DateTime<Utc>) {
    if event.timestamp < cutoff {
        return;
    }
    if !is_candidate_type(event.disaster_type, event.severity) {
        return;
    }
    let point = GeoPoint::new(event.latitude, event.longitude);
    if !bbox.contains(point) {
        return;
    }
    candidates.push(Candidate { id: event.id.clone(), disaster_type: event.disaster_type, severity: event.severity, location: point });
}

/// Route geometry sample points for the safety-score distance checks; falls
/// back to a straight-line sample when the provider returned no geometry
/// (the HERE-shaped client above doesn't parse a polyline today).
fn route_sample_points(provider_route: &ProviderRoute, origin: GeoPoint, destination: GeoPoint) -> Vec<GeoPoint> {
    if !provider_route.geometry.is_empty() {
        return provider_route.geometry.iter().map(|[lon, lat]| GeoPoint::new(*lat, *lon)).collect();
    }
    (0..=ROUTE_SAMPLE_POINTS)
        .map(|i| {
            let t = i as f64 / ROUTE_SAMPLE_POINTS as f64;
            GeoPoint::new(origin.latitude + (destination.latitude - origin.latitude) * t, origin.longitude + (destination.longitude - origin.longitude) * t)
        })
        .collect()
}

fn min_distance_to_path(path: &[GeoPoint], target: GeoPoint) -> f64 {
    path.iter().map(|p| p.distance_mi(&target)).fold(f64::MAX, f64::min)
}

/// Safety score per spec.md §4.8.3: weighted sum of minimum distance (50%),
/// nearby count within 6.2 mi (30%), and deviation from the direct
/// haversine distance (20%).
fn safety_score(route_distance_mi: f64, direct_distance_mi: f64, min_distance: Option<f64>, nearby_count: u32) -> f64 {
    let distance_factor = min_distance.map(|d| 100.0 * (1.0 - (-d / 6.2_f64).exp())).unwrap_or(100.0);
    let nearby_factor = (100.0 - 15.0 * nearby_count as f64).max(0.0);

    let ratio = if direct_distance_mi > 0.0 { route_distance_mi / direct_distance_mi } else { 1.0 };
    let deviation_factor = if ratio <= 1.1 { 100.0 } else { (100.0 - (ratio - 1.1) * 100.0).max(0.0) };

    let score = distance_factor * 0.5 + nearby_factor * 0.3 + deviation_factor * 0.2;
    (score * 10.0).round() / 10.0
}

#[allow(clippy::too_many_arguments)]
fn normalize_route(
    index: usize,
    provider_route: ProviderRoute,
    provider_kind: RouteProviderKind,
    warning: Option<String>,
    is_baseline: bool,
    candidates: &[Candidate],
    direct_distance_mi: f64,
    origin: GeoPoint,
    destination: GeoPoint,
    now: DateTime<Utc>,
) -> Route {
    let sample_points = route_sample_points(&provider_route, origin, destination);

    let mut min_distance: Option<f64> = None;
    let mut nearby_count = 0u32;
    let mut intersects = false;

    for candidate in candidates {
        let d = min_distance_to_path(&sample_points, candidate.location);
        min_distance = Some(min_distance.map_or(d, |m: f64| m.min(d)));
        if d <= NEARBY_THREAT_RADIUS_MI {
            nearby_count += 1;
        }
        let polygon = Polygon::circle(candidate.location, buffer_radius_mi(candidate.severity));
        if polygon.intersects_path(&sample_points) {
            intersects = true;
        }
    }

    let safety_score = safety_score(provider_route.distance_mi, direct_distance_mi, min_distance, nearby_count);

    Route {
        route_id: format!("route:{index}:{}", now.timestamp_millis()),
        distance_mi: provider_route.distance_mi,
        duration_seconds: provider_route.duration_seconds,
        estimated_arrival: now + chrono::Duration::seconds(provider_route.duration_seconds as i64),
        waypoints: vec![origin, destination],
        geometry: provider_route.geometry,
        safety_score,
        is_fastest: false,
        is_safest: false,
        is_shortest: if is_baseline { Some(true) } else { None },
        is_baseline,
        intersects_disasters: intersects,
        disasters_nearby: nearby_count,
        min_disaster_distance_mi: min_distance,
        provider: provider_kind,
        warning,
    }
}

fn mark_best(routes: &mut [Route]) {
    if let Some(fastest_idx) = routes.iter().enumerate().min_by(|(_, a), (_, b)| a.duration_seconds.partial_cmp(&b.duration_seconds).unwrap_or(std::cmp::Ordering::Equal)).map(|(i, _)| i) {
        routes[fastest_idx].is_fastest = true;
    }
    if let Some(safest_idx) = routes.iter().enumerate().max_by(|(_, a), (_, b)| a.safety_score.partial_cmp(&b.safety_score).unwrap_or(std::cmp::Ordering::Equal)).map(|(i, _)| i) {
        routes[safest_idx].is_safest = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubProvider {
        name: &'static str,
        max_polygons: usize,
        distance_mi: f64,
        duration_seconds: f64,
    }

    #[async_trait]
    impl RoutingProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.name
        }
        fn max_polygons(&self) -> usize {
            self.max_polygons
        }
        async fn route(&self, _request: &RouteRequest) -> Result<Vec<ProviderRoute>, RoutingError> {
            Ok(vec![ProviderRoute { distance_mi: self.distance_mi, duration_seconds: self.duration_seconds, geometry: Vec::new() }])
        }
    }

    #[tokio::test]
    async fn calculates_primary_and_baseline_routes() {
        let store = Arc::new(store::InMemoryStore::default());
        let feed_cache = Arc::new(FeedCacheManager::new(store.clone()));
        let primary = Arc::new(StubProvider { name: "ors", max_polygons: 50, distance_mi: 12.0, duration_seconds: 900.0 });
        let fallback = Arc::new(StubProvider { name: "here", max_polygons: 20, distance_mi: 13.0, duration_seconds: 950.0 });
        let baseline = Arc::new(StubProvider { name: "baseline", max_polygons: 0, distance_mi: 10.0, duration_seconds: 800.0 });

        let service = RouteService::new(store, feed_cache, primary, fallback, baseline);
        let routes = service.calculate_routes(GeoPoint::new(34.05, -118.25), GeoPoint::new(34.10, -118.30), 2).await.unwrap();

        assert_eq!(routes.len(), 2);
        assert!(routes.iter().any(|r| r.is_shortest == Some(true)));
        assert!(routes.iter().any(|r| r.is_fastest));
        assert!(routes.iter().any(|r| r.is_safest));
    }

    #[test]
    fn safety_score_penalizes_close_and_numerous_disasters() {
        let close = safety_score(10.0, 10.0, Some(1.0), 5);
        let far = safety_score(10.0, 10.0, Some(50.0), 0);
        assert!(far > close);
    }

    #[test]
    fn origin_inside_polygon_is_excluded() {
        let origin = GeoPoint::new(34.05, -118.25);
        let candidates = vec![Candidate { id: "x".to_string(), disaster_type: DisasterType::Wildfire, severity: Severity::Critical, location: origin }];
        let polygons = RouteService::build_polygons(&candidates, origin);
        assert!(polygons.is_empty());
    }
}
