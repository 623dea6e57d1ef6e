//! Disaster-aware routing providers, per spec.md §4.8/§6.3. One trait, three
//! concrete shapes: a primary (ORS-like polygon-avoidance provider), a
//! fallback (HERE-like polygon-avoidance provider with a tighter request-size
//! limit), and a baseline provider that never avoids anything (used to
//! compute the "what would the unprotected route have been" comparison).

use async_trait::async_trait;
use geo_core::{GeoPoint, Polygon};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub avoid_polygons: Vec<Polygon>,
    /// Desired alternate-route count, 1-3 (spec.md §4.8.2). Providers honor
    /// this on a best-effort basis and may return fewer than requested.
    pub alternatives: u8,
}

#[derive(Debug, Clone)]
pub struct ProviderRoute {
    pub distance_mi: f64,
    pub duration_seconds: f64,
    /// (lon, lat) pairs, matching `geo_core::Polygon`'s vertex order.
    pub geometry: Vec<[f64; 2]>,
}

#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("no routable path found")]
    NoRoute,
    #[error("avoidance polygon set exceeds provider limit ({0} polygons)")]
    TooManyPolygons(usize),
    #[error("request exceeds provider URI size limit")]
    RequestTooLarge,
    #[error("routing provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait RoutingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Hard cap on avoidance polygons this provider's API accepts in one
    /// request. The route service trims to this before calling.
    fn max_polygons(&self) -> usize;

    /// Returns one route per alternate the provider was able to produce,
    /// in no particular order. Always at least one route on `Ok`.
    async fn route(&self, request: &RouteRequest) -> Result<Vec<ProviderRoute>, RoutingError>;
}

fn polygon_to_wkt_like(polygons: &[Polygon]) -> String {
    polygons
        .iter()
        .map(|p| {
            let coords = p
                .rings
                .iter()
                .map(|[lon, lat]| format!("{lon},{lat}"))
                .collect::<Vec<_>>()
                .join(";");
            format!("({coords})")
        })
        .collect::<Vec<_>>()
        .join("|")
}

/// OpenRouteService-shaped client, used as the primary provider.
pub struct OpenRouteServiceProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenRouteServiceProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openrouteservice.org/v2/directions/driving-car/geojson".to_string(),
        }
    }
}

#[async_trait]
impl RoutingProvider for OpenRouteServiceProvider {
    fn name(&self) -> &'static str {
        "openrouteservice"
    }

    fn max_polygons(&self) -> usize {
        50
    }

    async fn route(&self, request: &RouteRequest) -> Result<Vec<ProviderRoute>, RoutingError> {
        if request.avoid_polygons.len() > self.max_polygons() {
            return Err(RoutingError::TooManyPolygons(request.avoid_polygons.len()));
        }

        let avoid_geojson = serde_json::json!({
            "type": "MultiPolygon",
            "coordinates": request.avoid_polygons.iter().map(|p| vec![p.rings.clone()]).collect::<Vec<_>>(),
        });

        let target_count = request.alternatives.clamp(1, 3);
        let mut options = serde_json::Map::new();
        if !request.avoid_polygons.is_empty() {
            options.insert("avoid_polygons".to_string(), avoid_geojson);
        }
        if target_count > 1 {
            options.insert(
                "alternative_routes".to_string(),
                serde_json::json!({ "target_count": target_count, "share_factor": 0.6 }),
            );
        }

        let body = serde_json::json!({
            "coordinates": [
                [request.origin.longitude, request.origin.latitude],
                [request.destination.longitude, request.destination.latitude],
            ],
            "options": if options.is_empty() { serde_json::Value::Null } else { serde_json::Value::Object(options) },
        });

        let resp = self
            .client
            .post(&self.base_url)
            .header("Authorization", &self.api_key)
            .json(&body)
            .timeout(std::time::Duration::from_secs(15))
            .send()
            .await
            .map_err(|e| RoutingError::Unavailable(e.to_string()))?;

        if resp.status().as_u16() == 414 {
            return Err(RoutingError::RequestTooLarge);
        }
        if !resp.status().is_success() {
            return Err(RoutingError::Unavailable(format!("status {}", resp.status())));
        }

        let parsed: OrsResponse = resp.json().await.map_err(|e| RoutingError::Unavailable(e.to_string()))?;
        if parsed.features.is_empty() {
            return Err(RoutingError::NoRoute);
        }

        Ok(parsed
            .features
            .into_iter()
            .take(target_count as usize)
            .map(|feature| ProviderRoute {
                distance_mi: feature.properties.summary.distance / 1609.344,
                duration_seconds: feature.properties.summary.duration,
                geometry: feature.geometry.coordinates,
            })
            .collect())
    }
}

/// HERE-shaped client, used as the fallback provider when the primary fails
/// or rejects the request as too large. HERE's request URI limit is tighter,
/// hence the lower `max_polygons`.
pub struct HereRoutingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl HereRoutingProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://router.hereapi.com/v8/routes".to_string(),
        }
    }
}

#[async_trait]
impl RoutingProvider for HereRoutingProvider {
    fn name(&self) -> &'static str {
        "here"
    }

    fn max_polygons(&self) -> usize {
        20
    }

    async fn route(&self, request: &RouteRequest) -> Result<Vec<ProviderRoute>, RoutingError> {
        if request.avoid_polygons.len() > self.max_polygons() {
            return Err(RoutingError::TooManyPolygons(request.avoid_polygons.len()));
        }

        let avoid_areas = polygon_to_wkt_like(&request.avoid_polygons);
        let target_count = request.alternatives.clamp(1, 3);

        let mut query = vec![
            ("transportMode".to_string(), "car".to_string()),
            (
                "origin".to_string(),
                format!("{},{}", request.origin.latitude, request.origin.longitude),
            ),
            (
                "destination".to_string(),
                format!("{},{}", request.destination.latitude, request.destination.longitude),
            ),
            ("return".to_string(), "summary,polyline".to_string()),
            ("apiKey".to_string(), self.api_key.clone()),
        ];
        if !avoid_areas.is_empty() {
            query.push(("avoid[areas]".to_string(), avoid_areas));
        }
        if target_count > 1 {
            // HERE's `alternatives` param counts routes in addition to the primary.
            query.push(("alternatives".to_string(), (target_count - 1).to_string()));
        }

        let url_len_estimate: usize = query.iter().map(|(k, v)| k.len() + v.len() + 2).sum();
        if url_len_estimate > 16_000 {
            return Err(RoutingError::RequestTooLarge);
        }

        let resp = self
            .client
            .get(&self.base_url)
            .query(&query)
            .timeout(std::time::Duration::from_secs(15))
            .send()
            .await
            .map_err(|e| RoutingError::Unavailable(e.to_string()))?;

        if resp.status().as_u16() == 414 {
            return Err(RoutingError::RequestTooLarge);
        }
        if !resp.status().is_success() {
            return Err(RoutingError::Unavailable(format!("status {}", resp.status())));
        }

        let parsed: HereResponse = resp.json().await.map_err(|e| RoutingError::Unavailable(e.to_string()))?;
        if parsed.routes.is_empty() {
            return Err(RoutingError::NoRoute);
        }

        let mut out = Vec::new();
        for route in parsed.routes.into_iter().take(target_count as usize) {
            let Some(section) = route.sections.into_iter().next() else { continue };
            out.push(ProviderRoute {
                distance_mi: section.summary.length as f64 / 1609.344,
                duration_seconds: section.summary.duration as f64,
                geometry: Vec::new(),
            });
        }
        if out.is_empty() {
            return Err(RoutingError::NoRoute);
        }
        Ok(out)
    }
}

/// Never avoids anything. Used by the route service to produce the baseline
/// comparison route alongside the avoidance-aware primary/fallback.
pub struct BaselineRoutingProvider {
    inner: OpenRouteServiceProvider,
}

impl BaselineRoutingProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            inner: OpenRouteServiceProvider::new(api_key),
        }
    }
}

#[async_trait]
impl RoutingProvider for BaselineRoutingProvider {
    fn name(&self) -> &'static str {
        "baseline"
    }

    fn max_polygons(&self) -> usize {
        0
    }

    async fn route(&self, request: &RouteRequest) -> Result<Vec<ProviderRoute>, RoutingError> {
        let unaided = RouteRequest {
            origin: request.origin.clone(),
            destination: request.destination.clone(),
            avoid_polygons: Vec::new(),
            alternatives: 1,
        };
        self.inner.route(&unaided).await
    }
}

#[derive(serde::Deserialize)]
struct OrsResponse {
    features: Vec<OrsFeature>,
}

#[derive(serde::Deserialize)]
struct OrsFeature {
    properties: OrsProperties,
    geometry: OrsGeometry,
}

#[derive(serde::Deserialize)]
struct OrsProperties {
    summary: OrsSummary,
}

#[derive(serde::Deserialize)]
struct OrsSummary {
    distance: f64,
    duration: f64,
}

#[derive(serde::Deserialize)]
struct OrsGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(serde::Deserialize)]
struct HereResponse {
    routes: Vec<HereRoute>,
}

#[derive(serde::Deserialize)]
struct HereRoute {
    sections: Vec<HereSection>,
}

#[derive(serde::Deserialize)]
struct HereSection {
    summary: HereSummary,
}

#[derive(serde::Deserialize)]
struct HereSummary {
    length: u64,
    duration: u64,
}
