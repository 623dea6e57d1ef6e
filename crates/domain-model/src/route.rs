use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteProvider {
    #[serde(rename = "ORS")]
    Ors,
    #[serde(rename = "HERE")]
    Here,
    #[serde(rename = "Google")]
    Google,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub route_id: String,
    pub distance_mi: f64,
    pub duration_seconds: f64,
    pub estimated_arrival: DateTime<Utc>,
    pub waypoints: Vec<geo_core::GeoPoint>,
    /// `[lon, lat]` pairs, matching `geo_core::Polygon`'s vertex order.
    pub geometry: Vec<[f64; 2]>,
    pub safety_score: f64,
    pub is_fastest: bool,
    pub is_safest: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_shortest: Option<bool>,
    #[serde(default)]
    pub is_baseline: bool,
    pub intersects_disasters: bool,
    pub disasters_nearby: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_disaster_distance_mi: Option<f64>,
    pub provider: RouteProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
