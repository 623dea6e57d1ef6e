//! NOAA/NWS active alerts feed (`api.weather.gov/alerts/active`), JSON+GeoJSON.

use crate::common::{coordinates_valid, score_official_event, weather_alert_severity};
use crate::{AdapterError, FeedAdapter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use confidence_scorer::official::{IntensitySignal, OfficialCompleteness, WeatherAlertLevel};
use domain_model::event::{DisasterType, Source};
use domain_model::DisasterEvent;
use serde::Deserialize;

const NOAA_ACTIVE_ALERTS_URL: &str = "https://api.weather.gov/alerts/active";

#[derive(Debug, Deserialize)]
struct AlertsFeed {
    features: Vec<AlertFeature>,
}

#[derive(Debug, Deserialize)]
struct AlertFeature {
    properties: AlertProperties,
    geometry: Option<AlertGeometry>,
}

#[derive(Debug, Deserialize)]
struct AlertProperties {
    headline: Option<String>,
    severity: Option<String>,
    sent: Option<DateTime<Utc>>,
    #[serde(rename = "areaDesc")]
    area_desc: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlertGeometry {
    #[serde(rename = "type")]
    geometry_type: String,
    coordinates: serde_json::Value,
}

impl AlertGeometry {
    /// Alerts are frequently polygons/multipolygons covering a county; we
    /// take the centroid of the first ring as a representative point,
    /// matching how the mapping client plots county-scoped alerts.
    fn centroid(&self) -> Option<(f64, f64)> {
        let ring = match self.geometry_type.as_str() {
            "Polygon" => self.coordinates.get(0)?.as_array()?,
            "MultiPolygon" => self.coordinates.get(0)?.get(0)?.as_array()?,
            _ => return None,
        };
        let (mut sum_lon, mut sum_lat, mut n) = (0.0, 0.0, 0.0);
        for point in ring {
            let arr = point.as_array()?;
            sum_lon += arr.first()?.as_f64()?;
            sum_lat += arr.get(1)?.as_f64()?;
            n += 1.0;
        }
        if n == 0.0 {
            None
        } else {
            Some((sum_lat / n, sum_lon / n))
        }
    }
}

pub struct NoaaAdapter {
    client: reqwest::Client,
}

impl Default for NoaaAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl NoaaAdapter {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

#[async_trait]
impl FeedAdapter for NoaaAdapter {
    fn source_name(&self) -> &'static str {
        "noaa"
    }

    async fn fetch(&self, _window_days: u32) -> Result<Vec<DisasterEvent>, AdapterError> {
        // Alerts are always "active"; NOAA has no query-window parameter.
        let feed: AlertsFeed = self
            .client
            .get(NOAA_ACTIVE_ALERTS_URL)
            .header("User-Agent", "disaster-intelligence-service")
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AdapterError::RequestFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| AdapterError::BadResponse(e.to_string()))?;

        let now = Utc::now();
        let mut events = Vec::new();

        for feature in feed.features {
            let Some((lat, lon)) = feature.geometry.as_ref().and_then(|g| g.centroid()) else { continue };
            if !coordinates_valid(lat, lon) {
                continue;
            }
            let Some(timestamp) = feature.properties.sent else { continue };
            let raw_severity = feature.properties.severity.unwrap_or_default();
            let severity = weather_alert_severity(&raw_severity);
            let alert_level = match raw_severity.to_ascii_lowercase().as_str() {
                "extreme" => Some(WeatherAlertLevel::Extreme),
                "severe" => Some(WeatherAlertLevel::Severe),
                "moderate" => Some(WeatherAlertLevel::Moderate),
                "minor" => Some(WeatherAlertLevel::Minor),
                _ => None,
            };

            let id = format!("noaa:{}:{}", timestamp.timestamp(), lat.to_bits());

            let completeness = OfficialCompleteness {
                required_field_count: 2,
                present_field_count: usize::from(feature.properties.headline.is_some()) + usize::from(feature.properties.area_desc.is_some()),
            };
            let (score, breakdown) = score_official_event(
                Source::Noaa,
                DisasterType::WeatherAlert,
                timestamp,
                now,
                completeness,
                IntensitySignal::Weather { alert_level },
            );

            let mut event = DisasterEvent {
                id,
                source: Source::Noaa,
                disaster_type: DisasterType::WeatherAlert,
                latitude: lat,
                longitude: lon,
                severity,
                timestamp,
                description: feature.properties.headline,
                location_name: feature.properties.area_desc,
                magnitude: None,
                brightness: None,
                frp: None,
                acres_burned: None,
                percent_contained: None,
                alert_level: Some(raw_severity),
                country: Some("US".to_string()),
                state: None,
                image_url: None,
                confidence_score: 0.0,
                confidence_level: domain_model::event::ConfidenceLevel::Low,
                confidence_breakdown: domain_model::event::ConfidenceBreakdown::empty(),
                time_decay: None,
            };
            event.set_confidence(score, breakdown);
            events.push(event);
        }

        Ok(events)
    }
}
