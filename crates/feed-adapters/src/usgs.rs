//! USGS earthquake feed — GeoJSON summary feeds (e.g.
//! `.../summary/all_day.geojson`, `all_week.geojson`).

use crate::common::{coordinates_valid, score_official_event, seismic_severity};
use crate::{AdapterError, FeedAdapter};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use confidence_scorer::official::{IntensitySignal, OfficialCompleteness};
use domain_model::event::{DisasterType, Source};
use domain_model::DisasterEvent;
use serde::Deserialize;

const USGS_FEED_DAY: &str = "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_day.geojson";
const USGS_FEED_WEEK: &str = "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_week.geojson";
const USGS_FEED_MONTH: &str = "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_month.geojson";

#[derive(Debug, Deserialize)]
struct GeoJsonFeed {
    features: Vec<GeoJsonFeature>,
}

#[derive(Debug, Deserialize)]
struct GeoJsonFeature {
    properties: UsgsProperties,
    geometry: UsgsGeometry,
}

#[derive(Debug, Deserialize)]
struct UsgsProperties {
    mag: Option<f64>,
    place: Option<String>,
    time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct UsgsGeometry {
    coordinates: Vec<f64>,
}

pub struct UsgsAdapter {
    client: reqwest::Client,
}

impl Default for UsgsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl UsgsAdapter {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }

    fn feed_url(window_days: u32) -> &'static str {
        if window_days <= 1 {
            USGS_FEED_DAY
        } else if window_days <= 7 {
            USGS_FEED_WEEK
        } else {
            USGS_FEED_MONTH // USGS's widest public summary window is 30 days
        }
    }
}

#[async_trait]
impl FeedAdapter for UsgsAdapter {
    fn source_name(&self) -> &'static str {
        "usgs"
    }

    async fn fetch(&self, window_days: u32) -> Result<Vec<DisasterEvent>, AdapterError> {
        let url = Self::feed_url(window_days);
        let feed: GeoJsonFeed = self
            .client
            .get(url)
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
            let Some(&lon) = feature.geometry.coordinates.first() else { continue };
            let Some(&lat) = feature.geometry.coordinates.get(1) else { continue };
            if !coordinates_valid(lat, lon) {
                continue;
            }
            let Some(time_ms) = feature.properties.time else { continue };
            let Some(timestamp) = Utc.timestamp_millis_opt(time_ms).single() else { continue };
            let Some(magnitude) = feature.properties.mag else { continue };

            let severity = seismic_severity(magnitude);
            let id = format!("usgs:{}:{}", time_ms, lat.to_bits());

            let completeness = OfficialCompleteness {
                required_field_count: 2,
                present_field_count: 1 + usize::from(feature.properties.place.is_some()),
            };
            let (score, breakdown) = score_official_event(
                Source::Usgs,
                DisasterType::Earthquake,
                timestamp,
                now,
                completeness,
                IntensitySignal::Seismic { magnitude: Some(magnitude) },
            );

            let mut event = DisasterEvent {
                id,
                source: Source::Usgs,
                disaster_type: DisasterType::Earthquake,
                latitude: lat,
                longitude: lon,
                severity,
                timestamp,
                description: feature.properties.place,
                location_name: None,
                magnitude: Some(magnitude),
                brightness: None,
                frp: None,
                acres_burned: None,
                percent_contained: None,
                alert_level: None,
                country: None,
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
