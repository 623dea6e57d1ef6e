//! Cal Fire incident feed — California-scoped JSON API
//! (`incidents.fire.ca.gov`). State-level geopolitical bounding is this
//! adapter's own concern (spec.md §4.2.iv): any record outside a rough
//! California bounding box is dropped here, not filtered downstream.

use crate::common::{coordinates_valid, score_adapter_internal_event};
use crate::{AdapterError, FeedAdapter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use confidence_scorer::official::{IntensitySignal, OfficialCompleteness};
use domain_model::event::{DisasterType, Severity, Source};
use domain_model::DisasterEvent;
use serde::Deserialize;

const CAL_FIRE_API_URL: &str = "https://incidents.fire.ca.gov/imapdata/mapdataall.json";

/// Generous California bounding box (includes offshore islands).
const CA_LAT_RANGE: (f64, f64) = (32.5, 42.1);
const CA_LON_RANGE: (f64, f64) = (-124.5, -114.0);

fn in_california(lat: f64, lon: f64) -> bool {
    (CA_LAT_RANGE.0..=CA_LAT_RANGE.1).contains(&lat) && (CA_LON_RANGE.0..=CA_LON_RANGE.1).contains(&lon)
}

#[derive(Debug, Deserialize)]
struct CalFireIncident {
    #[serde(rename = "Latitude")]
    latitude: Option<f64>,
    #[serde(rename = "Longitude")]
    longitude: Option<f64>,
    #[serde(rename = "Started")]
    started: Option<DateTime<Utc>>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "AcresBurned")]
    acres_burned: Option<f64>,
    #[serde(rename = "PercentContained")]
    percent_contained: Option<f64>,
}

pub struct CalFireAdapter {
    client: reqwest::Client,
}

impl Default for CalFireAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl CalFireAdapter {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

fn severity_for_incident(acres_burned: Option<f64>, percent_contained: Option<f64>) -> Severity {
    let contained = percent_contained.unwrap_or(0.0);
    if contained >= 100.0 {
        return Severity::Low;
    }
    match acres_burned.unwrap_or(0.0) {
        a if a > 10_000.0 => Severity::Critical,
        a if a > 1_000.0 => Severity::High,
        a if a > 100.0 => Severity::Medium,
        _ => Severity::Low,
    }
}

#[async_trait]
impl FeedAdapter for CalFireAdapter {
    fn source_name(&self) -> &'static str {
        "cal_fire"
    }

    async fn fetch(&self, _window_days: u32) -> Result<Vec<DisasterEvent>, AdapterError> {
        let incidents: Vec<CalFireIncident> = self
            .client
            .get(CAL_FIRE_API_URL)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AdapterError::RequestFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| AdapterError::BadResponse(e.to_string()))?;

        let now = Utc::now();
        let mut events = Vec::new();

        for incident in incidents {
            let (Some(lat), Some(lon)) = (incident.latitude, incident.longitude) else { continue };
            if !coordinates_valid(lat, lon) || !in_california(lat, lon) {
                continue;
            }
            let Some(timestamp) = incident.started else { continue };

            let severity = severity_for_incident(incident.acres_burned, incident.percent_contained);
            let id = format!("cal_fire:{}:{}", lat.to_bits(), timestamp.timestamp());

            let completeness = OfficialCompleteness {
                required_field_count: 2,
                present_field_count: usize::from(incident.acres_burned.is_some()) + usize::from(incident.percent_contained.is_some()),
            };
            let (score, breakdown) = score_adapter_internal_event(
                Source::CalFire,
                DisasterType::Wildfire,
                timestamp,
                now,
                completeness,
                IntensitySignal::None,
            );

            let mut event = DisasterEvent {
                id,
                source: Source::CalFire,
                disaster_type: DisasterType::Wildfire,
                latitude: lat,
                longitude: lon,
                severity,
                timestamp,
                description: incident.name,
                location_name: None,
                magnitude: None,
                brightness: None,
                frp: None,
                acres_burned: incident.acres_burned,
                percent_contained: incident.percent_contained,
                alert_level: None,
                country: Some("US".to_string()),
                state: Some("CA".to_string()),
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
