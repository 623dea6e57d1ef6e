//! Cal OES (California Governor's Office of Emergency Services) statewide
//! emergency proclamations feed — another California-scoped JSON source,
//! structurally similar to Cal Fire but covering all disaster types.

use crate::common::{coordinates_valid, score_adapter_internal_event};
use crate::{AdapterError, FeedAdapter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use confidence_scorer::official::{IntensitySignal, OfficialCompleteness};
use domain_model::event::{DisasterType, Severity, Source};
use domain_model::DisasterEvent;
use serde::Deserialize;

const CAL_OES_API_URL: &str = "https://www.caloes.ca.gov/api/emergency-proclamations";

const CA_LAT_RANGE: (f64, f64) = (32.5, 42.1);
const CA_LON_RANGE: (f64, f64) = (-124.5, -114.0);

fn in_california(lat: f64, lon: f64) -> bool {
    (CA_LAT_RANGE.0..=CA_LAT_RANGE.1).contains(&lat) && (CA_LON_RANGE.0..=CA_LON_RANGE.1).contains(&lon)
}

fn proclamation_type_to_disaster_type(raw: &str) -> DisasterType {
    match raw.to_ascii_lowercase().as_str() {
        s if s.contains("fire") => DisasterType::Wildfire,
        s if s.contains("earthquake") => DisasterType::Earthquake,
        s if s.contains("flood") || s.contains("storm") => DisasterType::Flood,
        s if s.contains("drought") => DisasterType::Drought,
        _ => DisasterType::Other,
    }
}

#[derive(Debug, Deserialize)]
struct CalOesProclamation {
    latitude: Option<f64>,
    longitude: Option<f64>,
    proclamation_type: Option<String>,
    title: Option<String>,
    issued_at: Option<DateTime<Utc>>,
    statewide: Option<bool>,
}

pub struct CalOesAdapter {
    client: reqwest::Client,
}

impl Default for CalOesAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl CalOesAdapter {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

#[async_trait]
impl FeedAdapter for CalOesAdapter {
    fn source_name(&self) -> &'static str {
        "cal_oes"
    }

    async fn fetch(&self, _window_days: u32) -> Result<Vec<DisasterEvent>, AdapterError> {
        let proclamations: Vec<CalOesProclamation> = self
            .client
            .get(CAL_OES_API_URL)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AdapterError::RequestFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| AdapterError::BadResponse(e.to_string()))?;

        let now = Utc::now();
        let mut events = Vec::new();

        for p in proclamations {
            let (Some(lat), Some(lon)) = (p.latitude, p.longitude) else { continue };
            if !coordinates_valid(lat, lon) || !in_california(lat, lon) {
                continue;
            }
            let Some(timestamp) = p.issued_at else { continue };

            let disaster_type = p.proclamation_type.as_deref().map(proclamation_type_to_disaster_type).unwrap_or(DisasterType::Other);
            let severity = if p.statewide.unwrap_or(false) { Severity::High } else { Severity::Medium };

            let id = format!("cal_oes:{}:{}", lat.to_bits(), timestamp.timestamp());

            let completeness = OfficialCompleteness {
                required_field_count: 1,
                present_field_count: usize::from(p.title.is_some()),
            };
            let (score, breakdown) =
                score_adapter_internal_event(Source::CalOes, disaster_type, timestamp, now, completeness, IntensitySignal::None);

            let mut event = DisasterEvent {
                id,
                source: Source::CalOes,
                disaster_type,
                latitude: lat,
                longitude: lon,
                severity,
                timestamp,
                description: p.title,
                location_name: None,
                magnitude: None,
                brightness: None,
                frp: None,
                acres_burned: None,
                percent_contained: None,
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
