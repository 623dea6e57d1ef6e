//! FEMA disaster declarations — OpenFEMA's `DisasterDeclarationsSummaries`
//! API, JSON over HTTP.

use crate::common::{coordinates_valid, score_adapter_internal_event};
use crate::{AdapterError, FeedAdapter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use confidence_scorer::official::{IntensitySignal, OfficialCompleteness};
use domain_model::event::{DisasterType, Severity, Source};
use domain_model::DisasterEvent;
use serde::Deserialize;

const FEMA_API_URL: &str = "https://www.fema.gov/api/open/v2/DisasterDeclarationsSummaries";

/// Rough state-capital centroid table: FEMA declarations are scoped to a
/// whole state, not a point, so the adapter plots the state centroid — a
/// documented approximation, not a precision geocode.
fn state_centroid(code: &str) -> Option<(f64, f64)> {
    match code {
        "CA" => Some((36.78, -119.42)),
        "FL" => Some((27.77, -81.69)),
        "TX" => Some((31.97, -99.90)),
        "LA" => Some((31.24, -92.15)),
        "NY" => Some((42.17, -74.95)),
        _ => None,
    }
}

fn incident_type_to_disaster_type(raw: &str) -> DisasterType {
    match raw.to_ascii_lowercase().as_str() {
        s if s.contains("fire") => DisasterType::Wildfire,
        s if s.contains("earthquake") => DisasterType::Earthquake,
        s if s.contains("flood") => DisasterType::Flood,
        s if s.contains("hurricane") || s.contains("typhoon") => DisasterType::Hurricane,
        s if s.contains("tornado") => DisasterType::Tornado,
        s if s.contains("volcan") => DisasterType::Volcano,
        s if s.contains("drought") => DisasterType::Drought,
        s if s.contains("severe storm") || s.contains("winter storm") => DisasterType::WeatherAlert,
        _ => DisasterType::Other,
    }
}

#[derive(Debug, Deserialize)]
struct FemaResponse {
    #[serde(rename = "DisasterDeclarationsSummaries")]
    declarations: Vec<FemaDeclaration>,
}

#[derive(Debug, Deserialize)]
struct FemaDeclaration {
    state: String,
    #[serde(rename = "incidentType")]
    incident_type: String,
    #[serde(rename = "declarationTitle")]
    declaration_title: Option<String>,
    #[serde(rename = "declarationDate")]
    declaration_date: Option<DateTime<Utc>>,
    #[serde(rename = "ihProgramDeclared")]
    ih_program_declared: Option<bool>,
}

pub struct FemaAdapter {
    client: reqwest::Client,
}

impl Default for FemaAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FemaAdapter {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

#[async_trait]
impl FeedAdapter for FemaAdapter {
    fn source_name(&self) -> &'static str {
        "fema"
    }

    async fn fetch(&self, window_days: u32) -> Result<Vec<DisasterEvent>, AdapterError> {
        let now = Utc::now();
        let cutoff = now - chrono::Duration::days(window_days.clamp(1, 365) as i64);
        let filter = format!("declarationDate ge '{}'", cutoff.to_rfc3339());

        let resp: FemaResponse = self
            .client
            .get(FEMA_API_URL)
            .query(&[("$filter", filter.as_str()), ("$top", "1000")])
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AdapterError::RequestFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| AdapterError::BadResponse(e.to_string()))?;

        let mut events = Vec::new();

        for decl in resp.declarations {
            let Some((lat, lon)) = state_centroid(&decl.state) else { continue }; // only states the adapter maps are handled
            if !coordinates_valid(lat, lon) {
                continue;
            }
            let Some(timestamp) = decl.declaration_date else { continue };

            let disaster_type = incident_type_to_disaster_type(&decl.incident_type);
            let severity = if decl.ih_program_declared.unwrap_or(false) { Severity::High } else { Severity::Medium };

            let id = format!("fema:{}:{}", decl.state, timestamp.timestamp());

            let completeness = OfficialCompleteness {
                required_field_count: 1,
                present_field_count: usize::from(decl.declaration_title.is_some()),
            };
            let (score, breakdown) = score_adapter_internal_event(Source::Fema, disaster_type, timestamp, now, completeness, IntensitySignal::None);

            let mut event = DisasterEvent {
                id,
                source: Source::Fema,
                disaster_type,
                latitude: lat,
                longitude: lon,
                severity,
                timestamp,
                description: decl.declaration_title,
                location_name: None,
                magnitude: None,
                brightness: None,
                frp: None,
                acres_burned: None,
                percent_contained: None,
                alert_level: None,
                country: Some("US".to_string()),
                state: Some(decl.state),
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
