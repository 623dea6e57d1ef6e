//! NASA FIRMS (Fire Information for Resource Management System) — VIIRS/MODIS
//! active-fire detections, delivered as CSV over HTTP.

use crate::common::{coordinates_valid, score_official_event, wildfire_severity};
use crate::{AdapterError, FeedAdapter};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use confidence_scorer::official::{IntensitySignal, OfficialCompleteness};
use domain_model::event::{DisasterType, Source};
use domain_model::DisasterEvent;

/// `https://firms.modaps.eosdis.nasa.gov/api/area/csv/{key}/VIIRS_SNPP_NRT/world/{days}`
const FIRMS_CSV_BASE: &str = "https://firms.modaps.eosdis.nasa.gov/api/area/csv";

pub struct NasaFirmsAdapter {
    client: reqwest::Client,
    map_key: String,
}

impl NasaFirmsAdapter {
    pub fn new(map_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            map_key: map_key.into(),
        }
    }

    fn parse_csv(&self, body: &str, now: DateTime<Utc>) -> Vec<DisasterEvent> {
        let mut records = Vec::new();
        let mut lines = body.lines();
        let Some(header) = lines.next() else { return records };
        let columns: Vec<&str> = header.split(',').collect();
        let idx = |name: &str| columns.iter().position(|c| c.eq_ignore_ascii_case(name));

        let (Some(lat_i), Some(lon_i), Some(bright_i), Some(frp_i), Some(date_i), Some(time_i)) = (
            idx("latitude"),
            idx("longitude"),
            idx("bright_ti4").or_else(|| idx("brightness")),
            idx("frp"),
            idx("acq_date"),
            idx("acq_time"),
        ) else {
            tracing::warn!("NASA FIRMS CSV missing expected columns, skipping fetch");
            return records;
        };

        for row in lines {
            let fields: Vec<&str> = row.split(',').collect();
            let get = |i: usize| fields.get(i).copied();
            let (Some(lat), Some(lon)) = (
                get(lat_i).and_then(|s| s.parse::<f64>().ok()),
                get(lon_i).and_then(|s| s.parse::<f64>().ok()),
            ) else {
                continue;
            };
            if !coordinates_valid(lat, lon) {
                continue;
            }
            let Some(timestamp) = get(date_i).zip(get(time_i)).and_then(|(d, t)| {
                let t_padded = format!("{t:0>4}");
                NaiveDateTime::parse_from_str(&format!("{d} {t_padded}"), "%Y-%m-%d %H%M").ok()
            }) else {
                continue; // missing timestamp — drop per spec.md §4.2.b
            };
            let timestamp = timestamp.and_utc();

            let brightness = get(bright_i).and_then(|s| s.parse::<f64>().ok());
            let frp = get(frp_i).and_then(|s| s.parse::<f64>().ok());
            let severity = wildfire_severity(brightness, frp);

            let id = format!(
                "nasa_firms:{}:{}:{}",
                lat.to_bits(),
                lon.to_bits(),
                timestamp.timestamp()
            );

            let completeness = OfficialCompleteness {
                required_field_count: 2,
                present_field_count: [brightness.is_some(), frp.is_some()].iter().filter(|b| **b).count(),
            };
            let (score, breakdown) = score_official_event(
                Source::NasaFirms,
                DisasterType::Wildfire,
                timestamp,
                now,
                completeness,
                IntensitySignal::Wildfire { brightness, frp },
            );

            let mut event = DisasterEvent {
                id,
                source: Source::NasaFirms,
                disaster_type: DisasterType::Wildfire,
                latitude: lat,
                longitude: lon,
                severity,
                timestamp,
                description: None,
                location_name: None,
                magnitude: None,
                brightness,
                frp,
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
            records.push(event);
        }

        records
    }
}

#[async_trait]
impl FeedAdapter for NasaFirmsAdapter {
    fn source_name(&self) -> &'static str {
        "nasa_firms"
    }

    async fn fetch(&self, window_days: u32) -> Result<Vec<DisasterEvent>, AdapterError> {
        let clamped_days = window_days.clamp(1, 10); // FIRMS allows at most 10-day windows
        let url = format!("{FIRMS_CSV_BASE}/{}/VIIRS_SNPP_NRT/world/{clamped_days}", self.map_key);
        let body = self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| AdapterError::RequestFailed(e.to_string()))?
            .text()
            .await
            .map_err(|e| AdapterError::RequestFailed(e.to_string()))?;

        Ok(self.parse_csv(&body, Utc::now()))
    }
}
