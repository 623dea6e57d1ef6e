//! Feed Adapters (spec.md §4.2): one adapter per upstream source, each
//! responsible for its own transport and schema mapping, producing
//! normalized `DisasterEvent` records behind the `FeedAdapter` trait.
//!
//! The only adapter semantics that leak into the core are documented on
//! each adapter: brightness/FRP and magnitude map to severity bands, alert
//! strings map onto the unified severity set, and state-scoped sources
//! (Cal Fire, Cal OES) apply their own geographic bounding.

pub mod cal_fire;
pub mod cal_oes;
pub mod fema;
pub mod gdacs;
pub mod nasa_firms;
pub mod noaa;
pub mod usgs;

pub use cal_fire::CalFireAdapter;
pub use cal_oes::CalOesAdapter;
pub use fema::FemaAdapter;
pub use gdacs::GdacsAdapter;
pub use nasa_firms::NasaFirmsAdapter;
pub use noaa::NoaaAdapter;
pub use usgs::UsgsAdapter;

use async_trait::async_trait;
use domain_model::DisasterEvent;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("upstream request failed: {0}")]
    RequestFailed(String),
    #[error("upstream response could not be parsed: {0}")]
    BadResponse(String),
}

/// Capability set every feed adapter implements: fetch a window, normalize
/// into the common record shape. Adapters are leaves — nothing downstream
/// depends on adapter-specific types.
#[async_trait]
pub trait FeedAdapter: Send + Sync {
    fn source_name(&self) -> &'static str;
    async fn fetch(&self, window_days: u32) -> Result<Vec<DisasterEvent>, AdapterError>;
}

/// Shared normalization helpers used by every adapter.
pub(crate) mod common {
    use chrono::{DateTime, Utc};
    use confidence_scorer::official::{self, IntensitySignal, OfficialCompleteness, OfficialScoreInput};
    use domain_model::event::{ConfidenceBreakdown, DisasterType, Severity, Source};
    use domain_model::DisasterEvent;

    /// Drops records with out-of-range coordinates; adapters call this
    /// before constructing a `DisasterEvent` so invalid upstream rows never
    /// reach the core (spec.md §4.2.b).
    pub fn coordinates_valid(lat: f64, lon: f64) -> bool {
        geo_core::is_valid_coordinate(lat, lon)
    }

    /// Attaches the official-source confidence (spec.md §4.2.e) for the
    /// three sources the scorer dispatches to the official path at
    /// rescore time (nasa_firms, noaa, usgs).
    pub fn score_official_event(
        source: Source,
        disaster_type: DisasterType,
        timestamp: DateTime<Utc>,
        now: DateTime<Utc>,
        completeness: OfficialCompleteness,
        intensity: IntensitySignal,
    ) -> (f64, ConfidenceBreakdown) {
        let age_hours = (now - timestamp).num_milliseconds() as f64 / 3_600_000.0;
        official::score(OfficialScoreInput {
            source,
            disaster_type,
            age_hours: age_hours.max(0.0),
            completeness,
            intensity,
        })
    }

    /// Same initial-confidence attachment, for the other official-ish feeds
    /// (GDACS, FEMA, Cal Fire, Cal OES) that don't take the scorer's
    /// source-dispatched official path but still deserve a disaster-type-keyed
    /// base score rather than the heuristic user-report formula.
    pub fn score_adapter_internal_event(
        source: Source,
        disaster_type: DisasterType,
        timestamp: DateTime<Utc>,
        now: DateTime<Utc>,
        completeness: OfficialCompleteness,
        intensity: IntensitySignal,
    ) -> (f64, ConfidenceBreakdown) {
        let age_hours = (now - timestamp).num_milliseconds() as f64 / 3_600_000.0;
        official::score_by_type(OfficialScoreInput {
            source,
            disaster_type,
            age_hours: age_hours.max(0.0),
            completeness,
            intensity,
        })
    }

    /// Satellite wildfire brightness/FRP → severity band (spec.md §4.2.i).
    pub fn wildfire_severity(brightness: Option<f64>, frp: Option<f64>) -> Severity {
        let b = brightness.unwrap_or(0.0);
        let f = frp.unwrap_or(0.0);
        if b > 360.0 || f > 100.0 {
            Severity::Critical
        } else if b > 320.0 || f > 50.0 {
            Severity::High
        } else if b > 300.0 || f > 10.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Seismic magnitude → severity band (spec.md §4.2.ii).
    pub fn seismic_severity(magnitude: f64) -> Severity {
        if magnitude >= 7.0 {
            Severity::Critical
        } else if magnitude >= 6.0 {
            Severity::High
        } else if magnitude >= 4.5 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// NWS-style alert severity string → unified severity (spec.md
    /// §4.2.iii).
    pub fn weather_alert_severity(raw: &str) -> Severity {
        match raw.to_ascii_lowercase().as_str() {
            "extreme" => Severity::Critical,
            "severe" => Severity::High,
            "moderate" => Severity::Medium,
            _ => Severity::Low,
        }
    }
}
