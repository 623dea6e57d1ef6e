use crate::event::{DisasterType, Severity, Source};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuietHours {
    pub enabled: bool,
    /// "HH:MM", 24h clock.
    pub start: String,
    pub end: String,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start: "22:00".to_string(),
            end: "07:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPreferences {
    pub enabled: bool,
    pub radius_mi: f64,
    pub severity_filter: HashSet<Severity>,
    pub disaster_types: HashSet<DisasterType>,
    pub notification_channels: Vec<String>,
    pub quiet_hours: QuietHours,
}

pub const MIN_ALERT_RADIUS_MI: f64 = 5.0;
pub const MAX_ALERT_RADIUS_MI: f64 = 50.0;

impl Default for AlertPreferences {
    fn default() -> Self {
        Self {
            enabled: true,
            radius_mi: 25.0,
            severity_filter: [Severity::Critical, Severity::High, Severity::Medium, Severity::Low]
                .into_iter()
                .collect(),
            disaster_types: [
                DisasterType::Earthquake,
                DisasterType::Flood,
                DisasterType::Wildfire,
                DisasterType::Hurricane,
                DisasterType::Tornado,
                DisasterType::Volcano,
                DisasterType::Drought,
            ]
            .into_iter()
            .collect(),
            notification_channels: vec!["push".to_string()],
            quiet_hours: QuietHours::default(),
        }
    }
}

impl AlertPreferences {
    pub fn clamp_radius(&mut self) {
        self.radius_mi = self.radius_mi.clamp(MIN_ALERT_RADIUS_MI, MAX_ALERT_RADIUS_MI);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSettings {
    pub display_radius_mi: f64,
    pub zoom_radius_mi: f64,
    pub auto_zoom: bool,
    pub show_all_disasters: bool,
}

pub const MIN_ZOOM_RADIUS_MI: f64 = 1.0;
pub const MAX_ZOOM_RADIUS_MI: f64 = 100.0;

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            display_radius_mi: 50.0,
            zoom_radius_mi: 25.0,
            auto_zoom: true,
            show_all_disasters: false,
        }
    }
}

/// TTL for a materialized notification (spec.md §3): 24h from creation.
pub const NOTIFICATION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub disaster_id: String,
    pub disaster_type: DisasterType,
    pub severity: Severity,
    /// Severity as escalated by proximity (spec.md §4.6), may outrank
    /// `severity` for a close-enough event.
    pub alert_severity: Severity,
    pub distance_mi: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub source: Source,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn acknowledge(&mut self, now: DateTime<Utc>) {
        self.acknowledged = true;
        self.acknowledged_at = Some(now);
    }
}
