use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    UserReport,
    UserReportAuthenticated,
    NasaFirms,
    Noaa,
    Usgs,
    Gdacs,
    Fema,
    CalFire,
    CalOes,
}

impl Source {
    pub fn is_official(&self) -> bool {
        !matches!(self, Source::UserReport | Source::UserReportAuthenticated)
    }

    pub fn is_user_submitted(&self) -> bool {
        !self.is_official()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisasterType {
    Wildfire,
    Earthquake,
    Flood,
    Hurricane,
    Tornado,
    Volcano,
    Drought,
    WeatherAlert,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Invariant (spec.md §3): confidence_level is a pure function of
    /// confidence_score: >=0.8 High, >=0.6 Medium, else Low.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            ConfidenceLevel::High
        } else if score >= 0.6 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// One named contribution to a confidence score, kept so the breakdown can
/// be returned to clients instead of just the final number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceFactor {
    pub name: String,
    pub weight: f64,
    pub value: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub factors: Vec<ConfidenceFactor>,
    pub corroboration_boost: f64,
    pub credibility_multiplier: Option<f64>,
    pub ai_blend: Option<AiBlend>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiBlend {
    pub heuristic_score: f64,
    pub ai_score: f64,
    pub ai_reasoning: String,
    pub provider: String,
    pub blended_score: f64,
}

impl ConfidenceBreakdown {
    pub fn empty() -> Self {
        Self {
            factors: Vec::new(),
            corroboration_boost: 0.0,
            credibility_multiplier: None,
            ai_blend: None,
        }
    }
}

/// The unified representation a feed adapter must produce (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisasterEvent {
    pub id: String,
    pub source: Source,
    #[serde(rename = "type")]
    pub disaster_type: DisasterType,
    pub latitude: f64,
    pub longitude: f64,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acres_burned: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_contained: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default)]
    pub confidence_score: f64,
    #[serde(default = "default_confidence_level")]
    pub confidence_level: ConfidenceLevel,
    #[serde(default = "ConfidenceBreakdown::empty")]
    pub confidence_breakdown: ConfidenceBreakdown,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_decay: Option<geo_core::TimeDecay>,
}

fn default_confidence_level() -> ConfidenceLevel {
    ConfidenceLevel::Low
}

impl DisasterEvent {
    pub fn is_valid_coordinate(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Applies the spec.md §3 invariant after any confidence_score mutation.
    pub fn set_confidence(&mut self, score: f64, breakdown: ConfidenceBreakdown) {
        self.confidence_score = score.clamp(0.0, 1.0);
        self.confidence_level = ConfidenceLevel::from_score(self.confidence_score);
        self.confidence_breakdown = breakdown;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiAnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    NotApplicable,
}

/// A DisasterEvent with `source` restricted to the user_report family, plus
/// the authoring/moderation fields spec.md §3 adds on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReport {
    #[serde(flatten)]
    pub event: DisasterEvent,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_credibility_at_submission: Option<f64>,
    pub ai_analysis_status: AiAnalysisStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by_admin: Option<bool>,
}

impl UserReport {
    /// Ownership rule (spec.md §3): a report with a non-empty user_id may be
    /// mutated or deleted only by that user or an admin. A legacy report
    /// with no user_id is deletable by anyone.
    pub fn can_be_modified_by(&self, requester_user_id: Option<&str>, requester_is_admin: bool) -> bool {
        match &self.user_id {
            Some(owner) => requester_is_admin || requester_user_id == Some(owner.as_str()),
            None => true,
        }
    }
}
