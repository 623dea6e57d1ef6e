use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredibilityLevel {
    Expert,
    Veteran,
    Trusted,
    Neutral,
    Caution,
    Unreliable,
}

impl CredibilityLevel {
    /// `credibility_level` is a pure function of `credibility_score`
    /// (spec.md §3, bands given in §4.4).
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => CredibilityLevel::Expert,
            s if s >= 75.0 => CredibilityLevel::Veteran,
            s if s >= 60.0 => CredibilityLevel::Trusted,
            s if s >= 50.0 => CredibilityLevel::Neutral,
            s if s >= 30.0 => CredibilityLevel::Caution,
            _ => CredibilityLevel::Unreliable,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredibilityHistoryEntry {
    pub old: f64,
    pub new: f64,
    pub delta: f64,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,

    pub credibility_score: f64,
    pub credibility_level: CredibilityLevel,

    pub total_reports: u32,
    pub successful_reports: u32,
    pub flagged_reports: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_report_timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    pub credibility_history: Vec<CredibilityHistoryEntry>,
}

/// Maximum display-name length, HTML-sanitized on input (spec.md §3).
pub const DISPLAY_NAME_MAX_LEN: usize = 50;

/// Default credibility for a newly created profile. Profiles created via a
/// verified OAuth identity start at the higher `OAUTH_BONUS_CREDIBILITY`
/// instead (spec.md §3 "OAuth identity bonus -> 55").
pub const DEFAULT_CREDIBILITY: f64 = 50.0;
pub const OAUTH_BONUS_CREDIBILITY: f64 = 55.0;

impl UserProfile {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>, display_name: String, oauth_verified: bool, now: DateTime<Utc>) -> Self {
        let credibility_score = if oauth_verified { OAUTH_BONUS_CREDIBILITY } else { DEFAULT_CREDIBILITY };
        Self {
            user_id: user_id.into(),
            email: email.into(),
            display_name: sanitize_display_name(&display_name),
            created_at: now,
            last_active: now,
            credibility_score,
            credibility_level: CredibilityLevel::from_score(credibility_score),
            total_reports: 0,
            successful_reports: 0,
            flagged_reports: 0,
            last_report_timestamp: None,
            credibility_history: Vec::new(),
        }
    }

    /// Applies a credibility delta, enforcing the spec.md §3 clamp
    /// invariant and recomputing the derived level, and appends the
    /// append-only history entry.
    pub fn apply_credibility_delta(&mut self, delta: f64, reason: impl Into<String>, now: DateTime<Utc>) {
        let old = self.credibility_score;
        let new = (old + delta).clamp(0.0, 100.0);
        self.credibility_score = new;
        self.credibility_level = CredibilityLevel::from_score(new);
        self.credibility_history.push(CredibilityHistoryEntry {
            old,
            new,
            delta: new - old,
            reason: reason.into(),
            timestamp: now,
        });
    }
}

pub fn sanitize_display_name(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !matches!(c, '<' | '>' | '&' | '"' | '\'')).collect();
    stripped.chars().take(DISPLAY_NAME_MAX_LEN).collect()
}
