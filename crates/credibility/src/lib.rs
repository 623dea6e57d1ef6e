//! User Credibility Service (spec.md §4.4). Pure delta computation plus a
//! thin store-backed service that reads/writes `UserProfile` and appends the
//! append-only credibility history on every mutation.

use chrono::{DateTime, Utc};
use domain_model::user::{CredibilityLevel, UserProfile};
use store::{DocumentStore, DocumentStoreExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CredibilityError {
    #[error("document store error: {0}")]
    Store(#[from] store::StoreError),
    #[error("user profile not found: {0}")]
    ProfileNotFound(String),
}

/// Base delta from final confidence, per spec.md §4.4's table.
pub fn base_delta(confidence: f64) -> f64 {
    if confidence >= 0.90 {
        5.0
    } else if confidence >= 0.80 {
        3.0
    } else if confidence >= 0.70 {
        2.0
    } else if confidence >= 0.60 {
        1.0
    } else if confidence >= 0.50 {
        0.0
    } else if confidence >= 0.40 {
        -1.0
    } else if confidence >= 0.30 {
        -2.0
    } else {
        -3.0
    }
}

/// Recovery bonus (spec.md §4.4): a struggling user who files a strong
/// report gets an extra nudge out of the bottom bands.
pub fn recovery_bonus(credibility: f64, confidence: f64) -> f64 {
    if credibility < 30.0 && confidence >= 0.80 {
        2.0
    } else if credibility < 50.0 && confidence >= 0.85 {
        1.0
    } else {
        0.0
    }
}

/// Diminishing-returns multiplier on *positive* deltas, keyed by how many
/// reports the user already filed in the last 24h within 10 mi of this one.
pub fn diminishing_returns_multiplier(recent_nearby_count: u32) -> f64 {
    match recent_nearby_count {
        0 => 1.0,
        1 => 0.75,
        2 => 0.50,
        _ => 0.20,
    }
}

#[derive(Debug, Clone)]
pub enum SpamTrigger {
    /// More than 10 reports in the last 24h (any location).
    VolumeSpam,
    /// Another report within 1h and within 1 mi of this one.
    Duplicate,
    /// The user's last five reports were all below 0.6 confidence.
    PatternSpam,
}

impl SpamTrigger {
    pub fn delta(&self) -> f64 {
        match self {
            SpamTrigger::VolumeSpam => -5.0,
            SpamTrigger::Duplicate => -5.0,
            SpamTrigger::PatternSpam => -3.0,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            SpamTrigger::VolumeSpam => "spam_trigger: more than 10 reports in 24h",
            SpamTrigger::Duplicate => "spam_trigger: duplicate report within 1h and 1mi",
            SpamTrigger::PatternSpam => "spam_trigger: last five reports all below 0.6 confidence",
        }
    }
}

/// Context a caller must assemble before calling `apply_submission_delta`;
/// these counts come from querying the user's own report history.
#[derive(Debug, Clone, Default)]
pub struct SubmissionContext {
    pub reports_in_last_24h: u32,
    pub reports_in_last_24h_within_10mi: u32,
    pub duplicate_within_1h_1mi: bool,
    pub last_five_confidences: Vec<f64>,
}

impl SubmissionContext {
    fn spam_trigger(&self) -> Option<SpamTrigger> {
        if self.reports_in_last_24h > 10 {
            return Some(SpamTrigger::VolumeSpam);
        }
        if self.duplicate_within_1h_1mi {
            return Some(SpamTrigger::Duplicate);
        }
        if self.last_five_confidences.len() >= 5 && self.last_five_confidences.iter().all(|c| *c < 0.6) {
            return Some(SpamTrigger::PatternSpam);
        }
        None
    }
}

/// Outcome of a single credibility mutation, returned so callers (e.g. the
/// report service) can include it in the API response.
#[derive(Debug, Clone)]
pub struct CredibilityUpdate {
    pub delta_applied: f64,
    pub reason: String,
    pub new_score: f64,
    pub new_level: CredibilityLevel,
}

/// Computes and applies the submission-time credibility delta (spec.md
/// §4.4), mutating `profile` in place and appending a history entry. A spam
/// trigger short-circuits the normal delta computation entirely.
pub fn apply_submission_delta(
    profile: &mut UserProfile,
    confidence: f64,
    context: &SubmissionContext,
    now: DateTime<Utc>,
) -> CredibilityUpdate {
    if let Some(trigger) = context.spam_trigger() {
        let delta = trigger.delta();
        profile.apply_credibility_delta(delta, trigger.reason(), now);
        return CredibilityUpdate {
            delta_applied: delta,
            reason: trigger.reason().to_string(),
            new_score: profile.credibility_score,
            new_level: profile.credibility_level,
        };
    }

    let base = base_delta(confidence);
    let recovery = recovery_bonus(profile.credibility_score, confidence);
    let raw = base + recovery;

    let applied = if raw > 0.0 {
        raw * diminishing_returns_multiplier(context.reports_in_last_24h_within_10mi)
    } else {
        raw
    };

    let reason = format!(
        "submission: confidence={confidence:.3} base_delta={base:.1} recovery_bonus={recovery:.1} diminishing_returns_count={}",
        context.reports_in_last_24h_within_10mi
    );
    profile.apply_credibility_delta(applied, &reason, now);

    CredibilityUpdate {
        delta_applied: applied,
        reason,
        new_score: profile.credibility_score,
        new_level: profile.credibility_level,
    }
}

/// AI-enhance follow-up (spec.md §4.4): applies the *difference* between the
/// AI-era delta (recomputed from the AI-blended confidence) and the
/// submission-era delta already applied, so net movement matches the final
/// confidence.
pub fn apply_ai_enhance_followup(
    profile: &mut UserProfile,
    submission_era_delta: f64,
    ai_blended_confidence: f64,
    now: DateTime<Utc>,
) -> CredibilityUpdate {
    let ai_era_delta = base_delta(ai_blended_confidence) + recovery_bonus(profile.credibility_score, ai_blended_confidence);
    let followup = ai_era_delta - submission_era_delta;
    let reason = format!("ai_enhance_followup: ai_confidence={ai_blended_confidence:.3} followup_delta={followup:.1}");
    profile.apply_credibility_delta(followup, &reason, now);

    CredibilityUpdate {
        delta_applied: followup,
        reason,
        new_score: profile.credibility_score,
        new_level: profile.credibility_level,
    }
}

/// Delete follow-up (spec.md §4.4): on report deletion by its owner, the
/// submission-era delta is inverted and reapplied, restoring credibility to
/// (approximately, modulo clamping) its pre-submission value.
pub fn apply_delete_followup(profile: &mut UserProfile, submission_era_delta: f64, now: DateTime<Utc>) -> CredibilityUpdate {
    let inverted = -submission_era_delta;
    let reason = format!("delete_followup: inverting submission delta {submission_era_delta:.1}");
    profile.apply_credibility_delta(inverted, &reason, now);

    CredibilityUpdate {
        delta_applied: inverted,
        reason,
        new_score: profile.credibility_score,
        new_level: profile.credibility_level,
    }
}

fn profile_path(user_id: &str) -> String {
    format!("users/{user_id}")
}

/// Thin store-backed wrapper so callers don't have to repeat the
/// read-mutate-write dance; the mutation itself always goes through the
/// pure functions above.
pub struct CredibilityService {
    store: std::sync::Arc<dyn DocumentStore>,
}

impl CredibilityService {
    pub fn new(store: std::sync::Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self, user_id: &str) -> Result<UserProfile, CredibilityError> {
        self.store
            .get_typed::<UserProfile>(&profile_path(user_id))
            .await?
            .ok_or_else(|| CredibilityError::ProfileNotFound(user_id.to_string()))
    }

    pub async fn save(&self, profile: &UserProfile) -> Result<(), CredibilityError> {
        self.store.set_typed(&profile_path(&profile.user_id), profile).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_profile() -> UserProfile {
        UserProfile::new("u1", "u1@example.com", "Tester".to_string(), false, Utc::now())
    }

    #[test]
    fn high_confidence_submission_with_no_history_raises_credibility() {
        let mut profile = fresh_profile();
        let update = apply_submission_delta(&mut profile, 0.95, &SubmissionContext::default(), Utc::now());
        assert_eq!(update.delta_applied, 5.0);
        assert_eq!(profile.credibility_score, 55.0);
    }

    #[test]
    fn diminishing_returns_shrinks_repeated_positive_deltas() {
        let mut profile = fresh_profile();
        let context = SubmissionContext {
            reports_in_last_24h_within_10mi: 3,
            ..Default::default()
        };
        let update = apply_submission_delta(&mut profile, 0.95, &context, Utc::now());
        assert_eq!(update.delta_applied, 1.0); // 5.0 * 0.20
    }

    #[test]
    fn volume_spam_short_circuits_to_negative_five() {
        let mut profile = fresh_profile();
        let context = SubmissionContext {
            reports_in_last_24h: 11,
            ..Default::default()
        };
        let update = apply_submission_delta(&mut profile, 0.95, &context, Utc::now());
        assert_eq!(update.delta_applied, -5.0);
    }

    #[test]
    fn delete_followup_restores_pre_submission_value() {
        let mut profile = fresh_profile();
        let submission = apply_submission_delta(&mut profile, 0.95, &SubmissionContext::default(), Utc::now());
        apply_delete_followup(&mut profile, submission.delta_applied, Utc::now());
        assert_eq!(profile.credibility_score, 50.0);
    }

    #[test]
    fn credibility_never_exceeds_bounds() {
        let mut profile = fresh_profile();
        for _ in 0..50 {
            apply_submission_delta(&mut profile, 0.99, &SubmissionContext::default(), Utc::now());
        }
        assert!((0.0..=100.0).contains(&profile.credibility_score));
    }
}
