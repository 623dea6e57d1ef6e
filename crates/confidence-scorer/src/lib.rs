//! Confidence Scorer (spec.md §4.3) — the hardest component. Dispatches
//! between the official-source path (§4.3.2) and the heuristic user-report
//! path (§4.3.3 + §4.3.4 + §4.3.5), with optional two-phase AI enhancement
//! (§4.3.6) and retroactive neighbor rescoring (§4.3.7).

pub mod ai_enhance;
pub mod corroboration;
pub mod credibility_multiplier;
pub mod heuristic;
pub mod official;
pub mod retroactive;

pub use ai_enhance::{quota_available, reap_stale_quota_buckets, AiEnhanceError, AiEnhanceOutcome, DEFAULT_HOURLY_QUOTA};
pub use corroboration::{CorroborationNeighbor, CorroborationResult};
pub use heuristic::{HeuristicInput, TypeValidity};
pub use official::{IntensitySignal, OfficialCompleteness, OfficialScoreInput, WeatherAlertLevel};
pub use retroactive::{rescore_neighbors, RetroactiveError, RESCORE_MAX_NEIGHBORS, RESCORE_RADIUS_MI};

use domain_model::event::{ConfidenceBreakdown, ConfidenceLevel, DisasterType, Severity, Source};
use domain_model::user::CredibilityLevel;
use geo_core::GeoPoint;

/// True for the three sources that dispatch to the official-source path
/// (spec.md §4.3.1). Every other source — including the other official
/// feeds (GDACS, FEMA, Cal Fire, Cal OES) — takes the heuristic path, per
/// the spec's explicit dispatch rule.
pub fn is_official_source_path(source: Source) -> bool {
    matches!(source, Source::NasaFirms | Source::Noaa | Source::Usgs)
}

/// Scores an official-source event. Level is always High because the base
/// scores are all >= 0.90 and bonuses are additive.
pub fn score_official(input: OfficialScoreInput) -> (f64, ConfidenceLevel, ConfidenceBreakdown) {
    let (score, breakdown) = official::score(input);
    (score, ConfidenceLevel::from_score(score), breakdown)
}

pub struct UserReportScoreInput<'a> {
    pub heuristic: HeuristicInput,
    /// `Some` only for authenticated submissions (spec.md §4.3.5).
    pub credibility_level: Option<CredibilityLevel>,
    pub candidate_location: GeoPoint,
    pub candidate_timestamp: chrono::DateTime<Utc>,
    pub candidate_severity: Severity,
    pub candidate_type: DisasterType,
    pub corroboration_neighbors: &'a [CorroborationNeighbor],
}

use chrono::Utc;

/// Runs the full non-AI user-report pipeline: heuristic → credibility
/// multiplier → corroboration boost → clamp. AI enhancement is a separate,
/// later step (see `ai_enhance::enhance`) so the submit path stays fast.
pub fn score_user_report(input: UserReportScoreInput<'_>) -> (f64, ConfidenceLevel, ConfidenceBreakdown) {
    let (heuristic_total, mut breakdown) = heuristic::score(&input.heuristic);

    let credibility_multiplier = input.credibility_level.map(credibility_multiplier::multiplier);
    let after_credibility = heuristic_total * credibility_multiplier.unwrap_or(1.0);
    breakdown.credibility_multiplier = credibility_multiplier;

    let corroboration = corroboration::boost(
        input.candidate_location,
        input.candidate_timestamp,
        input.candidate_severity,
        input.candidate_type,
        input.corroboration_neighbors,
    );
    breakdown.corroboration_boost = corroboration.boost;

    let total = (after_credibility + corroboration.boost).clamp(0.0, 1.0);
    (total, ConfidenceLevel::from_score(total), breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_model::event::DisasterType;

    #[test]
    fn dispatch_matches_spec_exactly() {
        assert!(is_official_source_path(Source::NasaFirms));
        assert!(is_official_source_path(Source::Noaa));
        assert!(is_official_source_path(Source::Usgs));
        assert!(!is_official_source_path(Source::Gdacs));
        assert!(!is_official_source_path(Source::Fema));
        assert!(!is_official_source_path(Source::CalFire));
        assert!(!is_official_source_path(Source::CalOes));
        assert!(!is_official_source_path(Source::UserReport));
    }

    #[test]
    fn authenticated_unreliable_user_lands_in_low_band() {
        let input = UserReportScoreInput {
            heuristic: HeuristicInput {
                user_credibility: Some(22.0),
                recaptcha_score: None,
                age_hours: 0.05,
                user_distance_mi: Some(0.5),
                has_description: true,
                has_severity: true,
                has_affected_population: true,
                type_validity: TypeValidity::Recognized,
            },
            credibility_level: Some(CredibilityLevel::Unreliable),
            candidate_location: GeoPoint::new(34.0, -118.0),
            candidate_timestamp: Utc::now(),
            candidate_severity: Severity::Medium,
            candidate_type: DisasterType::Flood,
            corroboration_neighbors: &[],
        };
        let (score, level, _) = score_user_report(input);
        assert!((0.45..=0.55).contains(&score), "expected 0.45..=0.55, got {score}");
        assert_eq!(level, ConfidenceLevel::Low);
    }
}
