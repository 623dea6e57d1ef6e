//! User-report path (spec.md §4.3.3): a deterministic weighted sum over five
//! normalized factors. Fast by construction — no I/O, no AI.

use domain_model::event::{ConfidenceBreakdown, ConfidenceFactor};

pub const WEIGHT_SOURCE_CREDIBILITY: f64 = 0.40;
pub const WEIGHT_TEMPORAL_RECENCY: f64 = 0.20;
pub const WEIGHT_SPATIAL_VALIDATION: f64 = 0.20;
pub const WEIGHT_COMPLETENESS: f64 = 0.10;
pub const WEIGHT_TYPE_VALIDATION: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeValidity {
    Recognized,
    Unrecognized,
    Absent,
}

/// Everything the heuristic needs about a single candidate report, gathered
/// by the report service from the submission payload and request context
/// (not all of this lives on the normalized `DisasterEvent`).
#[derive(Debug, Clone)]
pub struct HeuristicInput {
    /// Authenticated submitter's credibility score in [0,100]. `None` for
    /// anonymous submissions, in which case `recaptcha_score` is used.
    pub user_credibility: Option<f64>,
    /// Raw reCAPTCHA score in [0,1], used only when `user_credibility` is
    /// `None`.
    pub recaptcha_score: Option<f64>,
    pub age_hours: f64,
    /// Distance between the submitting device and the reported location, if
    /// supplied by the client.
    pub user_distance_mi: Option<f64>,
    pub has_description: bool,
    pub has_severity: bool,
    pub has_affected_population: bool,
    pub type_validity: TypeValidity,
}

fn source_credibility(input: &HeuristicInput) -> f64 {
    if let Some(credibility) = input.user_credibility {
        // Authenticated user credibility mapping: floored at 0.3 so even an
        // Unreliable-band user contributes something, scaled up to 1.0 at a
        // perfect credibility score. The separate band multiplier in
        // §4.3.5 applies on top of this, not instead of it.
        (0.3 + 0.7 * (credibility / 100.0).clamp(0.0, 1.0)).clamp(0.0, 1.0)
    } else {
        // reCAPTCHA-derived estimate in [0.5, 0.85] (spec.md §4.3.3).
        let raw = input.recaptcha_score.unwrap_or(0.0).clamp(0.0, 1.0);
        0.5 + raw * 0.35
    }
}

fn temporal_recency(age_hours: f64) -> f64 {
    if age_hours < 0.25 {
        1.0
    } else if age_hours < 1.0 {
        0.9
    } else if age_hours < 6.0 {
        0.8
    } else if age_hours < 24.0 {
        0.7
    } else {
        (0.7 * 0.97_f64.powf(age_hours / 24.0)).max(0.5)
    }
}

fn spatial_validation(user_distance_mi: Option<f64>) -> f64 {
    match user_distance_mi {
        None => 0.5,
        Some(d) if d < 1.0 => 1.0,
        Some(d) if d < 5.0 => 0.9,
        Some(d) if d < 15.0 => 0.7,
        Some(d) if d < 50.0 => 0.5,
        Some(_) => 0.3,
    }
}

fn completeness(input: &HeuristicInput) -> f64 {
    // Core fields {lat, lon, type} are guaranteed present by the time a
    // candidate reaches the scorer (submission validation rejects
    // otherwise), so the core component is always 1.0.
    let core = 1.0 * 0.8;
    let bonus_present = [input.has_description, input.has_severity, input.has_affected_population]
        .iter()
        .filter(|present| **present)
        .count();
    let bonus = (bonus_present as f64 / 3.0) * 0.2;
    core + bonus
}

fn type_validation(validity: TypeValidity) -> f64 {
    match validity {
        TypeValidity::Recognized => 1.0,
        TypeValidity::Unrecognized => 0.5,
        TypeValidity::Absent => 0.3,
    }
}

/// Returns the unweighted [0,1] heuristic total and its breakdown, before
/// the credibility multiplier (§4.3.5) and corroboration boost (§4.3.4) are
/// applied.
pub fn score(input: &HeuristicInput) -> (f64, ConfidenceBreakdown) {
    let factors = [
        ("source_credibility", WEIGHT_SOURCE_CREDIBILITY, source_credibility(input)),
        ("temporal_recency", WEIGHT_TEMPORAL_RECENCY, temporal_recency(input.age_hours)),
        ("spatial_validation", WEIGHT_SPATIAL_VALIDATION, spatial_validation(input.user_distance_mi)),
        ("completeness", WEIGHT_COMPLETENESS, completeness(input)),
        ("type_validation", WEIGHT_TYPE_VALIDATION, type_validation(input.type_validity)),
    ];

    let total: f64 = factors.iter().map(|(_, w, v)| w * v).sum();

    let breakdown = ConfidenceBreakdown {
        factors: factors
            .into_iter()
            .map(|(name, weight, value)| ConfidenceFactor {
                name: name.to_string(),
                weight,
                value,
                contribution: weight * value,
            })
            .collect(),
        corroboration_boost: 0.0,
        credibility_multiplier: None,
        ai_blend: None,
    };

    (total.clamp(0.0, 1.0), breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticated_unreliable_user_coherent_report_no_neighbors() {
        let input = HeuristicInput {
            user_credibility: Some(22.0),
            recaptcha_score: None,
            age_hours: 0.05,
            user_distance_mi: Some(0.5),
            has_description: true,
            has_severity: true,
            has_affected_population: true,
            type_validity: TypeValidity::Recognized,
        };
        let (total, _) = score(&input);
        assert!((0.70..=0.85).contains(&total), "expected heuristic near 0.78, got {total}");
    }

    #[test]
    fn anonymous_submission_uses_recaptcha_band() {
        let input = HeuristicInput {
            user_credibility: None,
            recaptcha_score: Some(1.0),
            age_hours: 0.1,
            user_distance_mi: None,
            has_description: false,
            has_severity: false,
            has_affected_population: false,
            type_validity: TypeValidity::Recognized,
        };
        let (total, breakdown) = score(&input);
        let source = breakdown.factors.iter().find(|f| f.name == "source_credibility").unwrap();
        assert!((0.5..=0.85).contains(&source.value));
        assert!(total > 0.0);
    }
}
