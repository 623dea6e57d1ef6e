//! Official-source path (spec.md §4.3.2): no AI, no user credibility. Base
//! score per source plus three bounded bonuses, clamped to 1.0 with the
//! level forced to High.

use domain_model::event::{ConfidenceBreakdown, ConfidenceFactor, DisasterType, Source};

/// Base score per official source (spec.md §4.3.2).
fn base_score(source: Source) -> f64 {
    match source {
        Source::NasaFirms => 0.92,
        Source::Noaa => 0.90,
        Source::Usgs => 0.98,
        _ => unreachable!("official path is only dispatched for nasa_firms/noaa/usgs"),
    }
}

/// Base score keyed by disaster type rather than exact source, for the
/// official-ish adapters (GDACS, FEMA, Cal Fire, Cal OES) that attach an
/// initial confidence at fetch time without going through the scorer's
/// §4.3.1 source dispatch — the base scores in spec.md §4.3.2 are given per
/// disaster category (satellite wildfire / weather / seismic), so any
/// adapter producing one of those categories uses the matching base.
pub fn base_score_for_type(disaster_type: DisasterType) -> f64 {
    match disaster_type {
        DisasterType::Wildfire => 0.92,
        DisasterType::WeatherAlert => 0.90,
        DisasterType::Earthquake => 0.98,
        _ => 0.85, // no dedicated base in spec.md; a conservative default for flood/hurricane/tornado/volcano/drought/other
    }
}

fn recency_bonus(age_hours: f64) -> f64 {
    if age_hours < 1.0 {
        0.05
    } else if age_hours < 6.0 {
        0.03
    } else if age_hours < 24.0 {
        0.01
    } else {
        0.0
    }
}

/// Fields considered "required" for completeness scoring, per source. Not
/// exhaustive of `DisasterEvent` — only the ones each adapter is expected to
/// populate reliably.
#[derive(Debug, Clone, Default)]
pub struct OfficialCompleteness {
    pub required_field_count: usize,
    pub present_field_count: usize,
}

impl OfficialCompleteness {
    fn fraction(&self) -> f64 {
        if self.required_field_count == 0 {
            1.0
        } else {
            self.present_field_count as f64 / self.required_field_count as f64
        }
    }
}

/// Source-specific intensity signal used for the intensity bonus.
#[derive(Debug, Clone, Copy)]
pub enum IntensitySignal {
    Wildfire { brightness: Option<f64>, frp: Option<f64> },
    Seismic { magnitude: Option<f64> },
    Weather { alert_level: Option<WeatherAlertLevel> },
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherAlertLevel {
    Extreme,
    Severe,
    Moderate,
    Minor,
}

fn intensity_bonus(signal: IntensitySignal) -> f64 {
    match signal {
        IntensitySignal::Wildfire { brightness, frp } => {
            if brightness.unwrap_or(0.0) > 360.0 || frp.unwrap_or(0.0) > 100.0 {
                0.02
            } else if brightness.unwrap_or(0.0) > 320.0 || frp.unwrap_or(0.0) > 50.0 {
                0.01
            } else {
                0.0
            }
        }
        IntensitySignal::Seismic { magnitude } => match magnitude {
            Some(m) if m >= 7.0 => 0.02,
            Some(m) if m >= 6.0 => 0.01,
            _ => 0.0,
        },
        IntensitySignal::Weather { alert_level } => match alert_level {
            Some(WeatherAlertLevel::Extreme) => 0.02,
            Some(WeatherAlertLevel::Severe) => 0.01,
            _ => 0.0,
        },
        IntensitySignal::None => 0.0,
    }
}

pub struct OfficialScoreInput {
    pub source: Source,
    pub disaster_type: DisasterType,
    pub age_hours: f64,
    pub completeness: OfficialCompleteness,
    pub intensity: IntensitySignal,
}

/// Returns the clamped score and its breakdown. Level is forced to High by
/// the caller via `ConfidenceLevel::from_score`, which is always satisfied
/// here since the base scores are already >= 0.90.
pub fn score(input: OfficialScoreInput) -> (f64, ConfidenceBreakdown) {
    score_with_base(base_score(input.source), input)
}

/// Same bonus structure as `score`, but keyed off disaster type rather than
/// an exact nasa_firms/noaa/usgs source — used by adapters for the other
/// official-ish feeds (GDACS, FEMA, Cal Fire, Cal OES) that stamp an initial
/// confidence without going through the scorer's source dispatch.
pub fn score_by_type(input: OfficialScoreInput) -> (f64, ConfidenceBreakdown) {
    score_with_base(base_score_for_type(input.disaster_type), input)
}

fn score_with_base(base: f64, input: OfficialScoreInput) -> (f64, ConfidenceBreakdown) {
    let recency = recency_bonus(input.age_hours);
    let completeness_fraction = input.completeness.fraction();
    let completeness = completeness_fraction * 0.03;
    let intensity = intensity_bonus(input.intensity);

    let total = (base + recency + completeness + intensity).clamp(0.0, 1.0);

    let breakdown = ConfidenceBreakdown {
        factors: vec![
            ConfidenceFactor {
                name: "base_score".to_string(),
                weight: 1.0,
                value: base,
                contribution: base,
            },
            ConfidenceFactor {
                name: "recency_bonus".to_string(),
                weight: 1.0,
                value: recency,
                contribution: recency,
            },
            ConfidenceFactor {
                name: "completeness_bonus".to_string(),
                weight: 1.0,
                value: completeness_fraction,
                contribution: completeness,
            },
            ConfidenceFactor {
                name: "intensity_bonus".to_string(),
                weight: 1.0,
                value: intensity,
                contribution: intensity,
            },
        ],
        corroboration_boost: 0.0,
        credibility_multiplier: None,
        ai_blend: None,
    };

    (total, breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_strong_wildfire_detection_scores_very_high() {
        let input = OfficialScoreInput {
            source: Source::NasaFirms,
            disaster_type: DisasterType::Wildfire,
            age_hours: 0.1,
            completeness: OfficialCompleteness {
                required_field_count: 3,
                present_field_count: 3,
            },
            intensity: IntensitySignal::Wildfire {
                brightness: Some(370.0),
                frp: Some(120.0),
            },
        };
        let (score, breakdown) = score(input);
        assert!(score >= 0.97, "expected >= 0.97, got {score}");
        let recency = breakdown.factors.iter().find(|f| f.name == "recency_bonus").unwrap();
        assert_eq!(recency.contribution, 0.05);
        let intensity = breakdown.factors.iter().find(|f| f.name == "intensity_bonus").unwrap();
        assert_eq!(intensity.contribution, 0.02);
    }

    #[test]
    fn seismic_base_is_never_below_point_nine() {
        let input = OfficialScoreInput {
            source: Source::Usgs,
            disaster_type: DisasterType::Earthquake,
            age_hours: 100.0,
            completeness: OfficialCompleteness::default(),
            intensity: IntensitySignal::Seismic { magnitude: None },
        };
        let (score, _) = score(input);
        assert!((0.90..=1.0).contains(&score));
    }
}
