//! Corroboration boost (spec.md §4.3.4): nearby, temporally-close, same-type
//! events raise a user report's confidence. Bounded to the top five
//! contributors so one crowded area can't dominate the score.

use chrono::{DateTime, Utc};
use domain_model::event::{DisasterType, Severity, Source};
use geo_core::GeoPoint;

/// Maximum distance and time window a neighbor may be considered within.
pub const MAX_DISTANCE_MI: f64 = 50.0;
pub const MAX_AGE_HOURS: f64 = 24.0;

#[derive(Debug, Clone)]
pub struct CorroborationNeighbor {
    pub source: Source,
    pub disaster_type: DisasterType,
    pub severity: Severity,
    pub location: GeoPoint,
    pub timestamp: DateTime<Utc>,
    pub brightness: Option<f64>,
    pub frp: Option<f64>,
}

fn distance_weight(distance_mi: f64) -> Option<f64> {
    if distance_mi <= 5.0 {
        Some(1.0)
    } else if distance_mi <= 15.0 {
        Some(0.8)
    } else if distance_mi <= 30.0 {
        Some(0.5)
    } else if distance_mi <= 50.0 {
        Some(0.2)
    } else {
        None
    }
}

fn source_weight(source: Source) -> f64 {
    if source.is_official() {
        1.5
    } else if matches!(source, Source::UserReport | Source::UserReportAuthenticated) {
        1.0
    } else {
        0.8
    }
}

fn severity_band_index(severity: Severity) -> i32 {
    match severity {
        Severity::Low => 0,
        Severity::Medium => 1,
        Severity::High => 2,
        Severity::Critical => 3,
    }
}

/// Wildfire corroboration overrides the severity-band match with a direct
/// brightness/FRP comparison, per spec.md §4.3.4.
fn wildfire_severity_match(neighbor: &CorroborationNeighbor) -> f64 {
    if neighbor.brightness.unwrap_or(0.0) > 360.0 || neighbor.frp.unwrap_or(0.0) > 100.0 {
        1.2
    } else if neighbor.brightness.unwrap_or(0.0) > 320.0 || neighbor.frp.unwrap_or(0.0) > 50.0 {
        1.0
    } else {
        0.8
    }
}

fn severity_match(candidate_severity: Severity, candidate_type: DisasterType, neighbor: &CorroborationNeighbor) -> f64 {
    if candidate_type == DisasterType::Wildfire {
        return wildfire_severity_match(neighbor);
    }

    let diff = (severity_band_index(candidate_severity) - severity_band_index(neighbor.severity)).abs();
    match diff {
        0 => 1.2,
        1 => 1.0,
        _ => 0.8,
    }
}

/// Translates the diminishing-weighted sum of the top five neighbor scores
/// into a bounded boost (spec.md §4.3.4).
fn boost_from_total(total: f64) -> f64 {
    if total >= 4.0 {
        0.35
    } else if total >= 3.0 {
        0.30
    } else if total >= 2.0 {
        0.20
    } else if total >= 1.0 {
        0.10
    } else {
        0.05
    }
}

pub struct CorroborationResult {
    pub boost: f64,
    /// Count of corroborating neighbors per source, for the breakdown.
    pub source_counts: std::collections::HashMap<Source, usize>,
}

/// `candidate_location`/`candidate_timestamp` are the report under
/// evaluation; `neighbors` must already be filtered to the same disaster
/// type by the caller (the scorer only receives same-type candidates).
pub fn boost(
    candidate_location: GeoPoint,
    candidate_timestamp: DateTime<Utc>,
    candidate_severity: Severity,
    candidate_type: DisasterType,
    neighbors: &[CorroborationNeighbor],
) -> CorroborationResult {
    let mut scored: Vec<(f64, Source)> = Vec::new();
    let mut source_counts = std::collections::HashMap::new();

    for neighbor in neighbors {
        let age_hours = (candidate_timestamp - neighbor.timestamp).num_milliseconds().abs() as f64 / 3_600_000.0;
        if age_hours > MAX_AGE_HOURS {
            continue;
        }

        let distance_mi = candidate_location.distance_mi(&neighbor.location);
        let Some(dw) = distance_weight(distance_mi) else { continue };

        let sw = source_weight(neighbor.source);
        let sm = severity_match(candidate_severity, candidate_type, neighbor);
        scored.push((dw * sw * sm, neighbor.source));
    }

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let diminishing = [1.0, 1.0 / 2.0, 1.0 / 3.0, 1.0 / 4.0, 1.0 / 5.0];
    let mut total = 0.0;
    for (i, (score, source)) in scored.iter().take(5).enumerate() {
        total += score * diminishing[i];
        *source_counts.entry(*source).or_insert(0) += 1;
    }

    CorroborationResult {
        boost: boost_from_total(total),
        source_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn neighbor(source: Source, offset_mi_lat: f64, hours_ago: i64, severity: Severity) -> CorroborationNeighbor {
        CorroborationNeighbor {
            source,
            disaster_type: DisasterType::Wildfire,
            severity,
            location: GeoPoint::new(34.0 + offset_mi_lat / 69.0, -118.0),
            timestamp: Utc::now() - Duration::hours(hours_ago),
            brightness: Some(370.0),
            frp: Some(120.0),
        }
    }

    #[test]
    fn three_nasa_detections_within_5mi_yield_strong_boost() {
        let candidate_location = GeoPoint::new(34.0, -118.0);
        let neighbors = vec![
            neighbor(Source::NasaFirms, 1.0, 2, Severity::High),
            neighbor(Source::NasaFirms, 2.0, 3, Severity::High),
            neighbor(Source::NasaFirms, 3.0, 1, Severity::High),
        ];
        let result = boost(candidate_location, Utc::now(), Severity::High, DisasterType::Wildfire, &neighbors);
        assert!(result.boost >= 0.20, "expected boost >= 0.20, got {}", result.boost);
        assert_eq!(*result.source_counts.get(&Source::NasaFirms).unwrap(), 3);
    }

    #[test]
    fn neighbor_beyond_50mi_is_excluded() {
        let candidate_location = GeoPoint::new(34.0, -118.0);
        let far = CorroborationNeighbor {
            source: Source::NasaFirms,
            disaster_type: DisasterType::Wildfire,
            severity: Severity::High,
            location: GeoPoint::new(35.5, -118.0),
            timestamp: Utc::now(),
            brightness: Some(400.0),
            frp: None,
        };
        let result = boost(candidate_location, Utc::now(), Severity::High, DisasterType::Wildfire, &[far]);
        assert_eq!(result.boost, 0.05);
        assert!(result.source_counts.is_empty());
    }

    #[test]
    fn neighbor_older_than_24h_contributes_nothing() {
        let candidate_location = GeoPoint::new(34.0, -118.0);
        let stale = neighbor(Source::NasaFirms, 1.0, 25, Severity::High);
        let result = boost(candidate_location, Utc::now(), Severity::High, DisasterType::Wildfire, &[stale]);
        assert_eq!(result.boost, 0.05);
        assert!(result.source_counts.is_empty());
    }
}
