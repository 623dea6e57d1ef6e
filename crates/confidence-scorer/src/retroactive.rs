//! Retroactive rescoring (spec.md §4.3.7). When a new or AI-enhanced user
//! report changes the local picture, the scorer revisits nearby existing
//! reports' corroboration boost without re-invoking AI, and writes every
//! change in one multi-path batch.
//!
//! Bounded by construction: 50 mi radius, 20 nearest, trigger excluded.

use crate::corroboration::{self, CorroborationNeighbor};
use domain_model::event::ConfidenceLevel;
use domain_model::{DisasterEvent, UserReport};
use geo_core::GeoPoint;
use serde_json::Value;
use store::DocumentStore;
use thiserror::Error;

pub const RESCORE_RADIUS_MI: f64 = 50.0;
pub const RESCORE_MAX_NEIGHBORS: usize = 20;

#[derive(Error, Debug)]
pub enum RetroactiveError {
    #[error("document store error: {0}")]
    Store(#[from] store::StoreError),
}

fn report_path(id: &str) -> String {
    format!("reports/{id}")
}

/// Reads every report under `reports/`, filters to the same disaster type
/// within `RESCORE_RADIUS_MI` of `trigger_location` (excluding
/// `trigger_id`), and returns up to `RESCORE_MAX_NEIGHBORS` nearest.
async fn nearest_same_type_reports(
    store: &dyn DocumentStore,
    trigger_location: GeoPoint,
    trigger_id: &str,
    disaster_type: domain_model::event::DisasterType,
) -> Result<Vec<(String, UserReport)>, RetroactiveError> {
    let all = store.list_prefix("reports/").await?;
    let mut candidates: Vec<(String, UserReport, f64)> = Vec::new();

    for (path, value) in all {
        if path == report_path(trigger_id) {
            continue;
        }
        let Ok(report) = serde_json::from_value::<UserReport>(value) else { continue };
        if report.event.disaster_type != disaster_type {
            continue;
        }
        let location = GeoPoint::new(report.event.latitude, report.event.longitude);
        let distance = trigger_location.distance_mi(&location);
        if distance > RESCORE_RADIUS_MI {
            continue;
        }
        candidates.push((path, report, distance));
    }

    candidates.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));
    candidates.truncate(RESCORE_MAX_NEIGHBORS);
    Ok(candidates.into_iter().map(|(path, report, _)| (path, report)).collect())
}

fn to_corroboration_neighbor(event: &DisasterEvent) -> CorroborationNeighbor {
    CorroborationNeighbor {
        source: event.source,
        disaster_type: event.disaster_type,
        severity: event.severity,
        location: GeoPoint::new(event.latitude, event.longitude),
        timestamp: event.timestamp,
        brightness: event.brightness,
        frp: event.frp,
    }
}

/// Reconstructs the pre-corroboration, post-credibility-multiplier heuristic
/// total from a previously-persisted breakdown, so it can be recombined with
/// a freshly computed corroboration boost without recomputing every factor
/// from scratch (the raw submission inputs for recency/spatial/etc. are not
/// retained past scoring time).
fn credibility_adjusted_heuristic(breakdown: &domain_model::event::ConfidenceBreakdown) -> f64 {
    let raw_total: f64 = breakdown.factors.iter().map(|f| f.contribution).sum();
    raw_total * breakdown.credibility_multiplier.unwrap_or(1.0)
}

/// Rescales `report`'s confidence using a freshly computed corroboration
/// boost. If the report already carries an AI blend, the blend is
/// recombined at 70/30 against the new heuristic total rather than
/// re-invoking the AI provider.
fn rescored(report: &mut UserReport, trigger_and_neighbors: &[CorroborationNeighbor]) {
    let location = GeoPoint::new(report.event.latitude, report.event.longitude);
    let result = corroboration::boost(
        location,
        report.event.timestamp,
        report.event.severity,
        report.event.disaster_type,
        trigger_and_neighbors,
    );

    let heuristic_adjusted = credibility_adjusted_heuristic(&report.event.confidence_breakdown);
    let mut new_total = (heuristic_adjusted + result.boost).clamp(0.0, 1.0);

    let mut breakdown = report.event.confidence_breakdown.clone();
    breakdown.corroboration_boost = result.boost;

    if let Some(existing_blend) = breakdown.ai_blend.clone() {
        let blended = (0.7 * new_total + 0.3 * existing_blend.ai_score).clamp(0.0, 1.0);
        breakdown.ai_blend = Some(domain_model::event::AiBlend {
            heuristic_score: new_total,
            ..existing_blend
        });
        new_total = blended;
    }

    report.event.set_confidence(new_total, breakdown);
}

/// Executes the retroactive rescore and returns the number of reports
/// updated. Never returns an error to a caller that treats rescore as
/// best-effort — callers should log and swallow per spec.md §4.3.7
/// ("failures in retroactive rescoring must not fail the triggering
/// request").
pub async fn rescore_neighbors(store: &dyn DocumentStore, trigger: &DisasterEvent) -> Result<usize, RetroactiveError> {
    let trigger_location = GeoPoint::new(trigger.latitude, trigger.longitude);
    let neighbors = nearest_same_type_reports(store, trigger_location, &trigger.id, trigger.disaster_type).await?;

    if neighbors.is_empty() {
        return Ok(0);
    }

    let pool: Vec<CorroborationNeighbor> = std::iter::once(to_corroboration_neighbor(trigger))
        .chain(neighbors.iter().map(|(_, r)| to_corroboration_neighbor(&r.event)))
        .collect();

    let mut updates: Vec<(String, Value)> = Vec::with_capacity(neighbors.len());
    for (path, mut report) in neighbors {
        let others: Vec<CorroborationNeighbor> = pool
            .iter()
            .filter(|n| n.location.latitude != report.event.latitude || n.location.longitude != report.event.longitude)
            .cloned()
            .collect();
        rescored(&mut report, &others);
        updates.push((path, serde_json::to_value(&report)?));
    }

    let count = updates.len();
    store.multi_update(updates).await?;
    tracing::info!(trigger_id = %trigger.id, rescored_count = count, "retroactive rescore complete");
    Ok(count)
}

impl From<serde_json::Error> for RetroactiveError {
    fn from(e: serde_json::Error) -> Self {
        RetroactiveError::Store(store::StoreError::Serde(e))
    }
}

pub fn level_for(score: f64) -> ConfidenceLevel {
    ConfidenceLevel::from_score(score)
}
