//! Report Service (spec.md §4.5): the submit-fast / enhance-async pipeline,
//! ownership-gated mutation, and the admin bulk-delete-stale operation.

pub mod state_machine;
pub mod validation;

use chrono::{DateTime, Utc};
use confidence_scorer::{CorroborationNeighbor, HeuristicInput, TypeValidity, UserReportScoreInput};
use credibility::{CredibilityService, SubmissionContext};
use domain_model::event::{AiAnalysisStatus, ConfidenceBreakdown, DisasterType, Severity, Source};
use domain_model::user::UserProfile;
use domain_model::{DisasterEvent, UserReport};
use external_services::ai::{AiPromptContext, AiProviderChain};
use external_services::geocoder::Geocoder;
use external_services::identity::{IdentityProvider, Principal};
use feed_cache::{FeedCacheManager, FeedType};
use geo_core::GeoPoint;
use serde_json::Value;
use std::sync::Arc;
use store::{DocumentStore, DocumentStoreExt};
use thiserror::Error;

pub use state_machine::{begin_processing, EnhanceIdempotentResult};
pub use validation::ValidationError;

const NEARBY_RADIUS_MI: f64 = 50.0;

#[derive(Error, Debug)]
pub enum ReportServiceError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("authentication required")]
    AuthRequired,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("identity provider unavailable: {0}")]
    IdentityUnavailable(String),
    #[error("report not found: {0}")]
    NotFound(String),
    #[error("forbidden: not the report owner or an admin")]
    Forbidden,
    #[error("report is not eligible for AI enhancement")]
    NotApplicable,
    #[error("report is already being enhanced")]
    Processing,
    #[error("report enhancement already failed, retry after the quota window resets")]
    AlreadyFailed,
    #[error("document store error: {0}")]
    Store(#[from] store::StoreError),
}

/// Retry-after window reported on a re-enhance attempt against an
/// already-`failed` report (spec.md §4.5: idempotent, "returns 200/429
/// accordingly"), matching the hourly AI quota bucket the failure most
/// often stems from.
pub const ENHANCE_RETRY_AFTER_SECS: u64 = 3600;

fn report_path(id: &str) -> String {
    format!("reports/{id}")
}

fn tracking_path(user_id: &str, id: &str) -> String {
    format!("user_reports/{user_id}/reports/{id}")
}

/// Compact tracking row persisted alongside each authenticated user's
/// reports (spec.md §6.2), carrying the submission-era credibility delta so
/// later AI-enhance/delete follow-ups can compute a difference against it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct ReportTrackingRow {
    report_id: String,
    submission_confidence: f64,
    submission_era_credibility_delta: Option<f64>,
}

pub struct SubmitReportRequest {
    pub disaster_type_raw: String,
    pub latitude: f64,
    pub longitude: f64,
    pub severity: Option<Severity>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub location_name: Option<String>,
    pub affected_population: Option<f64>,
    pub bearer_token: Option<String>,
    pub recaptcha_score: Option<f64>,
    pub user_distance_mi: Option<f64>,
}

pub struct SubmitOutcome {
    pub report: UserReport,
    pub credibility_update: Option<credibility::CredibilityUpdate>,
}

pub struct EnhanceOutcome {
    pub report: UserReport,
    pub credibility_followup: Option<credibility::CredibilityUpdate>,
}

pub struct ReportService {
    store: Arc<dyn DocumentStore>,
    credibility: CredibilityService,
    feed_cache: Arc<FeedCacheManager>,
    identity: Option<Arc<dyn IdentityProvider>>,
    geocoder: Option<Arc<dyn Geocoder>>,
    ai: Arc<AiProviderChain>,
    hourly_ai_quota: u64,
}

impl ReportService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        feed_cache: Arc<FeedCacheManager>,
        identity: Option<Arc<dyn IdentityProvider>>,
        geocoder: Option<Arc<dyn Geocoder>>,
        ai: Arc<AiProviderChain>,
        hourly_ai_quota: u64,
    ) -> Self {
        Self {
            store: store.clone(),
            credibility: CredibilityService::new(store),
            feed_cache,
            identity,
            geocoder,
            ai,
            hourly_ai_quota,
        }
    }

    async fn verify_principal(&self, bearer_token: Option<&str>) -> Result<Option<Principal>, ReportServiceError> {
        let Some(token) = bearer_token else { return Ok(None) };
        let Some(identity) = &self.identity else {
            return Err(ReportServiceError::IdentityUnavailable("identity provider not configured".to_string()));
        };
        identity.verify(token).await.map(Some).map_err(|e| match e {
            external_services::identity::IdentityError::ExpiredToken => ReportServiceError::InvalidToken,
            external_services::identity::IdentityError::InvalidToken => ReportServiceError::InvalidToken,
            external_services::identity::IdentityError::Unavailable(msg) => ReportServiceError::IdentityUnavailable(msg),
        })
    }

    async fn load_or_create_profile(&self, principal: &Principal, now: DateTime<Utc>) -> UserProfile {
        match self.credibility.load(&principal.user_id).await {
            Ok(profile) => profile,
            Err(_) => UserProfile::new(
                principal.user_id.clone(),
                principal.email.clone(),
                principal.email.clone(),
                principal.email_verified,
                now,
            ),
        }
    }

    /// Nearby *user reports only* (spec.md §4.5 submit path: "skip official
    /// feeds for latency"), same disaster type, within 50 mi.
    async fn nearby_user_reports(&self, location: GeoPoint, disaster_type: DisasterType) -> Vec<UserReport> {
        let all = self.store.list_prefix("reports/").await.unwrap_or_default();
        all.into_iter()
            .filter_map(|(_, v)| serde_json::from_value::<UserReport>(v).ok())
            .filter(|r| r.event.disaster_type == disaster_type)
            .filter(|r| location.distance_mi(&GeoPoint::new(r.event.latitude, r.event.longitude)) <= NEARBY_RADIUS_MI)
            .collect()
    }

    fn to_corroboration_neighbors(reports: &[UserReport]) -> Vec<CorroborationNeighbor> {
        reports
            .iter()
            .map(|r| CorroborationNeighbor {
                source: r.event.source,
                disaster_type: r.event.disaster_type,
                severity: r.event.severity,
                location: GeoPoint::new(r.event.latitude, r.event.longitude),
                timestamp: r.event.timestamp,
                brightness: r.event.brightness,
                frp: r.event.frp,
            })
            .collect()
    }

    /// Submit-fast path (spec.md §4.5, steps 1-5). Geocoding, full-corpus
    /// corroboration, AI enhancement and retroactive rescoring are deferred
    /// to `enhance`.
    pub async fn submit(&self, req: SubmitReportRequest) -> Result<SubmitOutcome, ReportServiceError> {
        validation::validate_coordinate(req.latitude, req.longitude)?;
        let disaster_type = validation::validate_disaster_type(&req.disaster_type_raw)
            .unwrap_or(DisasterType::Other); // unrecognized types are still accepted, just scored lower
        if let Some(description) = &req.description {
            validation::validate_description(description)?;
        }
        if let Some(image_url) = &req.image_url {
            validation::validate_image_url(image_url)?;
        }

        let now = Utc::now();
        let principal = self.verify_principal(req.bearer_token.as_deref()).await?;
        let mut profile = match &principal {
            Some(p) => Some(self.load_or_create_profile(p, now).await),
            None => None,
        };

        let location = GeoPoint::new(req.latitude, req.longitude);
        let nearby = self.nearby_user_reports(location, disaster_type).await;
        let neighbors = Self::to_corroboration_neighbors(&nearby);

        let severity = req.severity.unwrap_or(Severity::Medium);
        let heuristic = HeuristicInput {
            user_credibility: profile.as_ref().map(|p| p.credibility_score),
            recaptcha_score: req.recaptcha_score,
            age_hours: 0.0,
            user_distance_mi: req.user_distance_mi,
            has_description: req.description.is_some(),
            has_severity: req.severity.is_some(),
            has_affected_population: req.affected_population.is_some(),
            type_validity: if validation::validate_disaster_type(&req.disaster_type_raw).is_ok() {
                TypeValidity::Recognized
            } else {
                TypeValidity::Unrecognized
            },
        };

        let (score, level, breakdown) = confidence_scorer::score_user_report(UserReportScoreInput {
            heuristic,
            credibility_level: profile.as_ref().map(|p| p.credibility_level),
            candidate_location: location,
            candidate_timestamp: now,
            candidate_severity: severity,
            candidate_type: disaster_type,
            corroboration_neighbors: &neighbors,
        });

        let id = format!("user_report:{}", uuid::Uuid::new_v4());
        let source = if principal.is_some() {
            Source::UserReportAuthenticated
        } else {
            Source::UserReport
        };

        let quota_ok = confidence_scorer::quota_available(self.store.as_ref(), self.hourly_ai_quota)
            .await
            .unwrap_or(false);
        let has_ai_inputs = req.description.is_some() || req.image_url.is_some();
        let ai_status = state_machine::initial_status(true, has_ai_inputs, quota_ok && self.ai.is_configured());

        let mut event = DisasterEvent {
            id: id.clone(),
            source,
            disaster_type,
            latitude: req.latitude,
            longitude: req.longitude,
            severity,
            timestamp: now,
            description: req.description,
            location_name: req.location_name,
            magnitude: None,
            brightness: None,
            frp: None,
            acres_burned: None,
            percent_contained: None,
            alert_level: None,
            country: None,
            state: None,
            image_url: req.image_url,
            confidence_score: 0.0,
            confidence_level: domain_model::event::ConfidenceLevel::Low,
            confidence_breakdown: ConfidenceBreakdown::empty(),
            time_decay: None,
        };
        event.set_confidence(score, breakdown);

        let report = UserReport {
            event,
            user_id: principal.as_ref().map(|p| p.user_id.clone()),
            user_credibility_at_submission: profile.as_ref().map(|p| p.credibility_score),
            ai_analysis_status: ai_status,
            updated_at: None,
            updated_by_admin: None,
        };

        let mut credibility_update = None;
        let mut submission_era_delta = None;
        if let (Some(principal), Some(profile_mut)) = (&principal, profile.as_mut()) {
            let owned_recent = nearby
                .iter()
                .filter(|r| r.user_id.as_deref() == Some(principal.user_id.as_str()))
                .collect::<Vec<_>>();
            let context = SubmissionContext {
                reports_in_last_24h: owned_recent
                    .iter()
                    .filter(|r| (now - r.event.timestamp) <= chrono::Duration::hours(24))
                    .count() as u32,
                reports_in_last_24h_within_10mi: owned_recent
                    .iter()
                    .filter(|r| {
                        (now - r.event.timestamp) <= chrono::Duration::hours(24)
                            && location.distance_mi(&GeoPoint::new(r.event.latitude, r.event.longitude)) <= 10.0
                    })
                    .count() as u32,
                duplicate_within_1h_1mi: owned_recent.iter().any(|r| {
                    (now - r.event.timestamp).num_minutes().abs() <= 60
                        && location.distance_mi(&GeoPoint::new(r.event.latitude, r.event.longitude)) <= 1.0
                }),
                last_five_confidences: owned_recent
                    .iter()
                    .rev()
                    .take(5)
                    .map(|r| r.event.confidence_score)
                    .collect(),
            };
            let update = credibility::apply_submission_delta(profile_mut, score, &context, now);
            submission_era_delta = Some(update.delta_applied);
            self.credibility.save(profile_mut).await?;
            credibility_update = Some(update);
        }

        self.store.set_typed(&report_path(&id), &report).await?;
        if let Some(user_id) = &report.user_id {
            let tracking = ReportTrackingRow {
                report_id: id.clone(),
                submission_confidence: score,
                submission_era_credibility_delta: submission_era_delta,
            };
            self.store.set_typed(&tracking_path(user_id, &id), &tracking).await?;
        }

        tracing::info!(report_id = %id, confidence = score, level = ?level, "user report submitted");

        Ok(SubmitOutcome { report, credibility_update })
    }

    pub async fn get_report(&self, id: &str) -> Result<UserReport, ReportServiceError> {
        let mut report = self
            .store
            .get_typed::<UserReport>(&report_path(id))
            .await?
            .ok_or_else(|| ReportServiceError::NotFound(id.to_string()))?;
        report.event.time_decay = Some(geo_core::TimeDecay::compute(Some(report.event.timestamp), Utc::now()));
        Ok(report)
    }

    pub async fn list_reports(&self, max_age_hours: Option<f64>) -> Result<Vec<UserReport>, ReportServiceError> {
        let now = Utc::now();
        let all = self.store.list_prefix("reports/").await?;
        let mut reports: Vec<UserReport> = all
            .into_iter()
            .filter_map(|(_, v)| serde_json::from_value::<UserReport>(v).ok())
            .collect();

        if let Some(max_age) = max_age_hours {
            reports.retain(|r| (now - r.event.timestamp).num_milliseconds() as f64 / 3_600_000.0 <= max_age);
        }
        for report in &mut reports {
            report.event.time_decay = Some(geo_core::TimeDecay::compute(Some(report.event.timestamp), now));
        }
        Ok(reports)
    }

    /// Enhance path (spec.md §4.5): reverse-geocode, full-corpus
    /// corroboration, AI invocation, credibility delta-of-delta, retroactive
    /// rescore trigger.
    pub async fn enhance(&self, id: &str) -> Result<EnhanceOutcome, ReportServiceError> {
        let mut report = self
            .store
            .get_typed::<UserReport>(&report_path(id))
            .await?
            .ok_or_else(|| ReportServiceError::NotFound(id.to_string()))?;

        match state_machine::begin_processing(report.ai_analysis_status) {
            Ok(processing) => report.ai_analysis_status = processing,
            Err(EnhanceIdempotentResult::AlreadyCompleted) => return Ok(EnhanceOutcome { report, credibility_followup: None }),
            Err(EnhanceIdempotentResult::AlreadyFailed) => return Err(ReportServiceError::AlreadyFailed),
            Err(EnhanceIdempotentResult::AlreadyProcessing) => return Err(ReportServiceError::Processing),
            Err(EnhanceIdempotentResult::NotApplicable) => return Err(ReportServiceError::NotApplicable),
        }
        self.store.set_typed(&report_path(id), &report).await?;

        if report.event.location_name.is_none() {
            if let Some(geocoder) = &self.geocoder {
                if let Ok(Some(result)) = geocoder.reverse_geocode(report.event.latitude, report.event.longitude).await {
                    report.event.location_name = Some(result.display_name);
                    report.event.country = result.country;
                    report.event.state = result.state;
                }
            }
        }

        let location = GeoPoint::new(report.event.latitude, report.event.longitude);
        let official_neighbors = self.official_same_type_neighbors(report.event.disaster_type).await;
        let user_neighbors = self.nearby_user_reports(location, report.event.disaster_type).await;
        let mut neighbors = Self::to_corroboration_neighbors(&user_neighbors);
        neighbors.extend(Self::to_corroboration_neighbors_from_events(&official_neighbors));

        let official_same_type: Vec<&DisasterEvent> = official_neighbors
            .iter()
            .filter(|e| location.distance_mi(&GeoPoint::new(e.latitude, e.longitude)) <= NEARBY_RADIUS_MI)
            .collect();
        let nearest_official_distance_mi = official_same_type
            .iter()
            .map(|e| location.distance_mi(&GeoPoint::new(e.latitude, e.longitude)))
            .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a: f64| a.min(d))));

        let ai_ctx = AiPromptContext {
            description: report.event.description.clone(),
            image_url: report.event.image_url.clone(),
            disaster_type: format!("{:?}", report.event.disaster_type),
            location_text: report.event.location_name.clone(),
            same_type_official_count: official_same_type.len(),
            nearest_official_distance_mi,
            same_type_user_report_count: user_neighbors.len(),
        };

        let heuristic_score = report.event.confidence_score;
        let mut credibility_followup = None;

        match confidence_scorer::ai_enhance::enhance(
            self.store.as_ref(),
            &self.ai,
            self.hourly_ai_quota,
            heuristic_score,
            report.event.description.as_deref(),
            report.event.image_url.as_deref(),
            &ai_ctx,
        )
        .await
        {
            Ok(outcome) => {
                let mut breakdown = report.event.confidence_breakdown.clone();
                breakdown.ai_blend = Some(outcome.blend);
                report.event.set_confidence(outcome.blended_score, breakdown);
                report.ai_analysis_status = AiAnalysisStatus::Completed;

                if let Some(user_id) = report.user_id.clone() {
                    if let Ok(tracking) = self.store.get_typed::<ReportTrackingRow>(&tracking_path(&user_id, id)).await {
                        if let Some(tracking) = tracking {
                            if let Some(submission_delta) = tracking.submission_era_credibility_delta {
                                if let Ok(mut profile) = self.credibility.load(&user_id).await {
                                    let followup = credibility::apply_ai_enhance_followup(
                                        &mut profile,
                                        submission_delta,
                                        outcome.blended_score,
                                        Utc::now(),
                                    );
                                    let _ = self.credibility.save(&profile).await;
                                    credibility_followup = Some(followup);
                                }
                            }
                        }
                    }
                }
            }
            Err(_) => {
                report.ai_analysis_status = AiAnalysisStatus::Failed;
            }
        }

        self.store.set_typed(&report_path(id), &report).await?;

        if let Err(e) = confidence_scorer::rescore_neighbors(self.store.as_ref(), &report.event).await {
            tracing::warn!(report_id = %id, error = %e, "retroactive rescore failed, triggering request unaffected");
        }

        Ok(EnhanceOutcome { report, credibility_followup })
    }

    async fn official_same_type_neighbors(&self, disaster_type: DisasterType) -> Vec<DisasterEvent> {
        let mut events = Vec::new();
        for feed_type in FeedType::all() {
            events.extend(
                self.feed_cache
                    .get_cached_data(feed_type)
                    .await
                    .into_iter()
                    .filter(|e| e.disaster_type == disaster_type),
            );
        }
        events
    }

    fn to_corroboration_neighbors_from_events(events: &[DisasterEvent]) -> Vec<CorroborationNeighbor> {
        events
            .iter()
            .map(|e| CorroborationNeighbor {
                source: e.source,
                disaster_type: e.disaster_type,
                severity: e.severity,
                location: GeoPoint::new(e.latitude, e.longitude),
                timestamp: e.timestamp,
                brightness: e.brightness,
                frp: e.frp,
            })
            .collect()
    }

    /// PUT: ownership-gated mutation of description/location_name/severity/
    /// image_url. `requester_user_id`/`requester_is_admin` gate per
    /// `UserReport::can_be_modified_by`.
    pub async fn update_report(
        &self,
        id: &str,
        requester_user_id: Option<&str>,
        requester_is_admin: bool,
        description: Option<String>,
        location_name: Option<String>,
        severity: Option<Severity>,
    ) -> Result<UserReport, ReportServiceError> {
        let mut report = self
            .store
            .get_typed::<UserReport>(&report_path(id))
            .await?
            .ok_or_else(|| ReportServiceError::NotFound(id.to_string()))?;

        if !report.can_be_modified_by(requester_user_id, requester_is_admin) {
            return Err(ReportServiceError::Forbidden);
        }

        if let Some(description) = description {
            validation::validate_description(&description)?;
            report.event.description = Some(description);
        }
        if let Some(location_name) = location_name {
            report.event.location_name = Some(location_name);
        }
        if let Some(severity) = severity {
            report.event.severity = severity;
        }
        report.updated_at = Some(Utc::now());
        report.updated_by_admin = Some(requester_is_admin);

        self.store.set_typed(&report_path(id), &report).await?;
        Ok(report)
    }

    /// DELETE: ownership-gated; inverts the submission-era credibility delta
    /// for the owner if one was recorded.
    pub async fn delete_report(
        &self,
        id: &str,
        requester_user_id: Option<&str>,
        requester_is_admin: bool,
    ) -> Result<(), ReportServiceError> {
        let report = self
            .store
            .get_typed::<UserReport>(&report_path(id))
            .await?
            .ok_or_else(|| ReportServiceError::NotFound(id.to_string()))?;

        if !report.can_be_modified_by(requester_user_id, requester_is_admin) {
            return Err(ReportServiceError::Forbidden);
        }

        if let Some(user_id) = &report.user_id {
            let tracking_key = tracking_path(user_id, id);
            if let Ok(Some(tracking)) = self.store.get_typed::<ReportTrackingRow>(&tracking_key).await {
                if let Some(submission_delta) = tracking.submission_era_credibility_delta {
                    if let Ok(mut profile) = self.credibility.load(user_id).await {
                        credibility::apply_delete_followup(&mut profile, submission_delta, Utc::now());
                        let _ = self.credibility.save(&profile).await;
                    }
                }
            }
            self.store.delete(&tracking_key).await?;
        }

        self.store.delete(&report_path(id)).await?;
        Ok(())
    }

    /// Admin bulk delete of user reports older than `max_age_hours`. Writes
    /// an audit log entry before starting and on completion (spec.md §5),
    /// so a crashed run is detectable.
    pub async fn bulk_delete_stale(&self, max_age_hours: f64) -> Result<BulkDeleteOutcome, ReportServiceError> {
        let operation_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        self.write_audit_log(&operation_id, "bulk_delete_stale", "started", started_at, None).await;

        let all = self.store.list_prefix("reports/").await?;
        let now = Utc::now();
        let mut deleted_ids = Vec::new();
        let mut failed_ids = Vec::new();

        for (path, value) in all {
            let Ok(report) = serde_json::from_value::<UserReport>(value) else { continue };
            if report.user_id.is_none() {
                continue; // bulk-delete targets user reports, not feed cache entries
            }
            let age_hours = (now - report.event.timestamp).num_milliseconds() as f64 / 3_600_000.0;
            if age_hours <= max_age_hours {
                continue;
            }
            match self.store.delete(&path).await {
                Ok(()) => deleted_ids.push(report.event.id.clone()),
                Err(_) => failed_ids.push(report.event.id.clone()),
            }
        }

        self.write_audit_log(
            &operation_id,
            "bulk_delete_stale",
            "completed",
            Utc::now(),
            Some(serde_json::json!({ "deleted": deleted_ids.len(), "failed": failed_ids.len() })),
        )
        .await;

        Ok(BulkDeleteOutcome { deleted_ids, failed_ids })
    }

    async fn write_audit_log(&self, operation_id: &str, operation: &str, status: &str, at: DateTime<Utc>, detail: Option<Value>) {
        let path = format!("audit_logs/{operation_id}");
        let existing = self.store.get(&path).await.ok().flatten();
        let mut record = existing.unwrap_or_else(|| serde_json::json!({ "operation": operation, "operation_id": operation_id }));
        if let Value::Object(ref mut map) = record {
            map.insert("status".to_string(), serde_json::json!(status));
            map.insert("updated_at".to_string(), serde_json::json!(at));
            if let Some(detail) = detail {
                map.insert("detail".to_string(), detail);
            }
        }
        // Best-effort per spec.md §7: audit-log writes never fail the caller.
        let _ = self.store.set(&path, record).await;
    }
}

pub struct BulkDeleteOutcome {
    pub deleted_ids: Vec<String>,
    pub failed_ids: Vec<String>,
}

impl BulkDeleteOutcome {
    /// 200 if everything succeeded, 207 if some failed, matching spec.md
    /// §6.1's partial-success contract.
    pub fn is_partial(&self) -> bool {
        !self.failed_ids.is_empty()
    }
}
