//! User report CRUD + AI enhancement + admin bulk-delete (spec.md §6.1).

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use domain_model::event::Severity;
use domain_model::UserReport;
use report_service::SubmitReportRequest;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::rate_limit::Limit;
use crate::state::AppState;

use super::{bearer_token, check_rate_limit, client_key, optional_principal, require_principal};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports", get(list_reports).post(submit_report))
        .route("/reports/bulk/delete-stale", post(bulk_delete_stale))
        .route("/reports/{id}", get(get_report).put(update_report).delete(delete_report))
        .route("/reports/{id}/enhance-ai", post(enhance_report))
}

#[derive(Deserialize)]
struct ListReportsQuery {
    max_age_hours: Option<f64>,
}

async fn list_reports(State(state): State<AppState>, Query(query): Query<ListReportsQuery>) -> Result<Json<Vec<UserReport>>, ApiError> {
    if let Some(hours) = query.max_age_hours {
        if !(0.0..=8760.0).contains(&hours) {
            return Err(ApiError::Validation("max_age_hours must be between 0 and 8760".to_string()));
        }
    }
    let reports = state.reports.list_reports(query.max_age_hours).await?;
    Ok(Json(reports))
}

#[derive(Deserialize)]
struct SubmitReportBody {
    disaster_type: String,
    latitude: f64,
    longitude: f64,
    severity: Option<Severity>,
    description: Option<String>,
    image_url: Option<String>,
    location_name: Option<String>,
    affected_population: Option<f64>,
    recaptcha_score: Option<f64>,
    user_distance_mi: Option<f64>,
}

#[derive(Serialize)]
struct SubmitReportResponse {
    report: UserReport,
    credibility_delta: Option<f64>,
}

async fn submit_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SubmitReportBody>,
) -> Result<(StatusCode, Json<SubmitReportResponse>), ApiError> {
    let principal = optional_principal(&state, &headers).await?;
    let key = client_key(&headers, principal.as_ref());
    check_rate_limit(&state, "reports_submit_hourly", &key, Limit::per_hour(20)).await?;
    check_rate_limit(&state, "reports_submit_daily", &key, Limit::per_day(100)).await?;

    let outcome = state
        .reports
        .submit(SubmitReportRequest {
            disaster_type_raw: body.disaster_type,
            latitude: body.latitude,
            longitude: body.longitude,
            severity: body.severity,
            description: body.description,
            image_url: body.image_url,
            location_name: body.location_name,
            affected_population: body.affected_population,
            bearer_token: bearer_token(&headers),
            recaptcha_score: body.recaptcha_score,
            user_distance_mi: body.user_distance_mi,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitReportResponse {
            report: outcome.report,
            credibility_delta: outcome.credibility_update.map(|u| u.delta_applied),
        }),
    ))
}

async fn get_report(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<UserReport>, ApiError> {
    let report = state.reports.get_report(&id).await?;
    Ok(Json(report))
}

#[derive(Deserialize)]
struct UpdateReportBody {
    description: Option<String>,
    location_name: Option<String>,
    severity: Option<Severity>,
}

async fn update_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateReportBody>,
) -> Result<Json<UserReport>, ApiError> {
    let principal = require_principal(&state, &headers).await?;
    let is_admin = state.is_admin(&principal.user_id);
    let report = state
        .reports
        .update_report(&id, Some(&principal.user_id), is_admin, body.description, body.location_name, body.severity)
        .await?;
    Ok(Json(report))
}

async fn delete_report(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Result<Json<serde_json::Value>, ApiError> {
    let principal = require_principal(&state, &headers).await?;
    let is_admin = state.is_admin(&principal.user_id);
    state.reports.delete_report(&id, Some(&principal.user_id), is_admin).await?;
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}

async fn enhance_report(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> Result<Json<UserReport>, ApiError> {
    let principal = optional_principal(&state, &headers).await?;
    let key = client_key(&headers, principal.as_ref());
    check_rate_limit(&state, "reports_enhance_hourly", &key, Limit::per_hour(100)).await?;

    let outcome = state.reports.enhance(&id).await?;
    Ok(Json(outcome.report))
}

#[derive(Deserialize)]
struct BulkDeleteStaleBody {
    max_age_hours: f64,
}

#[derive(Serialize)]
struct BulkDeleteStaleResponse {
    deleted_ids: Vec<String>,
    failed_ids: Vec<String>,
}

async fn bulk_delete_stale(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<BulkDeleteStaleBody>,
) -> Result<(axum::http::StatusCode, Json<BulkDeleteStaleResponse>), ApiError> {
    let principal = require_principal(&state, &headers).await?;
    if !state.is_admin(&principal.user_id) {
        return Err(ApiError::Forbidden("admin only".to_string()));
    }
    check_rate_limit(&state, "reports_bulk_delete_hourly", &principal.user_id, Limit::per_hour(5)).await?;

    let outcome = state.reports.bulk_delete_stale(body.max_age_hours).await?;
    let status = if outcome.is_partial() {
        axum::http::StatusCode::MULTI_STATUS
    } else {
        axum::http::StatusCode::OK
    };
    Ok((status, Json(BulkDeleteStaleResponse { deleted_ids: outcome.deleted_ids, failed_ids: outcome.failed_ids })))
}
