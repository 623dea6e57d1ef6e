//! Central HTTP error mapping (spec.md §7). This is the only place in the
//! repo that turns a domain error into a status code — library crates never
//! mention HTTP, matching the teacher's practice of keeping transport
//! concerns out of `collision-avoidance`/`beam-routing`-equivalent crates.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("authentication required")]
    AuthRequired,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("dependent service unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::AuthRequired => (StatusCode::UNAUTHORIZED, "auth_required"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let mut response = (status, Json(ErrorBody { error: kind, message: self.to_string() })).into_response();
        if let ApiError::RateLimited { retry_after_secs } = self {
            response.headers_mut().insert("retry-after", retry_after_secs.into());
        }
        response
    }
}

impl From<store::StoreError> for ApiError {
    fn from(e: store::StoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<report_service::ReportServiceError> for ApiError {
    fn from(e: report_service::ReportServiceError) -> Self {
        use report_service::ReportServiceError as E;
        match e {
            E::Validation(v) => ApiError::Validation(v.to_string()),
            E::AuthRequired => ApiError::AuthRequired,
            E::InvalidToken => ApiError::AuthRequired,
            E::IdentityUnavailable(msg) => ApiError::Unavailable(msg),
            E::NotFound(id) => ApiError::NotFound(id),
            E::Forbidden => ApiError::Forbidden("not the report owner or an admin".to_string()),
            E::NotApplicable => ApiError::Conflict("report is not eligible for AI enhancement".to_string()),
            E::Processing => ApiError::Conflict("report is already being enhanced".to_string()),
            E::AlreadyFailed => ApiError::RateLimited { retry_after_secs: report_service::ENHANCE_RETRY_AFTER_SECS },
            E::Store(s) => ApiError::Internal(s.to_string()),
        }
    }
}

impl From<proximity_alerts::ProximityAlertError> for ApiError {
    fn from(e: proximity_alerts::ProximityAlertError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<safe_zones::SafeZoneError> for ApiError {
    fn from(e: safe_zones::SafeZoneError) -> Self {
        use safe_zones::SafeZoneError as E;
        match e {
            E::InvalidCoordinates(lat, lon) => ApiError::Validation(format!("invalid coordinates ({lat}, {lon})")),
            E::Store(s) => ApiError::Internal(s.to_string()),
            E::Shelter(s) => ApiError::Unavailable(s.to_string()),
        }
    }
}

impl From<feed_cache::FeedCacheError> for ApiError {
    fn from(e: feed_cache::FeedCacheError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<credibility::CredibilityError> for ApiError {
    fn from(e: credibility::CredibilityError) -> Self {
        use credibility::CredibilityError as E;
        match e {
            E::ProfileNotFound(id) => ApiError::NotFound(format!("user profile {id}")),
            E::Store(s) => ApiError::Internal(s.to_string()),
        }
    }
}

impl From<route_service::RouteServiceError> for ApiError {
    fn from(e: route_service::RouteServiceError) -> Self {
        use route_service::RouteServiceError as E;
        match e {
            E::InvalidCoordinates => ApiError::Validation("invalid origin/destination coordinates".to_string()),
            E::NoRoute => ApiError::NotFound("no route found between origin and destination".to_string()),
            E::Store(s) => ApiError::Internal(s.to_string()),
        }
    }
}
