pub mod alerts;
pub mod auth;
pub mod cache;
pub mod health;
pub mod public_data;
pub mod reports;
pub mod routes;
pub mod safe_zones;
pub mod settings;

use axum::http::HeaderMap;
use external_services::identity::Principal;

use crate::error::ApiError;
use crate::state::AppState;

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// Resolves the caller's `Principal` from the bearer token, failing with
/// `AuthRequired` when the header is absent or the identity provider
/// rejects it. Endpoints marked "required" in spec.md §6.1 call this.
pub async fn require_principal(state: &AppState, headers: &HeaderMap) -> Result<Principal, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::AuthRequired)?;
    let identity = state.identity.as_ref().ok_or_else(|| ApiError::Unavailable("identity provider not configured".to_string()))?;
    identity.verify(&token).await.map_err(|e| match e {
        external_services::identity::IdentityError::Unavailable(msg) => ApiError::Unavailable(msg),
        _ => ApiError::AuthRequired,
    })
}

/// Resolves a `Principal` if a bearer token is present, returning `None`
/// rather than erroring when it's absent — for endpoints marked "optional".
pub async fn optional_principal(state: &AppState, headers: &HeaderMap) -> Result<Option<Principal>, ApiError> {
    let Some(token) = bearer_token(headers) else { return Ok(None) };
    let identity = state.identity.as_ref().ok_or_else(|| ApiError::Unavailable("identity provider not configured".to_string()))?;
    identity
        .verify(&token)
        .await
        .map(Some)
        .map_err(|e| match e {
            external_services::identity::IdentityError::Unavailable(msg) => ApiError::Unavailable(msg),
            _ => ApiError::AuthRequired,
        })
}

pub fn client_key(headers: &HeaderMap, principal: Option<&Principal>) -> String {
    if let Some(p) = principal {
        return p.user_id.clone();
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').next().unwrap_or(v).trim().to_string())
        .unwrap_or_else(|| "anonymous".to_string())
}

pub async fn check_rate_limit(state: &AppState, bucket: &str, key: &str, limit: crate::rate_limit::Limit) -> Result<(), ApiError> {
    state.rate_limiter.check(bucket, key, limit).await.map_err(|retry_after_secs| ApiError::RateLimited { retry_after_secs })
}
