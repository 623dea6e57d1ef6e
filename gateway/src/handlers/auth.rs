//! Auth endpoints (spec.md §6.1): registration/login delegate credential
//! handling to the external identity provider; this layer only validates
//! input shape and bootstraps/reads the local `UserProfile` record.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use domain_model::user::sanitize_display_name;
use domain_model::UserProfile;
use serde::{Deserialize, Serialize};

use crate::auth::{validate_email, validate_password};
use crate::error::ApiError;
use crate::rate_limit::Limit;
use crate::state::{credibility_service, AppState};

use super::{bearer_token, check_rate_limit, client_key, require_principal};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/profile", get(get_profile).put(put_profile))
}

#[derive(Deserialize)]
struct RegisterRequest {
    email: String,
    password: String,
    display_name: Option<String>,
}

#[derive(Serialize)]
struct ProfileResponse {
    user_id: String,
    email: String,
    display_name: String,
    credibility_score: f64,
    credibility_level: domain_model::user::CredibilityLevel,
    total_reports: u32,
}

impl From<&UserProfile> for ProfileResponse {
    fn from(p: &UserProfile) -> Self {
        Self {
            user_id: p.user_id.clone(),
            email: p.email.clone(),
            display_name: p.display_name.clone(),
            credibility_score: p.credibility_score,
            credibility_level: p.credibility_level,
            total_reports: p.total_reports,
        }
    }
}

async fn register(State(state): State<AppState>, headers: HeaderMap, Json(req): Json<RegisterRequest>) -> Result<Json<ProfileResponse>, ApiError> {
    check_rate_limit(&state, "auth_register_hourly", &client_key(&headers, None), Limit::per_hour(3)).await?;
    check_rate_limit(&state, "auth_register_daily", &client_key(&headers, None), Limit::per_day(10)).await?;

    validate_email(&req.email).map_err(|e| ApiError::Validation(e.to_string()))?;
    validate_password(&req.password).map_err(|e| ApiError::Validation(e.to_string()))?;
    let display_name = req.display_name.as_deref().map(sanitize_display_name).unwrap_or_else(|| {
        req.email.split('@').next().unwrap_or("user").to_string()
    });

    let identity = state.identity.as_ref().ok_or_else(|| ApiError::Unavailable("identity provider not configured".to_string()))?;
    let account = identity
        .register(&req.email, &req.password, Some(&display_name))
        .await
        .map_err(|e| ApiError::Conflict(e.to_string()))?;

    let now = Utc::now();
    let profile = UserProfile::new(account.user_id, account.email, display_name, account.email_verified, now);
    credibility_service(&state).save(&profile).await?;

    Ok(Json(ProfileResponse::from(&profile)))
}

#[derive(Deserialize)]
struct LoginRequest {
    id_token: String,
}

async fn login(State(state): State<AppState>, headers: HeaderMap, Json(req): Json<LoginRequest>) -> Result<Json<ProfileResponse>, ApiError> {
    check_rate_limit(&state, "auth_login_15min", &client_key(&headers, None), Limit::per_minutes(5, 15)).await?;
    check_rate_limit(&state, "auth_login_daily", &client_key(&headers, None), Limit::per_day(20)).await?;

    let identity = state.identity.as_ref().ok_or_else(|| ApiError::Unavailable("identity provider not configured".to_string()))?;
    let principal = identity.verify(&req.id_token).await.map_err(|_| ApiError::AuthRequired)?;

    let credibility = credibility_service(&state);
    let profile = match credibility.load(&principal.user_id).await {
        Ok(profile) => profile,
        Err(_) => {
            let now = Utc::now();
            let profile = UserProfile::new(principal.user_id.clone(), principal.email.clone(), principal.email.clone(), principal.email_verified, now);
            credibility.save(&profile).await?;
            profile
        }
    };

    Ok(Json(ProfileResponse::from(&profile)))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some(token) = bearer_token(&headers) {
        if let Some(identity) = &state.identity {
            if let Ok(principal) = identity.verify(&token).await {
                let _ = identity.revoke(&principal.user_id).await;
            }
        }
    }
    Ok(Json(serde_json::json!({ "status": "logged_out" })))
}

async fn get_profile(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<ProfileResponse>, ApiError> {
    let principal = require_principal(&state, &headers).await?;
    let profile = credibility_service(&state).load(&principal.user_id).await?;
    Ok(Json(ProfileResponse::from(&profile)))
}

#[derive(Deserialize)]
struct UpdateProfileRequest {
    display_name: String,
}

async fn put_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let principal = require_principal(&state, &headers).await?;
    let credibility = credibility_service(&state);
    let mut profile = credibility.load(&principal.user_id).await?;
    profile.display_name = sanitize_display_name(&req.display_name);
    credibility.save(&profile).await?;
    Ok(Json(ProfileResponse::from(&profile)))
}
