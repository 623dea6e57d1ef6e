//! Identity provider: `verify(token) -> Principal`. Treated as opaque per
//! spec.md §6.1/§6.3 — the core never parses a provider-specific token.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
    pub email_verified: bool,
    pub is_admin: bool,
}

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("invalid token")]
    InvalidToken,
    #[error("expired token")]
    ExpiredToken,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Account-creation outcome returned by `register` — the provider already
/// knows the assigned `user_id` and whatever credibility bonus an OAuth-style
/// identity earns, but the caller (report-service's profile bootstrap) still
/// owns writing the `UserProfile` record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredAccount {
    pub user_id: String,
    pub email: String,
    pub email_verified: bool,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<Principal, IdentityError>;

    /// Creates a new account with the identity provider. Password policy and
    /// email-format validation happen gateway-side before this is called;
    /// the provider itself owns credential storage (spec.md §6.3 treats it as
    /// a black box, matching the original's Firebase-backed `create_user`).
    async fn register(&self, email: &str, password: &str, display_name: Option<&str>) -> Result<RegisteredAccount, IdentityError>;

    /// Revokes all outstanding sessions/refresh tokens for a user (logout).
    async fn revoke(&self, user_id: &str) -> Result<(), IdentityError>;
}

/// HTTP-backed identity provider calling configured verification/registration
/// endpoints. The endpoint contract is the opaque one from spec.md §6.3: POST
/// the token/credentials, get back a principal (or account) or an error
/// status.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    verify_url: String,
    register_url: String,
    revoke_url: String,
}

impl HttpIdentityProvider {
    pub fn new(verify_url: impl Into<String>, register_url: impl Into<String>, revoke_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            verify_url: verify_url.into(),
            register_url: register_url.into(),
            revoke_url: revoke_url.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn verify(&self, id_token: &str) -> Result<Principal, IdentityError> {
        let resp = self
            .client
            .post(&self.verify_url)
            .json(&serde_json::json!({ "id_token": id_token }))
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        match resp.status().as_u16() {
            200 => resp
                .json::<Principal>()
                .await
                .map_err(|e| IdentityError::Unavailable(e.to_string())),
            401 => Err(IdentityError::ExpiredToken),
            403 => Err(IdentityError::InvalidToken),
            other => Err(IdentityError::Unavailable(format!("unexpected status {other}"))),
        }
    }

    async fn register(&self, email: &str, password: &str, display_name: Option<&str>) -> Result<RegisteredAccount, IdentityError> {
        let resp = self
            .client
            .post(&self.register_url)
            .json(&serde_json::json!({ "email": email, "password": password, "display_name": display_name }))
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        match resp.status().as_u16() {
            200 | 201 => resp
                .json::<RegisteredAccount>()
                .await
                .map_err(|e| IdentityError::Unavailable(e.to_string())),
            409 => Err(IdentityError::Unavailable("email already in use".to_string())),
            other => Err(IdentityError::Unavailable(format!("unexpected status {other}"))),
        }
    }

    async fn revoke(&self, user_id: &str) -> Result<(), IdentityError> {
        let resp = self
            .client
            .post(&self.revoke_url)
            .json(&serde_json::json!({ "user_id": user_id }))
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(IdentityError::Unavailable(format!("unexpected status {}", resp.status())))
        }
    }
}
