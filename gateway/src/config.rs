//! Environment configuration (spec.md §6.4), read with `std::env::var` the
//! way the teacher's `main.rs` reads `ORBITAL_GATEWAY_PORT`. Missing required
//! variables in production fail fast at startup rather than panicking deep
//! in a handler.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("FRONTEND_URL is required when FLASK_ENV=production")]
    MissingFrontendUrl,
}

pub struct Config {
    pub env: Environment,
    pub port: u16,
    pub frontend_url: Option<String>,
    pub dev_mobile_url: Option<String>,
    pub redis_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub ors_api_key: Option<String>,
    pub here_api_key: Option<String>,
    pub google_maps_api_key: Option<String>,
    pub admin_user_ids: HashSet<String>,
    pub identity_verify_url: Option<String>,
    pub identity_register_url: Option<String>,
    pub identity_revoke_url: Option<String>,
    pub nasa_firms_map_key: Option<String>,
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let env = match env_opt("FLASK_ENV").as_deref() {
            Some("production") => Environment::Production,
            _ => Environment::Development,
        };
        let frontend_url = env_opt("FRONTEND_URL");
        if env == Environment::Production && frontend_url.is_none() {
            return Err(ConfigError::MissingFrontendUrl);
        }

        let port = std::env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8080);

        let admin_user_ids = env_opt("ADMIN_USER_IDS")
            .map(|raw| raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        Ok(Self {
            env,
            port,
            frontend_url,
            dev_mobile_url: env_opt("DEV_MOBILE_URL"),
            redis_url: env_opt("REDIS_URL"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            gemini_api_key: env_opt("GEMINI_API_KEY"),
            ors_api_key: env_opt("ORS_API_KEY"),
            here_api_key: env_opt("HERE_API_KEY"),
            google_maps_api_key: env_opt("GOOGLE_MAPS_API_KEY"),
            admin_user_ids,
            identity_verify_url: env_opt("IDENTITY_VERIFY_URL"),
            identity_register_url: env_opt("IDENTITY_REGISTER_URL"),
            identity_revoke_url: env_opt("IDENTITY_REVOKE_URL"),
            nasa_firms_map_key: env_opt("NASA_FIRMS_MAP_KEY"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.env == Environment::Production
    }

    /// CORS allowlist: single `FRONTEND_URL` in prod, localhost dev ports
    /// plus optional `DEV_MOBILE_URL` in dev (spec.md §6.1).
    pub fn cors_allowlist(&self) -> Vec<String> {
        if self.is_production() {
            self.frontend_url.iter().cloned().collect()
        } else {
            let mut origins = vec!["http://localhost:3000".to_string(), "http://localhost:3001".to_string()];
            if let Some(mobile) = &self.dev_mobile_url {
                origins.push(mobile.clone());
            }
            origins
        }
    }
}
