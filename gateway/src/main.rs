use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use external_services::ai::{AiProviderChain, OpenAiCompatibleProvider};
use external_services::geocoder::{Geocoder, HttpGeocoder};
use external_services::identity::{HttpIdentityProvider, IdentityProvider};
use external_services::routing::{BaselineRoutingProvider, HereRoutingProvider, OpenRouteServiceProvider, RoutingProvider};
use external_services::shelter::{HifldShelterProvider, ShelterProvider};
use feed_cache::FeedType;
use store::InMemoryStore;

mod auth;
mod config;
mod error;
mod handlers;
mod rate_limit;
mod security;
mod state;

use config::Config;

const REQUEST_BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;
const FEED_POLL_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "gateway=debug,info".into())))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);
    tracing::info!(env = ?config.env, port = config.port, "starting gateway");

    let store = Arc::new(InMemoryStore::new());

    let identity: Option<Arc<dyn IdentityProvider>> = config
        .identity_verify_url
        .as_ref()
        .zip(config.identity_register_url.as_ref())
        .zip(config.identity_revoke_url.as_ref())
        .map(|((verify, register), revoke)| -> Arc<dyn IdentityProvider> {
            Arc::new(HttpIdentityProvider::new(verify.clone(), register.clone(), revoke.clone()))
        });
    if identity.is_none() {
        tracing::warn!("identity provider not configured, auth-gated endpoints will return 503");
    }

    let geocoder: Option<Arc<dyn Geocoder>> = Some(Arc::new(HttpGeocoder::new("https://nominatim.openstreetmap.org")));

    let ai_primary = config.openai_api_key.clone().map(|k| Box::new(OpenAiCompatibleProvider::openai(k)) as Box<dyn external_services::ai::AiProvider>);
    let ai_fallback = config.gemini_api_key.clone().map(|k| Box::new(OpenAiCompatibleProvider::gemini(k)) as Box<dyn external_services::ai::AiProvider>);
    if ai_primary.is_none() {
        tracing::warn!("OPENAI_API_KEY not set, AI enhancement runs in fallback-only mode");
    }
    let ai = Arc::new(AiProviderChain::new(ai_primary, ai_fallback));

    let shelter_provider: Option<Arc<dyn ShelterProvider>> = Some(Arc::new(HifldShelterProvider::new()));

    let (primary_router, fallback_router, baseline_router): (
        Option<Arc<dyn RoutingProvider>>,
        Option<Arc<dyn RoutingProvider>>,
        Option<Arc<dyn RoutingProvider>>,
    ) = match &config.ors_api_key {
        Some(ors_key) => {
            let primary: Arc<dyn RoutingProvider> = Arc::new(OpenRouteServiceProvider::new(ors_key.clone()));
            let fallback: Option<Arc<dyn RoutingProvider>> =
                config.here_api_key.clone().map(|k| Arc::new(HereRoutingProvider::new(k)) as Arc<dyn RoutingProvider>);
            let baseline: Arc<dyn RoutingProvider> = Arc::new(BaselineRoutingProvider::new(ors_key.clone()));
            (Some(primary), fallback.or_else(|| Some(Arc::new(BaselineRoutingProvider::new(ors_key.clone())))), Some(baseline))
        }
        None => {
            tracing::warn!("ORS_API_KEY not set, Route Service disabled (/api/routes/calculate returns 503)");
            (None, None, None)
        }
    };

    let app_state = state::build(store, config.clone(), identity, geocoder, ai, shelter_provider, primary_router, fallback_router, baseline_router);

    let api_routes = Router::new()
        .merge(handlers::health::router())
        .merge(handlers::auth::router())
        .merge(handlers::reports::router())
        .merge(handlers::cache::router())
        .merge(handlers::public_data::router())
        .merge(handlers::alerts::router())
        .merge(handlers::safe_zones::router())
        .merge(handlers::routes::router())
        .merge(handlers::settings::router());

    let app = Router::new()
        .nest("/api", api_routes)
        .with_state(app_state.clone())
        .layer(axum::middleware::from_fn({
            let is_production = config.is_production();
            move |req, next| security::security_headers(is_production, req, next)
        }))
        .layer(security::cors_layer(&config))
        .layer(RequestBodyLimitLayer::new(REQUEST_BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http());

    // Background feed refresh, analogous to the teacher's 30s re-propagation
    // loop: each tick, every feed whose TTL has elapsed is re-fetched.
    let bg_state = app_state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(FEED_POLL_INTERVAL_SECS));
        loop {
            interval.tick().await;
            refresh_stale_feeds(&bg_state).await;
        }
    });

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(%addr, "gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Feed adapters live behind `feed_adapters::FeedAdapter`; this loop only
/// decides *when* to refresh, deferring fetch/parse to each adapter (spec.md
/// §4.1). Adapter wiring is intentionally minimal here: adapters that need
/// no credentials are always on, the NASA FIRMS adapter is skipped when no
/// map key is configured rather than failing the whole loop.
async fn refresh_stale_feeds(state: &state::AppState) {
    use feed_adapters::{CalFireAdapter, CalOesAdapter, FemaAdapter, GdacsAdapter, NasaFirmsAdapter, NoaaAdapter, UsgsAdapter};
    use feed_adapters::FeedAdapter;

    for feed_type in FeedType::all() {
        if !state.feed_cache.should_update(feed_type).await {
            continue;
        }

        const WINDOW_DAYS: u32 = 1;
        let result = match feed_type {
            FeedType::NasaFirms => match &state.config.nasa_firms_map_key {
                Some(key) => NasaFirmsAdapter::new(key.clone()).fetch(WINDOW_DAYS).await,
                None => continue,
            },
            FeedType::Noaa => NoaaAdapter::new().fetch(WINDOW_DAYS).await,
            FeedType::Usgs => UsgsAdapter::new().fetch(WINDOW_DAYS).await,
            FeedType::Gdacs => GdacsAdapter::new().fetch(WINDOW_DAYS).await,
            FeedType::Fema => FemaAdapter::new().fetch(WINDOW_DAYS).await,
            FeedType::CalFire => CalFireAdapter::new().fetch(WINDOW_DAYS).await,
            FeedType::CalOes => CalOesAdapter::new().fetch(WINDOW_DAYS).await,
        };

        match result {
            Ok(events) => {
                if let Err(e) = state.feed_cache.update_cache(feed_type, events).await {
                    tracing::warn!(feed = feed_type.as_str(), error = %e, "failed to persist refreshed feed cache");
                }
            }
            Err(e) => state.feed_cache.mark_error(feed_type, &e.to_string()).await,
        }
    }
}
