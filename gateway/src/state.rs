//! Process-wide application state (spec.md §5 implementation note): a
//! `Clone` struct of `Arc<...>` fields, the way the teacher's `AppState` in
//! `main.rs` held `Arc<ConstellationState>`/`Arc<RwLock<ConstellationANN>>`.
//! No field is ever locked across an `.await` that calls another external
//! collaborator.

use crate::config::Config;
use crate::rate_limit::RateLimiter;
use credibility::CredibilityService;
use external_services::ai::AiProviderChain;
use external_services::geocoder::Geocoder;
use external_services::identity::IdentityProvider;
use external_services::routing::RoutingProvider;
use external_services::shelter::ShelterProvider;
use feed_cache::FeedCacheManager;
use proximity_alerts::ProximityAlertService;
use report_service::ReportService;
use route_service::RouteService;
use safe_zones::SafeZoneService;
use std::sync::Arc;
use store::DocumentStore;

/// Hourly AI-enhancement quota (spec.md §4.3 admission control).
pub const HOURLY_AI_QUOTA: u64 = 500;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<Config>,
    pub rate_limiter: Arc<RateLimiter>,
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub feed_cache: Arc<FeedCacheManager>,
    pub reports: Arc<ReportService>,
    pub proximity_alerts: Arc<ProximityAlertService>,
    pub safe_zones: Arc<SafeZoneService>,
    pub routes: Option<Arc<RouteService>>,
}

impl AppState {
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.config.admin_user_ids.contains(user_id)
    }
}

#[allow(clippy::too_many_arguments)]
pub fn build(
    store: Arc<dyn DocumentStore>,
    config: Arc<Config>,
    identity: Option<Arc<dyn IdentityProvider>>,
    geocoder: Option<Arc<dyn Geocoder>>,
    ai: Arc<AiProviderChain>,
    shelter_provider: Option<Arc<dyn ShelterProvider>>,
    primary_router: Option<Arc<dyn RoutingProvider>>,
    fallback_router: Option<Arc<dyn RoutingProvider>>,
    baseline_router: Option<Arc<dyn RoutingProvider>>,
) -> AppState {
    let feed_cache = Arc::new(FeedCacheManager::new(store.clone()));
    let reports = Arc::new(ReportService::new(
        store.clone(),
        feed_cache.clone(),
        identity.clone(),
        geocoder,
        ai,
        HOURLY_AI_QUOTA,
    ));
    let proximity_alerts = Arc::new(ProximityAlertService::new(store.clone(), feed_cache.clone()));
    let safe_zones = Arc::new(SafeZoneService::new(store.clone(), shelter_provider));

    let routes = match (primary_router, fallback_router, baseline_router) {
        (Some(primary), Some(fallback), Some(baseline)) => {
            Some(Arc::new(RouteService::new(store.clone(), feed_cache.clone(), primary, fallback, baseline)))
        }
        _ => None,
    };

    AppState {
        store,
        config,
        rate_limiter: RateLimiter::new(),
        identity,
        feed_cache,
        reports,
        proximity_alerts,
        safe_zones,
        routes,
    }
}

/// Handlers that bootstrap a profile outside the report-submission path
/// (registration) construct their own `CredibilityService` from the shared
/// store handle rather than holding one permanently in `AppState`.
pub fn credibility_service(state: &AppState) -> CredibilityService {
    CredibilityService::new(state.store.clone())
}
