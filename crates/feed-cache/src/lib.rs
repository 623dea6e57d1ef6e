//! Feed Cache Manager (spec.md §4.1). One document per feed type at
//! `public_data_cache/{feed_type}/{metadata,data}`, refreshed by feed
//! adapters on their own TTL and served stale on adapter failure.

use chrono::{DateTime, Utc};
use domain_model::DisasterEvent;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use store::{DocumentStore, DocumentStoreExt};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedType {
    NasaFirms,
    Noaa,
    Usgs,
    Gdacs,
    Fema,
    CalFire,
    CalOes,
}

impl FeedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedType::NasaFirms => "nasa_firms",
            FeedType::Noaa => "noaa",
            FeedType::Usgs => "usgs",
            FeedType::Gdacs => "gdacs",
            FeedType::Fema => "fema",
            FeedType::CalFire => "cal_fire",
            FeedType::CalOes => "cal_oes",
        }
    }

    pub fn all() -> [FeedType; 7] {
        [
            FeedType::NasaFirms,
            FeedType::Noaa,
            FeedType::Usgs,
            FeedType::Gdacs,
            FeedType::Fema,
            FeedType::CalFire,
            FeedType::CalOes,
        ]
    }

    /// Refresh cadence per spec.md §4.1: wildfire/weather feeds refresh
    /// every few minutes, FEMA daily, state feeds every 30 minutes.
    pub fn ttl(&self) -> Duration {
        match self {
            FeedType::NasaFirms => Duration::from_secs(5 * 60),
            FeedType::Noaa | FeedType::Gdacs | FeedType::Usgs => Duration::from_secs(10 * 60),
            FeedType::Fema => Duration::from_secs(24 * 60 * 60),
            FeedType::CalFire | FeedType::CalOes => Duration::from_secs(30 * 60),
        }
    }

    fn metadata_path(&self) -> String {
        format!("public_data_cache/{}/metadata", self.as_str())
    }

    fn data_path(&self) -> String {
        format!("public_data_cache/{}/data", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Ok,
    Stale,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub last_updated: Option<DateTime<Utc>>,
    pub count: usize,
    pub status: CacheStatus,
}

impl Default for CacheMetadata {
    fn default() -> Self {
        Self {
            last_updated: None,
            count: 0,
            status: CacheStatus::Stale,
        }
    }
}

#[derive(Error, Debug)]
pub enum FeedCacheError {
    #[error("document store error: {0}")]
    Store(#[from] store::StoreError),
}

pub struct FeedCacheManager {
    store: std::sync::Arc<dyn DocumentStore>,
}

impl FeedCacheManager {
    pub fn new(store: std::sync::Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn metadata(&self, feed_type: FeedType) -> CacheMetadata {
        match self.store.get_typed::<CacheMetadata>(&feed_type.metadata_path()).await {
            Ok(Some(meta)) => meta,
            Ok(None) => CacheMetadata::default(),
            Err(e) => {
                tracing::warn!(feed = feed_type.as_str(), error = %e, "failed to read cache metadata, treating as stale");
                CacheMetadata::default()
            }
        }
    }

    /// True when this feed's cache is stale per its own TTL, or has never
    /// been populated.
    pub async fn should_update(&self, feed_type: FeedType) -> bool {
        let meta = self.metadata(feed_type).await;
        match meta.last_updated {
            None => true,
            Some(last) => {
                let age = Utc::now() - last;
                age.to_std().map(|d| d >= feed_type.ttl()).unwrap_or(true)
            }
        }
    }

    /// Returns the last successfully cached data for this feed, or an empty
    /// list if the cache has never been populated. Callers fall back to this
    /// on adapter failure rather than propagating to the HTTP layer.
    pub async fn get_cached_data(&self, feed_type: FeedType) -> Vec<DisasterEvent> {
        match self.store.get_typed::<Vec<DisasterEvent>>(&feed_type.data_path()).await {
            Ok(Some(data)) => data,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(feed = feed_type.as_str(), error = %e, "failed to read cached feed data");
                Vec::new()
            }
        }
    }

    /// Atomically writes metadata + data for a feed type in a single
    /// multi-path update (spec.md §6.2), so a concurrent reader never sees
    /// `count` out of sync with `data`.
    pub async fn update_cache(&self, feed_type: FeedType, data: Vec<DisasterEvent>) -> Result<(), FeedCacheError> {
        let metadata = CacheMetadata {
            last_updated: Some(Utc::now()),
            count: data.len(),
            status: CacheStatus::Ok,
        };

        let updates = vec![
            (feed_type.metadata_path(), serde_json::to_value(&metadata)?),
            (feed_type.data_path(), serde_json::to_value(&data)?),
        ];
        self.store.multi_update(updates).await?;
        tracing::info!(feed = feed_type.as_str(), count = metadata.count, "feed cache updated");
        Ok(())
    }

    /// Marks the feed's metadata as errored without touching the stored
    /// data, so `get_cached_data` keeps serving the last good snapshot.
    pub async fn mark_error(&self, feed_type: FeedType, reason: &str) {
        let mut meta = self.metadata(feed_type).await;
        meta.status = CacheStatus::Error;
        tracing::warn!(feed = feed_type.as_str(), reason, "feed adapter failed, serving last cached data");
        if let Err(e) = self.store.set_typed(&feed_type.metadata_path(), &meta).await {
            tracing::warn!(feed = feed_type.as_str(), error = %e, "failed to persist cache error status");
        }
    }

    /// Public read of a feed's cache metadata, for the admin cache-status endpoint.
    pub async fn status(&self, feed_type: FeedType) -> CacheMetadata {
        self.metadata(feed_type).await
    }

    /// Drops a feed's cached metadata and data, forcing the next
    /// `should_update` check to return true.
    pub async fn clear(&self, feed_type: FeedType) -> Result<(), FeedCacheError> {
        self.store.delete(&feed_type.metadata_path()).await?;
        self.store.delete(&feed_type.data_path()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_model::{ConfidenceBreakdown, ConfidenceLevel, DisasterType, Severity, Source};
    use std::sync::Arc;
    use store::InMemoryStore;

    fn sample_event() -> DisasterEvent {
        DisasterEvent {
            id: "nasa_firms:1".to_string(),
            source: Source::NasaFirms,
            disaster_type: DisasterType::Wildfire,
            latitude: 34.0,
            longitude: -118.0,
            severity: Severity::High,
            timestamp: Utc::now(),
            description: None,
            location_name: None,
            magnitude: None,
            brightness: Some(370.0),
            frp: Some(120.0),
            acres_burned: None,
            percent_contained: None,
            alert_level: None,
            country: None,
            state: None,
            image_url: None,
            confidence_score: 0.97,
            confidence_level: ConfidenceLevel::High,
            confidence_breakdown: ConfidenceBreakdown::empty(),
            time_decay: None,
        }
    }

    #[tokio::test]
    async fn empty_cache_is_stale() {
        let manager = FeedCacheManager::new(Arc::new(InMemoryStore::default()));
        assert!(manager.should_update(FeedType::NasaFirms).await);
        assert!(manager.get_cached_data(FeedType::NasaFirms).await.is_empty());
    }

    #[tokio::test]
    async fn update_then_read_round_trips() {
        let manager = FeedCacheManager::new(Arc::new(InMemoryStore::default()));
        manager.update_cache(FeedType::NasaFirms, vec![sample_event()]).await.unwrap();

        assert!(!manager.should_update(FeedType::NasaFirms).await);
        let data = manager.get_cached_data(FeedType::NasaFirms).await;
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].id, "nasa_firms:1");
    }

    #[tokio::test]
    async fn error_mark_preserves_last_good_data() {
        let manager = FeedCacheManager::new(Arc::new(InMemoryStore::default()));
        manager.update_cache(FeedType::Usgs, vec![sample_event()]).await.unwrap();
        manager.mark_error(FeedType::Usgs, "upstream 500").await;

        let data = manager.get_cached_data(FeedType::Usgs).await;
        assert_eq!(data.len(), 1);
    }
}
