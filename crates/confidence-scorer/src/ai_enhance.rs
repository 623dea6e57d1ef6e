//! Two-phase AI enhancement (spec.md §4.3.6): admission control (configured
//! provider, content-hash cache, hourly quota) followed by a 0.7/0.3 blend
//! of the heuristic and AI scores.

use chrono::Utc;
use domain_model::event::{AiBlend, ConfidenceLevel};
use external_services::ai::{AiPromptContext, AiProviderChain};
use sha2::{Digest, Sha256};
use store::{DocumentStore, DocumentStoreExt};
use thiserror::Error;

/// Default hourly AI-provider admission quota (spec.md §4.3.6).
pub const DEFAULT_HOURLY_QUOTA: u64 = 50;

#[derive(Error, Debug)]
pub enum AiEnhanceError {
    #[error("no AI provider configured")]
    NotConfigured,
    #[error("hourly AI quota exhausted ({0}/hour)")]
    QuotaExhausted(u64),
    #[error("document store error: {0}")]
    Store(#[from] store::StoreError),
}

fn content_hash(description: &str, image_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(description.as_bytes());
    hasher.update(image_url.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn hour_bucket_key(now: chrono::DateTime<Utc>) -> String {
    format!("ai_usage_tracking/hourly/{}", now.format("%Y-%m-%d-%H"))
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct CachedAiResult {
    score: f64,
    reasoning: String,
    provider: String,
    #[allow(dead_code)]
    timestamp: chrono::DateTime<Utc>,
}

/// Atomically increments the hour bucket counter and returns the
/// post-increment value; last-write-wins is acceptable per spec.md §5,
/// admission control only needs to be approximately accurate.
async fn increment_and_check_quota(store: &dyn DocumentStore, quota: u64) -> Result<bool, store::StoreError> {
    let key = hour_bucket_key(Utc::now());
    let current = store.get_typed::<u64>(&key).await?.unwrap_or(0);
    if current >= quota {
        return Ok(false);
    }
    store.set_typed(&key, &(current + 1)).await?;
    Ok(true)
}

/// Non-mutating check of whether the current hour bucket has quota left.
/// Used by the submit path to decide `ai_analysis_status = pending` vs.
/// `not_applicable` without actually consuming a quota slot.
pub async fn quota_available(store: &dyn DocumentStore, quota: u64) -> Result<bool, store::StoreError> {
    let key = hour_bucket_key(Utc::now());
    let current = store.get_typed::<u64>(&key).await?.unwrap_or(0);
    Ok(current < quota)
}

/// Reaps hourly quota buckets older than 24 hours, per spec.md §4.3.6.
pub async fn reap_stale_quota_buckets(store: &dyn DocumentStore) -> Result<usize, store::StoreError> {
    let entries = store.list_prefix("ai_usage_tracking/hourly/").await?;
    let cutoff = Utc::now() - chrono::Duration::hours(24);
    let mut reaped = 0;
    for (path, _) in entries {
        if let Some(bucket) = path.rsplit('/').next() {
            if let Ok(bucket_time) = chrono::NaiveDateTime::parse_from_str(&format!("{bucket}:00:00"), "%Y-%m-%d-%H:%M:%S") {
                if bucket_time.and_utc() < cutoff {
                    store.delete(&path).await?;
                    reaped += 1;
                }
            }
        }
    }
    Ok(reaped)
}

pub struct AiEnhanceOutcome {
    pub blended_score: f64,
    pub blend: AiBlend,
}

/// Runs AI enhancement against `heuristic_score`, applying the cache/quota
/// admission gate from spec.md §4.3.6. Returns `Ok(None)` (not an error)
/// when enhancement is legitimately skipped (no description/image, or the
/// cache already has an answer that gets reused without consuming quota).
pub async fn enhance(
    store: &dyn DocumentStore,
    chain: &AiProviderChain,
    hourly_quota: u64,
    heuristic_score: f64,
    description: Option<&str>,
    image_url: Option<&str>,
    ctx: &AiPromptContext,
) -> Result<AiEnhanceOutcome, AiEnhanceError> {
    if description.is_none() && image_url.is_none() {
        return Err(AiEnhanceError::NotConfigured);
    }
    if !chain.is_configured() {
        return Err(AiEnhanceError::NotConfigured);
    }

    let cache_key = format!(
        "ai_analysis_cache/{}",
        content_hash(description.unwrap_or(""), image_url.unwrap_or(""))
    );

    if let Some(cached) = store.get_typed::<CachedAiResult>(&cache_key).await? {
        tracing::debug!("AI enhancement served from 24h content-hash cache");
        return Ok(blend(heuristic_score, cached.score, cached.reasoning, cached.provider));
    }

    if !increment_and_check_quota(store, hourly_quota).await? {
        return Err(AiEnhanceError::QuotaExhausted(hourly_quota));
    }

    let Some((result, provider)) = chain.analyze(ctx).await else {
        return Err(AiEnhanceError::NotConfigured);
    };

    let cached = CachedAiResult {
        score: result.score,
        reasoning: result.reasoning.clone(),
        provider: provider.to_string(),
        timestamp: Utc::now(),
    };
    store.set_typed(&cache_key, &cached).await?;

    Ok(blend(heuristic_score, result.score, result.reasoning, provider.to_string()))
}

fn blend(heuristic_score: f64, ai_score: f64, reasoning: String, provider: String) -> AiEnhanceOutcome {
    let blended = (0.7 * heuristic_score + 0.3 * ai_score).clamp(0.0, 1.0);
    AiEnhanceOutcome {
        blended_score: blended,
        blend: AiBlend {
            heuristic_score,
            ai_score,
            ai_reasoning: reasoning,
            provider,
            blended_score: blended,
        },
    }
}

pub fn level_for(score: f64) -> ConfidenceLevel {
    ConfidenceLevel::from_score(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use external_services::ai::{AiError, AiProvider, AiResult};
    use store::InMemoryStore;

    struct FixedProvider(f64);

    #[async_trait]
    impl AiProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }
        async fn analyze(&self, _ctx: &AiPromptContext) -> Result<AiResult, AiError> {
            Ok(AiResult {
                score: self.0,
                reasoning: "test reasoning".to_string(),
            })
        }
    }

    fn sample_ctx() -> AiPromptContext {
        AiPromptContext {
            description: Some("smoke visible".to_string()),
            image_url: None,
            disaster_type: "wildfire".to_string(),
            location_text: Some("near Malibu, CA".to_string()),
            same_type_official_count: 1,
            nearest_official_distance_mi: Some(2.0),
            same_type_user_report_count: 0,
        }
    }

    #[tokio::test]
    async fn blends_heuristic_and_ai_at_70_30() {
        let store = InMemoryStore::default();
        let chain = AiProviderChain::new(Some(Box::new(FixedProvider(1.0))), None);
        let outcome = enhance(&store, &chain, 50, 0.5, Some("smoke visible"), None, &sample_ctx())
            .await
            .unwrap();
        assert!((outcome.blended_score - 0.65).abs() < 1e-9);
    }

    #[tokio::test]
    async fn second_call_with_same_content_hits_cache() {
        let store = InMemoryStore::default();
        let chain = AiProviderChain::new(Some(Box::new(FixedProvider(0.9))), None);
        enhance(&store, &chain, 50, 0.5, Some("smoke visible"), None, &sample_ctx()).await.unwrap();

        let counter_key = hour_bucket_key(Utc::now());
        let count_after_first: u64 = store.get_typed(&counter_key).await.unwrap().unwrap();

        enhance(&store, &chain, 50, 0.6, Some("smoke visible"), None, &sample_ctx()).await.unwrap();
        let count_after_second: u64 = store.get_typed(&counter_key).await.unwrap().unwrap();

        assert_eq!(count_after_first, count_after_second, "cached call must not consume quota");
    }

    #[tokio::test]
    async fn quota_exhaustion_is_reported() {
        let store = InMemoryStore::default();
        let chain = AiProviderChain::new(Some(Box::new(FixedProvider(0.9))), None);
        let err = enhance(&store, &chain, 0, 0.5, Some("unique content"), None, &sample_ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, AiEnhanceError::QuotaExhausted(0)));
    }
}
