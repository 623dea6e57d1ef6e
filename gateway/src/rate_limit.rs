//! Process-wide rate limiter (spec.md §5 "per-endpoint rate limiters are
//! process-wide and survive request boundaries"; §6.4 "REDIS_URL ... falls
//! back to in-memory"). This is the in-memory fallback: a fixed-window
//! counter per `(bucket, key)` guarded by an `RwLock<HashMap>`, the same
//! concurrency shape `safe_zones::SafeZoneService` uses for its numeric-ID
//! cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy)]
pub struct Limit {
    pub max_requests: u32,
    pub window: Duration,
}

impl Limit {
    pub const fn per_hour(n: u32) -> Self {
        Self { max_requests: n, window: Duration::from_secs(3600) }
    }

    pub const fn per_minutes(n: u32, minutes: u64) -> Self {
        Self { max_requests: n, window: Duration::from_secs(minutes * 60) }
    }

    pub const fn per_day(n: u32) -> Self {
        Self { max_requests: n, window: Duration::from_secs(86_400) }
    }
}

struct Window {
    started_at: Instant,
    count: u32,
}

/// Holds every window for a single rate-limited bucket (one per `(limit,
/// key)` pair the caller checks). A bucket may be backed by more than one
/// `Limit` (e.g. register is both 3/h and 10/day); callers check each limit
/// against its own named bucket.
#[derive(Default)]
pub struct RateLimiter {
    windows: RwLock<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns `Ok(())` if the request is admitted, or `Err(retry_after)`
    /// with the seconds until the window resets.
    pub async fn check(&self, bucket: &str, key: &str, limit: Limit) -> Result<(), u64> {
        let window_key = format!("{bucket}:{key}");
        let mut windows = self.windows.write().await;
        let now = Instant::now();

        let entry = windows.entry(window_key).or_insert_with(|| Window { started_at: now, count: 0 });
        if now.duration_since(entry.started_at) >= limit.window {
            entry.started_at = now;
            entry.count = 0;
        }

        if entry.count >= limit.max_requests {
            let elapsed = now.duration_since(entry.started_at);
            let retry_after = limit.window.saturating_sub(elapsed).as_secs();
            return Err(retry_after.max(1));
        }

        entry.count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new();
        let limit = Limit { max_requests: 2, window: Duration::from_secs(60) };

        assert!(limiter.check("test", "user-1", limit).await.is_ok());
        assert!(limiter.check("test", "user-1", limit).await.is_ok());
        assert!(limiter.check("test", "user-1", limit).await.is_err());
    }

    #[tokio::test]
    async fn buckets_are_independent_per_key() {
        let limiter = RateLimiter::new();
        let limit = Limit { max_requests: 1, window: Duration::from_secs(60) };

        assert!(limiter.check("test", "user-1", limit).await.is_ok());
        assert!(limiter.check("test", "user-2", limit).await.is_ok());
    }
}
