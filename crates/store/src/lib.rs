//! Key-path document store abstraction.
//!
//! The spec treats persistence as an external collaborator (spec.md §6.2): a
//! path-based KV store where a handful of writes must land atomically across
//! several paths at once (e.g. a report's `confidence_score`,
//! `confidence_level` and `confidence_breakdown` together). `DocumentStore` is
//! the seam; `InMemoryStore` is the one production-shaped implementation
//! shipped here, the way the teacher drew the line at `MemoryBackend` for its
//! own key-value layer.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("path not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A path-based key/value document store with multi-path atomic updates.
///
/// Concurrency model per spec.md §5: all mutations are read-modify-write with
/// last-write-wins semantics; no in-process locking is required beyond what
/// guards a single path's internal consistency. `multi_update` guarantees that
/// an observer never reads a report with a `confidence_score` from one write
/// and a `confidence_breakdown` from another.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>>;
    async fn set(&self, path: &str, value: Value) -> Result<()>;
    async fn delete(&self, path: &str) -> Result<()>;
    /// All paths under `prefix` (exclusive of trailing slash handling nuance —
    /// callers pass e.g. `"reports/"` to list every report).
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>>;
    /// Apply every `(path, value)` pair as a single atomic batch.
    async fn multi_update(&self, updates: Vec<(String, Value)>) -> Result<()>;
}

/// Typed convenience helpers layered over the raw `Value` API. Kept as an
/// extension trait so `DocumentStore` itself stays object-safe.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    async fn get_typed<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        match self.get(path).await? {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    async fn set_typed<T: Serialize + Sync>(&self, path: &str, value: &T) -> Result<()> {
        self.set(path, serde_json::to_value(value)?).await
    }
}

impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}

/// In-memory implementation: a single `RwLock<HashMap>` guarding every path.
/// Two concurrent refreshers racing on the same path is expected and
/// harmless (spec.md §5 "Feed cache refresh is best-effort") — the lock only
/// ever protects the map's own structure, not cross-call invariants.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        Ok(self.inner.read().await.get(path).cloned())
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        self.inner.write().await.insert(path.to_string(), value);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.inner.write().await.remove(path);
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>> {
        let guard = self.inner.read().await;
        Ok(guard
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn multi_update(&self, updates: Vec<(String, Value)>) -> Result<()> {
        let mut guard = self.inner.write().await;
        for (path, value) in updates {
            guard.insert(path, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = InMemoryStore::new();
        store.set("reports/abc", serde_json::json!({"id": "abc"})).await.unwrap();
        let got = store.get("reports/abc").await.unwrap();
        assert_eq!(got, Some(serde_json::json!({"id": "abc"})));
    }

    #[tokio::test]
    async fn multi_update_applies_all_paths_together() {
        let store = InMemoryStore::new();
        store
            .multi_update(vec![
                ("reports/1/confidence_score".into(), serde_json::json!(0.9)),
                ("reports/1/confidence_level".into(), serde_json::json!("High")),
            ])
            .await
            .unwrap();

        assert_eq!(store.get("reports/1/confidence_score").await.unwrap(), Some(serde_json::json!(0.9)));
        assert_eq!(store.get("reports/1/confidence_level").await.unwrap(), Some(serde_json::json!("High")));
    }

    #[tokio::test]
    async fn list_prefix_filters_correctly() {
        let store = InMemoryStore::new();
        store.set("reports/1", serde_json::json!({})).await.unwrap();
        store.set("reports/2", serde_json::json!({})).await.unwrap();
        store.set("users/1", serde_json::json!({})).await.unwrap();

        let reports = store.list_prefix("reports/").await.unwrap();
        assert_eq!(reports.len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_path() {
        let store = InMemoryStore::new();
        store.set("reports/1", serde_json::json!({})).await.unwrap();
        store.delete("reports/1").await.unwrap();
        assert_eq!(store.get("reports/1").await.unwrap(), None);
    }
}
