//! TTL result cache with single-flight initialization
//!
//! Concurrent lookups of the same key share one initializer run: the first
//! caller computes the value, everyone else waits for it and counts as a hit.

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::Result;
use crate::types::PluginType;

/// A cached value with the time it was stored
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: DateTime<Utc>,
}

/// Result of a cache lookup
#[derive(Debug, Clone)]
pub struct Lookup<V> {
    pub value: V,
    pub stored_at: DateTime<Utc>,
    /// Served without running the initializer
    pub hit: bool,
}

pub struct ResultCache<V> {
    inner: Cache<String, Arc<CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> ResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached value for `key`, or run `init` and store its success.
    /// Failures are not cached.
    pub async fn get_or_try_insert<F>(&self, key: String, init: F) -> Result<Lookup<V>>
    where
        F: Future<Output = Result<V>>,
    {
        let entry = self
            .inner
            .entry(key)
            .or_try_insert_with(async {
                init.await.map(|value| {
                    Arc::new(CacheEntry {
                        value,
                        stored_at: Utc::now(),
                    })
                })
            })
            .await
            .map_err(Arc::unwrap_or_clone)?;

        let hit = !entry.is_fresh();
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }

        let cached = entry.into_value();
        Ok(Lookup {
            value: cached.value.clone(),
            stored_at: cached.stored_at,
            hit,
        })
    }

    pub async fn clear(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }

    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

/// Stable key for `(operation kind, plugin type, request)`
pub fn cache_key<T: Serialize>(kind: &str, plugin_type: PluginType, request: &T) -> Result<String> {
    let body = serde_json::to_vec(&(plugin_type, request))?;
    let digest = Sha256::digest(&body);
    Ok(format!("{kind}:{digest:x}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssessError;
    use crate::input::{AssessmentInput, InputType};
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn test_second_lookup_is_a_hit() {
        let cache = ResultCache::<u32>::new(Duration::from_secs(60), 10);
        let calls = AtomicU32::new(0);

        for _ in 0..2 {
            let lookup = cache
                .get_or_try_insert("k".to_string(), async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(lookup.value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = ResultCache::<u32>::new(Duration::from_secs(60), 10);

        let err = cache
            .get_or_try_insert("k".to_string(), async {
                Err(AssessError::Network("down".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AssessError::Network(_)));

        let lookup = cache
            .get_or_try_insert("k".to_string(), async { Ok(1) })
            .await
            .unwrap();
        assert!(!lookup.hit);
    }

    #[tokio::test]
    async fn test_expired_entries_are_recomputed() {
        let cache = ResultCache::<u32>::new(Duration::from_millis(20), 10);
        cache.get_or_try_insert("k".to_string(), async { Ok(1) }).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;

        let lookup = cache
            .get_or_try_insert("k".to_string(), async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(lookup.value, 2);
        assert!(!lookup.hit);
    }

    #[tokio::test]
    async fn test_clear_drops_entries() {
        let cache = ResultCache::<u32>::new(Duration::from_secs(60), 10);
        cache.get_or_try_insert("a".to_string(), async { Ok(1) }).await.unwrap();
        cache.clear().await;
        assert_eq!(cache.entry_count().await, 0);
    }

    #[test]
    fn test_cache_key_is_stable_and_distinct() {
        let a = AssessmentInput::new(InputType::Website, "https://example.com").unwrap();
        let b = AssessmentInput::new(InputType::Website, "https://example.org").unwrap();

        let key_a = cache_key("analysis", PluginType::Website, &a).unwrap();
        assert_eq!(key_a, cache_key("analysis", PluginType::Website, &a).unwrap());
        assert_ne!(key_a, cache_key("analysis", PluginType::Website, &b).unwrap());
        assert_ne!(key_a, cache_key("analysis", PluginType::BusinessType, &a).unwrap());
        assert!(key_a.starts_with("analysis:"));
    }
}
