//! Response cache shared by every collector, with one fetch in flight per key.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use compintel_core::SourceId;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use moka::Expiry;

use crate::error::SourceError;

/// Cache key: the source plus its normalised query (fiscal id, name or domain).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: SourceId,
    pub query: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(source: SourceId, query: impl Into<String>) -> Self {
        Self {
            source,
            query: query.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with.
struct EntryTtl;

impl<V> Expiry<CacheKey, CacheEntry<V>> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &CacheEntry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &CacheEntry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Size-bounded LRU cache with per-entry TTL, shared across collectors.
#[derive(Clone)]
pub struct CacheLayer<V> {
    inner: Cache<CacheKey, CacheEntry<V>>,
    default_ttl: Duration,
}

impl<V> CacheLayer<V>
where
    V: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(capacity: u64, default_ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(EntryTtl)
            .build();
        Self { inner, default_ttl }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        self.inner.get(key).await.map(|entry| entry.value)
    }

    pub async fn put(&self, key: CacheKey, value: V, ttl: Duration) {
        self.inner.insert(key, CacheEntry { value, ttl }).await;
    }

    /// Return the cached value for `key`, or run `fetch` and cache its result.
    ///
    /// Concurrent callers for the same key share one in-flight `fetch`; the
    /// others wait for its outcome. Errors are not cached.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `fetch`.
    pub async fn get_or_fetch<F>(&self, key: CacheKey, fetch: F) -> Result<V, SourceError>
    where
        F: Future<Output = Result<V, SourceError>> + Send,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!(source = %key.source, query = %key.query, "cache hit");
            return Ok(value);
        }

        let ttl = self.default_ttl;
        let (source, query) = (key.source, key.query.clone());
        self.inner
            .try_get_with(key, async move {
                tracing::debug!(source = %source, query = %query, "cache miss");
                fetch.await.map(|value| CacheEntry { value, ttl })
            })
            .await
            .map(|entry| entry.value)
            .map_err(|err: Arc<SourceError>| SourceError::from_shared(err))
    }

    /// Number of live entries after pending maintenance has run.
    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn key(query: &str) -> CacheKey {
        CacheKey::new(SourceId::Financial, query)
    }

    #[tokio::test]
    async fn put_then_get_returns_value() {
        let cache: CacheLayer<String> = CacheLayer::new(10, Duration::from_secs(60));
        cache
            .put(key("00743110157"), "acme".to_string(), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get(&key("00743110157")).await.as_deref(), Some("acme"));
        assert!(cache.get(&key("12345678903")).await.is_none());
    }

    #[tokio::test]
    async fn same_query_different_source_is_a_miss() {
        let cache: CacheLayer<u32> = CacheLayer::new(10, Duration::from_secs(60));
        cache.put(key("acme"), 1, Duration::from_secs(60)).await;
        assert!(cache.get(&CacheKey::new(SourceId::Seo, "acme")).await.is_none());
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache: CacheLayer<u32> = CacheLayer::new(10, Duration::from_secs(60));
        cache.put(key("short"), 1, Duration::from_millis(50)).await;
        cache.put(key("long"), 2, Duration::from_secs(60)).await;
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get(&key("short")).await.is_none());
        assert_eq!(cache.get(&key("long")).await, Some(2));
    }

    #[tokio::test]
    async fn capacity_is_bounded() {
        let cache: CacheLayer<u32> = CacheLayer::new(5, Duration::from_secs(60));
        for i in 0..50 {
            cache.put(key(&i.to_string()), i, Duration::from_secs(60)).await;
        }
        assert!(cache.entry_count().await <= 5);
    }

    #[tokio::test]
    async fn get_or_fetch_calls_fetch_once_per_key() {
        let cache: CacheLayer<u32> = CacheLayer::new(10, Duration::from_secs(60));
        let calls = Arc::new(AtomicU32::new(0));
        for _ in 0..3 {
            let c = Arc::clone(&calls);
            let value = cache
                .get_or_fetch(key("acme"), async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_duplicate_fetches_share_one_call() {
        let cache: CacheLayer<u32> = CacheLayer::new(10, Duration::from_secs(60));
        let calls = Arc::new(AtomicU32::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let c = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch(key("acme"), async move {
                        c.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(9)
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 9);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache: CacheLayer<u32> = CacheLayer::new(10, Duration::from_secs(60));
        let err = cache
            .get_or_fetch(key("acme"), async {
                Err(SourceError::Transient {
                    source_id: SourceId::Financial,
                    reason: "503".to_string(),
                })
            })
            .await
            .unwrap_err();
        assert!(err.is_transient());
        let value = cache.get_or_fetch(key("acme"), async { Ok(3) }).await.unwrap();
        assert_eq!(value, 3);
    }
}
