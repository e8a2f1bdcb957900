//! In-process LRU response cache with per-entry TTL.
//!
//! Used when no Redis is configured for a single-instance deployment, and as
//! the in-memory stand-in for the cache in tests. Entries expire lazily on
//! read; the oldest entries are evicted once `max_entries` is reached.

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::{ResponseCache, LARGE_PAYLOAD_BYTES};
use crate::cache_key::CacheKey;

struct CachedResponse {
    data: Bytes,
    inserted_at: Instant,
    ttl: Duration,
}

impl CachedResponse {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() >= self.ttl
    }
}

/// Hit/miss counters for the memory cache.
#[derive(Debug, Default)]
pub struct MemoryCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    /// Entries dropped on read because their TTL had passed
    pub expired: AtomicU64,
}

impl MemoryCacheStats {
    /// Cache hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}

pub struct MemoryCache {
    entries: Mutex<LruCache<String, CachedResponse>>,
    stats: MemoryCacheStats,
}

impl MemoryCache {
    /// Create a cache holding at most `max_entries` responses.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            stats: MemoryCacheStats::default(),
        }
    }

    pub fn stats(&self) -> &MemoryCacheStats {
        &self.stats
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Option<Bytes> {
        let mut entries = self.entries.lock().await;

        let expired = match entries.get(key.as_str()) {
            Some(entry) => entry.is_expired(),
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Cache MISS");
                return None;
            }
        };

        if expired {
            entries.pop(key.as_str());
            self.stats.expired.fetch_add(1, Ordering::Relaxed);
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache entry expired");
            return None;
        }

        self.stats.hits.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Cache HIT");
        entries.peek(key.as_str()).map(|entry| entry.data.clone())
    }

    async fn set(&self, key: &CacheKey, value: Bytes, ttl: Duration) {
        if value.len() > LARGE_PAYLOAD_BYTES {
            warn!(size = value.len(), "Cache data is very large");
        }

        let entry = CachedResponse {
            data: value,
            inserted_at: Instant::now(),
            ttl,
        };
        self.entries.lock().await.put(key.as_str().to_string(), entry);
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_key::{CacheKeyCodec, CacheValue};

    fn key(name: &str) -> CacheKey {
        CacheKeyCodec::encode([("name", CacheValue::from(name))])
    }

    #[tokio::test]
    async fn test_round_trip_before_expiry() {
        let cache = MemoryCache::new(16);
        assert!(cache.is_empty().await);
        assert!(cache.get(&key("a")).await.is_none());

        let data = Bytes::from_static(b"{\"products\":{}}");
        cache.set(&key("a"), data.clone(), Duration::from_secs(60)).await;

        assert_eq!(cache.get(&key("a")).await, Some(data));
        assert_eq!(cache.stats().hits.load(Ordering::Relaxed), 1);
        assert_eq!(cache.stats().misses.load(Ordering::Relaxed), 1);
        assert_eq!(cache.stats().hit_rate(), 50.0);
    }

    #[tokio::test]
    async fn test_entry_absent_after_ttl() {
        let cache = MemoryCache::new(16);
        cache
            .set(&key("a"), Bytes::from_static(b"x"), Duration::from_millis(50))
            .await;
        assert!(cache.get(&key("a")).await.is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cache.get(&key("a")).await.is_none());
        assert_eq!(cache.stats().expired.load(Ordering::Relaxed), 1);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache = MemoryCache::new(2);
        let ttl = Duration::from_secs(60);
        cache.set(&key("a"), Bytes::from_static(b"1"), ttl).await;
        cache.set(&key("b"), Bytes::from_static(b"2"), ttl).await;
        cache.set(&key("c"), Bytes::from_static(b"3"), ttl).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(&key("a")).await.is_none());
        assert!(cache.get(&key("c")).await.is_some());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let cache = MemoryCache::new(4);
        let ttl = Duration::from_secs(60);
        cache.set(&key("a"), Bytes::from_static(b"old"), ttl).await;
        cache.set(&key("a"), Bytes::from_static(b"new"), ttl).await;
        assert_eq!(cache.get(&key("a")).await, Some(Bytes::from_static(b"new")));
    }
}
