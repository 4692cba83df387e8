//! In-memory cache-aside store for upstream responses.
//!
//! Bounded by entry count with least-recently-used eviction, and by a
//! per-entry time-to-live measured from insertion. Expiry is lazy: a stale
//! entry is dropped the next time it is read.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use lru::LruCache;
use serde::Serialize;
use tokio::time::Instant;

use crate::http_client::PayloadKind;

/// No entry outlives this, whatever TTL is requested.
pub const MAX_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_JSON_TTL: Duration = Duration::from_secs(30);
pub const DEFAULT_BINARY_TTL: Duration = Duration::from_secs(60);

/// Body stored for a cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPayload {
    /// Upstream success status, replayed on hits.
    pub status: u16,
    pub kind: PayloadKind,
    pub content_type: String,
    pub body: Bytes,
}

impl CachedPayload {
    pub fn text(content_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            kind: PayloadKind::Text,
            content_type: content_type.into(),
            body: Bytes::from(body.into()),
        }
    }

    pub fn json(body: impl Into<String>) -> Self {
        Self::text("application/json; charset=utf-8", body)
    }

    pub fn binary(content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            kind: PayloadKind::Binary,
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// A stored payload together with its freshness window.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub payload: CachedPayload,
    pub inserted_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn is_fresh(&self) -> bool {
        self.inserted_at.elapsed() < self.ttl
    }

    pub fn age(&self) -> Duration {
        self.inserted_at.elapsed()
    }
}

/// Counters exposed on the health route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
struct CacheInner {
    // `None` when the store was built with zero capacity.
    map: Option<LruCache<String, CacheEntry>>,
    json_ttl: Duration,
    binary_ttl: Duration,
    hits: u64,
    misses: u64,
}

impl CacheInner {
    fn get(&mut self, key: &str) -> Option<CacheEntry> {
        let Some(map) = self.map.as_mut() else {
            self.misses += 1;
            return None;
        };

        let fresh = map.peek(key).map(CacheEntry::is_fresh);
        match fresh {
            Some(true) => {
                self.hits += 1;
                map.get(key).cloned()
            }
            Some(false) => {
                map.pop(key);
                self.misses += 1;
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    fn put(&mut self, key: String, payload: CachedPayload, ttl: Duration) {
        if let Some(map) = self.map.as_mut() {
            let entry = CacheEntry {
                key: key.clone(),
                payload,
                inserted_at: Instant::now(),
                ttl: ttl.min(MAX_TTL),
            };
            map.put(key, entry);
        }
    }

    fn ttl_for(&self, kind: PayloadKind) -> Duration {
        match kind {
            PayloadKind::Binary => self.binary_ttl,
            PayloadKind::Text => self.json_ttl,
        }
    }
}

/// Thread-safe LRU cache shared by every request for the life of the process.
///
/// Entries are replaced whole under the lock, so concurrent writers for the
/// same key leave exactly one of their values behind.
#[derive(Debug, Clone)]
pub struct CacheStore {
    inner: Arc<tokio::sync::Mutex<CacheInner>>,
    capacity: usize,
}

impl CacheStore {
    /// A store holding at most `capacity` entries. Zero disables caching.
    pub fn new(capacity: usize, json_ttl: Duration, binary_ttl: Duration) -> Self {
        let map = NonZeroUsize::new(capacity).map(LruCache::new);
        Self {
            inner: Arc::new(tokio::sync::Mutex::new(CacheInner {
                map,
                json_ttl: json_ttl.min(MAX_TTL),
                binary_ttl: binary_ttl.min(MAX_TTL),
                hits: 0,
                misses: 0,
            })),
            capacity,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(capacity, DEFAULT_JSON_TTL, DEFAULT_BINARY_TTL)
    }

    pub fn disabled() -> Self {
        Self::with_capacity(0)
    }

    /// Fresh entry for `key`, promoting it to most recently used.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.inner.lock().await.get(key)
    }

    /// Store `payload` with the TTL for its kind.
    pub async fn set(&self, key: impl Into<String>, payload: CachedPayload) {
        let mut store = self.inner.lock().await;
        let ttl = store.ttl_for(payload.kind);
        store.put(key.into(), payload, ttl);
    }

    /// Store `payload` with an explicit TTL (still capped at [`MAX_TTL`]).
    pub async fn set_with_ttl(&self, key: impl Into<String>, payload: CachedPayload, ttl: Duration) {
        self.inner.lock().await.put(key.into(), payload, ttl);
    }

    /// Drop every expired entry.
    pub async fn clear_expired(&self) -> usize {
        let mut store = self.inner.lock().await;
        let Some(map) = store.map.as_mut() else {
            return 0;
        };
        let stale: Vec<String> = map
            .iter()
            .filter(|(_, entry)| !entry.is_fresh())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            map.pop(key);
        }
        stale.len()
    }

    pub async fn clear(&self) {
        if let Some(map) = self.inner.lock().await.map.as_mut() {
            map.clear();
        }
    }

    /// Number of stored entries, including ones that expired but were not read yet.
    pub async fn len(&self) -> usize {
        self.inner
            .lock()
            .await
            .map
            .as_ref()
            .map_or(0, LruCache::len)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub const fn is_disabled(&self) -> bool {
        self.capacity == 0
    }

    pub async fn stats(&self) -> CacheStats {
        let store = self.inner.lock().await;
        CacheStats {
            entries: store.map.as_ref().map_or(0, LruCache::len),
            capacity: self.capacity,
            hits: store.hits,
            misses: store.misses,
        }
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(body: &str) -> CachedPayload {
        CachedPayload::json(body)
    }

    #[tokio::test]
    async fn test_get_after_set_returns_entry() {
        let cache = CacheStore::default();

        assert!(cache.get("key1").await.is_none());

        cache.set("key1", json("value1")).await;
        let entry = cache.get("key1").await.expect("fresh entry");
        assert_eq!(entry.key, "key1");
        assert_eq!(entry.payload.body, Bytes::from("value1"));

        cache.set("key1", json("value2")).await;
        let entry = cache.get("key1").await.expect("overwritten entry");
        assert_eq!(entry.payload.body, Bytes::from("value2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = CacheStore::new(10, Duration::from_secs(30), Duration::from_secs(60));
        cache.set("key1", json("value1")).await;

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(cache.get("key1").await.is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("key1").await.is_none());
        assert_eq!(cache.len().await, 0, "stale entry is dropped on read");
    }

    #[tokio::test(start_paused = true)]
    async fn test_binary_payloads_live_longer() {
        let cache = CacheStore::default();
        cache
            .set("img", CachedPayload::binary("image/png", vec![1_u8, 2, 3]))
            .await;
        cache.set("doc", json("{}")).await;

        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(cache.get("img").await.is_some());
        assert!(cache.get("doc").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_is_capped() {
        let cache = CacheStore::new(10, Duration::from_secs(600), Duration::from_secs(600));
        cache
            .set_with_ttl("key1", json("v"), Duration::from_secs(3600))
            .await;
        let entry = cache.get("key1").await.expect("fresh");
        assert_eq!(entry.ttl, MAX_TTL);

        tokio::time::advance(MAX_TTL).await;
        assert!(cache.get("key1").await.is_none());
    }

    #[tokio::test]
    async fn test_least_recently_used_is_evicted() {
        let cache = CacheStore::with_capacity(2);
        cache.set("a", json("1")).await;
        cache.set("b", json("2")).await;

        // Touch `a` so `b` becomes the eviction candidate.
        assert!(cache.get("a").await.is_some());
        cache.set("c", json("3")).await;

        assert!(cache.get("a").await.is_some());
        assert!(cache.get("b").await.is_none());
        assert!(cache.get("c").await.is_some());
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_expired_and_clear() {
        let cache = CacheStore::default();
        cache.set("a", json("1")).await;
        cache
            .set("b", CachedPayload::binary("image/png", vec![0_u8]))
            .await;

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cache.clear_expired().await, 1);
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_disabled_store_never_holds_entries() {
        let cache = CacheStore::disabled();
        assert!(cache.is_disabled());

        cache.set("key1", json("value1")).await;
        assert!(cache.get("key1").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_stats_count_hits_and_misses() {
        let cache = CacheStore::with_capacity(4);
        cache.set("a", json("1")).await;
        let _ = cache.get("a").await;
        let _ = cache.get("missing").await;

        let stats = cache.stats().await;
        assert_eq!(
            stats,
            CacheStats {
                entries: 1,
                capacity: 4,
                hits: 1,
                misses: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_writers_leave_one_whole_value() {
        let cache = CacheStore::default();
        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.set("same", json(&format!("value-{i}"))).await;
            }));
        }
        for handle in handles {
            handle.await.expect("writer task should not panic");
        }

        let entry = cache.get("same").await.expect("one value survives");
        let body = String::from_utf8(entry.payload.body.to_vec()).expect("utf8");
        assert!(body.starts_with("value-"));
        assert_eq!(cache.len().await, 1);
    }
}
