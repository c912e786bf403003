//! Pluggable response cache with time-to-live expiry.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

/// A cached response body and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: String,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Key/value store for previously-seen response bodies.
///
/// No transactional semantics are assumed: concurrent writes to the same key
/// may race, and an implementation may drop entries at any time. The request
/// executor re-checks expiry itself and falls back to a network fetch
/// whenever an entry is missing, expired, or unreadable.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<CacheEntry>;
    async fn set(&self, key: &str, value: String, ttl: Duration);
}

/// Cache that stores nothing. Every request goes to the network.
pub struct NoopCache;

#[async_trait]
impl Cache for NoopCache {
    async fn get(&self, _key: &str) -> Option<CacheEntry> {
        None
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) {}
}

/// Thread-safe in-memory cache with per-entry time-to-live expiration.
///
/// Expired entries are lazily evicted on the next `get` call for that key.
/// Expiry is tracked with `tokio::time::Instant` so tests can drive it with a
/// paused clock.
#[derive(Default)]
pub struct MemoryCache {
    store: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    /// Removes all entries from the cache.
    pub fn clear(&self) {
        self.store.clear();
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<CacheEntry> {
        let entry = self.store.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.store.remove(key);
            return None;
        }
        Some(entry.clone())
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        self.store.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}
