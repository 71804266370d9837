//! Capacity-bounded in-memory cache store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::cache::{CacheStore, CachedResponse};

#[derive(Debug, Clone)]
struct Entry {
    value: CachedResponse,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// A thread-safe response cache.
///
/// When full, expired entries are purged first; if that frees nothing the
/// entry closest to expiry is evicted.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Arc<DashMap<String, Entry>>,
    capacity: usize,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn make_room(&self, now: Instant) {
        self.inner.retain(|_, entry| !entry.is_expired(now));
        if self.inner.len() < self.capacity {
            return;
        }

        let victim = self
            .inner
            .iter()
            .min_by_key(|entry| entry.value().expires_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = victim {
            self.inner.remove(&key);
            tracing::trace!(key = %key, "Evicted cache entry");
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Option<CachedResponse> {
        let now = Instant::now();
        let entry = self.inner.get(key)?;
        if entry.is_expired(now) {
            drop(entry);
            self.inner.remove_if(key, |_, e| e.is_expired(now));
            return None;
        }
        Some(entry.value.clone())
    }

    async fn set(&self, key: String, value: CachedResponse, ttl: Duration) {
        let now = Instant::now();
        if !self.inner.contains_key(&key) && self.inner.len() >= self.capacity {
            self.make_room(now);
        }
        self.inner.insert(
            key,
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    async fn invalidate(&self, resource: &str) {
        let variants = format!("{resource}?");
        self.inner
            .retain(|key, _| key != resource && !key.starts_with(&variants));
    }
}
