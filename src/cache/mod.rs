//! Response cache storage.
//!
//! # Responsibilities
//! - Store fully buffered upstream responses under a string key
//! - Expire entries after their TTL
//! - Drop a resource and all of its query variants on invalidation
//!
//! # Design Decisions
//! - The caching behaviour only depends on the [`CacheStore`] trait
//! - The in-memory store is bounded by entry count, not bytes

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;

pub mod memory;

pub use memory::MemoryCache;

/// A buffered response as stored in the cache.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CachedResponse {
    /// Rebuild a response, tagged with the given `x-cache` value.
    pub fn to_response(&self, cache_status: &'static str) -> Response {
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        response
            .headers_mut()
            .insert(X_CACHE, HeaderValue::from_static(cache_status));
        response
    }
}

/// Header reporting whether a response was served from cache.
pub const X_CACHE: &str = "x-cache";

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<CachedResponse>;

    async fn set(&self, key: String, value: CachedResponse, ttl: Duration);

    /// Remove `resource` and every entry stored as `resource?query`.
    async fn invalidate(&self, resource: &str);
}
