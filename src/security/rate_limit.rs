//! Token bucket rate limiting.

use std::time::Instant;

use dashmap::DashMap;

/// Admits or rejects one request for a key.
pub trait RateLimiter: Send + Sync {
    fn check(&self, key: &str) -> bool;
}

/// A simple token bucket.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// One bucket per key, refilled at `requests_per_second` up to `burst_size`.
#[derive(Debug)]
pub struct TokenBucketLimiter {
    buckets: DashMap<String, TokenBucket>,
    rps: f64,
    burst: f64,
}

impl TokenBucketLimiter {
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            buckets: DashMap::new(),
            rps: f64::from(requests_per_second),
            burst: f64::from(burst_size.max(1)),
        }
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl RateLimiter for TokenBucketLimiter {
    fn check(&self, key: &str) -> bool {
        if let Some(mut bucket) = self.buckets.get_mut(key) {
            return bucket.try_acquire(self.burst, self.rps);
        }
        self.buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst))
            .try_acquire(self.burst, self.rps)
    }
}
