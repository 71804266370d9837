//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::schema::RetryConfig;

/// Delay before retry number `attempt` (1-based).
///
/// `base * 2^(attempt-1)`, capped at the configured maximum, plus up to 10%
/// random jitter.
pub fn retry_delay(attempt: u32, retries: &RetryConfig) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u64.saturating_pow(attempt - 1);
    let capped = retries
        .base_delay_ms
        .saturating_mul(factor)
        .min(retries.max_delay_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}
