//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend (proxy::client):
//!     → upstream timeout (504 on expiry)
//!     → On failure: retries.rs (check if retryable)
//!     → backoff.rs (exponential delay with jitter before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - Retries only for safe requests without a body
//! - Jittered backoff prevents thundering herd

pub mod backoff;
pub mod retries;
