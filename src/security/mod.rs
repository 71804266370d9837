//! Security collaborators used by the request behaviours.
//!
//! # Data Flow
//! ```text
//! Incoming request (after route match):
//!     → rate_limit.rs (admit or reject per app + client key)
//!     → auth.rs (allow, deny, or annotate with the caller's identity)
//!     → Continue to the route handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: a denied or rejected request never reaches the backend
//! - State is in memory and per process
//! - No trust in client input: annotations overwrite client-sent headers

pub mod auth;
pub mod rate_limit;

pub use auth::{AuthDecision, AuthRequest, Authenticator, BearerTokenAuthenticator};
pub use rate_limit::{RateLimiter, TokenBucketLimiter};
