//! Concrete behaviours applied by the dispatcher to every route.
//!
//! # Data Flow
//! ```text
//! Registered in this order (each wraps the previous):
//!     caching.rs         (safe chain; unsafe chain when auto_flush is set)
//!     authentication.rs  (both chains)
//!     ratelimit.rs       (both chains, outermost)
//!
//! Request: ratelimit → authentication → caching → rewriter → proxy
//! ```
//!
//! # Design Decisions
//! - Per-application opt-in/opt-out is decided at registration time; a
//!   behaviour that does not apply returns the handlers unchanged
//! - Collaborators (store, authenticator, limiter) are trait objects

pub mod authentication;
pub mod caching;
pub mod ratelimit;

pub use authentication::AuthenticationBehaviour;
pub use caching::CachingBehaviour;
pub use ratelimit::RatelimitBehaviour;
