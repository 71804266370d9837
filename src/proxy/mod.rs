//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Route handler (after behaviours)
//!     → rewriter.rs (client path → upstream destination, attached to the request)
//!     → dispatch::forwarder (hands the request to the Proxy)
//!     → client.rs (hyper client, timeout, retries)
//!     → rewriter.rs (upstream Location headers → client paths)
//! ```
//!
//! # Design Decisions
//! - The dispatcher only depends on the [`Proxy`] trait
//! - Destinations are resolved once per request and travel in request extensions
//! - A request without a resolved destination is never forwarded

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Uri};
use axum::response::Response;

pub mod client;
pub mod rewriter;

pub use client::HttpProxy;
pub use rewriter::HostRewriter;

/// Fully qualified upstream URL for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination(pub Uri);

/// Forwards a request to a resolved upstream URL and returns its response.
#[async_trait]
pub trait Proxy: Send + Sync {
    async fn forward(&self, request: Request<Body>, destination: Uri) -> Response;
}
