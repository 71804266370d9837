//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum serve, request ID, tracing, request timeout)
//!     → dispatch::Dispatcher (method + path lookup, behaviour chains)
//!     → request.rs helpers (request ID, client address) used along the way
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::{client_ip, request_id, X_FORWARDED_FOR, X_REQUEST_ID};
pub use server::GatewayServer;
