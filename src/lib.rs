//! Service gateway library.
//!
//! Dispatches inbound HTTP requests to per-application backends through a
//! configurable chain of behaviours.

// Core subsystems
pub mod config;
pub mod dispatch;
pub mod http;
pub mod proxy;
pub mod routing;

// Behaviours and their collaborators
pub mod behaviours;
pub mod cache;
pub mod security;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GatewayConfig;
pub use dispatch::Dispatcher;
pub use http::GatewayServer;
pub use lifecycle::{build_gateway, Shutdown};
pub use proxy::HttpProxy;
