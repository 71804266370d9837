//! Request dispatching core.
//!
//! # Data Flow
//! ```text
//! Registration (startup, single-threaded):
//!     ApplicationConfig
//!     → backend.rs (explicit URL or Consul service name → base URL)
//!     → route.rs (select strategy: path.rs or pattern.rs → CompiledRoute list)
//!     → proxy::HostRewriter (one per application, decorates each forwarder)
//!     → behaviour.rs (each behaviour wraps the safe/unsafe pair, in order)
//!     → handler.rs method table (GET/HEAD/OPTIONS → safe, the rest → unsafe)
//!     → options.rs (replaces OPTIONS when enabled)
//!     → RouteTable
//!
//! Serving (after initialize, lock-free):
//!     Request → RouteTable lookup → behaviours → rewriter → forwarder.rs → Proxy
//! ```
//!
//! # Design Decisions
//! - Handlers are immutable values; behaviours return new handlers
//! - All per-route data is resolved at registration time
//! - Registration errors name the application and route, and abort startup

pub mod backend;
pub mod behaviour;
pub mod dispatcher;
pub mod error;
pub mod forwarder;
pub mod handler;
pub mod options;
pub mod path;
pub mod pattern;
pub mod route;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{resolve_backend, BackendError};
pub use behaviour::{Behaviour, BehaviourContext, BehaviourError};
pub use dispatcher::{Dispatcher, Phase};
pub use error::DispatchError;
pub use handler::{method_bindings, Handler, HandlerFuture, HandlerPair, MethodClass};
pub use route::{ApplicationContext, CompiledRoute, RoutingStrategy};
