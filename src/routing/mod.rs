//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (segment-wise match, parameter capture)
//!     → Return: handler + params, MethodNotAllowed, or NotFound
//!
//! Route Compilation (at startup):
//!     route templates from every application
//!     → template.rs (`:name` / `*name` captures, anchored regex)
//!     → matcher.rs (typed segments)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in the table lookup (segment matching only)
//! - Deterministic: same input always matches same route
//! - Static beats parameter beats catch-all

pub mod matcher;
pub mod router;
pub mod template;

pub use matcher::{Params, PathPattern, PatternError};
pub use router::{Lookup, RouteError, RouteTable};
pub use template::{PathTemplate, TemplateError};
