//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc with the dispatcher and its behaviours
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; applications are registered once at startup
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::ApplicationConfig;
pub use schema::BackendDescriptor;
pub use schema::GatewayConfig;
pub use schema::OptionsConfig;
pub use schema::RoutingConfig;
