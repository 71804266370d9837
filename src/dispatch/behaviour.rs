//! Cross-cutting behaviours applied to every compiled route.
//!
//! A behaviour receives the current safe/unsafe handler pair for one route
//! and returns a new pair. It may wrap either handler, both, or neither.
//!
//! The dispatcher applies behaviours in registration order, each one
//! wrapping the result of the previous. The last registered behaviour is
//! therefore the outermost one and sees a request first:
//!
//! ```text
//! add_behaviour(A); add_behaviour(B); add_behaviour(C);
//!
//! request → C → B → A → rewritten route handler → proxy
//! ```

use std::sync::Arc;

use thiserror::Error;

use crate::config::{ApplicationConfig, GatewayConfig};
use crate::dispatch::handler::HandlerPair;

/// Raised by a behaviour that cannot be applied to a route.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BehaviourError {
    message: String,
}

impl BehaviourError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Route and application a behaviour is being applied to.
#[derive(Debug, Clone, Copy)]
pub struct BehaviourContext<'a> {
    /// Router template of the route.
    pub route: &'a str,
    pub app_name: &'a str,
    pub app: &'a Arc<ApplicationConfig>,
    /// Gateway configuration the dispatcher was constructed with.
    pub config: &'a Arc<GatewayConfig>,
}

pub trait Behaviour: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Wrap the handlers of one route.
    fn apply(
        &self,
        handlers: HandlerPair,
        ctx: &BehaviourContext<'_>,
    ) -> Result<HandlerPair, BehaviourError>;
}
