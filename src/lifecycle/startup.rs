//! Startup orchestration.
//!
//! # Responsibilities
//! - Select the dispatcher for the configured dispatching mode
//! - Construct the concrete behaviours and add them in order
//! - Register every configured application, then initialize
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Behaviour order is caching, authentication, rate limiting, so rate
//!   limiting is outermost and rejects before any other work

use std::sync::Arc;

use axum::Router;
use thiserror::Error;

use crate::behaviours::{AuthenticationBehaviour, CachingBehaviour, RatelimitBehaviour};
use crate::cache::MemoryCache;
use crate::config::GatewayConfig;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::proxy::Proxy;
use crate::security::auth::{authenticator_from_config, AuthConfigError};
use crate::security::TokenBucketLimiter;

/// Dispatcher implementations selectable through `dispatching_mode`.
const SUPPORTED_MODES: &[&str] = &["path"];

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("authentication: {0}")]
    Authentication(#[from] AuthConfigError),
}

/// Build a dispatcher with every application registered, not yet initialized.
pub fn build_dispatcher(
    config: Arc<GatewayConfig>,
    proxy: Arc<dyn Proxy>,
) -> Result<Dispatcher, StartupError> {
    if !SUPPORTED_MODES.contains(&config.dispatching_mode.as_str()) {
        return Err(DispatchError::UnsupportedDispatchMode(config.dispatching_mode.clone()).into());
    }

    let mut dispatcher = Dispatcher::new(Arc::clone(&config), proxy);

    let store = Arc::new(MemoryCache::new(config.caching.capacity));
    dispatcher.add_behaviour(Arc::new(CachingBehaviour::new(store, config.caching.clone())))?;

    let authenticator = authenticator_from_config(&config.authentication)?;
    dispatcher.add_behaviour(Arc::new(AuthenticationBehaviour::new(authenticator)))?;

    let limiter = Arc::new(TokenBucketLimiter::new(
        config.rate_limiting.requests_per_second,
        config.rate_limiting.burst_size,
    ));
    dispatcher.add_behaviour(Arc::new(RatelimitBehaviour::new(limiter)))?;

    for (name, app) in &config.applications {
        dispatcher.register_application(name, app.clone())?;
    }
    Ok(dispatcher)
}

/// Build the servable router for `config`.
pub fn build_gateway(
    config: Arc<GatewayConfig>,
    proxy: Arc<dyn Proxy>,
) -> Result<Router, StartupError> {
    let mut dispatcher = build_dispatcher(config, proxy)?;
    dispatcher.initialize()?;
    Ok(dispatcher.into_router()?)
}
