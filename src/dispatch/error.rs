//! Registration errors.
//!
//! Every variant raised while registering an application names the
//! application, and the route template where one is involved.

use thiserror::Error;

use crate::dispatch::backend::BackendError;
use crate::dispatch::behaviour::BehaviourError;
use crate::routing::{RouteError, TemplateError};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unsupported dispatching mode: '{0}'")]
    UnsupportedDispatchMode(String),

    #[error("dispatcher is already initialized")]
    AlreadyInitialized,

    #[error("dispatcher is not initialized")]
    NotInitialized,

    #[error("application '{app}' is already registered")]
    DuplicateApplication { app: String },

    #[error("application '{app}': {source}")]
    Backend {
        app: String,
        #[source]
        source: BackendError,
    },

    #[error("application '{app}': unsupported routing type '{kind}'")]
    UnsupportedRouting { app: String, kind: String },

    #[error("application '{app}': path routing requires a mount path")]
    MissingMountPath { app: String },

    #[error("application '{app}': pattern routing requires at least one pattern")]
    NoPatterns { app: String },

    #[error("application '{app}', route '{route}': target '{target}' must start with '/'")]
    InvalidTarget {
        app: String,
        route: String,
        target: String,
    },

    #[error(
        "application '{app}', route '{route}': target '{target}' uses parameter '{param}' \
         that the route does not capture"
    )]
    UnresolvedParameter {
        app: String,
        route: String,
        target: String,
        param: String,
    },

    #[error("application '{app}', route '{route}': {source}")]
    Template {
        app: String,
        route: String,
        #[source]
        source: TemplateError,
    },

    #[error("application '{app}', route '{route}': no rewrite rule for route")]
    MissingRewriteRule { app: String, route: String },

    #[error("application '{app}', route '{route}': {source}")]
    Route {
        app: String,
        route: String,
        #[source]
        source: RouteError,
    },

    #[error("application '{app}', route '{route}': behaviour '{behaviour}' failed: {source}")]
    Behaviour {
        app: String,
        route: String,
        behaviour: &'static str,
        #[source]
        source: BehaviourError,
    },
}
