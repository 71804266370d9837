//! Compiled routes and routing strategy selection.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{ApplicationConfig, RoutingConfig};
use crate::dispatch::error::DispatchError;
use crate::dispatch::handler::Handler;
use crate::dispatch::{path, pattern};
use crate::proxy::Proxy;
use crate::routing::PathTemplate;

/// Resolved, read-only data shared by all routes of one application.
#[derive(Clone)]
pub struct ApplicationContext {
    pub name: Arc<str>,
    pub config: Arc<ApplicationConfig>,
    /// Base URL produced by the backend resolver.
    pub backend_url: String,
    pub proxy: Arc<dyn Proxy>,
}

/// One route template bound to a backend path template.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    /// Template registered with the route table.
    pub route: PathTemplate,
    /// Backend path template, relative to the application's base URL.
    pub target: PathTemplate,
    /// Unwrapped handler that forwards to the upstream.
    pub forwarder: Handler,
}

impl CompiledRoute {
    pub fn new(route: PathTemplate, target: PathTemplate, forwarder: Handler) -> Self {
        Self {
            route,
            target,
            forwarder,
        }
    }

    pub fn template(&self) -> &str {
        self.route.source()
    }
}

/// How an application's client paths are laid out.
#[derive(Debug, Clone, Copy)]
pub enum RoutingStrategy<'a> {
    /// Everything below a mount path goes to the backend root.
    Path { mount: &'a str },
    /// Explicit route template -> backend path template pairs.
    Pattern {
        patterns: &'a BTreeMap<String, String>,
    },
}

impl<'a> RoutingStrategy<'a> {
    pub fn from_config(app: &str, routing: &'a RoutingConfig) -> Result<Self, DispatchError> {
        match routing.kind.as_str() {
            "path" => match routing.path.as_deref() {
                Some(mount) => Ok(Self::Path { mount }),
                None => Err(DispatchError::MissingMountPath {
                    app: app.to_string(),
                }),
            },
            "pattern" if routing.patterns.is_empty() => Err(DispatchError::NoPatterns {
                app: app.to_string(),
            }),
            "pattern" => Ok(Self::Pattern {
                patterns: &routing.patterns,
            }),
            other => Err(DispatchError::UnsupportedRouting {
                app: app.to_string(),
                kind: other.to_string(),
            }),
        }
    }

    pub fn compile(&self, ctx: &ApplicationContext) -> Result<Vec<CompiledRoute>, DispatchError> {
        match self {
            Self::Path { mount } => path::compile(mount, ctx),
            Self::Pattern { patterns } => pattern::compile(patterns, ctx),
        }
    }
}
