//! Dispatcher supervisor.
//!
//! Owns the applications, the behaviour list and the route table, and moves
//! through a one-way lifecycle:
//!
//! ```text
//! Constructed → Registering → Initialized (serving)
//! ```
//!
//! All mutation happens before `initialize`. Afterwards the route table is
//! frozen behind an `Arc` and read concurrently without locks.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::ALLOW;
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::config::{ApplicationConfig, GatewayConfig};
use crate::dispatch::backend::resolve_backend;
use crate::dispatch::behaviour::{Behaviour, BehaviourContext};
use crate::dispatch::error::DispatchError;
use crate::dispatch::handler::{method_bindings, Handler, HandlerPair};
use crate::dispatch::options::options_handler;
use crate::dispatch::route::{ApplicationContext, CompiledRoute, RoutingStrategy};
use crate::proxy::{HostRewriter, Proxy};
use crate::routing::{Lookup, RouteTable};

/// Observable lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing registered yet.
    Constructed,
    /// Behaviours or applications have been added.
    Registering,
    /// Frozen and serving; no further registration.
    Initialized,
}

enum State {
    Registering(RouteTable<Handler>),
    Serving(Arc<RouteTable<Handler>>),
}

pub struct Dispatcher {
    config: Arc<GatewayConfig>,
    proxy: Arc<dyn Proxy>,
    behaviours: Vec<Arc<dyn Behaviour>>,
    applications: BTreeMap<String, Arc<ApplicationConfig>>,
    /// Dedicated OPTIONS handler, when enabled gateway-wide.
    options: Option<Handler>,
    state: State,
}

impl Dispatcher {
    pub fn new(config: Arc<GatewayConfig>, proxy: Arc<dyn Proxy>) -> Self {
        let options = config
            .proxy
            .options
            .enabled
            .then(|| options_handler(&config.proxy.options));

        Self {
            config,
            proxy,
            behaviours: Vec::new(),
            applications: BTreeMap::new(),
            options,
            state: State::Registering(RouteTable::new()),
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Serving(_) => Phase::Initialized,
            State::Registering(_) if self.behaviours.is_empty() && self.applications.is_empty() => {
                Phase::Constructed
            }
            State::Registering(_) => Phase::Registering,
        }
    }

    /// Append a behaviour. It applies to applications registered afterwards.
    pub fn add_behaviour(&mut self, behaviour: Arc<dyn Behaviour>) -> Result<(), DispatchError> {
        if let State::Serving(_) = self.state {
            return Err(DispatchError::AlreadyInitialized);
        }
        tracing::debug!(behaviour = behaviour.name(), position = self.behaviours.len(), "Added behaviour");
        self.behaviours.push(behaviour);
        Ok(())
    }

    /// Compile, wrap and register every route of one application.
    ///
    /// The global configuration is the one given to [`Dispatcher::new`];
    /// behaviours see it as [`BehaviourContext::config`].
    ///
    /// Registration is atomic: on error none of the application's routes
    /// are kept.
    pub fn register_application(
        &mut self,
        name: &str,
        app: ApplicationConfig,
    ) -> Result<(), DispatchError> {
        let State::Registering(table) = &self.state else {
            return Err(DispatchError::AlreadyInitialized);
        };
        if self.applications.contains_key(name) {
            return Err(DispatchError::DuplicateApplication {
                app: name.to_string(),
            });
        }

        let backend_url = resolve_backend(&app.backend).map_err(|source| DispatchError::Backend {
            app: name.to_string(),
            source,
        })?;
        let app = Arc::new(app);
        let ctx = ApplicationContext {
            name: Arc::from(name),
            config: Arc::clone(&app),
            backend_url,
            proxy: Arc::clone(&self.proxy),
        };

        let routes = RoutingStrategy::from_config(name, &app.routing)?.compile(&ctx)?;

        let mapping = routes
            .iter()
            .map(|r| (r.route.clone(), r.target.clone()))
            .collect();
        let rewriter = HostRewriter::new(&ctx.backend_url, mapping).map_err(|source| {
            DispatchError::Template {
                app: name.to_string(),
                route: source.template().to_string(),
                source,
            }
        })?;
        let rewriter = Arc::new(rewriter);

        let mut staged = table.clone();
        for route in &routes {
            let handlers = self.wrap_route(name, &app, route, &rewriter)?;
            self.bind_methods(&mut staged, name, route, &handlers)?;
            tracing::debug!(
                app = name,
                route = route.template(),
                target = route.target.source(),
                "Registered route"
            );
        }

        tracing::info!(
            app = name,
            backend = %ctx.backend_url,
            routing = %app.routing.kind,
            routes = routes.len(),
            "Registered application"
        );
        self.state = State::Registering(staged);
        self.applications.insert(name.to_string(), app);
        Ok(())
    }

    /// Rewrite the route's forwarder, then run every behaviour over it.
    fn wrap_route(
        &self,
        name: &str,
        app: &Arc<ApplicationConfig>,
        route: &CompiledRoute,
        rewriter: &Arc<HostRewriter>,
    ) -> Result<HandlerPair, DispatchError> {
        let ctx = BehaviourContext {
            route: route.template(),
            app_name: name,
            app,
            config: &self.config,
        };

        let rewritten = rewriter
            .decorate(route.template(), route.forwarder.clone())
            .ok_or_else(|| DispatchError::MissingRewriteRule {
                app: name.to_string(),
                route: route.template().to_string(),
            })?;

        let mut handlers = HandlerPair::uniform(rewritten);
        for behaviour in &self.behaviours {
            handlers = behaviour
                .apply(handlers, &ctx)
                .map_err(|source| DispatchError::Behaviour {
                    app: name.to_string(),
                    route: route.template().to_string(),
                    behaviour: behaviour.name(),
                    source,
                })?;
        }
        Ok(handlers)
    }

    fn bind_methods(
        &self,
        table: &mut RouteTable<Handler>,
        name: &str,
        route: &CompiledRoute,
        handlers: &HandlerPair,
    ) -> Result<(), DispatchError> {
        for (method, class) in method_bindings() {
            let handler = match &self.options {
                Some(options) if method == Method::OPTIONS => options.clone(),
                _ => handlers.for_class(class).clone(),
            };
            table
                .insert(method, route.template(), handler)
                .map_err(|source| DispatchError::Route {
                    app: name.to_string(),
                    route: route.template().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Freeze the route table. Calling it again is a no-op.
    pub fn initialize(&mut self) -> Result<(), DispatchError> {
        match &mut self.state {
            State::Registering(table) => {
                let table = std::mem::take(table);
                tracing::info!(
                    applications = self.applications.len(),
                    routes = table.len(),
                    behaviours = self.behaviours.len(),
                    "Dispatcher initialized"
                );
                self.state = State::Serving(Arc::new(table));
            }
            State::Serving(_) => tracing::debug!("Dispatcher already initialized"),
        }
        Ok(())
    }

    /// Handle one request. Answers 503 until the dispatcher is initialized.
    pub async fn handle(&self, req: Request<Body>) -> Response {
        match &self.state {
            State::Serving(table) => dispatch(table, req).await,
            State::Registering(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Gateway is not initialized").into_response()
            }
        }
    }

    /// Single entry point accepting every method and path.
    pub fn into_router(&self) -> Result<Router, DispatchError> {
        let State::Serving(table) = &self.state else {
            return Err(DispatchError::NotInitialized);
        };
        let table = Arc::clone(table);
        Ok(Router::new().fallback(move |req: Request<Body>| {
            let table = Arc::clone(&table);
            async move { dispatch(&table, req).await }
        }))
    }

    /// Names of the registered applications, in order.
    pub fn applications(&self) -> impl Iterator<Item = &str> {
        self.applications.keys().map(String::as_str)
    }

    /// Registered route templates with their methods.
    pub fn routes(&self) -> Vec<(String, Vec<Method>)> {
        let table = match &self.state {
            State::Registering(table) => table,
            State::Serving(table) => table.as_ref(),
        };
        table
            .routes()
            .map(|(template, methods)| (template.to_string(), methods))
            .collect()
    }
}

async fn dispatch(table: &RouteTable<Handler>, mut req: Request<Body>) -> Response {
    match table.lookup(req.method(), req.uri().path()) {
        Lookup::Found { handler, params } => {
            req.extensions_mut().insert(params);
            handler.call(req).await
        }
        Lookup::MethodNotAllowed { allowed } => {
            tracing::debug!(method = %req.method(), path = %req.uri().path(), "Method not allowed");
            let allow = allowed
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            (StatusCode::METHOD_NOT_ALLOWED, [(ALLOW, allow)]).into_response()
        }
        Lookup::NotFound => {
            tracing::debug!(method = %req.method(), path = %req.uri().path(), "No route matched");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
