//! Route handlers and the safe/unsafe method split.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use futures_util::future::BoxFuture;

/// Future returned by a [`Handler`].
pub type HandlerFuture = BoxFuture<'static, Response>;

/// A cloneable, type-erased request handler.
///
/// Handlers are immutable once built; behaviours wrap them into new handlers
/// instead of mutating them.
#[derive(Clone)]
pub struct Handler {
    inner: Arc<dyn Fn(Request<Body>) -> HandlerFuture + Send + Sync>,
}

impl Handler {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |req| Box::pin(f(req))),
        }
    }

    pub fn call(&self, req: Request<Body>) -> HandlerFuture {
        (self.inner)(req)
    }

    /// True if both values are the same handler instance.
    pub fn same_as(&self, other: &Handler) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

/// Which chain a method is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodClass {
    /// Idempotent reads; may be served from cache.
    Safe,
    /// Mutating requests.
    Unsafe,
}

/// Every method the dispatcher registers, with the chain it uses.
///
/// OPTIONS is listed as safe; the dispatcher swaps in the dedicated handler
/// when that is enabled.
pub fn method_bindings() -> [(Method, MethodClass); 7] {
    [
        (Method::GET, MethodClass::Safe),
        (Method::HEAD, MethodClass::Safe),
        (Method::POST, MethodClass::Unsafe),
        (Method::PUT, MethodClass::Unsafe),
        (Method::PATCH, MethodClass::Unsafe),
        (Method::DELETE, MethodClass::Unsafe),
        (Method::OPTIONS, MethodClass::Safe),
    ]
}

impl MethodClass {
    pub fn of(method: &Method) -> Option<Self> {
        method_bindings()
            .into_iter()
            .find(|(m, _)| m == method)
            .map(|(_, class)| class)
    }
}

/// The two fully wrapped chains produced for one route.
#[derive(Debug, Clone)]
pub struct HandlerPair {
    pub safe: Handler,
    pub unsafe_: Handler,
}

impl HandlerPair {
    /// Both chains start as the same handler.
    pub fn uniform(handler: Handler) -> Self {
        Self {
            safe: handler.clone(),
            unsafe_: handler,
        }
    }

    pub fn for_class(&self, class: MethodClass) -> &Handler {
        match class {
            MethodClass::Safe => &self.safe,
            MethodClass::Unsafe => &self.unsafe_,
        }
    }
}
