//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes with one handler per HTTP method
//! - Look up the handler for a method + path
//! - Return matched handler, method-not-allowed, or explicit no-match
//!
//! # Design Decisions
//! - Built during registration, then frozen behind an `Arc` (no locks)
//! - O(1) lookup for parameterless paths via HashMap
//! - O(n) scan over parameterized patterns (acceptable for typical route counts)
//! - Most specific pattern wins when several match

use std::collections::HashMap;

use axum::http::Method;
use thiserror::Error;

use crate::routing::matcher::{PathPattern, PatternError, Params};

/// Errors raised while inserting into the route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("{method} {route} conflicts with already registered route '{existing}'")]
    Conflict {
        method: Method,
        route: String,
        existing: String,
    },
}

/// Result of a route lookup.
#[derive(Debug)]
pub enum Lookup<H> {
    Found { handler: H, params: Params },
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

#[derive(Debug, Clone)]
struct RouteEntry<H> {
    pattern: PathPattern,
    handlers: Vec<(Method, H)>,
}

impl<H> RouteEntry<H> {
    fn handler(&self, method: &Method) -> Option<&H> {
        self.handlers
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, h)| h)
    }

    fn allowed(&self) -> Vec<Method> {
        self.handlers.iter().map(|(m, _)| m.clone()).collect()
    }
}

/// Method-aware exact/wildcard route table.
#[derive(Debug, Clone)]
pub struct RouteTable<H> {
    entries: Vec<RouteEntry<H>>,
    /// Pattern shape -> index into `entries`.
    by_shape: HashMap<String, usize>,
    /// Literal path -> index into `entries`, for parameterless patterns.
    exact: HashMap<String, usize>,
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            by_shape: HashMap::new(),
            exact: HashMap::new(),
        }
    }
}

impl<H: Clone> RouteTable<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `insert` would succeed, without modifying the table.
    pub fn check(&self, method: &Method, template: &str) -> Result<PathPattern, RouteError> {
        let pattern = PathPattern::parse(template)?;
        if let Some(&idx) = self.by_shape.get(&pattern.shape()) {
            let entry = &self.entries[idx];
            if entry.handler(method).is_some() {
                return Err(RouteError::Conflict {
                    method: method.clone(),
                    route: template.to_string(),
                    existing: entry.pattern.template().to_string(),
                });
            }
        }
        Ok(pattern)
    }

    /// Register `handler` for `method` on `template`.
    pub fn insert(&mut self, method: Method, template: &str, handler: H) -> Result<(), RouteError> {
        let pattern = self.check(&method, template)?;
        let shape = pattern.shape();

        let idx = match self.by_shape.get(&shape) {
            Some(&idx) => idx,
            None => {
                let idx = self.entries.len();
                if pattern.is_static() {
                    self.exact.insert(template.to_string(), idx);
                }
                self.entries.push(RouteEntry {
                    pattern,
                    handlers: Vec::new(),
                });
                self.by_shape.insert(shape, idx);
                idx
            }
        };

        self.entries[idx].handlers.push((method, handler));
        Ok(())
    }

    /// Find the handler for a request.
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup<H> {
        let matched = match self.exact.get(path) {
            Some(&idx) => Some((&self.entries[idx], Params::new())),
            None => self.best_match(path),
        };

        match matched {
            Some((entry, params)) => match entry.handler(method) {
                Some(handler) => Lookup::Found {
                    handler: handler.clone(),
                    params,
                },
                None => Lookup::MethodNotAllowed {
                    allowed: entry.allowed(),
                },
            },
            None => Lookup::NotFound,
        }
    }

    fn best_match(&self, path: &str) -> Option<(&RouteEntry<H>, Params)> {
        self.entries
            .iter()
            .filter(|e| !e.pattern.is_static())
            .filter_map(|e| e.pattern.matches(path).map(|p| (e, p)))
            .max_by(|(a, _), (b, _)| a.pattern.cmp_specificity(&b.pattern))
    }

    /// Number of distinct path patterns.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered templates with their methods, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&str, Vec<Method>)> {
        self.entries
            .iter()
            .map(|e| (e.pattern.template(), e.allowed()))
    }
}
