//! Backend address resolution.
//!
//! An explicit URL is used as-is. Otherwise the service name (and optional
//! tag) is turned into a Consul DNS name:
//!
//! ```text
//! { service = "orders", tag = "v2" } → http://v2.orders.service.consul
//! { service = "orders" }             → http://orders.service.consul
//! ```

use thiserror::Error;

use crate::config::BackendDescriptor;

const SERVICE_DOMAIN: &str = "service.consul";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend has neither a url nor a service name")]
    Unresolvable,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Resolve a backend descriptor to a base URL.
pub fn resolve_backend(backend: &BackendDescriptor) -> Result<String, BackendError> {
    if let Some(url) = non_empty(&backend.url) {
        return Ok(url.to_string());
    }

    match (non_empty(&backend.service), non_empty(&backend.tag)) {
        (Some(service), Some(tag)) => Ok(format!("http://{tag}.{service}.{SERVICE_DOMAIN}")),
        (Some(service), None) => Ok(format!("http://{service}.{SERVICE_DOMAIN}")),
        (None, _) => Err(BackendError::Unresolvable),
    }
}
