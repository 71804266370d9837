//! Retry decisions.
//!
//! # Design Decisions
//! - Never retry POST/PUT/DELETE/PATCH (non-idempotent)
//! - Connection errors are always retryable for safe methods
//! - Only gateway-class statuses (502, 503, 504) trigger a retry

use axum::http::{Method, StatusCode};

/// Decide whether an attempt that produced `status` (or a transport error)
/// may be repeated.
pub fn is_retryable(method: &Method, status: Option<StatusCode>, transport_error: bool) -> bool {
    if method != Method::GET && method != Method::HEAD {
        return false;
    }
    if transport_error {
        return true;
    }
    matches!(
        status,
        Some(StatusCode::BAD_GATEWAY)
            | Some(StatusCode::SERVICE_UNAVAILABLE)
            | Some(StatusCode::GATEWAY_TIMEOUT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_methods_retry_gateway_errors() {
        assert!(is_retryable(&Method::GET, Some(StatusCode::SERVICE_UNAVAILABLE), false));
        assert!(is_retryable(&Method::HEAD, None, true));
        assert!(!is_retryable(&Method::GET, Some(StatusCode::INTERNAL_SERVER_ERROR), false));
        assert!(!is_retryable(&Method::GET, Some(StatusCode::OK), false));
    }

    #[test]
    fn test_unsafe_methods_never_retry() {
        for m in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            assert!(!is_retryable(&m, None, true));
            assert!(!is_retryable(&m, Some(StatusCode::BAD_GATEWAY), false));
        }
    }
}
