//! HTTP forwarding to upstream services.
//!
//! # Responsibilities
//! - Rebuild the client request for the upstream destination
//! - Strip hop-by-hop headers in both directions
//! - Append `X-Forwarded-For` and propagate the request ID
//! - Enforce the upstream timeout and retry safe requests

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::ConnectInfo;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{request::Parts, Method, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::config::schema::{ProxyOptions, RetryConfig};
use crate::http::request::{request_id, X_FORWARDED_FOR};
use crate::observability::metrics;
use crate::proxy::Proxy;
use crate::resilience::backoff::retry_delay;
use crate::resilience::retries::is_retryable;

/// Bodies of retryable requests are buffered up to this size.
const MAX_RETRY_BODY: usize = 1024 * 1024;

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}

/// [`Proxy`] implementation backed by a pooled hyper client.
#[derive(Clone)]
pub struct HttpProxy {
    client: Client<HttpConnector, Body>,
    upstream_timeout: Duration,
    retries: RetryConfig,
}

impl HttpProxy {
    pub fn new(options: &ProxyOptions) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            upstream_timeout: Duration::from_secs(options.timeouts.upstream_secs),
            retries: options.retries.clone(),
        }
    }

    fn upstream_headers(parts: &Parts, forwarded_for: Option<String>) -> HeaderMap {
        let mut headers = parts.headers.clone();
        strip_hop_by_hop(&mut headers);
        // hyper derives Host from the destination URI.
        headers.remove(header::HOST);

        if let Some(value) = forwarded_for.and_then(|v| HeaderValue::from_str(&v).ok()) {
            headers.insert(X_FORWARDED_FOR, value);
        }
        headers
    }

    fn build_request(
        method: &Method,
        destination: &Uri,
        headers: &HeaderMap,
        body: Body,
    ) -> Result<Request<Body>, axum::http::Error> {
        let mut builder = Request::builder().method(method.clone()).uri(destination.clone());
        if let Some(h) = builder.headers_mut() {
            *h = headers.clone();
        }
        builder.body(body)
    }

    async fn send(&self, req: Request<Body>) -> Result<Response, StatusCode> {
        match tokio::time::timeout(self.upstream_timeout, self.client.request(req)).await {
            Ok(Ok(response)) => {
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Ok(Response::from_parts(parts, Body::new(body)))
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Upstream error");
                Err(StatusCode::BAD_GATEWAY)
            }
            Err(_) => {
                tracing::error!(timeout = ?self.upstream_timeout, "Upstream timed out");
                Err(StatusCode::GATEWAY_TIMEOUT)
            }
        }
    }

    fn failure(status: StatusCode) -> Response {
        let message = if status == StatusCode::GATEWAY_TIMEOUT {
            "Upstream request timed out"
        } else {
            "Upstream request failed"
        };
        (status, message).into_response()
    }
}

#[async_trait]
impl Proxy for HttpProxy {
    async fn forward(&self, request: Request<Body>, destination: Uri) -> Response {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let forwarded_for = peer.map(|ip| {
            match request.headers().get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
                Some(existing) => format!("{existing}, {ip}"),
                None => ip.to_string(),
            }
        });
        let request_id = request_id(&request).to_string();
        let (parts, body) = request.into_parts();
        let method = parts.method.clone();
        let headers = Self::upstream_headers(&parts, forwarded_for);

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            upstream = %destination,
            "Forwarding request"
        );

        let retrying = self.retries.enabled && is_retryable(&method, None, true);
        if !retrying {
            let req = match Self::build_request(&method, &destination, &headers, body) {
                Ok(req) => req,
                Err(e) => {
                    tracing::error!(request_id = %request_id, error = %e, "Invalid upstream request");
                    return Self::failure(StatusCode::BAD_GATEWAY);
                }
            };
            return self.send(req).await.unwrap_or_else(Self::failure);
        }

        let body: Bytes = match axum::body::to_bytes(body, MAX_RETRY_BODY).await {
            Ok(bytes) => bytes,
            Err(_) => return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response(),
        };

        let max_attempts = self.retries.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let req = match Self::build_request(&method, &destination, &headers, Body::from(body.clone())) {
                Ok(req) => req,
                Err(e) => {
                    tracing::error!(request_id = %request_id, error = %e, "Invalid upstream request");
                    return Self::failure(StatusCode::BAD_GATEWAY);
                }
            };

            let outcome = self.send(req).await;
            let retry = attempt < max_attempts
                && match &outcome {
                    Ok(response) => is_retryable(&method, Some(response.status()), false),
                    Err(_) => is_retryable(&method, None, true),
                };

            if !retry {
                return outcome.unwrap_or_else(Self::failure);
            }

            let delay = retry_delay(attempt, &self.retries);
            tracing::info!(request_id = %request_id, attempt, delay = ?delay, "Retrying upstream request");
            metrics::record_upstream_retry();
            tokio::time::sleep(delay).await;
        }
    }
}
