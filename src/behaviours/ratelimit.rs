//! Per-client rate limiting in front of both method chains.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::response::IntoResponse;

use crate::dispatch::{
    Behaviour, BehaviourContext, BehaviourError, Handler, HandlerFuture, HandlerPair,
};
use crate::http::request::client_ip;
use crate::observability::metrics;
use crate::security::RateLimiter;

pub struct RatelimitBehaviour {
    limiter: Arc<dyn RateLimiter>,
}

impl RatelimitBehaviour {
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self { limiter }
    }
}

/// Key is the application name plus the client address.
fn limit_key(app: &str, req: &Request<Body>) -> String {
    match client_ip(req) {
        Some(ip) => format!("{app}:{ip}"),
        None => format!("{app}:unknown"),
    }
}

fn limited(limiter: Arc<dyn RateLimiter>, app: Arc<str>, inner: Handler) -> Handler {
    Handler::new(move |req: Request<Body>| -> HandlerFuture {
        let key = limit_key(&app, &req);
        if limiter.check(&key) {
            return inner.call(req);
        }

        metrics::record_rate_limited(&app);
        tracing::warn!(app = %app, client = %key, "Rate limit exceeded");
        let mut response = (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response();
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from_static("1"));
        Box::pin(async move { response })
    })
}

impl Behaviour for RatelimitBehaviour {
    fn name(&self) -> &'static str {
        "rate_limiting"
    }

    fn apply(
        &self,
        handlers: HandlerPair,
        ctx: &BehaviourContext<'_>,
    ) -> Result<HandlerPair, BehaviourError> {
        if !ctx.config.rate_limiting.enabled || ctx.app.rate_limiting.disable {
            return Ok(handlers);
        }

        let app: Arc<str> = Arc::from(ctx.app_name);
        Ok(HandlerPair {
            safe: limited(Arc::clone(&self.limiter), Arc::clone(&app), handlers.safe),
            unsafe_: limited(Arc::clone(&self.limiter), app, handlers.unsafe_),
        })
    }
}
