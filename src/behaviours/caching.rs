//! Response caching for safe methods.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH};
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::cache::{CacheStore, CachedResponse, X_CACHE};
use crate::config::schema::CachingConfig;
use crate::dispatch::{Behaviour, BehaviourContext, BehaviourError, Handler, HandlerPair};
use crate::observability::metrics;

/// Serves GET/HEAD responses from a [`CacheStore`].
///
/// Only `200 OK` responses with a known `Content-Length` within
/// `max_body_bytes` are stored. `Cache-Control: no-store` or `private` on
/// the response, or `no-store`/`no-cache` on the request, bypasses the cache.
pub struct CachingBehaviour {
    store: Arc<dyn CacheStore>,
    settings: CachingConfig,
}

struct CacheScope {
    store: Arc<dyn CacheStore>,
    app: Arc<str>,
    ttl: Duration,
    max_body_bytes: usize,
}

fn cache_key(method: &Method, path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) => format!("{method} {path}?{q}"),
        None => format!("{method} {path}"),
    }
}

fn cache_control_has(headers: &HeaderMap, directives: &[&str]) -> bool {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|d| directives.iter().any(|want| d.trim().eq_ignore_ascii_case(want)))
}

/// `max-age` from the response, if present.
fn max_age(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .find_map(|d| {
            let (name, value) = d.trim().split_once('=')?;
            name.eq_ignore_ascii_case("max-age")
                .then(|| value.trim().parse::<u64>().ok())
                .flatten()
        })
        .map(Duration::from_secs)
}

fn content_length(headers: &HeaderMap) -> Option<usize> {
    headers.get(CONTENT_LENGTH)?.to_str().ok()?.parse().ok()
}

impl CacheScope {
    async fn serve(&self, inner: &Handler, req: Request<Body>) -> Response {
        if !matches!(*req.method(), Method::GET | Method::HEAD)
            || cache_control_has(req.headers(), &["no-store", "no-cache"])
        {
            return inner.call(req).await;
        }

        let key = cache_key(req.method(), req.uri().path(), req.uri().query());
        if let Some(hit) = self.store.get(&key).await {
            metrics::record_cache_event(&self.app, "hit");
            tracing::debug!(app = %self.app, key = %key, "Cache hit");
            return hit.to_response("HIT");
        }
        metrics::record_cache_event(&self.app, "miss");

        let response = inner.call(req).await;
        self.store_response(key, response).await
    }

    async fn store_response(&self, key: String, response: Response) -> Response {
        let cacheable = response.status() == StatusCode::OK
            && !cache_control_has(response.headers(), &["no-store", "private"])
            && content_length(response.headers()).is_some_and(|len| len <= self.max_body_bytes);
        let ttl = max_age(response.headers()).unwrap_or(self.ttl);

        if !cacheable || ttl.is_zero() {
            return with_cache_status(response, "MISS");
        }

        let (parts, body) = response.into_parts();
        let body = match axum::body::to_bytes(body, self.max_body_bytes).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(app = %self.app, error = %e, "Failed to buffer upstream response");
                return (StatusCode::BAD_GATEWAY, "Upstream response body failed").into_response();
            }
        };

        let entry = CachedResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        };
        let response = entry.to_response("MISS");
        self.store.set(key, entry, ttl).await;
        metrics::record_cache_event(&self.app, "store");
        response
    }

    /// Drop cached GET/HEAD entries for the path, query variants included,
    /// after a successful write.
    async fn flush_after(&self, inner: &Handler, req: Request<Body>) -> Response {
        let path = req.uri().path().to_string();
        let response = inner.call(req).await;
        if response.status().is_success() {
            for method in [Method::GET, Method::HEAD] {
                self.store.invalidate(&cache_key(&method, &path, None)).await;
            }
            metrics::record_cache_event(&self.app, "flush");
            tracing::debug!(app = %self.app, path = %path, "Flushed cached entries");
        }
        response
    }
}

fn with_cache_status(mut response: Response, status: &'static str) -> Response {
    response
        .headers_mut()
        .insert(X_CACHE, HeaderValue::from_static(status));
    response
}

impl CachingBehaviour {
    pub fn new(store: Arc<dyn CacheStore>, settings: CachingConfig) -> Self {
        Self { store, settings }
    }
}

impl Behaviour for CachingBehaviour {
    fn name(&self) -> &'static str {
        "caching"
    }

    fn apply(
        &self,
        handlers: HandlerPair,
        ctx: &BehaviourContext<'_>,
    ) -> Result<HandlerPair, BehaviourError> {
        let app = &ctx.app.caching;
        if !app.enabled {
            return Ok(handlers);
        }

        let ttl = Duration::from_secs(app.ttl_secs.unwrap_or(self.settings.default_ttl_secs));
        let scope = Arc::new(CacheScope {
            store: Arc::clone(&self.store),
            app: Arc::from(ctx.app_name),
            ttl,
            max_body_bytes: self.settings.max_body_bytes,
        });

        let HandlerPair { safe, unsafe_ } = handlers;

        let safe = {
            let scope = Arc::clone(&scope);
            Handler::new(move |req| {
                let scope = Arc::clone(&scope);
                let inner = safe.clone();
                async move { scope.serve(&inner, req).await }
            })
        };

        let unsafe_ = if app.auto_flush {
            Handler::new(move |req| {
                let scope = Arc::clone(&scope);
                let inner = unsafe_.clone();
                async move { scope.flush_after(&inner, req).await }
            })
        } else {
            unsafe_
        };

        Ok(HandlerPair { safe, unsafe_ })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::cache::MemoryCache;
    use crate::config::{ApplicationConfig, GatewayConfig};

    fn counting_backend(hits: &Arc<AtomicUsize>, cache_control: Option<&'static str>) -> Handler {
        let hits = Arc::clone(hits);
        Handler::new(move |_req| {
            let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                let body = format!("response {n}");
                let mut res = Response::new(Body::from(body.clone()));
                res.headers_mut()
                    .insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
                if let Some(cc) = cache_control {
                    res.headers_mut()
                        .insert(CACHE_CONTROL, HeaderValue::from_static(cc));
                }
                res
            }
        })
    }

    fn wrap(inner: Handler, enabled: bool, auto_flush: bool) -> HandlerPair {
        let mut app = ApplicationConfig::default();
        app.caching.enabled = enabled;
        app.caching.auto_flush = auto_flush;
        let app = Arc::new(app);
        let config = Arc::new(GatewayConfig::default());
        let ctx = BehaviourContext {
            route: "/orders/:id",
            app_name: "orders",
            app: &app,
            config: &config,
        };

        let behaviour = CachingBehaviour::new(Arc::new(MemoryCache::new(16)), CachingConfig::default());
        behaviour.apply(HandlerPair::uniform(inner), &ctx).unwrap()
    }

    fn get(path: &str) -> Request<Body> {
        Request::get(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_second_get_is_served_from_cache() {
        let hits = Arc::new(AtomicUsize::new(0));
        let pair = wrap(counting_backend(&hits, None), true, false);

        let first = pair.safe.call(get("/orders/1")).await;
        assert_eq!(first.headers()[X_CACHE], "MISS");
        let second = pair.safe.call(get("/orders/1")).await;
        assert_eq!(second.headers()[X_CACHE], "HIT");

        let body = axum::body::to_bytes(second.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"response 1");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        pair.safe.call(get("/orders/1?expand=items")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_store_is_not_cached() {
        let hits = Arc::new(AtomicUsize::new(0));
        let pair = wrap(counting_backend(&hits, Some("private, max-age=60")), true, false);

        pair.safe.call(get("/orders/1")).await;
        pair.safe.call(get("/orders/1")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_disabled_app_is_untouched() {
        let hits = Arc::new(AtomicUsize::new(0));
        let backend = counting_backend(&hits, None);
        let pair = wrap(backend.clone(), false, false);
        assert!(pair.safe.same_as(&backend));
        assert!(pair.unsafe_.same_as(&backend));
    }

    #[tokio::test]
    async fn test_unsafe_chain_only_wrapped_with_auto_flush() {
        let hits = Arc::new(AtomicUsize::new(0));
        let backend = counting_backend(&hits, None);
        let pair = wrap(backend.clone(), true, false);
        assert!(pair.unsafe_.same_as(&backend));

        let pair = wrap(backend, true, true);
        pair.safe.call(get("/orders/1")).await;
        pair.safe.call(get("/orders/1?expand=items")).await;
        let cached = pair.safe.call(get("/orders/1?expand=items")).await;
        assert_eq!(cached.headers()[X_CACHE], "HIT");
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        pair.unsafe_
            .call(Request::post("/orders/1").body(Body::empty()).unwrap())
            .await;
        let res = pair.safe.call(get("/orders/1")).await;
        assert_eq!(res.headers()[X_CACHE], "MISS");
        let res = pair.safe.call(get("/orders/1?expand=items")).await;
        assert_eq!(res.headers()[X_CACHE], "MISS");
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_max_age() {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=120"));
        assert_eq!(max_age(&headers), Some(Duration::from_secs(120)));
        assert!(!cache_control_has(&headers, &["no-store"]));
    }
}
