//! Host rewriting between client paths and upstream URLs.
//!
//! One rewriter exists per application and is shared by all of its routes.
//! It is built from (route template, target template) pairs. Each route's
//! handler is decorated with the rule for that route, so the destination
//! always comes from the route the table matched, filled with the
//! parameters the table captured:
//!
//! ```text
//! request:  /orders/42 (id=42)       --rule "/orders/:id"-->  http://backend/v1/orders/42
//! response: Location: http://backend/v1/orders/43  --target regex-->  /orders/43
//! ```

use std::cmp::Reverse;
use std::sync::Arc;

use axum::http::header::{CONTENT_LOCATION, LOCATION};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::IntoResponse;
use regex::{Captures, Regex};

use crate::dispatch::handler::Handler;
use crate::proxy::Destination;
use crate::routing::template::{PathTemplate, TemplateError};
use crate::routing::Params;

#[derive(Debug)]
struct Rule {
    route: PathTemplate,
    route_regex: Regex,
    target: PathTemplate,
    target_regex: Regex,
}

/// Maps inbound paths to upstream destinations and back.
#[derive(Debug)]
pub struct HostRewriter {
    backend_url: String,
    rules: Vec<Rule>,
}

fn capture_lookup<'c, 'h>(caps: &'c Captures<'h>) -> impl Fn(&str) -> Option<&'h str> + 'c {
    move |name| caps.name(name).map(|m| m.as_str())
}

impl HostRewriter {
    /// Build a rewriter for `backend_url` from (route, target) template pairs.
    ///
    /// Every parameter of a target must be captured by its route.
    pub fn new(
        backend_url: &str,
        mapping: Vec<(PathTemplate, PathTemplate)>,
    ) -> Result<Self, TemplateError> {
        let mut rules = Vec::with_capacity(mapping.len());
        for (route, target) in mapping {
            if let Some(name) = target.missing_from(&route).next() {
                return Err(TemplateError::UnresolvedParameter {
                    template: target.source().to_string(),
                    name: name.to_string(),
                });
            }
            rules.push(Rule {
                route_regex: route.to_regex()?,
                target_regex: target.to_regex()?,
                route,
                target,
            });
        }

        // Most specific target first for the response direction.
        rules.sort_by_key(|rule| Reverse(rule.target.specificity()));

        Ok(Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            rules,
        })
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    fn rule_index(&self, route: &str) -> Option<usize> {
        self.rules.iter().position(|rule| rule.route.source() == route)
    }

    /// Resolve the upstream destination of `route` for an inbound request.
    ///
    /// Parameters come from `params` when the route table supplied them,
    /// otherwise from matching the path against `route` itself. Returns
    /// `None` when `route` has no rule or the path does not fit it; callers
    /// must not forward then.
    pub fn resolve(&self, route: &str, uri: &Uri, params: Option<&Params>) -> Option<Destination> {
        self.resolve_rule(&self.rules[self.rule_index(route)?], uri, params)
    }

    fn resolve_rule(&self, rule: &Rule, uri: &Uri, params: Option<&Params>) -> Option<Destination> {
        let expanded = match params {
            Some(params) => rule.target.expand(|name| params.get(name)).ok()?,
            None => {
                let caps = rule.route_regex.captures(uri.path())?;
                rule.target.expand(capture_lookup(&caps)).ok()?
            }
        };

        let mut url = format!("{}{}", self.backend_url, expanded);
        if let Some(query) = uri.query() {
            url.push('?');
            url.push_str(query);
        }

        match url.parse::<Uri>() {
            Ok(uri) => Some(Destination(uri)),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Rewritten destination is not a valid URI");
                None
            }
        }
    }

    /// Map an upstream path back to the client-facing path.
    pub fn to_client(&self, upstream_path: &str) -> Option<String> {
        self.rules.iter().find_map(|rule| {
            let caps = rule.target_regex.captures(upstream_path)?;
            rule.route.expand(capture_lookup(&caps)).ok()
        })
    }

    /// Rewrite a `Location`-style header value, if it points at the backend.
    fn rewrite_location(&self, value: &str) -> Option<String> {
        let local = match value.strip_prefix(self.backend_url.as_str()) {
            Some(rest) if rest.is_empty() => "/",
            Some(rest) if rest.starts_with('/') || rest.starts_with('?') => rest,
            Some(_) => return None,
            None if value.starts_with('/') => value,
            None => return None,
        };

        let (path, query) = match local.split_once('?') {
            Some((p, q)) => (if p.is_empty() { "/" } else { p }, Some(q)),
            None => (local, None),
        };

        let mut client = self.to_client(path)?;
        if let Some(q) = query {
            client.push('?');
            client.push_str(q);
        }
        Some(client)
    }

    /// Rewrite upstream `Location` and `Content-Location` headers in place.
    pub fn rewrite_response_headers(&self, headers: &mut HeaderMap) {
        for name in [LOCATION, CONTENT_LOCATION] {
            let Some(rewritten) = headers
                .get(&name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| self.rewrite_location(v))
            else {
                continue;
            };
            if let Ok(value) = HeaderValue::from_str(&rewritten) {
                headers.insert(name, value);
            }
        }
    }

    /// Wrap the handler of `route` so it receives the resolved
    /// [`Destination`] and its response headers are mapped back to client
    /// paths.
    ///
    /// Returns `None` when the rewriter has no rule for `route`. Requests
    /// that resolve to no destination are answered with 502.
    pub fn decorate(self: &Arc<Self>, route: &str, inner: Handler) -> Option<Handler> {
        let index = self.rule_index(route)?;
        let rewriter = Arc::clone(self);
        Some(Handler::new(move |mut req| {
            let rewriter = Arc::clone(&rewriter);
            let inner = inner.clone();
            async move {
                let rule = &rewriter.rules[index];
                let destination = rewriter.resolve_rule(rule, req.uri(), req.extensions().get::<Params>());
                let Some(destination) = destination else {
                    tracing::warn!(
                        path = %req.uri().path(),
                        route = %rule.route.source(),
                        backend = %rewriter.backend_url,
                        "Request does not fit its route's rewrite rule; refusing to forward"
                    );
                    return (StatusCode::BAD_GATEWAY, "No upstream destination for request")
                        .into_response();
                };

                req.extensions_mut().insert(destination);
                let mut response = inner.call(req).await;
                rewriter.rewrite_response_headers(response.headers_mut());
                response
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    fn pair(route: &str, target: &str) -> (PathTemplate, PathTemplate) {
        (
            PathTemplate::parse(route).unwrap(),
            PathTemplate::parse(target).unwrap(),
        )
    }

    fn orders() -> HostRewriter {
        HostRewriter::new(
            "http://orders.service.consul/",
            vec![
                pair("/orders/:id", "/v1/orders/:id"),
                pair("/customers/:customer/orders", "/v1/orders/by-customer/:customer"),
            ],
        )
        .unwrap()
    }

    fn mount() -> HostRewriter {
        HostRewriter::new(
            "http://static.internal",
            vec![pair("/assets", "/"), pair("/assets/*path", "/*path")],
        )
        .unwrap()
    }

    fn uri(path: &str) -> Uri {
        path.parse().unwrap()
    }

    #[test]
    fn test_resolve_pattern() {
        let dest = orders()
            .resolve("/orders/:id", &uri("/orders/42?expand=items"), None)
            .unwrap();
        assert_eq!(dest.0.to_string(), "http://orders.service.consul/v1/orders/42?expand=items");
    }

    #[test]
    fn test_resolve_mount() {
        let rw = mount();
        let exact = rw.resolve("/assets", &uri("/assets"), None).unwrap();
        assert_eq!(exact.0.to_string(), "http://static.internal/");

        let nested = rw
            .resolve("/assets/*path", &uri("/assets/css/site.css"), None)
            .unwrap();
        assert_eq!(nested.0.to_string(), "http://static.internal/css/site.css");
    }

    #[test]
    fn test_resolve_uses_the_given_route() {
        let rw = HostRewriter::new(
            "http://b",
            vec![pair("/a/:x/c", "/first/:x"), pair("/a/b/:y", "/second/:y")],
        )
        .unwrap();

        let second = rw.resolve("/a/b/:y", &uri("/a/b/c"), None).unwrap();
        assert_eq!(second.0.to_string(), "http://b/second/c");
        let first = rw.resolve("/a/:x/c", &uri("/a/b/c"), None).unwrap();
        assert_eq!(first.0.to_string(), "http://b/first/b");
    }

    #[test]
    fn test_resolve_prefers_table_params() {
        let mut params = Params::new();
        params.push("id", "7");
        let dest = orders()
            .resolve("/orders/:id", &uri("/orders/42"), Some(&params))
            .unwrap();
        assert_eq!(dest.0.to_string(), "http://orders.service.consul/v1/orders/7");

        let empty = Params::new();
        assert!(orders()
            .resolve("/orders/:id", &uri("/orders/42"), Some(&empty))
            .is_none());
    }

    #[test]
    fn test_resolve_miss() {
        let rw = orders();
        assert!(rw.resolve("/orders/:id", &uri("/invoices/1"), None).is_none());
        assert!(rw.resolve("/invoices/:id", &uri("/invoices/1"), None).is_none());
    }

    #[test]
    fn test_unresolved_target_parameter() {
        let err = HostRewriter::new("http://x", vec![pair("/orders", "/v1/orders/:id")]).unwrap_err();
        assert!(matches!(err, TemplateError::UnresolvedParameter { ref name, .. } if name == "id"));
    }

    #[test]
    fn test_to_client() {
        let rw = orders();
        assert_eq!(rw.to_client("/v1/orders/7").as_deref(), Some("/orders/7"));
        assert_eq!(
            rw.to_client("/v1/orders/by-customer/c1").as_deref(),
            Some("/customers/c1/orders")
        );
        assert_eq!(rw.to_client("/v2/other"), None);

        let rw = mount();
        assert_eq!(rw.to_client("/").as_deref(), Some("/assets"));
        assert_eq!(rw.to_client("/img/a.png").as_deref(), Some("/assets/img/a.png"));
    }

    #[test]
    fn test_rewrite_location_headers() {
        let rw = orders();
        let mut headers = HeaderMap::new();
        headers.insert(
            LOCATION,
            HeaderValue::from_static("http://orders.service.consul/v1/orders/43?x=1"),
        );
        headers.insert(CONTENT_LOCATION, HeaderValue::from_static("https://elsewhere/v1/orders/1"));

        rw.rewrite_response_headers(&mut headers);
        assert_eq!(headers[LOCATION], "/orders/43?x=1");
        assert_eq!(headers[CONTENT_LOCATION], "https://elsewhere/v1/orders/1");
    }

    #[tokio::test]
    async fn test_decorate_attaches_destination() {
        let rw = Arc::new(orders());
        let inner = Handler::new(|req: Request<Body>| async move {
            let dest = req.extensions().get::<Destination>().cloned();
            let mut res = dest.unwrap().0.to_string().into_response();
            res.headers_mut().insert(
                LOCATION,
                HeaderValue::from_static("http://orders.service.consul/v1/orders/99"),
            );
            res
        });
        let handler = rw.decorate("/orders/:id", inner).unwrap();

        let res = handler
            .call(Request::get("/orders/42").body(Body::empty()).unwrap())
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[LOCATION], "/orders/99");
        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"http://orders.service.consul/v1/orders/42");
    }

    #[tokio::test]
    async fn test_decorate_fails_closed() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let rw = Arc::new(orders());
        let handler = rw
            .decorate(
                "/orders/:id",
                Handler::new(move |_req| {
                    flag.store(true, Ordering::SeqCst);
                    async { StatusCode::OK.into_response() }
                }),
            )
            .unwrap();
        assert!(rw.decorate("/unknown", handler.clone()).is_none());

        let res = handler
            .call(Request::get("/elsewhere").body(Body::empty()).unwrap())
            .await;
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        assert!(!called.load(Ordering::SeqCst));
    }
}
