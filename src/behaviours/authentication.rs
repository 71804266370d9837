//! Authentication in front of both method chains.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::dispatch::{Behaviour, BehaviourContext, BehaviourError, Handler, HandlerPair};
use crate::http::request::request_id;
use crate::observability::metrics;
use crate::security::{AuthDecision, AuthRequest, Authenticator};

pub struct AuthenticationBehaviour {
    authenticator: Arc<dyn Authenticator>,
}

struct AuthScope {
    authenticator: Arc<dyn Authenticator>,
    app: Arc<str>,
    route: Arc<str>,
}

impl AuthScope {
    async fn serve(&self, inner: &Handler, mut req: Request<Body>) -> Response {
        let decision = self
            .authenticator
            .authenticate(AuthRequest {
                method: req.method(),
                path: req.uri().path(),
                headers: req.headers(),
                app: &self.app,
                route: &self.route,
            })
            .await;

        match decision {
            AuthDecision::Allow => inner.call(req).await,
            AuthDecision::Annotate(headers) => {
                for (name, value) in &headers {
                    req.headers_mut().insert(name.clone(), value.clone());
                }
                inner.call(req).await
            }
            AuthDecision::Deny { status, reason } => {
                metrics::record_auth_denied(&self.app);
                tracing::warn!(
                    app = %self.app,
                    route = %self.route,
                    status = status.as_u16(),
                    reason = %reason,
                    request_id = %request_id(&req),
                    "Request denied by authenticator"
                );
                let mut response = (status, reason).into_response();
                if status == StatusCode::UNAUTHORIZED {
                    response
                        .headers_mut()
                        .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                }
                response
            }
        }
    }
}

impl AuthenticationBehaviour {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self { authenticator }
    }
}

impl Behaviour for AuthenticationBehaviour {
    fn name(&self) -> &'static str {
        "authentication"
    }

    fn apply(
        &self,
        handlers: HandlerPair,
        ctx: &BehaviourContext<'_>,
    ) -> Result<HandlerPair, BehaviourError> {
        if ctx.app.auth.disable {
            return Ok(handlers);
        }

        let scope = Arc::new(AuthScope {
            authenticator: Arc::clone(&self.authenticator),
            app: Arc::from(ctx.app_name),
            route: Arc::from(ctx.route),
        });
        let wrap = |inner: Handler| {
            let scope = Arc::clone(&scope);
            Handler::new(move |req| {
                let scope = Arc::clone(&scope);
                let inner = inner.clone();
                async move { scope.serve(&inner, req).await }
            })
        };

        Ok(HandlerPair {
            safe: wrap(handlers.safe),
            unsafe_: wrap(handlers.unsafe_),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::http::header::AUTHORIZATION;

    use crate::config::{ApplicationConfig, GatewayConfig};
    use crate::security::BearerTokenAuthenticator;

    /// Echoes the subject header it receives.
    fn backend() -> Handler {
        Handler::new(|req: Request<Body>| async move {
            let subject = req
                .headers()
                .get("x-gateway-subject")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("anonymous")
                .to_string();
            subject.into_response()
        })
    }

    fn wrap(disable: bool) -> HandlerPair {
        let tokens = HashMap::from([("t0k".to_string(), "alice".to_string())]);
        let authenticator = BearerTokenAuthenticator::new(tokens, "x-gateway-subject").unwrap();
        let behaviour = AuthenticationBehaviour::new(Arc::new(authenticator));

        let mut app = ApplicationConfig::default();
        app.auth.disable = disable;
        let app = Arc::new(app);
        let config = Arc::new(GatewayConfig::default());
        let ctx = BehaviourContext {
            route: "/orders/:id",
            app_name: "orders",
            app: &app,
            config: &config,
        };
        behaviour.apply(HandlerPair::uniform(backend()), &ctx).unwrap()
    }

    async fn body(res: Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_both_chains_require_token() {
        let pair = wrap(false);
        for handler in [&pair.safe, &pair.unsafe_] {
            let res = handler
                .call(Request::get("/orders/1").body(Body::empty()).unwrap())
                .await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(res.headers()[WWW_AUTHENTICATE], "Bearer");
        }
    }

    #[tokio::test]
    async fn test_subject_overrides_client_header() {
        let pair = wrap(false);
        let req = Request::post("/orders/1")
            .header(AUTHORIZATION, "Bearer t0k")
            .header("x-gateway-subject", "mallory")
            .body(Body::empty())
            .unwrap();

        let res = pair.unsafe_.call(req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(res).await, "alice");
    }

    #[tokio::test]
    async fn test_disabled_app_passes_through() {
        let pair = wrap(true);
        let res = pair
            .safe
            .call(Request::get("/orders/1").body(Body::empty()).unwrap())
            .await;
        assert_eq!(body(res).await, "anonymous");
    }
}
