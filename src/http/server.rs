//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the dispatcher router with the server-wide middleware
//!   (request ID, tracing, request timeout)
//! - Bind to a listener and serve with connect info
//! - Stop accepting and drain on shutdown

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::lifecycle::Shutdown;

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    /// Wrap the dispatcher's router with the server middleware.
    pub fn new(router: Router, config: &GatewayConfig) -> Self {
        let router = Self::build_router(router, config);
        Self { router }
    }

    #[allow(deprecated)]
    fn build_router(router: Router, config: &GatewayConfig) -> Router {
        router
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.proxy.timeouts.request_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` is triggered, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use tower::ServiceExt;

    use crate::http::request::X_REQUEST_ID;

    #[tokio::test]
    async fn test_assigns_request_id() {
        let inner = Router::new().route(
            "/ping",
            get(|req: Request<Body>| async move {
                crate::http::request::request_id(&req).to_string()
            }),
        );
        let server = GatewayServer::new(inner, &GatewayConfig::default());

        let res = server
            .router()
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let id = res.headers()[X_REQUEST_ID].to_str().unwrap().to_string();
        assert_eq!(id.len(), 36);
        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        assert_eq!(body, id.as_bytes());
    }

    #[tokio::test]
    async fn test_keeps_client_request_id() {
        let server = GatewayServer::new(
            Router::new().route("/", get(|| async { "ok" })),
            &GatewayConfig::default(),
        );
        let res = server
            .router()
            .oneshot(
                Request::get("/")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.headers()[X_REQUEST_ID], "abc-123");
    }
}
