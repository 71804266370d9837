//! Innermost route handler: hands the request to the proxy.

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::dispatch::handler::Handler;
use crate::dispatch::route::ApplicationContext;
use crate::http::request::request_id;
use crate::observability::metrics;
use crate::proxy::{Destination, Proxy};

/// Forwards requests of one route (or one mount) to its upstream.
///
/// The destination is resolved by the host rewriter rule of the matched
/// route and read from the request extensions; without one the request is
/// rejected.
pub struct Forwarder {
    app_name: Arc<str>,
    proxy: Arc<dyn Proxy>,
}

impl Forwarder {
    pub fn new(ctx: &ApplicationContext) -> Self {
        Self {
            app_name: Arc::clone(&ctx.name),
            proxy: Arc::clone(&ctx.proxy),
        }
    }

    pub fn into_handler(self) -> Handler {
        let this = Arc::new(self);
        Handler::new(move |req| {
            let this = Arc::clone(&this);
            async move {
                let start = Instant::now();
                let method = req.method().to_string();

                let Some(Destination(destination)) = req.extensions().get::<Destination>().cloned()
                else {
                    tracing::error!(
                        app = %this.app_name,
                        path = %req.uri().path(),
                        request_id = %request_id(&req),
                        "Request reached forwarder without a resolved destination"
                    );
                    return (StatusCode::BAD_GATEWAY, "No upstream destination for request")
                        .into_response();
                };

                let response = this.proxy.forward(req, destination).await;
                metrics::record_request(&this.app_name, &method, response.status().as_u16(), start);
                response
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::testing::{app_context, body_string, RecordingProxy};
    use axum::body::Body;
    use axum::http::{Method, Request};

    #[tokio::test]
    async fn test_forwards_to_destination() {
        let proxy = RecordingProxy::new();
        let handler = Forwarder::new(&app_context("orders", proxy.clone())).into_handler();
        let mut req = Request::get("/orders/1").body(Body::empty()).unwrap();
        req.extensions_mut().insert(Destination(
            "http://backend.internal/v1/orders/1".parse().unwrap(),
        ));

        let res = handler.call(req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "http://backend.internal/v1/orders/1");
        assert_eq!(
            proxy.calls(),
            vec![(Method::GET, "http://backend.internal/v1/orders/1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_missing_destination_fails_closed() {
        let proxy = RecordingProxy::new();
        let handler = Forwarder::new(&app_context("orders", proxy.clone())).into_handler();
        let res = handler
            .call(Request::get("/orders/1").body(Body::empty()).unwrap())
            .await;
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        assert!(proxy.calls().is_empty());
    }
}
