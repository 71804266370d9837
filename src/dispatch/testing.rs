//! Test doubles shared by the dispatch tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderValue, Method, Request, Uri};
use axum::response::{IntoResponse, Response};

use crate::config::ApplicationConfig;
use crate::dispatch::route::ApplicationContext;
use crate::proxy::Proxy;

/// Proxy that records every forwarded request and echoes the destination.
#[derive(Default)]
pub(crate) struct RecordingProxy {
    calls: Mutex<Vec<(Method, String)>>,
}

impl RecordingProxy {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Proxy for RecordingProxy {
    async fn forward(&self, request: Request<Body>, destination: Uri) -> Response {
        let url = destination.to_string();
        self.calls
            .lock()
            .unwrap()
            .push((request.method().clone(), url.clone()));

        let mut response = url.clone().into_response();
        response
            .headers_mut()
            .insert("x-upstream", HeaderValue::from_str(&url).unwrap());
        response
    }
}

pub(crate) fn app_context(name: &str, proxy: Arc<dyn Proxy>) -> ApplicationContext {
    ApplicationContext {
        name: Arc::from(name),
        config: Arc::new(ApplicationConfig::default()),
        backend_url: "http://backend.internal".into(),
        proxy,
    }
}

pub(crate) async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
