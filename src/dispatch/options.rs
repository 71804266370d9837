//! Dedicated OPTIONS handler.
//!
//! Answers which methods a route supports without involving the backend.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ALLOW,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;

use crate::config::OptionsConfig;
use crate::dispatch::handler::{method_bindings, Handler};

/// Value of the `Allow` header: every method the dispatcher binds.
pub fn allow_header_value() -> String {
    method_bindings()
        .iter()
        .map(|(method, _)| method.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(_) => tracing::warn!(header = %name, value, "Skipping invalid OPTIONS header value"),
    }
}

fn response_headers(config: &OptionsConfig) -> HeaderMap {
    let allow = allow_header_value();
    let mut headers = HeaderMap::new();
    insert(&mut headers, ALLOW, &allow);

    if let Some(origin) = &config.allow_origin {
        insert(&mut headers, ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        insert(&mut headers, ACCESS_CONTROL_ALLOW_METHODS, &allow);
        if !config.allow_headers.is_empty() {
            insert(
                &mut headers,
                ACCESS_CONTROL_ALLOW_HEADERS,
                &config.allow_headers.join(", "),
            );
        }
        if config.allow_credentials {
            insert(&mut headers, ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
        }
        if let Some(max_age) = config.max_age_secs {
            insert(&mut headers, ACCESS_CONTROL_MAX_AGE, &max_age.to_string());
        }
    }
    headers
}

/// Build the synthetic OPTIONS handler. Headers are computed once.
pub fn options_handler(config: &OptionsConfig) -> Handler {
    let headers = response_headers(config);
    Handler::new(move |_req| {
        let headers = headers.clone();
        async move { (StatusCode::NO_CONTENT, headers).into_response() }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    #[tokio::test]
    async fn test_plain_allow() {
        let handler = options_handler(&OptionsConfig {
            enabled: true,
            ..Default::default()
        });
        let res = handler
            .call(Request::options("/orders/1").body(Body::empty()).unwrap())
            .await;

        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert_eq!(res.headers()[ALLOW], "GET, HEAD, POST, PUT, PATCH, DELETE, OPTIONS");
        assert!(res.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let handler = options_handler(&OptionsConfig {
            enabled: true,
            allow_origin: Some("https://app.example".into()),
            allow_headers: vec!["authorization".into(), "content-type".into()],
            allow_credentials: true,
            max_age_secs: Some(600),
        });
        let res = handler
            .call(Request::options("/").body(Body::empty()).unwrap())
            .await;

        let h = res.headers();
        assert_eq!(h[ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.example");
        assert_eq!(h[ACCESS_CONTROL_ALLOW_HEADERS], "authorization, content-type");
        assert_eq!(h[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(h[ACCESS_CONTROL_MAX_AGE], "600");
        assert_eq!(h[ACCESS_CONTROL_ALLOW_METHODS], h[ALLOW]);
    }
}
