//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every application's backend and routing descriptor
//! - Validate value ranges (timeouts > 0, rates > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system; the dispatcher still
//!   re-checks what it depends on at registration time

use std::fmt;
use std::net::SocketAddr;

use axum::http::HeaderName;
use url::Url;

use crate::config::schema::{ApplicationConfig, GatewayConfig};
use crate::routing::PathTemplate;

/// One semantic problem, located by its config path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Default)]
struct Errors(Vec<ValidationError>);

impl Errors {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Errors::default();

    validate_gateway(config, &mut errors);
    for (name, app) in &config.applications {
        validate_application(name, app, &mut errors);
    }

    if errors.0.is_empty() {
        Ok(())
    } else {
        Err(errors.0)
    }
}

fn validate_gateway(config: &GatewayConfig, errors: &mut Errors) {
    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push("listener.bind_address", "must be a socket address");
    }
    if config.dispatching_mode != "path" {
        errors.push(
            "dispatching_mode",
            format!("unsupported mode '{}'", config.dispatching_mode),
        );
    }

    let timeouts = &config.proxy.timeouts;
    if timeouts.request_secs == 0 {
        errors.push("proxy.timeouts.request_secs", "must be greater than 0");
    }
    if timeouts.upstream_secs == 0 {
        errors.push("proxy.timeouts.upstream_secs", "must be greater than 0");
    }

    let retries = &config.proxy.retries;
    if retries.enabled && retries.max_attempts == 0 {
        errors.push("proxy.retries.max_attempts", "must be at least 1");
    }
    if retries.base_delay_ms > retries.max_delay_ms {
        errors.push("proxy.retries.base_delay_ms", "must not exceed max_delay_ms");
    }

    if config.caching.capacity == 0 {
        errors.push("caching.capacity", "must be greater than 0");
    }

    let auth = &config.authentication;
    match auth.mode.as_str() {
        "none" => {}
        "bearer" if auth.tokens.is_empty() => {
            errors.push("authentication.tokens", "bearer mode needs at least one token");
        }
        "bearer" => {}
        other => errors.push("authentication.mode", format!("unsupported mode '{other}'")),
    }
    if HeaderName::try_from(auth.subject_header.as_str()).is_err() {
        errors.push("authentication.subject_header", "must be a valid header name");
    }

    let limits = &config.rate_limiting;
    if limits.enabled && (limits.requests_per_second == 0 || limits.burst_size == 0) {
        errors.push(
            "rate_limiting",
            "requests_per_second and burst_size must be greater than 0",
        );
    }

    let observability = &config.observability;
    if !matches!(observability.log_format.as_str(), "pretty" | "json") {
        errors.push("observability.log_format", "must be 'pretty' or 'json'");
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push("observability.metrics_address", "must be a socket address");
    }
}

fn validate_application(name: &str, app: &ApplicationConfig, errors: &mut Errors) {
    let field = |suffix: &str| format!("applications.{name}.{suffix}");

    let backend = &app.backend;
    let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
    if has(&backend.url) {
        let url = backend.url.as_deref().unwrap_or_default();
        match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(_) => errors.push(field("backend.url"), "scheme must be http or https"),
            Err(e) => errors.push(field("backend.url"), format!("invalid url: {e}")),
        }
    } else if !has(&backend.service) {
        errors.push(field("backend"), "needs a url or a service name");
    }

    let routing = &app.routing;
    match routing.kind.as_str() {
        "path" => match routing.path.as_deref() {
            Some(path) if path.starts_with('/') => {}
            Some(_) => errors.push(field("routing.path"), "must start with '/'"),
            None => errors.push(field("routing.path"), "required for path routing"),
        },
        "pattern" if routing.patterns.is_empty() => {
            errors.push(field("routing.patterns"), "pattern routing needs at least one entry");
        }
        "pattern" => {
            for (route, target) in &routing.patterns {
                if let Err(message) = check_pattern(route, target) {
                    errors.push(field(&format!("routing.patterns.\"{route}\"")), message);
                }
            }
        }
        other => errors.push(field("routing.type"), format!("unsupported type '{other}'")),
    }
}

fn check_pattern(route: &str, target: &str) -> Result<(), String> {
    if !route.starts_with('/') {
        return Err("route must start with '/'".into());
    }
    if !target.starts_with('/') {
        return Err(format!("target '{target}' must start with '/'"));
    }

    let route = PathTemplate::parse(route).map_err(|e| e.to_string())?;
    let target = PathTemplate::parse(target).map_err(|e| e.to_string())?;
    let result = match target.missing_from(&route).next() {
        Some(param) => Err(format!(
            "target '{}' uses ':{param}', which the route does not capture",
            target.source()
        )),
        None => Ok(()),
    };
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(kind: &str) -> ApplicationConfig {
        let mut app = ApplicationConfig::default();
        app.backend.service = Some("orders".into());
        app.routing.kind = kind.into();
        app
    }

    fn fields(config: &GatewayConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_valid_applications() {
        let mut config = GatewayConfig::default();
        let mut orders = app("pattern");
        orders
            .routing
            .patterns
            .insert("/orders/:id".into(), "/v1/orders/:id".into());
        let mut assets = app("path");
        assets.backend.url = Some("http://static.internal".into());
        assets.routing.path = Some("/assets".into());
        config.applications.insert("orders".into(), orders);
        config.applications.insert("assets".into(), assets);

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.observability.log_format = "xml".into();
        config.authentication.mode = "oauth".into();

        let mut broken = app("path");
        broken.backend.service = None;
        config.applications.insert("broken".into(), broken);

        assert_eq!(
            fields(&config),
            vec![
                "authentication.mode",
                "observability.log_format",
                "applications.broken.backend",
                "applications.broken.routing.path",
            ]
        );
    }

    #[test]
    fn test_pattern_target_must_be_subset_of_route() {
        let mut config = GatewayConfig::default();
        let mut orders = app("pattern");
        orders
            .routing
            .patterns
            .insert("/orders/:id".into(), "/v1/:tenant/orders/:id".into());
        config.applications.insert("orders".into(), orders);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains(":tenant"));
        assert!(errors[0].field.starts_with("applications.orders.routing.patterns"));
    }

    #[test]
    fn test_placeholder_must_fill_its_segment() {
        let mut config = GatewayConfig::default();
        let mut files = app("pattern");
        files
            .routing
            .patterns
            .insert("/files/:name.json".into(), "/v1/files/:name".into());
        config.applications.insert("files".into(), files);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("whole segment"));
    }

    #[test]
    fn test_bad_backend_url_and_routing_type() {
        let mut config = GatewayConfig::default();
        let mut orders = app("regex");
        orders.backend.url = Some("ftp://files.internal".into());
        config.applications.insert("orders".into(), orders);

        assert_eq!(
            fields(&config),
            vec!["applications.orders.backend.url", "applications.orders.routing.type"]
        );
    }
}
