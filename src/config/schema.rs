//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Dispatcher implementation to build. Only `"path"` is supported.
    pub dispatching_mode: String,

    /// Proxy behaviour shared by all applications.
    pub proxy: ProxyOptions,

    /// Response cache settings.
    pub caching: CachingConfig,

    /// Authentication settings.
    pub authentication: AuthenticationConfig,

    /// Rate limiting configuration.
    pub rate_limiting: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Backend integrations keyed by application name.
    pub applications: BTreeMap<String, ApplicationConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            dispatching_mode: "path".to_string(),
            proxy: ProxyOptions::default(),
            caching: CachingConfig::default(),
            authentication: AuthenticationConfig::default(),
            rate_limiting: RateLimitConfig::default(),
            observability: ObservabilityConfig::default(),
            applications: BTreeMap::new(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Gateway-wide proxy settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyOptions {
    /// Dedicated OPTIONS handling.
    pub options: OptionsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Upstream retry configuration.
    pub retries: RetryConfig,
}

/// Dedicated OPTIONS handler configuration.
///
/// When disabled, OPTIONS requests are proxied through the safe chain like GET.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OptionsConfig {
    pub enabled: bool,
    pub allow_origin: Option<String>,
    pub allow_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age_secs: Option<u64>,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time for a client request (including behaviours) in seconds.
    pub request_secs: u64,

    /// Time allowed for a single upstream exchange in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 25,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries for safe methods.
    pub enabled: bool,

    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CachingConfig {
    /// Maximum number of cached responses.
    pub capacity: usize,

    /// TTL used when neither the response nor the application specifies one.
    pub default_ttl_secs: u64,

    /// Responses with larger bodies are never cached.
    pub max_body_bytes: usize,
}

impl Default for CachingConfig {
    fn default() -> Self {
        Self {
            capacity: 4096,
            default_ttl_secs: 60,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthenticationConfig {
    /// `"none"` or `"bearer"`.
    pub mode: String,

    /// Accepted bearer tokens mapped to the subject they identify.
    pub tokens: HashMap<String, String>,

    /// Header carrying the authenticated subject to the backend.
    pub subject_header: String,
}

impl Default for AuthenticationConfig {
    fn default() -> Self {
        Self {
            mode: "none".to_string(),
            tokens: HashMap::new(),
            subject_header: "x-gateway-subject".to_string(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per second per client and application.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 100,
            burst_size: 50,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// `"pretty"` or `"json"`.
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A named backend integration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApplicationConfig {
    /// How to reach the upstream service.
    #[serde(default)]
    pub backend: BackendDescriptor,

    /// How client paths map onto the upstream.
    pub routing: RoutingConfig,

    #[serde(default)]
    pub caching: AppCachingConfig,

    #[serde(default)]
    pub auth: AppAuthConfig,

    #[serde(default)]
    pub rate_limiting: AppRateLimitConfig,
}

/// Upstream address: an explicit URL, or a service-discovery name with optional tag.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendDescriptor {
    pub url: Option<String>,
    pub service: Option<String>,
    pub tag: Option<String>,
}

/// Routing descriptor. `type` selects the strategy; the other fields are
/// strategy-specific.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// `"path"` or `"pattern"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Mount path for the path strategy.
    pub path: Option<String>,

    /// Route template -> backend path template, for the pattern strategy.
    pub patterns: BTreeMap<String, String>,
}

/// Per-application cache settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppCachingConfig {
    pub enabled: bool,

    /// Overrides the global default TTL.
    pub ttl_secs: Option<u64>,

    /// Invalidate cached GET/HEAD entries after a successful unsafe request.
    pub auto_flush: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppAuthConfig {
    pub disable: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppRateLimitConfig {
    pub disable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_applications() {
        let raw = r#"
            dispatching_mode = "path"

            [proxy.options]
            enabled = true
            allow_origin = "*"

            [applications.orders.backend]
            service = "orders"
            tag = "v2"

            [applications.orders.routing]
            type = "pattern"
            patterns = { "/orders/:id" = "/v1/orders/:id" }

            [applications.orders.caching]
            enabled = true
            ttl_secs = 5

            [applications.static.backend]
            url = "http://static.internal"

            [applications.static.routing]
            type = "path"
            path = "/assets/"
        "#;

        let config: GatewayConfig = toml::from_str(raw).unwrap();
        assert!(config.proxy.options.enabled);
        assert_eq!(config.applications.len(), 2);

        let orders = &config.applications["orders"];
        assert_eq!(orders.routing.kind, "pattern");
        assert_eq!(orders.routing.patterns["/orders/:id"], "/v1/orders/:id");
        assert_eq!(orders.backend.tag.as_deref(), Some("v2"));
        assert_eq!(orders.caching.ttl_secs, Some(5));
        assert!(!orders.auth.disable);

        let assets = &config.applications["static"];
        assert_eq!(assets.routing.path.as_deref(), Some("/assets/"));
    }

    #[test]
    fn test_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.dispatching_mode, "path");
        assert_eq!(config.caching.capacity, 4096);
        assert!(!config.proxy.options.enabled);
        assert_eq!(config.authentication.mode, "none");
    }
}
