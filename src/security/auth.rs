//! Request authentication.
//!
//! The authentication behaviour asks an [`Authenticator`] for a decision and
//! enforces it. Annotations are headers added to the forwarded request.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

use crate::config::schema::AuthenticationConfig;

/// What the authenticator sees of a request.
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub headers: &'a HeaderMap,
    pub app: &'a str,
    /// Router template of the matched route.
    pub route: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allow,
    Deny { status: StatusCode, reason: String },
    /// Allow, adding these headers to the forwarded request.
    Annotate(HeaderMap),
}

impl AuthDecision {
    pub fn deny(status: StatusCode, reason: impl Into<String>) -> Self {
        Self::Deny {
            status,
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: AuthRequest<'_>) -> AuthDecision;
}

/// Allows every request. Used for `mode = "none"`.
#[derive(Debug, Default)]
pub struct AllowAll;

#[async_trait]
impl Authenticator for AllowAll {
    async fn authenticate(&self, _request: AuthRequest<'_>) -> AuthDecision {
        AuthDecision::Allow
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthConfigError {
    #[error("unsupported authentication mode: '{0}'")]
    UnsupportedMode(String),

    #[error("invalid subject header name '{0}'")]
    InvalidSubjectHeader(String),
}

/// Checks `Authorization: Bearer <token>` against a static token map and
/// forwards the token's subject in a header.
#[derive(Debug)]
pub struct BearerTokenAuthenticator {
    tokens: HashMap<String, String>,
    subject_header: HeaderName,
}

impl BearerTokenAuthenticator {
    pub fn new(
        tokens: HashMap<String, String>,
        subject_header: &str,
    ) -> Result<Self, AuthConfigError> {
        let subject_header = HeaderName::try_from(subject_header)
            .map_err(|_| AuthConfigError::InvalidSubjectHeader(subject_header.to_string()))?;
        Ok(Self {
            tokens,
            subject_header,
        })
    }

    fn bearer_token(headers: &HeaderMap) -> Option<&str> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.split_once(' ')?;
        scheme
            .eq_ignore_ascii_case("bearer")
            .then(|| token.trim())
            .filter(|t| !t.is_empty())
    }
}

#[async_trait]
impl Authenticator for BearerTokenAuthenticator {
    async fn authenticate(&self, request: AuthRequest<'_>) -> AuthDecision {
        let Some(token) = Self::bearer_token(request.headers) else {
            return AuthDecision::deny(StatusCode::UNAUTHORIZED, "Missing bearer token");
        };
        let Some(subject) = self.tokens.get(token) else {
            return AuthDecision::deny(StatusCode::UNAUTHORIZED, "Invalid bearer token");
        };

        let mut annotations = HeaderMap::new();
        match HeaderValue::from_str(subject) {
            Ok(value) => {
                annotations.insert(self.subject_header.clone(), value);
                AuthDecision::Annotate(annotations)
            }
            Err(_) => {
                tracing::warn!(app = request.app, "Token subject is not a valid header value");
                AuthDecision::Allow
            }
        }
    }
}

/// Build the authenticator selected by `mode`.
pub fn authenticator_from_config(
    config: &AuthenticationConfig,
) -> Result<std::sync::Arc<dyn Authenticator>, AuthConfigError> {
    match config.mode.as_str() {
        "none" => Ok(std::sync::Arc::new(AllowAll)),
        "bearer" => Ok(std::sync::Arc::new(BearerTokenAuthenticator::new(
            config.tokens.clone(),
            &config.subject_header,
        )?)),
        other => Err(AuthConfigError::UnsupportedMode(other.to_string())),
    }
}
