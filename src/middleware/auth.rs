//! Authentication.
//!
//! Two schemes, each independently enabled:
//!
//! - **API key**: the key is read from a configurable header (`X-API-Key` by default).
//! - **Bearer**: the token is read from `Authorization: Bearer <token>`.
//!
//! When both are enabled, either one succeeding authenticates the request.
//! Credentials are opaque strings checked by a [`TokenValidator`].

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderName;

use crate::config::AuthConfig;
use crate::error::HostError;
use crate::middleware::{Rejection, RequestContext, Stage};

/// Challenge sent with 401 responses when bearer auth is enabled.
pub const BEARER_CHALLENGE: &str = "Bearer";

/// Decides whether a presented credential is acceptable.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Returns `true` if `token` is accepted.
    async fn validate(&self, token: &str) -> bool;
}

/// Accepts exactly the credentials it was built with.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenValidator {
    tokens: HashSet<String>,
}

impl StaticTokenValidator {
    /// Creates a validator from a credential list. Empty entries are ignored.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.is_empty())
                .collect(),
        }
    }
}

#[async_trait]
impl TokenValidator for StaticTokenValidator {
    async fn validate(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }
}

struct ApiKeyScheme {
    header: HeaderName,
    validator: Arc<dyn TokenValidator>,
}

/// Rejects requests that no enabled scheme authenticates.
pub struct AuthStage {
    api_key: Option<ApiKeyScheme>,
    bearer: Option<Arc<dyn TokenValidator>>,
}

impl std::fmt::Debug for AuthStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStage")
            .field("api_key_header", &self.api_key.as_ref().map(|s| &s.header))
            .field("bearer", &self.bearer.is_some())
            .finish()
    }
}

impl AuthStage {
    /// Builds the stage with the static validators from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key header is not a valid header name.
    pub fn from_config(config: &AuthConfig) -> Result<Self, HostError> {
        let mut stage = Self {
            api_key: None,
            bearer: None,
        };

        if config.api_key.enabled {
            stage = stage.with_api_key(
                &config.api_key.header,
                Arc::new(StaticTokenValidator::new(config.api_key.keys.iter().cloned())),
            )?;
        }
        if config.bearer.enabled {
            stage = stage.with_bearer(Arc::new(StaticTokenValidator::new(
                config.bearer.tokens.iter().cloned(),
            )));
        }

        Ok(stage)
    }

    /// Enables the API key scheme with a custom validator.
    ///
    /// # Errors
    ///
    /// Returns an error if `header` is not a valid header name.
    pub fn with_api_key(
        mut self,
        header: &str,
        validator: Arc<dyn TokenValidator>,
    ) -> Result<Self, HostError> {
        let header = HeaderName::from_bytes(header.as_bytes()).map_err(|_| {
            HostError::InvalidHeader {
                header: header.to_string(),
            }
        })?;
        self.api_key = Some(ApiKeyScheme { header, validator });
        Ok(self)
    }

    /// Enables the bearer scheme with a custom validator.
    #[must_use]
    pub fn with_bearer(mut self, validator: Arc<dyn TokenValidator>) -> Self {
        self.bearer = Some(validator);
        self
    }
}

/// Extracts the bearer token from the `Authorization` header.
fn extract_bearer_token(ctx: &RequestContext) -> Option<&str> {
    ctx.header(AUTHORIZATION)
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl Stage for AuthStage {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn on_request(&self, ctx: &mut RequestContext) -> Result<(), Rejection> {
        if let Some(scheme) = &self.api_key {
            if let Some(key) = ctx.header(&scheme.header) {
                if scheme.validator.validate(key).await {
                    ctx.principal = Some("api_key");
                    return Ok(());
                }
            }
        }

        if let Some(validator) = &self.bearer {
            if let Some(token) = extract_bearer_token(ctx) {
                if validator.validate(token).await {
                    ctx.principal = Some("bearer");
                    return Ok(());
                }
            }
        }

        tracing::warn!(path = %ctx.path, "Authentication failed");
        Err(Rejection::unauthorized(
            "missing or invalid credentials",
            self.bearer.as_ref().map(|_| BEARER_CHALLENGE),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKeyConfig, BearerConfig};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    fn both() -> AuthStage {
        AuthStage::from_config(&AuthConfig {
            api_key: ApiKeyConfig {
                enabled: true,
                header: "X-API-Key".into(),
                keys: vec!["key-1".into()],
            },
            bearer: BearerConfig {
                enabled: true,
                tokens: vec!["tok-1".into()],
            },
        })
        .unwrap()
    }

    fn ctx(headers: &[(&str, &str)]) -> RequestContext {
        let mut builder = Request::post("/mcp");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        RequestContext::from_request(&builder.body(Body::empty()).unwrap())
    }

    #[tokio::test]
    async fn api_key_authenticates() {
        let mut ctx = ctx(&[("x-api-key", "key-1")]);
        both().on_request(&mut ctx).await.unwrap();
        assert_eq!(ctx.principal, Some("api_key"));
    }

    #[tokio::test]
    async fn bearer_authenticates_when_key_is_wrong() {
        let mut ctx = ctx(&[("x-api-key", "nope"), ("authorization", "Bearer tok-1")]);
        both().on_request(&mut ctx).await.unwrap();
        assert_eq!(ctx.principal, Some("bearer"));
    }

    #[tokio::test]
    async fn missing_credentials_get_challenge() {
        let err = both().on_request(&mut ctx(&[])).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.challenge, Some(BEARER_CHALLENGE));
    }

    #[tokio::test]
    async fn api_key_only_has_no_challenge() {
        let stage = AuthStage::from_config(&AuthConfig {
            api_key: ApiKeyConfig {
                enabled: true,
                header: "X-API-Key".into(),
                keys: vec!["key-1".into()],
            },
            bearer: BearerConfig::default(),
        })
        .unwrap();
        let err = stage
            .on_request(&mut ctx(&[("authorization", "Bearer key-1")]))
            .await
            .unwrap_err();
        assert!(err.challenge.is_none());
    }

    #[tokio::test]
    async fn static_validator_ignores_empty_tokens() {
        let validator = StaticTokenValidator::new(["", "a"]);
        assert!(!validator.validate("").await);
        assert!(validator.validate("a").await);
    }
}
