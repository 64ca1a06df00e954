//! Middleware chain for network hosts.
//!
//! The chain is an ordered list of optional [`Stage`]s, always in the
//! relative order origin → auth → tracking. A stage that is disabled in
//! configuration is not constructed at all, and an empty chain is not
//! installed on the router.
//!
//! Per request, stages run [`Stage::on_request`] in order against a shared
//! [`RequestContext`]. The first rejection short-circuits: later stages and
//! the dispatcher are never reached. Stages that were entered then observe
//! the final response status through [`Stage::on_response`], innermost
//! first.

pub mod auth;
pub mod origin;
pub mod tracking;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::config::Config;
use crate::error::HostError;
use crate::registry::ConnectionIdentity;

pub use auth::{AuthStage, StaticTokenValidator, TokenValidator};
pub use origin::OriginStage;
pub use tracking::{Metrics, MetricsSnapshot, TrackingStage};

/// Header carrying the caller's group identifier.
pub const GROUP_HEADER: &str = "x-group-id";

/// Header carrying the caller's user identifier.
pub const USER_HEADER: &str = "x-user-id";

/// Facts about one HTTP request, threaded through every stage.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// HTTP method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Caller identity taken from the identity headers.
    pub identity: ConnectionIdentity,
    /// Scheme that authenticated the request, set by the auth stage.
    pub principal: Option<&'static str>,
    /// When the chain started processing the request.
    pub started: Instant,
}

impl RequestContext {
    /// Captures the context of an incoming request.
    #[must_use]
    pub fn from_request(request: &Request) -> Self {
        let headers = request.headers().clone();
        Self {
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            identity: identity_from_headers(&headers),
            headers,
            principal: None,
            started: Instant::now(),
        }
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Reads the group/user identity headers.
#[must_use]
pub fn identity_from_headers(headers: &HeaderMap) -> ConnectionIdentity {
    let read = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    ConnectionIdentity {
        group: read(GROUP_HEADER),
        user: read(USER_HEADER),
    }
}

/// A stage's refusal to let a request through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// HTTP status of the rejection response.
    pub status: StatusCode,
    /// Category reported in the body.
    pub category: &'static str,
    /// Message reported in the body.
    pub message: String,
    /// `WWW-Authenticate` challenge, if any.
    pub challenge: Option<&'static str>,
}

impl Rejection {
    /// A 403 response.
    pub fn forbidden(category: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            category,
            message: message.into(),
            challenge: None,
        }
    }

    /// A 401 response, optionally carrying a challenge.
    pub fn unauthorized(message: impl Into<String>, challenge: Option<&'static str>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            category: "authentication",
            message: message.into(),
            challenge,
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "category": self.category,
                "message": self.message,
            }
        });

        let mut response = (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response();

        if let Some(challenge) = self.challenge {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
        }

        response
    }
}

/// One interceptor in the chain.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name, for logs.
    fn name(&self) -> &'static str;

    /// Inspects the request. Returning a rejection stops the chain.
    async fn on_request(&self, _ctx: &mut RequestContext) -> Result<(), Rejection> {
        Ok(())
    }

    /// Observes the final response status.
    fn on_response(&self, _ctx: &RequestContext, _status: StatusCode) {}
}

/// The ordered, immutable set of enabled stages.
#[derive(Default)]
pub struct MiddlewareChain {
    stages: Vec<Box<dyn Stage>>,
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.stage_names()).finish()
    }
}

impl MiddlewareChain {
    /// Builds the chain from configuration, omitting disabled stages.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key header name is invalid or the webhook
    /// client cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, HostError> {
        let mut chain = Self::default();

        if config.origin.enabled {
            chain.push(OriginStage::from_config(&config.origin));
        }
        if config.auth.any_enabled() {
            chain.push(AuthStage::from_config(&config.auth)?);
        }
        if config.tracking.any_enabled() {
            chain.push(TrackingStage::from_config(&config.tracking)?);
        }

        Ok(chain)
    }

    /// Appends a stage. Callers are responsible for the relative order.
    pub fn push(&mut self, stage: impl Stage + 'static) {
        self.stages.push(Box::new(stage));
    }

    /// Names of the installed stages, in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Whether no stage is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs the chain around `next`.
    pub async fn run(&self, request: Request, next: Next) -> Response {
        let mut ctx = RequestContext::from_request(&request);
        let mut entered = 0;
        let mut rejection = None;

        for stage in &self.stages {
            entered += 1;
            if let Err(rejected) = stage.on_request(&mut ctx).await {
                tracing::debug!(
                    stage = stage.name(),
                    status = %rejected.status,
                    path = %ctx.path,
                    "Request rejected by middleware"
                );
                rejection = Some(rejected);
                break;
            }
        }

        let response = match rejection {
            Some(rejected) => rejected.into_response(),
            None => next.run(request).await,
        };

        let status = response.status();
        for stage in self.stages[..entered].iter().rev() {
            stage.on_response(&ctx, status);
        }

        response
    }
}

/// Axum middleware function wrapping the routed surface with the chain.
pub async fn apply(
    State(chain): State<Arc<MiddlewareChain>>,
    request: Request,
    next: Next,
) -> Response {
    chain.run(request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKeyConfig, OriginConfig, TrackingConfig};

    #[test]
    fn disabled_stages_are_omitted() {
        let chain = MiddlewareChain::from_config(&Config::default()).unwrap();
        assert!(chain.is_empty());
    }

    #[test]
    fn stages_keep_fixed_order() {
        let mut config = Config::default();
        config.tracking = TrackingConfig {
            logging: true,
            ..TrackingConfig::default()
        };
        config.auth.api_key = ApiKeyConfig {
            enabled: true,
            keys: vec!["k".into()],
            ..ApiKeyConfig::default()
        };
        config.origin = OriginConfig {
            enabled: true,
            allowed_origins: vec!["https://app.example".into()],
            allow_missing: true,
        };

        let chain = MiddlewareChain::from_config(&config).unwrap();
        assert_eq!(chain.stage_names(), ["origin", "auth", "tracking"]);
    }

    #[test]
    fn invalid_header_name_fails_construction() {
        let mut config = Config::default();
        config.auth.api_key = ApiKeyConfig {
            enabled: true,
            header: "bad header".into(),
            keys: vec!["k".into()],
        };
        assert!(matches!(
            MiddlewareChain::from_config(&config),
            Err(HostError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn identity_headers_are_read() {
        let mut headers = HeaderMap::new();
        headers.insert(GROUP_HEADER, HeaderValue::from_static("team-a"));
        headers.insert(USER_HEADER, HeaderValue::from_static("  "));
        let identity = identity_from_headers(&headers);
        assert_eq!(identity.group.as_deref(), Some("team-a"));
        assert!(identity.user.is_none());
    }

    #[test]
    fn rejection_carries_challenge() {
        let response = Rejection::unauthorized("missing credentials", Some("Bearer")).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
