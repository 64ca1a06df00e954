//! Origin validation.
//!
//! Browsers attach an `Origin` header to cross-site requests. When present it
//! must match one of the configured origins exactly. Requests without the
//! header (command-line and server-side clients) pass only if
//! `allow_missing` is set.

use std::collections::HashSet;

use async_trait::async_trait;
use axum::http::header::ORIGIN;

use crate::config::OriginConfig;
use crate::middleware::{Rejection, RequestContext, Stage};

/// Rejects requests from origins that are not allow-listed.
#[derive(Debug, Clone)]
pub struct OriginStage {
    allowed: HashSet<String>,
    allow_missing: bool,
}

impl OriginStage {
    /// Builds the stage from configuration.
    #[must_use]
    pub fn from_config(config: &OriginConfig) -> Self {
        Self {
            allowed: config.allowed_origins.iter().cloned().collect(),
            allow_missing: config.allow_missing,
        }
    }
}

#[async_trait]
impl Stage for OriginStage {
    fn name(&self) -> &'static str {
        "origin"
    }

    async fn on_request(&self, ctx: &mut RequestContext) -> Result<(), Rejection> {
        match ctx.headers.get(ORIGIN) {
            None if self.allow_missing => Ok(()),
            None => Err(Rejection::forbidden("origin", "Origin header required")),
            Some(value) => match value.to_str() {
                Ok(origin) if self.allowed.contains(origin) => Ok(()),
                _ => {
                    tracing::warn!(origin = ?value, path = %ctx.path, "Rejected request origin");
                    Err(Rejection::forbidden("origin", "Origin not allowed"))
                }
            },
        }
    }
}
