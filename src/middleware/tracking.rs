//! Request tracking.
//!
//! Installed when at least one sink is configured:
//!
//! - **logging**: one `info` event per request,
//! - **metrics**: process-wide counters, emitted as a `metrics` target event,
//! - **webhook**: a JSON event POSTed per request on a detached task.
//!
//! Tracking observes requests; it never rejects one and a failed webhook
//! delivery never affects the response.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::TrackingConfig;
use crate::error::HostError;
use crate::middleware::{RequestContext, Stage};

/// Upper bound on a single webhook delivery.
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// One tracked request.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingEvent {
    /// When the request finished.
    pub timestamp: DateTime<Utc>,
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Final HTTP status.
    pub status: u16,
    /// Time spent in the chain and dispatcher.
    pub latency_ms: u64,
    /// Caller group, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Caller user, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Scheme that authenticated the request, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<&'static str>,
}

impl TrackingEvent {
    fn capture(ctx: &RequestContext, status: StatusCode) -> Self {
        Self {
            timestamp: Utc::now(),
            method: ctx.method.to_string(),
            path: ctx.path.clone(),
            status: status.as_u16(),
            latency_ms: u64::try_from(ctx.started.elapsed().as_millis()).unwrap_or(u64::MAX),
            group: ctx.identity.group.clone(),
            user: ctx.identity.user.clone(),
            principal: ctx.principal,
        }
    }
}

/// Request counters.
#[derive(Debug, Default)]
pub struct Metrics {
    requests: AtomicU64,
    client_errors: AtomicU64,
    server_errors: AtomicU64,
    latency_ms_total: AtomicU64,
}

/// A point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Requests seen.
    pub requests: u64,
    /// Requests answered with a 4xx status.
    pub client_errors: u64,
    /// Requests answered with a 5xx status.
    pub server_errors: u64,
    /// Sum of request latencies in milliseconds.
    pub latency_ms_total: u64,
}

impl Metrics {
    /// Records one finished request.
    pub fn record(&self, status: StatusCode, latency_ms: u64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if status.is_client_error() {
            self.client_errors.fetch_add(1, Ordering::Relaxed);
        } else if status.is_server_error() {
            self.server_errors.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_ms_total.fetch_add(latency_ms, Ordering::Relaxed);
    }

    /// Reads the counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            client_errors: self.client_errors.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            latency_ms_total: self.latency_ms_total.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
struct Webhook {
    client: reqwest::Client,
    url: String,
}

impl Webhook {
    fn send(&self, event: TrackingEvent) {
        let client = self.client.clone();
        let url = self.url.clone();
        tokio::spawn(async move {
            match client.post(&url).json(&event).send().await {
                Ok(resp) if !resp.status().is_success() => {
                    tracing::warn!(status = %resp.status(), "Tracking webhook rejected event");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Tracking webhook delivery failed"),
            }
        });
    }
}

/// Observes every request that passes the earlier stages.
#[derive(Debug)]
pub struct TrackingStage {
    logging: bool,
    metrics: Option<Arc<Metrics>>,
    webhook: Option<Webhook>,
}

impl TrackingStage {
    /// Builds the stage from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the webhook HTTP client cannot be created.
    pub fn from_config(config: &TrackingConfig) -> Result<Self, HostError> {
        let webhook = config
            .webhook_url
            .as_ref()
            .map(|url| {
                reqwest::Client::builder()
                    .timeout(WEBHOOK_TIMEOUT)
                    .build()
                    .map(|client| Webhook {
                        client,
                        url: url.clone(),
                    })
                    .map_err(HostError::Webhook)
            })
            .transpose()?;

        Ok(Self {
            logging: config.logging,
            metrics: config.metrics.then(|| Arc::new(Metrics::default())),
            webhook,
        })
    }

    /// The counters, when metrics are enabled.
    #[must_use]
    pub fn metrics(&self) -> Option<Arc<Metrics>> {
        self.metrics.clone()
    }
}

#[async_trait]
impl Stage for TrackingStage {
    fn name(&self) -> &'static str {
        "tracking"
    }

    fn on_response(&self, ctx: &RequestContext, status: StatusCode) {
        let event = TrackingEvent::capture(ctx, status);

        if self.logging {
            tracing::info!(
                method = %event.method,
                path = %event.path,
                status = event.status,
                latency_ms = event.latency_ms,
                group = ?event.group,
                user = ?event.user,
                principal = ?event.principal,
                "Request handled"
            );
        }

        if let Some(metrics) = &self.metrics {
            metrics.record(status, event.latency_ms);
            let snapshot = metrics.snapshot();
            tracing::info!(
                target: "metrics",
                requests = snapshot.requests,
                client_errors = snapshot.client_errors,
                server_errors = snapshot.server_errors,
                latency_ms_total = snapshot.latency_ms_total,
                "Request metrics"
            );
        }

        if let Some(webhook) = &self.webhook {
            webhook.send(event);
        }
    }
}
