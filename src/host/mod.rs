//! Transport host composition.
//!
//! [`build_host`] binds the shared [`Dispatcher`] to one of three channels,
//! chosen by [`TransportMode`] alone:
//!
//! | Mode | Channel | Middleware chain | Extra endpoints |
//! |---|---|---|---|
//! | `stdio` | newline-delimited stdin/stdout | no | none |
//! | `http` | `POST {path}` | yes | `GET /health`, `GET /ready` |
//! | `websocket` | upgrade at `{path}` | yes | `GET /health`, `GET /ready` |
//!
//! Network hosts resolve and bind their listener during construction, so an
//! invalid host or an occupied port fails [`build_host`] rather than a call.

pub mod http;
pub mod stdio;
pub mod websocket;

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

use crate::config::{Config, TransportMode};
use crate::error::HostError;
use crate::mcp::Dispatcher;
use crate::middleware::MiddlewareChain;

pub use stdio::StdioHost;

/// Resolves a configured bind host.
///
/// - `localhost` binds loopback only (`127.0.0.1`),
/// - `0.0.0.0` or `*` bind every interface,
/// - anything else must be an IP literal.
///
/// # Errors
///
/// Returns [`HostError::InvalidHost`] for any other value.
pub fn resolve_bind_address(host: &str, port: u16) -> Result<SocketAddr, HostError> {
    let ip = match host.trim() {
        "localhost" => IpAddr::V4(Ipv4Addr::LOCALHOST),
        "0.0.0.0" | "*" => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        other => other.parse().map_err(|_| HostError::InvalidHost {
            host: host.to_string(),
        })?,
    };
    Ok(SocketAddr::new(ip, port))
}

/// Routes that bypass the middleware chain and the registry.
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "healthy" })) }))
        .route("/ready", get(|| async { Json(json!({ "status": "ready" })) }))
}

/// A network host with its bound listener.
pub struct NetworkHost {
    mode: TransportMode,
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
}

impl std::fmt::Debug for NetworkHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkHost")
            .field("mode", &self.mode)
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl NetworkHost {
    async fn run_until<F>(self, shutdown: F) -> Result<(), HostError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(mode = %self.mode, addr = %self.local_addr, "Serving");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!(mode = %self.mode, "Listener closed");
        Ok(())
    }
}

/// A runnable host.
#[derive(Debug)]
pub enum Host {
    /// stdio host.
    Stdio(StdioHost),
    /// HTTP or WebSocket host.
    Network(NetworkHost),
}

impl Host {
    /// The transport this host serves.
    #[must_use]
    pub const fn mode(&self) -> TransportMode {
        match self {
            Self::Stdio(_) => TransportMode::Stdio,
            Self::Network(host) => host.mode,
        }
    }

    /// The bound address of a network host.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            Self::Stdio(_) => None,
            Self::Network(host) => Some(host.local_addr),
        }
    }

    /// Serves until SIGINT/SIGTERM (Ctrl+C on Windows), or EOF on stdio.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    pub async fn run(self) -> Result<(), HostError> {
        self.run_until(shutdown_signal()).await
    }

    /// Serves until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), HostError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self {
            Self::Stdio(host) => Ok(host.run_until(shutdown).await?),
            Self::Network(host) => host.run_until(shutdown).await,
        }
    }
}

/// Builds the host for `mode`.
///
/// # Errors
///
/// Returns an error if the bind host is invalid, the middleware chain cannot
/// be constructed, or the listener cannot be bound.
pub async fn build_host(
    mode: TransportMode,
    config: &Config,
    dispatcher: Arc<Dispatcher>,
) -> Result<Host, HostError> {
    if !mode.is_network() {
        return Ok(Host::Stdio(StdioHost::new(dispatcher)));
    }

    let addr = resolve_bind_address(&config.transport.host, config.transport.port)?;
    let chain = Arc::new(MiddlewareChain::from_config(config)?);
    tracing::debug!(stages = ?chain.stage_names(), "Middleware chain built");

    let path = config.transport.path.as_str();
    let router = if mode == TransportMode::WebSocket {
        websocket::router(dispatcher, chain, path)
    } else {
        http::router(dispatcher, chain, path)
    };

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| HostError::Bind { addr, source })?;
    let local_addr = listener.local_addr()?;

    Ok(Host::Network(NetworkHost {
        mode,
        listener,
        router,
        local_addr,
    }))
}

/// Completes on SIGINT or SIGTERM.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (Ok(mut sigint), Ok(mut sigterm)) = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) else {
        tracing::warn!("Could not install signal handlers, shutdown only on EOF");
        return std::future::pending().await;
    };

    tokio::select! {
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }

        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

/// Completes on Ctrl+C.
#[cfg(windows)]
pub async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    } else {
        tracing::warn!("Could not install Ctrl+C handler, shutdown only on EOF");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localhost_is_loopback() {
        let addr = resolve_bind_address("localhost", 8080).unwrap();
        assert_eq!(addr, "127.0.0.1:8080".parse().unwrap());
    }

    #[test]
    fn wildcards_bind_all_interfaces() {
        for host in ["0.0.0.0", "*"] {
            let addr = resolve_bind_address(host, 9000).unwrap();
            assert!(addr.ip().is_unspecified(), "{host}");
        }
    }

    #[test]
    fn ip_literals_are_accepted() {
        assert_eq!(
            resolve_bind_address("::1", 1).unwrap(),
            "[::1]:1".parse().unwrap()
        );
        assert_eq!(
            resolve_bind_address("10.0.0.5", 2).unwrap().ip(),
            "10.0.0.5".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn host_names_are_rejected() {
        assert!(matches!(
            resolve_bind_address("example.com", 80),
            Err(HostError::InvalidHost { .. })
        ));
        assert!(resolve_bind_address("", 80).is_err());
    }

    #[tokio::test]
    async fn invalid_host_fails_construction() {
        let mut config = Config::default();
        config.transport.host = "not a host".into();
        let dispatcher = Arc::new(Dispatcher::from_config(&config));

        let result = build_host(TransportMode::Http, &config, dispatcher).await;
        assert!(matches!(result, Err(HostError::InvalidHost { .. })));
    }

    #[tokio::test]
    async fn stdio_host_has_no_listener() {
        let config = Config::default();
        let dispatcher = Arc::new(Dispatcher::from_config(&config));
        let host = build_host(TransportMode::Stdio, &config, dispatcher)
            .await
            .unwrap();
        assert_eq!(host.mode(), TransportMode::Stdio);
        assert!(host.local_addr().is_none());
    }

    #[tokio::test]
    async fn network_host_binds_ephemeral_port() {
        let mut config = Config::default();
        config.transport.host = "127.0.0.1".into();
        config.transport.port = 0;
        let dispatcher = Arc::new(Dispatcher::from_config(&config));

        let host = build_host(TransportMode::WebSocket, &config, dispatcher)
            .await
            .unwrap();
        assert_eq!(host.mode(), TransportMode::WebSocket);
        assert_ne!(host.local_addr().unwrap().port(), 0);
    }
}
