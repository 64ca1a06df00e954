//! WebSocket host.
//!
//! `GET {path}` with an upgrade request opens a persistent socket. Each text
//! (or UTF-8 binary) message is one JSON-RPC frame; each response is sent
//! back as a text message. Frames on one connection are handled in order,
//! connections are handled concurrently.
//!
//! An optional identity is captured at accept time, from the `X-Group-Id` /
//! `X-User-Id` headers or, for browser clients that cannot set headers, the
//! `group` / `user` query parameters. Headers win.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::config::TransportMode;
use crate::host::health_routes;
use crate::mcp::{CallContext, Dispatcher};
use crate::middleware::{self, identity_from_headers, MiddlewareChain};
use crate::registry::ConnectionIdentity;

/// Identity query parameters accepted on the upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct IdentityQuery {
    /// Group identifier.
    pub group: Option<String>,
    /// User identifier.
    pub user: Option<String>,
}

/// Builds the WebSocket router: the protected upgrade endpoint plus health routes.
pub fn router(dispatcher: Arc<Dispatcher>, chain: Arc<MiddlewareChain>, path: &str) -> Router {
    let mut routes = Router::new()
        .route(path, get(upgrade))
        .with_state(dispatcher);

    if !chain.is_empty() {
        routes = routes.layer(axum::middleware::from_fn_with_state(chain, middleware::apply));
    }

    routes.merge(health_routes())
}

/// Merges header and query identity, preferring headers.
fn connection_identity(headers: &HeaderMap, query: IdentityQuery) -> ConnectionIdentity {
    let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let from_headers = identity_from_headers(headers);
    ConnectionIdentity {
        group: from_headers.group.or_else(|| non_empty(query.group)),
        user: from_headers.user.or_else(|| non_empty(query.user)),
    }
}

async fn upgrade(
    ws: WebSocketUpgrade,
    State(dispatcher): State<Arc<Dispatcher>>,
    headers: HeaderMap,
    Query(query): Query<IdentityQuery>,
) -> impl IntoResponse {
    let identity = connection_identity(&headers, query);
    ws.on_upgrade(move |socket| serve_socket(socket, dispatcher, identity))
}

async fn serve_socket(socket: WebSocket, dispatcher: Arc<Dispatcher>, identity: ConnectionIdentity) {
    let connection = uuid::Uuid::new_v4();
    tracing::info!(
        connection = %connection,
        group = ?identity.group,
        user = ?identity.user,
        "WebSocket connected"
    );

    let ctx = CallContext::new(TransportMode::WebSocket).with_identity(identity);
    let (mut sender, mut receiver) = socket.split();

    while let Some(message) = receiver.next().await {
        let frame = match message {
            Ok(Message::Text(text)) => text.as_str().to_owned(),
            Ok(Message::Binary(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Ok(Message::Close(_)) => break,
            // ping/pong are answered by the protocol layer
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(connection = %connection, error = %e, "WebSocket receive failed");
                break;
            }
        };

        if let Some(response) = dispatcher.dispatch(&frame, &ctx).await {
            if sender.send(Message::Text(response.to_json().into())).await.is_err() {
                break;
            }
        }
    }

    tracing::info!(connection = %connection, "WebSocket closed");
}
