//! Streamable HTTP host.
//!
//! Each `POST {path}` carries one JSON-RPC frame in its body. Requests are
//! answered with `200` and the response JSON; notifications with `202` and an
//! empty body. Requests are handled concurrently; a slow tool call on one
//! connection does not hold up any other.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;

use crate::config::TransportMode;
use crate::host::health_routes;
use crate::mcp::{CallContext, Dispatcher};
use crate::middleware::{self, MiddlewareChain};

/// Builds the HTTP router: the protected tool-call surface plus health routes.
pub fn router(dispatcher: Arc<Dispatcher>, chain: Arc<MiddlewareChain>, path: &str) -> Router {
    let mut routes = Router::new()
        .route(path, post(handle_post))
        .with_state(dispatcher);

    if !chain.is_empty() {
        routes = routes.layer(axum::middleware::from_fn_with_state(chain, middleware::apply));
    }

    routes.merge(health_routes())
}

async fn handle_post(State(dispatcher): State<Arc<Dispatcher>>, body: Bytes) -> Response {
    let frame = String::from_utf8_lossy(&body);
    let ctx = CallContext::new(TransportMode::Http);

    match dispatcher.dispatch(&frame, &ctx).await {
        Some(response) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            response.to_json(),
        )
            .into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ToolRegistry;
    use crate::session::SessionStore;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(ToolRegistry::default()),
            Arc::new(SessionStore::default()),
        ));
        router(dispatcher, Arc::new(MiddlewareChain::default()), "/mcp")
    }

    #[tokio::test]
    async fn request_gets_json_response() {
        let response = app()
            .oneshot(
                Request::post("/mcp")
                    .body(Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["result"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn notification_gets_202_and_empty_body() {
        let response = app()
            .oneshot(
                Request::post("/mcp")
                    .body(Body::from(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn health_is_served() {
        let response = app()
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
