//! Integration tests for the streamable HTTP host.
//!
//! Each test binds a real listener on an ephemeral loopback port, drives it
//! with an HTTP client and shuts it down through the host's shutdown future.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use aspose_mcp_server::config::{Config, TransportMode};
use aspose_mcp_server::host::build_host;
use aspose_mcp_server::mcp::Dispatcher;
use aspose_mcp_server::registry::{
    Categories, Tool, ToolContext, ToolEntry, ToolFilter, ToolOutput, ToolRegistry, ToolResult,
};
use aspose_mcp_server::session::SessionStore;

// =============================================================================
// Helpers
// =============================================================================

/// Sleeps for `delay_ms` before answering.
#[derive(Default)]
struct DelayTool;

#[async_trait]
impl Tool for DelayTool {
    fn description(&self) -> &'static str {
        "Waits, then echoes the delay"
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": { "delay_ms": { "type": "integer" } } })
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let delay = arguments["delay_ms"].as_u64().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        ToolOutput::json(&json!({ "slept_ms": delay }))
    }
}

fn delay_tool() -> ToolResult<Box<dyn Tool>> {
    Ok(Box::new(DelayTool))
}

static DELAY_CATALOG: &[ToolEntry] = &[ToolEntry::new("DelayTool", delay_tool)];

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl Running {
    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn stop(self) {
        let _ = self.stop.send(());
        self.task.await.unwrap();
    }
}

fn http_config() -> Config {
    let mut config = Config::default();
    config.transport.mode = TransportMode::Http;
    config.transport.host = "127.0.0.1".to_string();
    config.transport.port = 0;
    config
}

async fn start(config: &Config, dispatcher: Dispatcher) -> Running {
    let host = build_host(TransportMode::Http, config, Arc::new(dispatcher))
        .await
        .unwrap();
    let addr = host.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        host.run_until(async move {
            let _ = stopped.await;
        })
        .await
        .unwrap();
    });
    Running { addr, stop, task }
}

fn delay_dispatcher() -> Dispatcher {
    let filter = ToolFilter {
        categories: Categories::empty(),
        sessions: false,
    };
    Dispatcher::new(
        Arc::new(ToolRegistry::discover(DELAY_CATALOG, filter)),
        Arc::new(SessionStore::default()),
    )
}

fn delay_call(id: i64, delay_ms: u64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": "delay", "arguments": { "delay_ms": delay_ms } }
    })
}

// =============================================================================
// Request handling
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tools_list_over_http() {
    let server = start(&http_config(), Dispatcher::from_config(&http_config())).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/mcp"))
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(!body["result"]["tools"].as_array().unwrap().is_empty());

    let resp = client
        .post(server.url("/mcp"))
        .json(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);
    assert!(resp.bytes().await.unwrap().is_empty());

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_calls_complete_independently() {
    let server = start(&http_config(), delay_dispatcher()).await;
    let client = reqwest::Client::new();

    let slow = {
        let client = client.clone();
        let url = server.url("/mcp");
        tokio::spawn(async move {
            let resp = client.post(url).json(&delay_call(1, 1500)).send().await.unwrap();
            resp.json::<Value>().await.unwrap()
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    let fast: Value = client
        .post(server.url("/mcp"))
        .json(&delay_call(2, 0))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_millis(1000));
    assert_eq!(fast["id"], 2);
    assert!(!slow.is_finished(), "slow call finished before the fast one");

    let slow = slow.await.unwrap();
    assert_eq!(slow["id"], 1);
    assert!(slow["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("\"slept_ms\":1500"));

    server.stop().await;
}

// =============================================================================
// Middleware
// =============================================================================

fn api_key_config() -> Config {
    let mut config = http_config();
    config.auth.api_key.enabled = true;
    config.auth.api_key.keys = vec!["k-123".to_string()];
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_api_key_is_enforced() {
    let config = api_key_config();
    let server = start(&config, Dispatcher::from_config(&config)).await;
    let client = reqwest::Client::new();
    let ping = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});

    let resp = client.post(server.url("/mcp")).json(&ping).send().await.unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["category"], "authentication");

    let resp = client
        .post(server.url("/mcp"))
        .header("X-API-Key", "k-123")
        .json(&ping)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_health_bypasses_authentication() {
    let config = api_key_config();
    let server = start(&config, Dispatcher::from_config(&config)).await;

    let resp = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_foreign_origin_is_rejected_before_auth() {
    let mut config = api_key_config();
    config.origin.enabled = true;
    config.origin.allowed_origins = vec!["https://app.example".to_string()];
    let server = start(&config, Dispatcher::from_config(&config)).await;
    let client = reqwest::Client::new();
    let ping = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});

    let resp = client
        .post(server.url("/mcp"))
        .header("Origin", "https://evil.example")
        .json(&ping)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["category"], "origin");

    let resp = client
        .post(server.url("/mcp"))
        .header("Origin", "https://app.example")
        .header("X-API-Key", "k-123")
        .json(&ping)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    server.stop().await;
}

#[tokio::test]
async fn test_invalid_bind_host_fails_construction() {
    let mut config = http_config();
    config.transport.host = "not a host".to_string();
    let result = build_host(
        TransportMode::Http,
        &config,
        Arc::new(Dispatcher::from_config(&config)),
    )
    .await;
    assert!(result.is_err());
}
