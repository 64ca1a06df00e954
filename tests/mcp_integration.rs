//! Integration tests for MCP protocol handling.
//!
//! These tests drive the dispatcher with raw JSON-RPC frames, the way every
//! transport does, and check the lifecycle, routing and error responses.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use aspose_mcp_server::config::{Config, TransportMode};
use aspose_mcp_server::mcp::protocol::ErrorCode;
use aspose_mcp_server::mcp::{CallContext, Dispatcher, ErrorPolicy, Response};
use aspose_mcp_server::registry::{
    Categories, Tool, ToolContext, ToolEntry, ToolError, ToolFilter, ToolOutput, ToolRegistry,
    ToolResult,
};
use aspose_mcp_server::session::SessionStore;

// =============================================================================
// Helpers
// =============================================================================

#[derive(Default)]
struct PanickingTool;

#[async_trait]
impl Tool for PanickingTool {
    fn description(&self) -> &'static str {
        "Always panics"
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object" })
    }

    async fn execute(&self, _arguments: Value, _ctx: &ToolContext) -> ToolResult<ToolOutput> {
        panic!("secret panic detail at /srv/app/state.bin");
    }
}

#[derive(Default)]
struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn description(&self) -> &'static str {
        "Always fails internally"
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object" })
    }

    async fn execute(&self, _arguments: Value, _ctx: &ToolContext) -> ToolResult<ToolOutput> {
        Err(ToolError::Internal("state file /srv/app/state.bin is corrupt".to_string()))
    }
}

#[derive(Default)]
struct SleepyTool;

#[async_trait]
impl Tool for SleepyTool {
    fn description(&self) -> &'static str {
        "Sleeps for a while"
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object" })
    }

    async fn execute(&self, _arguments: Value, _ctx: &ToolContext) -> ToolResult<ToolOutput> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        ToolOutput::json(&json!({}))
    }
}

fn boxed<T: Tool + Default + 'static>() -> ToolResult<Box<dyn Tool>> {
    Ok(Box::new(T::default()))
}

static FAULTY: &[ToolEntry] = &[
    ToolEntry::new("PanickingTool", boxed::<PanickingTool>),
    ToolEntry::new("FailingTool", boxed::<FailingTool>),
    ToolEntry::new("SleepyTool", boxed::<SleepyTool>),
];

fn faulty_dispatcher() -> Dispatcher {
    let filter = ToolFilter {
        categories: Categories::empty(),
        sessions: false,
    };
    Dispatcher::new(
        Arc::new(ToolRegistry::discover(FAULTY, filter)),
        Arc::new(SessionStore::default()),
    )
}

fn default_dispatcher() -> Dispatcher {
    Dispatcher::from_config(&Config::default())
}

fn stdio() -> CallContext {
    CallContext::new(TransportMode::Stdio)
}

async fn call(dispatcher: &Dispatcher, frame: Value) -> Response {
    dispatcher
        .dispatch(&frame.to_string(), &stdio())
        .await
        .expect("request must be answered")
}

fn tool_call(id: i64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_initialize_announces_identity() {
    let resp = call(
        &default_dispatcher(),
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
    )
    .await;

    let result = resp.result().unwrap();
    assert_eq!(
        result,
        &json!({
            "protocolVersion": "2025-11-25",
            "serverInfo": { "name": "aspose-mcp-server", "version": "1.0.0" },
            "capabilities": { "tools": {} }
        })
    );
}

#[tokio::test]
async fn test_initialized_notification_is_silent() {
    let dispatcher = default_dispatcher();
    let frame = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
    assert!(dispatcher.dispatch(frame, &stdio()).await.is_none());
}

#[tokio::test]
async fn test_ping_returns_empty_object() {
    let resp = call(
        &default_dispatcher(),
        json!({"jsonrpc": "2.0", "id": "p", "method": "ping"}),
    )
    .await;
    assert_eq!(resp.result().unwrap(), &json!({}));
}

// =============================================================================
// Error responses
// =============================================================================

#[tokio::test]
async fn test_unknown_tool_is_method_not_found() {
    let resp = call(&default_dispatcher(), tool_call(3, "get_foo", json!({}))).await;

    let err = resp.error().unwrap();
    assert_eq!(err.code, ErrorCode::MethodNotFound.code());
    assert_eq!(err.message, "Unknown tool: get_foo");
}

#[tokio::test]
async fn test_missing_path_is_invalid_params() {
    let resp = call(&default_dispatcher(), tool_call(4, "word_get_text", json!({}))).await;

    let err = resp.error().unwrap();
    assert_eq!(err.code, ErrorCode::InvalidParams.code());
    assert!(err.message.contains("path is required"), "{}", err.message);
}

#[tokio::test]
async fn test_non_json_frame_gets_parse_error() {
    let resp = default_dispatcher()
        .dispatch("{this is not json", &stdio())
        .await
        .unwrap();

    let wire: Value = serde_json::from_str(&resp.to_json()).unwrap();
    assert_eq!(wire["id"], Value::Null);
    assert_eq!(wire["error"]["code"], ErrorCode::ParseError.code());
    assert!(wire["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Parse error: "));
}

#[tokio::test]
async fn test_frame_without_method_echoes_readable_id() {
    let resp = default_dispatcher()
        .dispatch(r#"{"jsonrpc":"2.0","id":5}"#, &stdio())
        .await
        .unwrap();

    let wire: Value = serde_json::from_str(&resp.to_json()).unwrap();
    assert_eq!(wire["id"], 5);
    assert_eq!(wire["error"]["code"], ErrorCode::ParseError.code());
    assert_eq!(wire["error"]["message"], "Parse error: missing method field");
}

#[tokio::test]
async fn test_missing_document_does_not_leak_path() {
    let resp = call(
        &default_dispatcher(),
        tool_call(5, "word_get_text", json!({"path": "/secret/dir/missing.txt"})),
    )
    .await;

    let err = resp.error().unwrap();
    assert_eq!(err.code, ErrorCode::InvalidParams.code());
    assert_eq!(err.message, "Resource not found");
}

// =============================================================================
// Fault isolation
// =============================================================================

#[tokio::test]
async fn test_panicking_tool_is_contained() {
    let dispatcher = faulty_dispatcher();

    let resp = call(&dispatcher, tool_call(1, "panicking", json!({}))).await;
    let err = resp.error().unwrap();
    assert_eq!(err.code, ErrorCode::InternalError.code());
    assert_eq!(err.message, "Internal error");

    // the dispatcher keeps serving after the panic
    let resp = call(&dispatcher, json!({"jsonrpc": "2.0", "id": 2, "method": "ping"})).await;
    assert!(resp.result().is_some());
}

#[tokio::test]
async fn test_internal_detail_only_in_debug_mode() {
    let resp = call(&faulty_dispatcher(), tool_call(1, "failing", json!({}))).await;
    assert_eq!(resp.error().unwrap().message, "Internal error");

    let debug = faulty_dispatcher().with_policy(ErrorPolicy { debug: true });
    let resp = call(&debug, tool_call(2, "failing", json!({}))).await;
    let message = &resp.error().unwrap().message;
    assert_eq!(message, "Internal error: state file [path] is corrupt");
}

#[tokio::test]
async fn test_slow_tool_times_out() {
    let dispatcher = faulty_dispatcher().with_tool_timeout(Some(Duration::from_millis(50)));

    let resp = call(&dispatcher, tool_call(1, "sleepy", json!({}))).await;
    let err = resp.error().unwrap();
    assert_eq!(err.code, ErrorCode::InternalError.code());
    assert!(err.message.starts_with("Tool execution timed out"));
}

// =============================================================================
// Tool results
// =============================================================================

#[tokio::test]
async fn test_successful_call_wraps_data_and_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.md");
    std::fs::write(&path, "# Report\n\nAll good.\n").unwrap();

    let resp = call(
        &default_dispatcher(),
        tool_call(7, "word_get_statistics", json!({"path": path})),
    )
    .await;

    let result = resp.result().unwrap();
    let text = result["content"][0]["text"].as_str().unwrap();
    let envelope: Value = serde_json::from_str(text).unwrap();
    assert_eq!(envelope["data"]["words"], 4);
    assert_eq!(envelope["output"]["tool"], "word_get_statistics");
    assert_eq!(envelope["output"]["transport"], "stdio");
    assert_eq!(result["structuredContent"], envelope);
}
