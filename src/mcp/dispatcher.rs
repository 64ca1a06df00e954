//! The protocol dispatcher shared by every transport.
//!
//! [`Dispatcher::dispatch`] turns one raw frame into at most one response:
//!
//! - undecodable frames get a parse error with a `null` id,
//! - notifications get nothing, and routing is skipped entirely,
//! - every request with an id gets exactly one success or error response.
//!
//! The dispatcher holds no per-connection state and is read-only after
//! construction, so hosts share one instance behind an `Arc`.
//!
//! Tool execution runs on a spawned task. A panicking tool surfaces as a
//! [`Fault::Panic`] through the join handle and never unwinds into the
//! caller's read loop.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::{Config, TransportMode};
use crate::mcp::fault::{classify, ErrorPolicy, Fault};
use crate::mcp::protocol::{
    parse_message, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, Response,
    MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::registry::schema::OutputMetadata;
use crate::registry::{panic_message, ConnectionIdentity, ToolContext, ToolHandle, ToolRegistry};
use crate::session::SessionStore;

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for the initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: &'static str,
    /// Server version.
    pub version: &'static str,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Result of the `initialize` method.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Announced protocol version.
    pub protocol_version: &'static str,
    /// Server identity.
    pub server_info: ServerInfo,
    /// Supported capabilities.
    pub capabilities: ServerCapabilities,
}

impl Default for InitializeResult {
    fn default() -> Self {
        Self {
            protocol_version: MCP_PROTOCOL_VERSION,
            server_info: ServerInfo::default(),
            capabilities: ServerCapabilities {
                tools: ToolCapabilities::default(),
            },
        }
    }
}

/// Content item in a tool call result.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a successful `tools/call`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// The result envelope, for tools that declare output shapes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

/// Per-call facts supplied by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Transport that carried the frame.
    pub transport: TransportMode,
    /// Connection identity captured at accept time, if any.
    pub identity: Option<ConnectionIdentity>,
}

impl CallContext {
    /// A context without identity.
    #[must_use]
    pub const fn new(transport: TransportMode) -> Self {
        Self {
            transport,
            identity: None,
        }
    }

    /// Attaches a connection identity, ignoring empty ones.
    #[must_use]
    pub fn with_identity(mut self, identity: ConnectionIdentity) -> Self {
        self.identity = (!identity.is_empty()).then_some(identity);
        self
    }
}

/// Routes decoded frames to the registry and tools.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    sessions: Arc<SessionStore>,
    policy: ErrorPolicy,
    tool_timeout: Option<Duration>,
}

impl Dispatcher {
    /// Creates a dispatcher with the production error policy and no timeout.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, sessions: Arc<SessionStore>) -> Self {
        Self {
            registry,
            sessions,
            policy: ErrorPolicy::default(),
            tool_timeout: None,
        }
    }

    /// Builds the registry, session store and error policy from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let registry = Arc::new(ToolRegistry::from_config(config));
        let sessions = Arc::new(SessionStore::new(config.session.max_sessions));
        Self::new(registry, sessions)
            .with_policy(ErrorPolicy {
                debug: config.server.debug_errors,
            })
            .with_tool_timeout(config.server.tool_timeout_secs.map(Duration::from_secs))
    }

    /// Sets the error policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the per-call tool timeout.
    #[must_use]
    pub const fn with_tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// The registry this dispatcher routes to.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Decodes and handles one raw frame.
    ///
    /// Returns `None` for notifications. Never panics on caller input.
    pub async fn dispatch(&self, frame: &str, ctx: &CallContext) -> Option<Response> {
        match parse_message(frame) {
            Ok(request) => self.handle(request, ctx).await,
            Err(err) => {
                tracing::debug!(error = %err, "Undecodable frame");
                let id = err.id.clone();
                let error = classify(&Fault::Parse(err), self.policy);
                Some(Response::Error(JsonRpcError::new(id, error)))
            }
        }
    }

    /// Handles an already-decoded request.
    pub async fn handle(&self, request: JsonRpcRequest, ctx: &CallContext) -> Option<Response> {
        if request.is_notification() {
            tracing::debug!(method = %request.method, "Notification received");
            return None;
        }
        let id = request.id.clone()?;

        tracing::debug!(method = %request.method, id = %id, transport = %ctx.transport, "Dispatching request");

        Some(match self.route(&request, ctx).await {
            Ok(result) => Response::Success(JsonRpcResponse::success(id, result)),
            Err(fault) => self.reject(id, &request.method, &fault),
        })
    }

    fn reject(&self, id: RequestId, method: &str, fault: &Fault) -> Response {
        match fault {
            Fault::Tool(err) => {
                tracing::warn!(method, id = %id, error = %err, cause = ?std::error::Error::source(err), "Tool call failed");
            }
            Fault::Panic(message) => {
                tracing::error!(method, id = %id, panic = %message, "Tool panicked");
            }
            other => tracing::debug!(method, id = %id, fault = ?other, "Request rejected"),
        }
        Response::Error(JsonRpcError::new(Some(id), classify(fault, self.policy)))
    }

    async fn route(&self, request: &JsonRpcRequest, ctx: &CallContext) -> Result<Value, Fault> {
        match request.method.as_str() {
            "initialize" => Ok(to_value(&InitializeResult::default())),
            "tools/list" => Ok(json!({ "tools": self.registry.descriptors() })),
            "tools/call" => self.call_tool(request, ctx).await,
            "ping" => Ok(json!({})),
            other => Err(Fault::MethodNotFound(other.to_string())),
        }
    }

    async fn call_tool(&self, request: &JsonRpcRequest, ctx: &CallContext) -> Result<Value, Fault> {
        let params = request.params_object();

        let name = params
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Fault::InvalidParams("name is required".to_string()))?;

        let arguments = match params.and_then(|p| p.get("arguments")) {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(args @ Value::Object(_)) => args.clone(),
            Some(_) => {
                return Err(Fault::InvalidParams(
                    "arguments must be an object".to_string(),
                ))
            }
        };

        let handle = self
            .registry
            .get(name)
            .ok_or_else(|| Fault::UnknownTool(name.to_string()))?;

        tracing::debug!(tool = name, "Calling tool");
        self.execute(handle, arguments, ctx).await
    }

    async fn execute(
        &self,
        handle: &ToolHandle,
        arguments: Value,
        ctx: &CallContext,
    ) -> Result<Value, Fault> {
        let tool = Arc::clone(&handle.tool);
        let tool_ctx = ToolContext {
            transport: ctx.transport,
            identity: ctx.identity.clone(),
            sessions: Arc::clone(&self.sessions),
        };

        let task = tokio::spawn(async move { tool.execute(arguments, &tool_ctx).await });

        let joined = match self.tool_timeout {
            Some(limit) => {
                let abort = task.abort_handle();
                if let Ok(joined) = tokio::time::timeout(limit, task).await {
                    joined
                } else {
                    abort.abort();
                    return Err(Fault::Timeout(limit));
                }
            }
            None => task.await,
        };

        let output = match joined {
            Ok(result) => result?,
            Err(err) if err.is_panic() => {
                return Err(Fault::Panic(panic_message(err.into_panic().as_ref())));
            }
            Err(_) => return Err(Fault::Panic("tool task was cancelled".to_string())),
        };

        let identity = ctx.identity.clone().unwrap_or_default();
        let envelope = json!({
            "data": output.data,
            "output": OutputMetadata {
                tool: handle.descriptor.name.clone(),
                transport: ctx.transport.to_string(),
                session_id: output.session_id,
                group: identity.group,
                user: identity.user,
            },
        });

        let text = serde_json::to_string(&envelope)
            .map_err(|e| Fault::Tool(crate::registry::ToolError::from(e)))?;

        let result = ToolCallResult {
            content: vec![ToolContent::Text { text }],
            structured_content: handle.descriptor.output_schema.is_some().then_some(envelope),
        };
        Ok(to_value(&result))
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
