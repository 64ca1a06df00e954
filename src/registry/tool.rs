//! The uniform execution contract every tool implements.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::TransportMode;
use crate::registry::schema::OutputShape;
use crate::session::SessionStore;

/// Fault conditions a tool may report.
///
/// The payload is operator detail. What reaches the caller is decided by
/// [`crate::mcp::fault::classify`].
#[derive(Debug, Error)]
pub enum ToolError {
    /// A caller-supplied argument is missing or malformed.
    #[error("{0}")]
    InvalidArgument(String),

    /// A referenced resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation was refused by the filesystem or a collaborator.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// I/O failed while processing.
    #[error("I/O failure")]
    Io(#[source] std::io::Error),

    /// The requested operation or format is not supported.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl ToolError {
    /// Creates an invalid-argument error for a missing required parameter.
    pub fn missing(name: &str) -> Self {
        Self::InvalidArgument(format!("{name} is required"))
    }

    /// Creates an invalid-argument error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Creates an unsupported-operation error.
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported(what.into())
    }
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::AccessDenied(err.to_string()),
            std::io::ErrorKind::Unsupported => Self::Unsupported(err.to_string()),
            _ => Self::Io(err),
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("failed to encode tool result: {err}"))
    }
}

/// Result type for tool execution.
pub type ToolResult<T> = Result<T, ToolError>;

/// Behavioural hints shown in `tools/list`. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    /// The tool does not modify its environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,

    /// The tool may perform destructive updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
}

impl ToolAnnotations {
    /// Annotations for a read-only tool.
    #[must_use]
    pub const fn read_only() -> Self {
        Self {
            read_only_hint: Some(true),
            destructive_hint: Some(false),
        }
    }

    /// Annotations for a destructive tool.
    #[must_use]
    pub const fn destructive() -> Self {
        Self {
            read_only_hint: Some(false),
            destructive_hint: Some(true),
        }
    }

    /// Annotations for a tool that writes without destroying.
    #[must_use]
    pub const fn additive() -> Self {
        Self {
            read_only_hint: Some(false),
            destructive_hint: Some(false),
        }
    }

    /// Whether no hint is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.read_only_hint.is_none() && self.destructive_hint.is_none()
    }
}

/// Identity attached to a WebSocket connection at accept time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionIdentity {
    /// Group (tenant) identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// User identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl ConnectionIdentity {
    /// Whether neither group nor user is known.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.group.is_none() && self.user.is_none()
    }
}

/// Per-call context handed to [`Tool::execute`].
#[derive(Clone)]
pub struct ToolContext {
    /// Transport that carried the call.
    pub transport: TransportMode,

    /// Connection identity, when the transport captured one.
    pub identity: Option<ConnectionIdentity>,

    /// Document session resolver.
    pub sessions: Arc<SessionStore>,
}

impl ToolContext {
    /// Creates a context without identity.
    #[must_use]
    pub const fn new(transport: TransportMode, sessions: Arc<SessionStore>) -> Self {
        Self {
            transport,
            identity: None,
            sessions,
        }
    }

    /// Resolves the working document from `session_id` or `path`.
    ///
    /// # Errors
    ///
    /// Returns `"path is required"` when neither argument is present, or a
    /// not-found error when the session is unknown.
    pub async fn resolve_document(&self, arguments: &Value) -> ToolResult<ResolvedDocument> {
        if let Some(session_id) = arguments.get("session_id").and_then(Value::as_str) {
            let path = self.sessions.resolve(session_id).await?;
            return Ok(ResolvedDocument {
                path,
                session_id: Some(session_id.to_string()),
            });
        }

        match arguments.get("path").and_then(Value::as_str) {
            Some(path) if !path.trim().is_empty() => Ok(ResolvedDocument {
                path: PathBuf::from(path),
                session_id: None,
            }),
            _ => Err(ToolError::missing("path")),
        }
    }
}

/// A document location resolved for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDocument {
    /// Filesystem location of the document.
    pub path: PathBuf,

    /// Session the document was resolved through, if any.
    pub session_id: Option<String>,
}

/// A successful tool result.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Variant payload, placed under `data` in the result envelope.
    pub data: Value,

    /// Session that served the call, reported under `output`.
    pub session_id: Option<String>,
}

impl ToolOutput {
    /// Wraps a serialisable payload.
    ///
    /// # Errors
    ///
    /// Returns an internal error if serialisation fails.
    pub fn json<T: Serialize>(data: &T) -> ToolResult<Self> {
        Ok(Self {
            data: serde_json::to_value(data)?,
            session_id: None,
        })
    }

    /// Records the session that served the call.
    #[must_use]
    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }
}

/// A single named, schema-described operation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Human-readable description.
    fn description(&self) -> &'static str;

    /// JSON Schema for the `arguments` object.
    fn input_schema(&self) -> Value;

    /// Result shapes this tool can yield. Empty means undeclared.
    fn output_shapes(&self) -> Vec<OutputShape> {
        Vec::new()
    }

    /// Explicitly declared annotations. `None` defers to name inference.
    fn annotations(&self) -> Option<ToolAnnotations> {
        None
    }

    /// Executes the tool with the caller's argument bag.
    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolResult<ToolOutput>;
}
