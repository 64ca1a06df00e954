//! Opening, closing and listing document sessions.

use std::path::Path;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{json, Value};

use crate::registry::schema::OutputShape;
use crate::registry::{Tool, ToolAnnotations, ToolContext, ToolError, ToolOutput, ToolResult};
use crate::session::SessionInfo;
use crate::tools::{optional_str, required_str};

/// Result of `open`.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SessionOpened {
    /// Identifier to pass as `session_id` to other tools.
    pub session_id: String,
    /// Document file name.
    pub document: String,
}

/// Result of `close`.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SessionClosed {
    /// The session that was asked to close.
    pub session_id: String,
    /// Whether the session was open.
    pub closed: bool,
}

/// Result of `list`.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SessionList {
    /// Open sessions, oldest first.
    pub sessions: Vec<SessionInfo>,
}

/// Manages document sessions.
#[derive(Debug, Default)]
pub struct DocumentSessionTool;

#[async_trait]
impl Tool for DocumentSessionTool {
    fn description(&self) -> &'static str {
        "Open a document as a session, close a session, or list open sessions. \
         Other tools accept session_id in place of path."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["open", "close", "list"],
                    "description": "Session operation"
                },
                "path": {
                    "type": "string",
                    "description": "Document to open (action=open)"
                },
                "session_id": {
                    "type": "string",
                    "description": "Session to close (action=close)"
                }
            },
            "required": ["action"]
        })
    }

    fn output_shapes(&self) -> Vec<OutputShape> {
        vec![
            OutputShape::of::<SessionOpened>("opened"),
            OutputShape::of::<SessionClosed>("closed"),
            OutputShape::of::<SessionList>("listed"),
        ]
    }

    fn annotations(&self) -> Option<ToolAnnotations> {
        Some(ToolAnnotations::additive())
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> ToolResult<ToolOutput> {
        match required_str(&arguments, "action")? {
            "open" => {
                let path = Path::new(required_str(&arguments, "path")?);
                let session_id = ctx.sessions.open(path).await?;
                let document = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Ok(ToolOutput::json(&SessionOpened {
                    session_id: session_id.clone(),
                    document,
                })?
                .with_session(Some(session_id)))
            }
            "close" => {
                let session_id = optional_str(&arguments, "session_id")?
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| ToolError::missing("session_id"))?;
                let closed = ctx.sessions.close(session_id).await;
                ToolOutput::json(&SessionClosed {
                    session_id: session_id.to_string(),
                    closed,
                })
            }
            "list" => ToolOutput::json(&SessionList {
                sessions: ctx.sessions.list().await,
            }),
            other => Err(ToolError::invalid(format!(
                "unknown action '{other}'; expected open, close or list"
            ))),
        }
    }
}
