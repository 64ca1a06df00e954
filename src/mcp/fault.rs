//! Error taxonomy: every fault the dispatcher can observe, and the single
//! mapping from fault to caller-visible JSON-RPC error.
//!
//! # Security Note
//!
//! Messages crossing the transport boundary are produced only by
//! [`classify`]. Validation faults keep their detail (with absolute paths
//! redacted); resource, permission and I/O faults are reduced to fixed
//! generic messages; unanticipated faults are generic unless
//! [`ErrorPolicy::debug`] is set, and even then only a sanitised message is
//! shown.

use std::time::Duration;

use crate::mcp::protocol::{DecodeError, ErrorCode, JsonRpcErrorData};
use crate::mcp::sanitize::{sanitize_detailed, sanitize_generic, truncate, GENERIC_MESSAGE_CAP};
use crate::registry::ToolError;

/// Fixed message for missing resources.
pub const NOT_FOUND_MESSAGE: &str = "Resource not found";

/// Fixed message for permission failures.
pub const ACCESS_DENIED_MESSAGE: &str = "Access denied";

/// Fixed message for I/O failures.
pub const IO_FAILURE_MESSAGE: &str = "An I/O error occurred while processing the request";

/// Fixed message for unsupported operations.
pub const NOT_SUPPORTED_MESSAGE: &str = "Operation not supported";

/// Fixed message for unanticipated faults.
pub const INTERNAL_MESSAGE: &str = "Internal error";

/// A fault observed while handling one frame.
#[derive(Debug)]
pub enum Fault {
    /// The frame could not be decoded.
    Parse(DecodeError),
    /// The method is not routed.
    MethodNotFound(String),
    /// `tools/call` named a tool that is not registered.
    UnknownTool(String),
    /// Dispatcher-level parameter problem (e.g. missing tool name).
    InvalidParams(String),
    /// The tool returned an error.
    Tool(ToolError),
    /// The tool panicked; the payload is the panic message if any.
    Panic(String),
    /// The tool exceeded the configured execution timeout.
    Timeout(Duration),
}

impl From<ToolError> for Fault {
    fn from(err: ToolError) -> Self {
        Self::Tool(err)
    }
}

impl From<DecodeError> for Fault {
    fn from(err: DecodeError) -> Self {
        Self::Parse(err)
    }
}

/// How much detail unanticipated faults may reveal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorPolicy {
    /// Show a sanitised message for internal faults instead of a generic one.
    pub debug: bool,
}

/// Maps a fault to its caller-visible error.
///
/// Total: there is no residual branch, every [`Fault`] has a fixed code
/// class and message policy.
#[must_use]
pub fn classify(fault: &Fault, policy: ErrorPolicy) -> JsonRpcErrorData {
    match fault {
        Fault::Parse(err) => JsonRpcErrorData::with_message(
            ErrorCode::ParseError,
            format!("Parse error: {}", sanitize_generic(&err.message)),
        ),
        Fault::MethodNotFound(method) => JsonRpcErrorData::with_message(
            ErrorCode::MethodNotFound,
            format!("Method not found: {}", truncate(method, GENERIC_MESSAGE_CAP)),
        ),
        Fault::UnknownTool(name) => JsonRpcErrorData::with_message(
            ErrorCode::MethodNotFound,
            format!("Unknown tool: {}", truncate(name, GENERIC_MESSAGE_CAP)),
        ),
        Fault::InvalidParams(message) => {
            JsonRpcErrorData::with_message(ErrorCode::InvalidParams, sanitize_detailed(message))
        }
        Fault::Tool(err) => classify_tool_error(err, policy),
        Fault::Panic(message) => internal(message, policy),
        Fault::Timeout(limit) => JsonRpcErrorData::with_message(
            ErrorCode::InternalError,
            format!("Tool execution timed out after {}s", limit.as_secs()),
        ),
    }
}

fn classify_tool_error(err: &ToolError, policy: ErrorPolicy) -> JsonRpcErrorData {
    match err {
        ToolError::InvalidArgument(message) => {
            JsonRpcErrorData::with_message(ErrorCode::InvalidParams, sanitize_detailed(message))
        }
        ToolError::NotFound(_) => {
            JsonRpcErrorData::with_message(ErrorCode::InvalidParams, NOT_FOUND_MESSAGE)
        }
        ToolError::AccessDenied(_) => {
            JsonRpcErrorData::with_message(ErrorCode::InternalError, ACCESS_DENIED_MESSAGE)
        }
        ToolError::Io(_) => {
            JsonRpcErrorData::with_message(ErrorCode::InternalError, IO_FAILURE_MESSAGE)
        }
        ToolError::Unsupported(_) => {
            JsonRpcErrorData::with_message(ErrorCode::InternalError, NOT_SUPPORTED_MESSAGE)
        }
        ToolError::Internal(message) => internal(message, policy),
    }
}

fn internal(message: &str, policy: ErrorPolicy) -> JsonRpcErrorData {
    if policy.debug {
        let detail = sanitize_generic(message);
        if !detail.is_empty() {
            return JsonRpcErrorData::with_message(
                ErrorCode::InternalError,
                format!("{INTERNAL_MESSAGE}: {detail}"),
            );
        }
    }
    JsonRpcErrorData::with_message(ErrorCode::InternalError, INTERNAL_MESSAGE)
}
