//! JSON-RPC 2.0 message types for the MCP protocol.
//!
//! This module defines the envelope types exchanged on every transport.
//!
//! # Message Types
//!
//! - **Request**: A message expecting a response (has `id`)
//! - **Response**: A reply to a request, carrying exactly one of `result` or `error`
//! - **Notification**: A one-way message that is never answered
//!
//! A message is a notification if it has no `id`, if its method is the
//! handshake notification [`HANDSHAKE_NOTIFICATION`], or if its method starts
//! with [`NOTIFICATION_PREFIX`]. The check is made before any routing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The MCP protocol version this implementation announces.
pub const MCP_PROTOCOL_VERSION: &str = "2025-11-25";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "aspose-mcp-server";

/// Handshake notification sent by clients after `initialize`.
pub const HANDSHAKE_NOTIFICATION: &str = "initialized";

/// Reserved namespace for notifications.
pub const NOTIFICATION_PREFIX: &str = "notifications/";

/// A JSON-RPC 2.0 request ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// A decoded JSON-RPC 2.0 request or notification.
///
/// Immutable once constructed; built per incoming frame.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol marker; `"2.0"` when present.
    #[serde(default)]
    pub jsonrpc: Option<String>,

    /// Request identifier. `None` marks a notification.
    #[serde(default)]
    pub id: Option<RequestId>,

    /// The method to invoke.
    pub method: String,

    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Returns `true` if this message must never be answered.
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none() || is_notification_method(&self.method)
    }

    /// Returns the parameter object, if any.
    #[must_use]
    pub fn params_object(&self) -> Option<&serde_json::Map<String, Value>> {
        self.params.as_ref().and_then(Value::as_object)
    }
}

/// Returns `true` for method names that are notifications regardless of `id`.
#[must_use]
pub fn is_notification_method(method: &str) -> bool {
    method == HANDSHAKE_NOTIFICATION || method.starts_with(NOTIFICATION_PREFIX)
}

/// A successful JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this response corresponds to.
    pub id: RequestId,

    /// The result of the method call.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result,
        }
    }
}

/// JSON-RPC 2.0 error codes exposed to callers.
///
/// Callers must treat unknown codes as generic failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The method or tool does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short, sanitised description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorData {
    /// Creates a new error from an error code.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self::with_message(code, code.default_message())
    }

    /// Creates a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Adds additional data to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A JSON-RPC 2.0 error response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this error corresponds to; `null` when it could not be read.
    pub id: Option<RequestId>,

    /// The error details.
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    /// Creates a new error response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // JsonRpcErrorData contains String
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorData) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error,
        }
    }
}

/// An outgoing response: exactly one of success or error.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    /// A `result` response.
    Success(JsonRpcResponse),
    /// An `error` response.
    Error(JsonRpcError),
}

impl Response {
    /// Returns the echoed request ID (`None` for unreadable frames).
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Success(resp) => Some(&resp.id),
            Self::Error(err) => err.id.as_ref(),
        }
    }

    /// Returns the error payload, if this is an error response.
    #[must_use]
    pub const fn error(&self) -> Option<&JsonRpcErrorData> {
        match self {
            Self::Success(_) => None,
            Self::Error(err) => Some(&err.error),
        }
    }

    /// Returns the result payload, if this is a success response.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        match self {
            Self::Success(resp) => Some(&resp.result),
            Self::Error(_) => None,
        }
    }

    /// Serialises the response to a single-line JSON string.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#
                .to_string()
        })
    }
}

/// Why a frame could not be decoded. The message is the parser's complaint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    /// Parser complaint, without any stack information.
    pub message: String,
    /// The frame's `id`, when the frame was a JSON object with a usable one.
    pub id: Option<RequestId>,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl DecodeError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            id: None,
        }
    }

    fn with_id(mut self, id: Option<RequestId>) -> Self {
        self.id = id;
        self
    }
}

/// Parses a JSON string into a request or notification.
///
/// # Errors
///
/// Returns a [`DecodeError`] if the frame is not JSON, not an object, has no
/// string `method`, announces a `jsonrpc` version other than `"2.0"`, or
/// carries an `id` that is neither a string nor an integer.
pub fn parse_message(json: &str) -> Result<JsonRpcRequest, DecodeError> {
    let value: Value = serde_json::from_str(json).map_err(|e| DecodeError::new(e.to_string()))?;

    let obj = value
        .as_object()
        .ok_or_else(|| DecodeError::new("expected a JSON object"))?;

    // echoed on the error response when the rest of the frame is unusable
    let id = obj
        .get("id")
        .and_then(|id| RequestId::deserialize(id).ok());
    let invalid = |message: &str| DecodeError::new(message).with_id(id.clone());

    if let Some(version) = obj.get("jsonrpc") {
        if version.as_str() != Some("2.0") {
            return Err(invalid("jsonrpc field must be \"2.0\""));
        }
    }

    match obj.get("method") {
        Some(Value::String(method)) if !method.is_empty() => {}
        Some(Value::String(_)) => return Err(invalid("method field cannot be empty")),
        Some(_) => return Err(invalid("method field must be a string")),
        None => return Err(invalid("missing method field")),
    }

    serde_json::from_value(value).map_err(|e| invalid(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let req = parse_message(json).unwrap();
        assert_eq!(req.id, Some(RequestId::Number(1)));
        assert_eq!(req.method, "initialize");
        assert!(!req.is_notification());
    }

    #[test]
    fn parse_valid_notification() {
        let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        let req = parse_message(json).unwrap();
        assert!(req.id.is_none());
        assert!(req.is_notification());
    }

    #[test]
    fn reserved_methods_are_notifications_even_with_id() {
        let handshake = parse_message(r#"{"jsonrpc":"2.0","id":3,"method":"initialized"}"#).unwrap();
        assert!(handshake.is_notification());

        let cancelled =
            parse_message(r#"{"jsonrpc":"2.0","id":4,"method":"notifications/cancelled"}"#)
                .unwrap();
        assert!(cancelled.is_notification());
    }

    #[test]
    fn parse_string_id() {
        let req = parse_message(r#"{"jsonrpc": "2.0", "id": "abc-123", "method": "test"}"#).unwrap();
        assert_eq!(req.id, Some(RequestId::String("abc-123".to_string())));
    }

    #[test]
    fn parse_invalid_json() {
        let err = parse_message("not valid json").unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[test]
    fn parse_non_object() {
        let err = parse_message("[1, 2, 3]").unwrap_err();
        assert_eq!(err.message, "expected a JSON object");
    }

    #[test]
    fn parse_missing_method() {
        let err = parse_message(r#"{"jsonrpc": "2.0", "id": 1}"#).unwrap_err();
        assert_eq!(err.message, "missing method field");
        assert_eq!(err.id, Some(RequestId::Number(1)));
    }

    #[test]
    fn unusable_id_is_not_echoed() {
        let err = parse_message(r#"{"jsonrpc": "2.0", "id": {"x": 1}, "method": 5}"#).unwrap_err();
        assert_eq!(err.id, None);
        assert_eq!(parse_message("not valid json").unwrap_err().id, None);
    }

    #[test]
    fn parse_wrong_jsonrpc_version() {
        assert!(parse_message(r#"{"jsonrpc": "1.0", "id": 1, "method": "test"}"#).is_err());
    }

    #[test]
    fn serialise_success_response() {
        let response = Response::Success(JsonRpcResponse::success(
            RequestId::Number(1),
            serde_json::json!({"ok": true}),
        ));
        let json = response.to_json();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""result":{"ok":true}"#));
        assert!(!json.contains("error"));
    }

    #[test]
    fn serialise_error_response_with_null_id() {
        let error = Response::Error(JsonRpcError::new(
            None,
            JsonRpcErrorData::from_code(ErrorCode::ParseError),
        ));
        let json = error.to_json();
        assert!(json.contains(r#""id":null"#));
        assert!(json.contains(r#""code":-32700"#));
        assert!(!json.contains("result"));
    }

    #[test]
    fn request_id_display() {
        assert_eq!(format!("{}", RequestId::Number(42)), "42");
        assert_eq!(format!("{}", RequestId::String("abc".to_string())), "abc");
    }
}
