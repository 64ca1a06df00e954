//! Model Context Protocol (MCP) core.
//!
//! This module holds everything that is independent of how frames travel:
//! the JSON-RPC envelope, the dispatcher and the error taxonomy. Hosts in
//! [`crate::host`] feed frames into one shared [`Dispatcher`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Dispatcher                          │
//! │                                                              │
//! │   frame ──▶ protocol::parse_message ──▶ route by method      │
//! │                                          │                   │
//! │                     ┌────────────────────┼──────────────┐    │
//! │                     ▼                    ▼              ▼    │
//! │                initialize           tools/list     tools/call│
//! │                                                         │    │
//! │                                     registry ──▶ spawned tool│
//! │                                                         │    │
//! │   response ◀── fault::classify (on any fault) ◀─────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation announces MCP protocol version 2025-11-25.

pub mod dispatcher;
pub mod fault;
pub mod protocol;
pub mod sanitize;
pub mod transport;

pub use dispatcher::{CallContext, Dispatcher};
pub use fault::{classify, ErrorPolicy, Fault};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, Response, MCP_PROTOCOL_VERSION};
pub use transport::{LineTransport, StdioTransport};
