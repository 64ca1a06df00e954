//! aspose-mcp-server: MCP server exposing document-processing tools
//!
//! This library hosts a catalog of document tools behind the Model Context
//! Protocol (JSON-RPC 2.0) on one of three transports.
//!
//! # Architecture
//!
//! A single protocol core serves every transport:
//!
//! - **Dispatcher**: parses messages, routes `initialize`, `tools/list`,
//!   `tools/call` and `ping`, and shapes every failure as a JSON-RPC error
//! - **Registry**: discovers tools from a build-time catalog, derives wire
//!   names and filters by enabled category
//! - **Hosts**: stdio (newline-delimited), streamable HTTP and WebSocket
//! - **Middleware**: origin validation, authentication and request tracking
//!   in front of the network hosts
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Startup error types
//! - [`host`] — Transport hosts
//! - [`mcp`] — Protocol types, dispatcher and fault taxonomy
//! - [`middleware`] — Request pipeline for network hosts
//! - [`registry`] — Tool contract, discovery and filtering
//! - [`session`] — Document sessions
//! - [`tools`] — Built-in tool catalog

pub mod config;
pub mod error;
pub mod host;
pub mod mcp;
pub mod middleware;
pub mod registry;
pub mod session;
pub mod tools;
