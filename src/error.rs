//! Operator-facing error types for aspose-mcp-server.
//!
//! These errors abort startup and are reported on stderr. They never reach a
//! protocol caller; per-call failures are shaped by [`crate::mcp::fault`].

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

impl ConfigError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

/// Errors that abort host construction or a running host.
#[derive(Error, Debug)]
pub enum HostError {
    /// The configured bind host is neither `localhost`, a wildcard nor an IP literal.
    #[error("invalid bind host '{host}': expected \"localhost\", \"0.0.0.0\", \"*\" or an IP address")]
    InvalidHost {
        /// The rejected host value.
        host: String,
    },

    /// The network listener could not be bound.
    #[error("failed to bind listener on {addr}")]
    Bind {
        /// Address the listener tried to bind.
        addr: SocketAddr,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configured API key header is not a valid HTTP header name.
    #[error("invalid API key header name '{header}'")]
    InvalidHeader {
        /// The rejected header name.
        header: String,
    },

    /// The tracking webhook client could not be created.
    #[error("failed to create webhook client")]
    Webhook(#[source] reqwest::Error),

    /// The host failed while serving.
    #[error("transport I/O failure")]
    Io(#[from] std::io::Error),
}
