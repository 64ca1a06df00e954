//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Tool category switches.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Document session support.
    #[serde(default)]
    pub session: SessionConfig,

    /// Transport selection and network binding.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Origin validation stage.
    #[serde(default)]
    pub origin: OriginConfig,

    /// Authentication stage.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Tracking stage.
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Dispatcher behaviour.
    #[serde(default)]
    pub server: ServerSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let path = &self.transport.path;
        if !path.starts_with('/') {
            return Err(ConfigError::validation(format!(
                "transport path '{path}' must start with '/'"
            )));
        }
        if path == "/health" || path == "/ready" {
            return Err(ConfigError::validation(format!(
                "transport path '{path}' collides with a health endpoint"
            )));
        }

        if self.session.max_sessions == 0 {
            return Err(ConfigError::validation("session.max_sessions must be > 0"));
        }

        if self.origin.enabled && self.origin.allowed_origins.is_empty() {
            return Err(ConfigError::validation(
                "origin validation is enabled but no allowed_origins are listed",
            ));
        }

        if self.auth.api_key.enabled && self.auth.api_key.keys.is_empty() {
            return Err(ConfigError::validation(
                "API key authentication is enabled but no keys are configured",
            ));
        }
        if self.auth.api_key.header.trim().is_empty() {
            return Err(ConfigError::validation("auth.api_key.header cannot be empty"));
        }
        if self.auth.bearer.enabled && self.auth.bearer.tokens.is_empty() {
            return Err(ConfigError::validation(
                "bearer authentication is enabled but no tokens are configured",
            ));
        }

        if let Some(url) = &self.tracking.webhook_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::validation(format!(
                    "tracking.webhook_url '{url}' must be an http(s) URL"
                )));
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::validation(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }
}

/// Tool category switches.
///
/// The four primary document categories default to enabled; add-on
/// categories default to disabled.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)] // one switch per category
pub struct ToolsConfig {
    /// Word-processing documents (`word_*`).
    #[serde(default = "default_true")]
    pub word: bool,
    /// Spreadsheets (`excel_*`).
    #[serde(default = "default_true")]
    pub excel: bool,
    /// Presentations (`ppt_*`).
    #[serde(default = "default_true")]
    pub ppt: bool,
    /// PDF documents (`pdf_*`).
    #[serde(default = "default_true")]
    pub pdf: bool,
    /// Optical character recognition add-on (`ocr_*`).
    #[serde(default)]
    pub ocr: bool,
    /// E-mail messages add-on (`email_*`).
    #[serde(default)]
    pub email: bool,
    /// Barcode add-on (`barcode_*`).
    #[serde(default)]
    pub barcode: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            word: true,
            excel: true,
            ppt: true,
            pdf: true,
            ocr: false,
            email: false,
            barcode: false,
        }
    }
}

impl ToolsConfig {
    /// Configuration with every category disabled.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            word: false,
            excel: false,
            ppt: false,
            pdf: false,
            ocr: false,
            email: false,
            barcode: false,
        }
    }
}

/// Document session settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Whether session-scoped tools are exposed.
    #[serde(default)]
    pub enabled: bool,

    /// Maximum number of simultaneously open sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_sessions: default_max_sessions(),
        }
    }
}

const fn default_max_sessions() -> usize {
    32
}

/// The channel the server is hosted on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Newline-delimited JSON over stdin/stdout.
    #[default]
    Stdio,
    /// Streamable HTTP.
    Http,
    /// Persistent WebSocket connections.
    #[serde(alias = "ws")]
    WebSocket,
}

impl TransportMode {
    /// Whether this mode binds a network listener.
    #[must_use]
    pub const fn is_network(self) -> bool {
        !matches!(self, Self::Stdio)
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
            Self::WebSocket => "websocket",
        };
        f.write_str(name)
    }
}

impl FromStr for TransportMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" | "sse" | "streamable-http" => Ok(Self::Http),
            "websocket" | "ws" => Ok(Self::WebSocket),
            other => Err(ConfigError::validation(format!(
                "unknown transport '{other}'. Must be one of: stdio, http, websocket"
            ))),
        }
    }
}

/// Transport selection and network binding.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// Which host to build.
    #[serde(default)]
    pub mode: TransportMode,

    /// Bind host (`localhost`, `0.0.0.0`, `*` or an IP literal).
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path serving the tool-call surface on the HTTP host.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::default(),
            host: default_host(),
            port: default_port(),
            path: default_path(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

const fn default_port() -> u16 {
    8080
}

fn default_path() -> String {
    "/mcp".to_string()
}

/// Origin validation stage.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OriginConfig {
    /// Whether the stage is installed.
    #[serde(default)]
    pub enabled: bool,

    /// Exact `Origin` header values that are accepted.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Whether requests without an `Origin` header (non-browser clients) pass.
    #[serde(default = "default_true")]
    pub allow_missing: bool,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_origins: Vec::new(),
            allow_missing: true,
        }
    }
}

/// Authentication stage. Zero, one or both schemes may be enabled.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// API key scheme.
    #[serde(default)]
    pub api_key: ApiKeyConfig,

    /// Bearer token scheme.
    #[serde(default)]
    pub bearer: BearerConfig,
}

impl AuthConfig {
    /// Whether at least one scheme is enabled.
    #[must_use]
    pub const fn any_enabled(&self) -> bool {
        self.api_key.enabled || self.bearer.enabled
    }
}

/// API key authentication.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiKeyConfig {
    /// Whether the scheme is active.
    #[serde(default)]
    pub enabled: bool,

    /// Header carrying the key.
    #[serde(default = "default_api_key_header")]
    pub header: String,

    /// Accepted keys.
    #[serde(default)]
    pub keys: Vec<String>,
}

impl Default for ApiKeyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            header: default_api_key_header(),
            keys: Vec::new(),
        }
    }
}

fn default_api_key_header() -> String {
    "X-API-Key".to_string()
}

/// Bearer token authentication.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BearerConfig {
    /// Whether the scheme is active.
    #[serde(default)]
    pub enabled: bool,

    /// Accepted tokens (opaque strings).
    #[serde(default)]
    pub tokens: Vec<String>,
}

/// Tracking stage. Installed when any sink is configured.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackingConfig {
    /// Emit one log event per request.
    #[serde(default)]
    pub logging: bool,

    /// Maintain and emit request counters.
    #[serde(default)]
    pub metrics: bool,

    /// POST a JSON event per request to this URL.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl TrackingConfig {
    /// Whether at least one sink is configured.
    #[must_use]
    pub const fn any_enabled(&self) -> bool {
        self.logging || self.metrics || self.webhook_url.is_some()
    }
}

/// Dispatcher behaviour.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Show sanitised detail for unanticipated faults instead of a generic message.
    #[serde(default)]
    pub debug_errors: bool,

    /// Abort tool calls that run longer than this many seconds.
    #[serde(default)]
    pub tool_timeout_secs: Option<u64>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.transport.mode, TransportMode::Stdio);
        assert!(config.tools.word && config.tools.pdf);
        assert!(!config.tools.email);
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "tools": { "word": true, "excel": false, "ppt": false, "pdf": true,
                       "ocr": false, "email": true, "barcode": false },
            "session": { "enabled": true, "max_sessions": 4 },
            "transport": { "mode": "websocket", "host": "0.0.0.0", "port": 9000, "path": "/rpc" },
            "origin": { "enabled": true, "allowed_origins": ["http://localhost:3000"] },
            "auth": {
                "api_key": { "enabled": true, "keys": ["k1"] },
                "bearer": { "enabled": true, "tokens": ["t1"] }
            },
            "tracking": { "logging": true, "metrics": false, "webhook_url": "https://hooks.example/x" },
            "server": { "debug_errors": true, "tool_timeout_secs": 30 },
            "logging": { "level": "debug" }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.transport.mode, TransportMode::WebSocket);
        assert_eq!(config.transport.port, 9000);
        assert_eq!(config.auth.api_key.header, "X-API-Key");
        assert!(config.auth.any_enabled());
        assert!(config.tracking.any_enabled());
        assert_eq!(config.server.tool_timeout_secs, Some(30));
        assert_eq!(config.session.max_sessions, 4);
    }

    #[test]
    fn transport_mode_from_str() {
        assert_eq!("HTTP".parse::<TransportMode>().unwrap(), TransportMode::Http);
        assert_eq!("ws".parse::<TransportMode>().unwrap(), TransportMode::WebSocket);
        assert!("carrier-pigeon".parse::<TransportMode>().is_err());
    }

    #[test]
    fn reject_auth_without_credentials() {
        let json = r#"{ "auth": { "bearer": { "enabled": true } } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_health_path_collision() {
        let json = r#"{ "transport": { "path": "/health" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_invalid_log_level() {
        let json = r#"{ "logging": { "level": "loud" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let result: Result<Config, _> = serde_json::from_str(r#"{ "unknown_field": "value" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn tracking_disabled_by_default() {
        assert!(!TrackingConfig::default().any_enabled());
    }
}
