//! aspose-mcp-server: MCP server exposing document-processing tools
//!
//! Serves the tool catalog over stdio, streamable HTTP or WebSocket.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use aspose_mcp_server::config::{self, Config, TransportMode};
use aspose_mcp_server::error::ConfigError;
use aspose_mcp_server::host::build_host;
use aspose_mcp_server::mcp::Dispatcher;

/// MCP server exposing document-processing tools.
///
/// Configuration comes from a JSON file; transport settings can be
/// overridden on the command line or through the environment.
#[derive(Parser, Debug)]
#[command(name = "aspose-mcp-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Transport to serve (stdio, http, websocket)
    #[arg(long, env = "ASPOSE_MCP_TRANSPORT")]
    transport: Option<TransportMode>,

    /// Bind host for network transports
    #[arg(long, env = "ASPOSE_MCP_HOST")]
    host: Option<String>,

    /// Bind port for network transports
    #[arg(long, env = "ASPOSE_MCP_PORT")]
    port: Option<u16>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Applies command-line overrides on top of the loaded configuration.
    fn apply(&self, mut cfg: Config) -> Result<Config, ConfigError> {
        if let Some(mode) = self.transport {
            cfg.transport.mode = mode;
        }
        if let Some(host) = &self.host {
            cfg.transport.host.clone_from(host);
        }
        if let Some(port) = self.port {
            cfg.transport.port = port;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber. Logs go to stderr so stdout stays
/// free for the stdio transport.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the runtime for a transport: one thread for stdio, a worker pool
/// for network hosts.
fn build_runtime(mode: TransportMode) -> std::io::Result<tokio::runtime::Runtime> {
    if mode.is_network() {
        tokio::runtime::Builder::new_multi_thread().enable_all().build()
    } else {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
    }
}

/// Entry point for the aspose-mcp-server binary.
fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path).and_then(|cfg| args.apply(cfg)) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nConfig is read from: {}", default_path.display());
                }
            }
            return ExitCode::FAILURE;
        }
    };

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    let mode = cfg.transport.mode;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = %mode,
        "Starting aspose-mcp-server"
    );

    let runtime = match build_runtime(mode) {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        let dispatcher = Arc::new(Dispatcher::from_config(&cfg));
        info!(tools = dispatcher.registry().len(), "Tool registry ready");

        let host = build_host(mode, &cfg, dispatcher).await?;
        if let Some(addr) = host.local_addr() {
            info!(%addr, path = %cfg.transport.path, "Listening");
        }
        host.run().await
    });

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            eprintln!("Server error: {e}");
            ExitCode::FAILURE
        }
    }
}
