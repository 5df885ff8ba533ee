//! MCP server command
//!
//! Starts the nxscope MCP server for AI assistant integration.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Args;
use nxscope_mcp::render::DEFAULT_MAX_TOKENS;
use nxscope_mcp::{NxScopeServer, ServerConfig};
use rmcp::{transport::stdio, ServiceExt};
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::FmtSubscriber;

use super::{load_config, resolve_workspace};
use crate::GlobalOptions;

/// Start the MCP server for AI assistant integration
#[derive(Args, Debug)]
pub struct McpArgs {
    /// Log file path (default: `logging.file` from config, else stderr)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Approximate token budget for the workspace overview
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: usize,
}

/// Execute the MCP server command
pub async fn execute(args: McpArgs, global: GlobalOptions) -> Result<()> {
    let root = resolve_workspace(&global)?;
    let config = load_config(&global, &root)?;

    // Logging must stay off stdout, which carries the JSON-RPC stream
    let log_level = if args.debug || global.verbose {
        Level::DEBUG
    } else if global.quiet {
        Level::ERROR
    } else {
        Level::from_str(&config.logging.level).unwrap_or(Level::INFO)
    };

    // try_init: the host may already have installed a subscriber
    if let Some(log_file) = args.log_file.as_ref().or(config.logging.file.as_ref()) {
        let file = std::fs::File::create(log_file)
            .with_context(|| format!("Failed to create log file: {}", log_file.display()))?;
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(file)
            .with_ansi(false)
            .finish();
        if subscriber.try_init().is_err() {
            warn!(
                "Using existing tracing subscriber (log file {} ignored)",
                log_file.display()
            );
        }
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .finish();
        let _ = subscriber.try_init();
    }

    info!("Starting nxscope MCP Server");
    info!("  Root: {}", root.display());
    info!("  Node: {}", config.node.binary);

    let server_config = ServerConfig::new(&root)
        .with_scope(config)
        .with_max_tokens(args.max_tokens);
    let server = NxScopeServer::new(server_config).context("Failed to create MCP server")?;

    info!("Server initialized, starting MCP protocol over stdio");

    let service = server
        .serve(stdio())
        .await
        .context("Failed to start MCP service")?;

    tokio::select! {
        result = service.waiting() => {
            if let Err(e) = result {
                info!("Service ended with error: {}", e);
            } else {
                info!("Service ended normally");
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
