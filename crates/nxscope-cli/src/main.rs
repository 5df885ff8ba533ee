//! nxscope CLI - Nx workspace graph inspection
//!
//! A command-line interface for resolving the project graph of an Nx
//! workspace, listing its projects and locating installed packages.
//!
//! # Usage
//!
//! ```bash
//! # Resolve the workspace and summarize it
//! nxscope snapshot
//!
//! # List projects in dependency order
//! nxscope projects --topo
//!
//! # Find a file inside an installed package
//! nxscope locate nx package.json
//!
//! # Serve the workspace to AI assistants over stdio
//! nxscope mcp
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;
mod progress;

/// nxscope - Nx workspace graph resolution and inspection
#[derive(Parser, Debug)]
#[command(name = "nxscope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Workspace root (default: current directory)
    #[arg(long, short = 'w', global = true, env = "NXSCOPE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "NXSCOPE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Node executable used to build the graph
    #[arg(long, global = true, env = "NXSCOPE_NODE")]
    node: Option<String>,

    /// Run without the Nx daemon
    #[arg(long, global = true)]
    no_daemon: bool,
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> nxscope_config::ConfigOverrides {
        nxscope_config::ConfigOverrides {
            node_binary: self.node.clone(),
            daemon_enabled: self.no_daemon.then_some(false),
            log_level: None,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve the workspace and summarize the snapshot
    Snapshot(commands::snapshot::SnapshotArgs),

    /// List projects, or show one project in detail
    Projects(commands::projects::ProjectsArgs),

    /// Locate a file inside an installed package
    Locate(commands::locate::LocateArgs),

    /// Show the installed Nx version and what it supports
    Version(commands::version::VersionArgs),

    /// Detect the package manager and its commands
    Pm(commands::pm::PmArgs),

    /// View and initialize configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Start the MCP server for AI assistant integration
    Mcp(commands::mcp::McpArgs),
}

/// Log level and color from the flags, else from the `logging` section.
fn log_settings(global: &GlobalOptions) -> (Level, bool) {
    let logging = commands::resolve_workspace(global)
        .ok()
        .and_then(|root| commands::load_config(global, &root).ok())
        .map(|config| config.logging)
        .unwrap_or_default();

    let level = if global.quiet {
        Level::ERROR
    } else if global.verbose {
        Level::DEBUG
    } else {
        Level::from_str(&logging.level).unwrap_or(Level::INFO)
    };
    (level, logging.ansi)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // MCP command handles its own tracing setup (stdout carries JSON-RPC)
    if !matches!(cli.command, Commands::Mcp(_)) {
        let (level, ansi) = log_settings(&cli.global);
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .with_ansi(ansi)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    // Execute the command
    match cli.command {
        Commands::Snapshot(args) => commands::snapshot::execute(args, cli.global).await,
        Commands::Projects(args) => commands::projects::execute(args, cli.global).await,
        Commands::Locate(args) => commands::locate::execute(args, cli.global).await,
        Commands::Version(args) => commands::version::execute(args, cli.global).await,
        Commands::Pm(args) => commands::pm::execute(args, cli.global).await,
        Commands::Config(cmd) => commands::config::execute(cmd, cli.global).await,
        Commands::Mcp(args) => commands::mcp::execute(args, cli.global).await,
    }
}
