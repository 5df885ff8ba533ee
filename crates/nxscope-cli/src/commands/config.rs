//! Config command - View and manage configuration
//!
//! Provides commands for viewing and modifying nxscope configuration:
//! - List the effective configuration
//! - Get or set individual values (local or global)
//! - Show configuration file paths
//! - Initialize a local configuration file

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use nxscope_config::{ConfigLoader, ScopeConfig};
use serde::Serialize;

use super::{load_config, resolve_workspace};
use crate::GlobalOptions;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// List the effective configuration
    List(ListArgs),

    /// Get a specific configuration value
    Get(GetArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Show configuration file paths
    Path(PathArgs),

    /// Create a local configuration file with defaults
    Init,
}

/// Arguments for the list command
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the get command
#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// Configuration key (e.g., "node.binary")
    key: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the set command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., "daemon.enabled")
    key: String,

    /// Value to set
    value: String,

    /// Set in global config (~/.nxscope/config.toml) instead of local
    #[arg(long)]
    global: bool,
}

/// Arguments for the path command
#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Configuration paths
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    /// Global config file path
    pub global: Option<PathBuf>,
    /// Local config file path
    pub local: PathBuf,
    /// Whether global config exists
    pub global_exists: bool,
    /// Whether local config exists
    pub local_exists: bool,
}

/// Execute the config command
pub async fn execute(cmd: ConfigCommand, global: GlobalOptions) -> Result<()> {
    match cmd {
        ConfigCommand::List(args) => execute_list(args, global),
        ConfigCommand::Get(args) => execute_get(args, global),
        ConfigCommand::Set(args) => execute_set(args, global),
        ConfigCommand::Path(args) => execute_path(args, global),
        ConfigCommand::Init => execute_init(global),
    }
}

fn execute_list(args: ListArgs, global: GlobalOptions) -> Result<()> {
    let workspace_path = resolve_workspace(&global)?;
    let config = load_config(&global, &workspace_path)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let json = serde_json::to_value(&config)?;
    let mut lines = Vec::new();
    flatten_config("", &json, &mut lines);
    for (key, value) in lines {
        println!("{} = {}", key, value);
    }
    Ok(())
}

fn execute_get(args: GetArgs, global: GlobalOptions) -> Result<()> {
    let workspace_path = resolve_workspace(&global)?;
    let config = load_config(&global, &workspace_path)?;

    let value = get_config_value(&config, &args.key)
        .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", args.key))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        match value {
            serde_json::Value::String(s) => println!("{}", s),
            serde_json::Value::Bool(b) => println!("{}", b),
            serde_json::Value::Number(n) => println!("{}", n),
            serde_json::Value::Null => println!("null"),
            other => println!("{}", serde_json::to_string_pretty(&other)?),
        }
    }

    Ok(())
}

fn execute_set(args: SetArgs, global: GlobalOptions) -> Result<()> {
    let workspace_path = resolve_workspace(&global)?;
    let mut loader = ConfigLoader::new();

    let mut config = if args.global {
        loader.load_global().ok().flatten().unwrap_or_default()
    } else {
        loader
            .load_local(&workspace_path)
            .ok()
            .flatten()
            .unwrap_or_default()
    };

    set_config_value(&mut config, &args.key, &args.value)
        .with_context(|| format!("Failed to set configuration key: {}", args.key))?;
    config.validate().context("Invalid configuration")?;

    if args.global {
        loader.save_global(&config)?;
        println!("Set {} = {} in global config", args.key, args.value);
    } else {
        loader.save_local(&workspace_path, &config)?;
        println!("Set {} = {} in local config", args.key, args.value);
    }

    Ok(())
}

fn execute_path(args: PathArgs, global: GlobalOptions) -> Result<()> {
    let workspace_path = resolve_workspace(&global)?;
    let loader = ConfigLoader::new();

    let global_path = loader.global_config_path();
    let local_path = loader.local_config_path(&workspace_path);

    let paths = ConfigPaths {
        global_exists: global_path.as_ref().is_some_and(|p| p.exists()),
        global: global_path,
        local_exists: local_path.exists(),
        local: local_path,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
        return Ok(());
    }

    let status = |exists: bool| if exists { "exists" } else { "not found" };
    match paths.global {
        Some(ref gp) => println!("Global: {} ({})", gp.display(), status(paths.global_exists)),
        None => println!("Global: not available (no home directory)"),
    }
    println!(
        "Local:  {} ({})",
        paths.local.display(),
        status(paths.local_exists)
    );
    Ok(())
}

fn execute_init(global: GlobalOptions) -> Result<()> {
    let workspace_path = resolve_workspace(&global)?;
    let loader = ConfigLoader::new();

    let path = loader
        .init_local(&workspace_path)
        .context("Failed to initialize local configuration")?;
    println!("{}", path.display());
    Ok(())
}

/// Get a configuration value by key path
fn get_config_value(config: &ScopeConfig, key: &str) -> Option<serde_json::Value> {
    let json = serde_json::to_value(config).ok()?;
    key.split('.')
        .try_fold(&json, |current, part| current.get(part))
        .cloned()
}

/// Set a configuration value by key path
fn set_config_value(config: &mut ScopeConfig, key: &str, value: &str) -> Result<()> {
    match key {
        // Node
        "node.binary" => config.node.binary = value.to_string(),

        // Graph
        "graph.silence_library_output" => config.graph.silence_library_output = value.parse()?,
        "graph.include_file_map" => config.graph.include_file_map = value.parse()?,

        // Daemon
        "daemon.reset_after_extraction" => config.daemon.reset_after_extraction = value.parse()?,
        "daemon.enabled" => config.daemon.enabled = Some(value.parse()?),

        // Logging
        "logging.level" => config.logging.level = value.to_string(),
        "logging.ansi" => config.logging.ansi = value.parse()?,
        "logging.file" => config.logging.file = Some(PathBuf::from(value)),

        _ => {
            if let Some(var) = key.strip_prefix("node.env.") {
                config.node.env.insert(var.to_string(), value.to_string());
            } else {
                anyhow::bail!("Unknown or read-only configuration key: {}", key);
            }
        }
    }

    Ok(())
}

/// Recursively flatten config into dotted key-value pairs
fn flatten_config(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_config(&path, child, out);
            }
        }
        other => out.push((prefix.to_string(), other.to_string())),
    }
}
