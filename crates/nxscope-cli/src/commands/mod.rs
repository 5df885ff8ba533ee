//! CLI command implementations
//!
//! This module contains all nxscope CLI command implementations.

pub mod config;
pub mod locate;
pub mod mcp;
pub mod pm;
pub mod projects;
pub mod snapshot;
pub mod version;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use nxscope_config::{ConfigLoader, ScopeConfig};
use nxscope_workspace::{canonical_root, SnapshotCache, Workspace, WorkspaceResolver};

use crate::GlobalOptions;

/// Resolve the workspace path from options or current directory.
pub fn resolve_workspace(global: &GlobalOptions) -> Result<PathBuf> {
    let path = match global.workspace {
        Some(ref ws) => ws.clone(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    canonical_root(&path).with_context(|| format!("Invalid workspace: {}", path.display()))
}

/// Load configuration with optional config file override, then apply CLI overrides.
pub fn load_config(global: &GlobalOptions, workspace: &Path) -> Result<ScopeConfig> {
    let mut loader = ConfigLoader::new();

    let mut config = match global.config {
        Some(ref config_path) => loader
            .load_file(config_path)
            .with_context(|| format!("Failed to load config file: {}", config_path.display()))?,
        None => loader
            .load(workspace, None)
            .context("Failed to load configuration")?,
    };

    config.apply_overrides(&global.to_config_overrides());
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Open the resolved workspace with a fresh snapshot cache.
pub fn open_workspace(global: &GlobalOptions) -> Result<Workspace> {
    let root = resolve_workspace(global)?;
    let config = load_config(global, &root)?;
    let resolver = WorkspaceResolver::from_config(&config);
    let cache = Arc::new(SnapshotCache::new(Arc::new(resolver)));
    Workspace::open(&root, cache).context("Failed to open workspace")
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}

/// Print a warning message to stderr.
pub fn print_warning(message: &str) {
    eprintln!("warning: {}", message);
}
