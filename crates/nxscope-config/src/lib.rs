//! nxscope Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.nxscope/config.toml`
//! - Local config: `.nxscope/config.toml` (in workspace)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.

mod error;
mod loader;

pub use error::{ConfigError, ConfigIo};
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Log levels accepted by `logging.level`.
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Root configuration for nxscope.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ScopeConfig {
    /// Node runtime used to drive the workspace tool
    pub node: NodeConfig,

    /// Graph construction settings
    pub graph: GraphConfig,

    /// Daemon interaction settings
    pub daemon: DaemonConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Node runtime configuration.
///
/// # Example TOML
///
/// ```toml
/// [node]
/// binary = "/usr/local/bin/node"
///
/// [node.env]
/// NX_VERBOSE_LOGGING = "true"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodeConfig {
    /// Node executable (name on PATH or absolute path)
    pub binary: String,

    /// Extra environment variables passed to the graph process
    pub env: BTreeMap<String, String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            binary: "node".to_string(),
            env: BTreeMap::new(),
        }
    }
}

/// Graph construction settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphConfig {
    /// Mute the workspace tool's own console output while the graph is built
    pub silence_library_output: bool,

    /// Collect per-project source file lists
    pub include_file_map: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            silence_library_output: true,
            include_file_map: true,
        }
    }
}

/// Daemon interaction settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Ask the daemon to drop its cached state after each extraction
    pub reset_after_extraction: bool,

    /// Force the daemon on or off (`NX_DAEMON`); unset leaves the workspace default
    pub enabled: Option<bool>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            reset_after_extraction: true,
            enabled: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Colored output on stderr
    pub ansi: bool,

    /// Log file path (optional, used by the MCP server)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: true,
            file: None,
        }
    }
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override node binary
    pub node_binary: Option<String>,

    /// Override daemon usage
    pub daemon_enabled: Option<bool>,

    /// Override log level
    pub log_level: Option<String>,
}

impl ScopeConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref binary) = overrides.node_binary {
            self.node.binary = binary.clone();
        }

        if let Some(enabled) = overrides.daemon_enabled {
            self.daemon.enabled = Some(enabled);
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.binary.trim().is_empty() {
            return Err(ConfigError::invalid_setting(
                "node.binary",
                "must not be empty",
            ));
        }

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::invalid_setting(
                "logging.level",
                format!(
                    "unknown level '{}'. Valid values: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Environment passed to the graph process on top of the fixed workspace variables.
    pub fn graph_env(&self) -> BTreeMap<String, String> {
        let mut env = self.node.env.clone();
        if let Some(enabled) = self.daemon.enabled {
            env.insert("NX_DAEMON".to_string(), enabled.to_string());
        }
        env
    }
}
