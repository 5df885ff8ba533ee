//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.nxscope/config.toml`
//! 2. Local config: `.nxscope/config.toml` (in workspace)
//! 3. CLI overrides
//!
//! Later sources override earlier ones.

use crate::error::{ConfigError, ConfigIo};
use crate::{ConfigOverrides, ScopeConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".nxscope";

/// Local configuration directory name.
const LOCAL_CONFIG_DIR: &str = ".nxscope";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.nxscope`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<ScopeConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.nxscope`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    ///
    /// Useful for testing.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path for a workspace.
    pub fn local_config_path(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(LOCAL_CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a workspace with optional CLI overrides.
    ///
    /// Merges config in order: global → local → overrides, then validates.
    pub fn load(
        &mut self,
        workspace_root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<ScopeConfig, ConfigError> {
        let mut config = ScopeConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = self.load_local(workspace_root)? {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<ScopeConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;

        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration for a workspace.
    pub fn load_local(&self, workspace_root: &Path) -> Result<Option<ScopeConfig>, ConfigError> {
        let local_path = self.local_config_path(workspace_root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    /// Load a configuration file from an explicit path.
    pub fn load_file(&self, path: &Path) -> Result<ScopeConfig, ConfigError> {
        load_config_file(path)
    }

    /// Save configuration to the global config file.
    pub fn save_global(&self, config: &ScopeConfig) -> Result<(), ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        let global_path = global_dir.join(CONFIG_FILE_NAME);
        save_config_file(&global_path, config)
    }

    /// Save configuration to the local config file for a workspace.
    pub fn save_local(
        &self,
        workspace_root: &Path,
        config: &ScopeConfig,
    ) -> Result<(), ConfigError> {
        let local_path = self.local_config_path(workspace_root);
        save_config_file(&local_path, config)
    }

    /// Initialize local configuration for a workspace.
    ///
    /// Creates `.nxscope/config.toml` with default configuration.
    pub fn init_local(&self, workspace_root: &Path) -> Result<PathBuf, ConfigError> {
        let local_dir = workspace_root.join(LOCAL_CONFIG_DIR);

        if !local_dir.exists() {
            std::fs::create_dir_all(&local_dir)
                .map_err(|e| ConfigError::io(ConfigIo::CreateDir, &local_dir, e))?;
        }

        let config_path = local_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            save_config_file(&config_path, &ScopeConfig::default())?;
        }

        Ok(config_path)
    }

    /// Clear cached global configuration.
    ///
    /// Forces reload on next `load_global()` call.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<ScopeConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(ConfigIo::Read, path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::malformed(path, e))
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &ScopeConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::io(ConfigIo::CreateDir, parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::io(ConfigIo::Write, path, e))
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// Overlay values only win when they differ from the default, so a partial
/// local file does not reset values set globally.
fn merge_configs(base: ScopeConfig, overlay: ScopeConfig) -> ScopeConfig {
    ScopeConfig {
        node: merge_node(base.node, overlay.node),
        graph: merge_graph(base.graph, overlay.graph),
        daemon: merge_daemon(base.daemon, overlay.daemon),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

fn merge_node(base: crate::NodeConfig, overlay: crate::NodeConfig) -> crate::NodeConfig {
    crate::NodeConfig {
        binary: if overlay.binary != "node" {
            overlay.binary
        } else {
            base.binary
        },
        env: {
            let mut env = base.env;
            env.extend(overlay.env);
            env
        },
    }
}

fn merge_graph(base: crate::GraphConfig, overlay: crate::GraphConfig) -> crate::GraphConfig {
    let defaults = crate::GraphConfig::default();
    crate::GraphConfig {
        silence_library_output: if overlay.silence_library_output
            != defaults.silence_library_output
        {
            overlay.silence_library_output
        } else {
            base.silence_library_output
        },
        include_file_map: if overlay.include_file_map != defaults.include_file_map {
            overlay.include_file_map
        } else {
            base.include_file_map
        },
    }
}

fn merge_daemon(base: crate::DaemonConfig, overlay: crate::DaemonConfig) -> crate::DaemonConfig {
    crate::DaemonConfig {
        reset_after_extraction: if !overlay.reset_after_extraction {
            false
        } else {
            base.reset_after_extraction
        },
        enabled: overlay.enabled.or(base.enabled),
    }
}

fn merge_logging(
    base: crate::LoggingConfig,
    overlay: crate::LoggingConfig,
) -> crate::LoggingConfig {
    crate::LoggingConfig {
        level: if overlay.level != "info" {
            overlay.level
        } else {
            base.level
        },
        ansi: overlay.ansi && base.ansi,
        file: overlay.file.or(base.file),
    }
}
