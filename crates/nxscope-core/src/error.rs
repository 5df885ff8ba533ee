//! Error types shared across the core crate.
//!
//! [`NxError`] is the serializable payload handed to collaborators; the
//! `thiserror` enums are internal failures that get folded into it.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A workspace error as reported to collaborators.
///
/// Serializes to `{ name, message, stack, file, pluginName, cause }` with
/// absent fields omitted, so lists of these can cross a JSON-RPC boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NxError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,

    /// Workspace-relative file the error originates from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Plugin that raised the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<serde_json::Value>,
}

impl NxError {
    /// Create an error carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            name: None,
            message: message.into(),
            stack: None,
            file: None,
            plugin_name: None,
            cause: None,
        }
    }

    /// Create an error with a name and message.
    pub fn named(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(message)
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_plugin(mut self, plugin_name: impl Into<String>) -> Self {
        self.plugin_name = Some(plugin_name.into());
        self
    }

    /// Human readable one-liner, preferring the name as a prefix.
    pub fn summary(&self) -> String {
        match (&self.name, &self.file) {
            (Some(name), Some(file)) => format!("{name} ({file}): {}", self.message),
            (Some(name), None) => format!("{name}: {}", self.message),
            (None, Some(file)) => format!("{file}: {}", self.message),
            (None, None) => self.message.clone(),
        }
    }
}

impl From<&JsonFileError> for NxError {
    fn from(err: &JsonFileError) -> Self {
        NxError::named("ConfigurationError", err.to_string())
            .with_file(err.path().display().to_string())
    }
}

/// Errors reading a JSON (or JSONC) file from the workspace.
#[derive(Debug, Error)]
pub enum JsonFileError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl JsonFileError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    /// Path of the offending file.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => path,
        }
    }

    /// True when the file simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Errors reading the workspace's own configuration files.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error(transparent)]
    Json(#[from] JsonFileError),

    #[error("invalid project '{name}' in '{path}': {source}")]
    InvalidProject {
        name: String,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("project discovery task failed: {0}")]
    Discovery(String),
}

impl ConfigFileError {
    pub fn invalid_project(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        source: serde_json::Error,
    ) -> Self {
        Self::InvalidProject {
            name: name.into(),
            path: path.into(),
            source,
        }
    }
}

impl From<&ConfigFileError> for NxError {
    fn from(err: &ConfigFileError) -> Self {
        match err {
            ConfigFileError::Json(json) => json.into(),
            ConfigFileError::InvalidProject { path, .. } => {
                NxError::named("ConfigurationError", err.to_string())
                    .with_file(path.display().to_string())
            }
            ConfigFileError::Discovery(_) => NxError::named("ConfigurationError", err.to_string()),
        }
    }
}

/// Errors invoking the graph runtime (the node child process).
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("graph process I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("graph process exited with {status} without reporting a result")]
    NoReport { status: String },

    #[error("graph process reported malformed output: {0}")]
    MalformedReport(#[from] serde_json::Error),

    #[error("required module '{module}' not found in workspace")]
    ModuleNotFound { module: String },
}

impl RuntimeError {
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    pub fn module_not_found(module: impl Into<String>) -> Self {
        Self::ModuleNotFound {
            module: module.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nx_error_wire_shape() {
        let err = NxError::named("CreateNodesError", "bad project")
            .with_file("libs/a/project.json")
            .with_plugin("@nx/js");
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["name"], "CreateNodesError");
        assert_eq!(json["pluginName"], "@nx/js");
        assert_eq!(json["file"], "libs/a/project.json");
        assert!(json.get("stack").is_none());
    }

    #[test]
    fn test_nx_error_summary() {
        assert_eq!(NxError::new("boom").summary(), "boom");
        assert_eq!(
            NxError::named("E", "boom").with_file("nx.json").summary(),
            "E (nx.json): boom"
        );
    }

    #[test]
    fn test_json_file_error_not_found() {
        let err = JsonFileError::read(
            "/w/nx.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.is_not_found());
        assert_eq!(err.path(), std::path::Path::new("/w/nx.json"));

        let nx: NxError = (&err).into();
        assert_eq!(nx.name.as_deref(), Some("ConfigurationError"));
    }

    #[test]
    fn test_config_file_error_keeps_file() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ConfigFileError::invalid_project("a", "/w/apps/a/project.json", source);
        let nx: NxError = (&err).into();
        assert_eq!(nx.file.as_deref(), Some("/w/apps/a/project.json"));
        assert!(nx.message.contains("invalid project 'a'"));
    }

    #[test]
    fn test_runtime_error_display() {
        let err = RuntimeError::module_not_found("nx/src/project-graph/project-graph.js");
        assert!(err.to_string().contains("project-graph.js"));
    }
}
