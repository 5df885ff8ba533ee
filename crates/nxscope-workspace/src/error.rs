//! Workspace error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised around snapshots.
///
/// Snapshot resolution itself never fails; these cover the edges where a
/// caller names a workspace or project that does not exist.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] nxscope_config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Workspace root does not exist
    #[error("workspace root '{path}' does not exist")]
    RootNotFound { path: PathBuf },

    /// Workspace root is a file
    #[error("workspace root '{path}' is not a directory")]
    NotADirectory { path: PathBuf },

    /// Project not present in the snapshot
    #[error("project '{name}' not found in workspace")]
    ProjectNotFound { name: String },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },
}

impl WorkspaceError {
    /// Create a RootNotFound error.
    pub fn root_not_found(path: impl Into<PathBuf>) -> Self {
        Self::RootNotFound { path: path.into() }
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<PathBuf>) -> Self {
        Self::NotADirectory { path: path.into() }
    }

    /// Create a ProjectNotFound error.
    pub fn project_not_found(name: impl Into<String>) -> Self {
        Self::ProjectNotFound { name: name.into() }
    }

    /// Add context to any error.
    pub fn with_context(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WorkspaceError::root_not_found("/path/to/ws");
        assert!(err.to_string().contains("does not exist"));
        assert!(err.to_string().contains("/path/to/ws"));

        let err = WorkspaceError::project_not_found("my-lib");
        assert_eq!(err.to_string(), "project 'my-lib' not found in workspace");
    }

    #[test]
    fn test_with_context() {
        let err = WorkspaceError::with_context("reset", "no such root");
        assert_eq!(err.to_string(), "reset: no such root");
    }
}
