//! Error types for the MCP server

use thiserror::Error;

/// Result type for MCP operations
pub type Result<T> = std::result::Result<T, McpError>;

/// Errors that can occur in the MCP server
#[derive(Error, Debug)]
pub enum McpError {
    /// Workspace could not be opened
    #[error("Failed to open workspace: {0}")]
    Workspace(#[from] nxscope_workspace::WorkspaceError),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] nxscope_config::ConfigError),

    /// Invalid parameters provided
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
