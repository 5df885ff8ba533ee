//! nxscope MCP - MCP server exposing Nx workspace snapshots to AI assistants
//!
//! This crate provides an MCP (Model Context Protocol) server over stdio that
//! answers questions about an Nx workspace from its cached configuration
//! snapshot.
//!
//! # Features
//!
//! - **Workspace overview**: `nx_workspace` renders nx.json, the project graph
//!   and any graph errors, trimmed to a token budget
//! - **Project details**: `nx_project_details` returns one project's full
//!   configuration with its edges
//! - **Invalidation**: `nx_reset_workspace` drops the cached snapshot after
//!   configuration changes

pub mod error;
pub mod render;
pub mod server;
pub mod tools;

// Re-exports
pub use error::{McpError, Result};
pub use server::{NxScopeServer, ServerConfig};
