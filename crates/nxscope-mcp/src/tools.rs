//! MCP Tool parameter definitions
//!
//! These structs define the JSON Schema for tool parameters using schemars.

use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

/// Parameters for nx_workspace tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkspaceParams {
    /// Re-read configuration from disk first
    #[schemars(
        description = "Discard the cached snapshot and re-read the workspace configuration before answering (default false). Use after editing nx.json or project.json files."
    )]
    pub force_reset: Option<bool>,
}

/// Parameters for nx_project_details tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProjectDetailsParams {
    /// Project to look up
    #[schemars(description = "Name of the project as listed by nx_workspace (e.g., \"shared-ui\")")]
    pub project_name: String,

    /// Restrict the output to a subset of the configuration
    #[schemars(
        description = "Optional dot path into the project configuration, e.g. \"targets.build\" or \"tags\". Returns the whole project when omitted."
    )]
    pub select: Option<String>,
}

/// Parameters for nx_reset_workspace tool (no params needed)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResetWorkspaceParams {}

/// Parameters for nx_workspace_status tool (no params needed)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkspaceStatusParams {}
