//! nxscope MCP Server implementation
//!
//! This module implements the MCP server using the rmcp SDK, exposing:
//! - Workspace overview (nx_workspace)
//! - Project configuration (nx_project_details)
//! - Snapshot management (nx_reset_workspace, nx_workspace_status)

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ErrorData as McpError,
};
use serde_json::json;
use tracing::{debug, info};

use nxscope_config::ScopeConfig;
use nxscope_workspace::{SnapshotCache, Workspace, WorkspaceResolver};

use crate::render::{compress_target, select_path, workspace_prompt, DEFAULT_MAX_TOKENS};
use crate::tools::*;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the workspace root
    pub workspace_root: PathBuf,
    /// Resolution settings (node binary, daemon, graph options)
    pub scope: ScopeConfig,
    /// Token budget for nx_workspace answers
    pub max_tokens: usize,
}

impl ServerConfig {
    /// Create config with default settings.
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            scope: ScopeConfig::default(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Set resolution settings
    pub fn with_scope(mut self, scope: ScopeConfig) -> Self {
        self.scope = scope;
        self
    }

    /// Set token budget
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// nxscope MCP Server exposing workspace snapshot tools
#[derive(Clone)]
pub struct NxScopeServer {
    workspace: Workspace,
    max_tokens: usize,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl NxScopeServer {
    /// Create a new server instance
    pub fn new(config: ServerConfig) -> Result<Self, crate::McpError> {
        info!("Initializing nxscope MCP server");
        info!("  Workspace: {}", config.workspace_root.display());

        let resolver = WorkspaceResolver::from_config(&config.scope);
        let cache = Arc::new(SnapshotCache::new(Arc::new(resolver)));
        let workspace = Workspace::open(&config.workspace_root, cache)?;
        Ok(Self::with_workspace(workspace, config.max_tokens))
    }

    /// Serve an already opened workspace.
    pub fn with_workspace(workspace: Workspace, max_tokens: usize) -> Self {
        Self {
            workspace,
            max_tokens,
            tool_router: Self::tool_router(),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    #[tool(
        name = "nx_workspace",
        description = "Returns a readable representation of the Nx project graph and the nx.json that configures Nx. If there are project graph errors, it also returns them. Use it to answer questions about the workspace and its architecture."
    )]
    pub async fn nx_workspace(
        &self,
        Parameters(params): Parameters<WorkspaceParams>,
    ) -> Result<CallToolResult, McpError> {
        let force_reset = params.force_reset.unwrap_or(false);
        debug!("nx_workspace: force_reset={}", force_reset);

        let snapshot = self.workspace.snapshot(force_reset).await;
        if !snapshot.is_valid {
            let reason = snapshot
                .errors
                .as_ref()
                .and_then(|errors| errors.first())
                .map(|e| e.summary())
                .unwrap_or_else(|| "workspace could not be resolved".to_string());
            return Ok(CallToolResult::error(vec![Content::text(format!(
                "Error: {} is not a valid Nx workspace. {}",
                self.workspace.root().display(),
                reason
            ))]));
        }

        let content = workspace_prompt(&snapshot, self.max_tokens)
            .into_iter()
            .map(Content::text)
            .collect();
        Ok(CallToolResult::success(content))
    }

    #[tool(
        name = "nx_project_details",
        description = "Returns the complete configuration of one Nx project: targets, tags, root, dependencies and dependents. Pass 'select' (a dot path such as 'targets.build') to return only part of it."
    )]
    pub async fn nx_project_details(
        &self,
        Parameters(params): Parameters<ProjectDetailsParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!(
            "nx_project_details: project='{}' select={:?}",
            params.project_name, params.select
        );

        let details = self
            .workspace
            .project(&params.project_name)
            .await
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
        let mut value = serde_json::to_value(&details.configuration).map_err(|e| {
            McpError::internal_error(format!("Failed to serialize project: {}", e), None)
        })?;

        if let Some(path) = params.select.as_deref() {
            return Ok(match select_path(&value, path) {
                Some(selected) => CallToolResult::success(vec![Content::text(format!(
                    "Project Details for {} at '{}':\n{}",
                    details.name,
                    path,
                    serde_json::to_string_pretty(selected).unwrap_or_default()
                ))]),
                None => CallToolResult::error(vec![Content::text(format!(
                    "Path '{}' not found in project configuration of {}",
                    path, details.name
                ))]),
            });
        }

        if let Some(obj) = value.as_object_mut() {
            obj.remove("targets");
            obj.insert("dependencies".to_string(), json!(details.dependencies));
            obj.insert("dependents".to_string(), json!(details.dependents));
        }
        let mut content = vec![Content::text(format!(
            "Project Details for {}:\n{}",
            details.name,
            serde_json::to_string_pretty(&value).unwrap_or_default()
        ))];

        if !details.configuration.targets.is_empty() {
            let targets: Vec<String> = details
                .configuration
                .targets
                .iter()
                .map(|(name, target)| format!("- {}", compress_target(name, target)))
                .collect();
            content.push(Content::text(format!(
                "Available Targets (use select='targets.<name>' for full configuration):\n{}",
                targets.join("\n")
            )));
        }

        Ok(CallToolResult::success(content))
    }

    #[tool(
        name = "nx_reset_workspace",
        description = "Discard the cached workspace snapshot so the next call re-reads nx.json, project.json and installed package versions. Call after configuration files change."
    )]
    pub async fn nx_reset_workspace(
        &self,
        Parameters(_params): Parameters<ResetWorkspaceParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("Resetting snapshot of {}", self.workspace.root().display());
        self.workspace.reset().await;

        Ok(CallToolResult::success(vec![Content::text(
            serde_json::to_string_pretty(&json!({
                "status": "reset",
                "workspaceRoot": self.workspace.root(),
                "state": self.workspace.state(),
            }))
            .unwrap_or_default(),
        )]))
    }

    #[tool(
        name = "nx_workspace_status",
        description = "Report the state of the cached snapshot: installed Nx version, project count, whether the graph is partial, error count and a fingerprint that changes whenever the project graph changes."
    )]
    pub async fn nx_workspace_status(
        &self,
        Parameters(_params): Parameters<WorkspaceStatusParams>,
    ) -> Result<CallToolResult, McpError> {
        let snapshot = self.workspace.snapshot(false).await;

        let response = json!({
            "workspaceRoot": snapshot.workspace_root,
            "state": self.workspace.state(),
            "isValid": snapshot.is_valid,
            "isPartial": snapshot.is_partial,
            "nxVersion": snapshot.tool_version.full,
            "projects": snapshot.graph.len(),
            "errors": snapshot.errors.as_ref().map_or(0, Vec::len),
            "daemonEnabled": snapshot.daemon_enabled,
            "fingerprint": snapshot.fingerprint(),
        });

        Ok(CallToolResult::success(vec![Content::text(
            serde_json::to_string_pretty(&response).unwrap_or_default(),
        )]))
    }
}

// Implement ServerHandler for tool routing
#[tool_handler]
impl rmcp::ServerHandler for NxScopeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "nxscope: Nx workspace structure for AI assistants.\n\n\
                TOOLS:\n\
                - nx_workspace: nx.json, every project with deps/targets/tags, and graph errors (start here)\n\
                - nx_project_details: full configuration of one project\n\
                - nx_workspace_status: Nx version, project count, snapshot fingerprint\n\
                - nx_reset_workspace: re-read configuration after it changed\n\n\
                WORKFLOW: nx_workspace → nx_project_details → nx_reset_workspace after edits"
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
