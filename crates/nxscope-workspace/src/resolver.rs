//! Snapshot resolution pipeline.
//!
//! [`SnapshotResolver`] is the seam between the cache and the work it
//! memoizes. [`WorkspaceResolver`] runs the production pipeline: locate the
//! tool, gate on its version, build the graph.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use nxscope_config::ScopeConfig;
use nxscope_core::locator::{locate, LEGACY_WORKSPACE_PACKAGE};
use nxscope_core::{
    find_nx_package_path, BuildOptions, GraphBuilder, GraphRuntime, NxError, VersionGate,
    WorkspaceConfigReader,
};
use tracing::{debug, warn};

use crate::snapshot::ConfigurationSnapshot;

/// Name of the error reported when the tool is not installed.
pub const DEPENDENCY_NOT_FOUND: &str = "DependencyNotFound";

/// Produces snapshots for workspace roots.
///
/// Implementations must not fail: every problem ends up in the snapshot.
#[async_trait]
pub trait SnapshotResolver: Send + Sync {
    /// Resolve the current configuration of `workspace_root`.
    async fn resolve(&self, workspace_root: &Path) -> ConfigurationSnapshot;

    /// Drop any per-root state so the next resolution reads from disk.
    fn invalidate(&self, _workspace_root: &Path) {}
}

/// Locate, gate, build.
pub struct WorkspaceResolver {
    versions: VersionGate,
    builder: GraphBuilder,
}

impl WorkspaceResolver {
    pub fn new(builder: GraphBuilder) -> Self {
        Self {
            versions: VersionGate::new(),
            builder,
        }
    }

    /// Resolver driving `node` as configured.
    pub fn from_config(config: &ScopeConfig) -> Self {
        Self::new(GraphBuilder::from_config(config, WorkspaceConfigReader::new()))
    }

    /// Resolver over a custom runtime.
    pub fn with_runtime(runtime: Arc<dyn GraphRuntime>, options: BuildOptions) -> Self {
        Self::new(GraphBuilder::new(runtime, WorkspaceConfigReader::new(), options))
    }

    pub fn versions(&self) -> &VersionGate {
        &self.versions
    }

    async fn tool_installed(workspace_root: &Path) -> bool {
        find_nx_package_path(workspace_root, "package.json")
            .await
            .is_some()
            || locate(workspace_root, LEGACY_WORKSPACE_PACKAGE, "package.json")
                .await
                .is_some()
    }
}

#[async_trait]
impl SnapshotResolver for WorkspaceResolver {
    async fn resolve(&self, workspace_root: &Path) -> ConfigurationSnapshot {
        if !Self::tool_installed(workspace_root).await {
            warn!("nx is not installed in {:?}", workspace_root);
            let config = match self.builder.reader().read(workspace_root).await {
                Ok(config) => Some(config),
                Err(e) => {
                    debug!("configuration of {:?} unreadable: {}", workspace_root, e);
                    None
                }
            };
            let error = NxError::named(
                DEPENDENCY_NOT_FOUND,
                format!(
                    "unable to locate the nx package in {}",
                    workspace_root.display()
                ),
            );
            return ConfigurationSnapshot::invalid(workspace_root, error, config);
        }

        let version = self.versions.resolve(workspace_root).await;
        let result = self.builder.build(workspace_root, &version).await;
        ConfigurationSnapshot::from_build(workspace_root, version, result)
    }

    fn invalidate(&self, workspace_root: &Path) {
        self.versions.reset(workspace_root);
        self.builder.reader().invalidate(workspace_root);
    }
}
