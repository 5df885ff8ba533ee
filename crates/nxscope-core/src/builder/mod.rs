//! Graph builder.
//!
//! Reads the workspace configuration and builds the project graph through
//! the adapter matching the installed version. Every failure is folded into
//! the [`BuildResult`]; callers never see an error.

mod adapters;
mod runtime;

pub use adapters::{
    locate_modules, select_adapter, BuildContext, GraphAdapter, SingleEntryAdapter,
    SourceMapAdapter, UnsupportedAdapter,
};
pub use runtime::{
    BridgeModules, BridgeReport, BridgeRequest, BridgeResult, DaemonStatus, GraphEntry,
    GraphRuntime, NodeRuntime, BRIDGE_SCRIPT, REPORT_MARKER,
};

use std::path::Path;
use std::sync::Arc;

use nxscope_config::ScopeConfig;
use tracing::{debug, info, warn};

use crate::error::NxError;
use crate::graph::{SourceMaps, WorkspaceGraph};
use crate::version::ToolVersion;
use crate::workspace_config::{WorkspaceConfigFile, WorkspaceConfigReader};

/// Knobs for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub silence_library_output: bool,
    pub include_file_map: bool,
    pub reset_daemon: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            silence_library_output: true,
            include_file_map: true,
            reset_daemon: true,
        }
    }
}

impl From<&ScopeConfig> for BuildOptions {
    fn from(config: &ScopeConfig) -> Self {
        Self {
            silence_library_output: config.graph.silence_library_output,
            include_file_map: config.graph.include_file_map,
            reset_daemon: config.daemon.reset_after_extraction,
        }
    }
}

/// Graph data produced by an adapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphOutput {
    pub graph: WorkspaceGraph,
    pub source_maps: SourceMaps,
    pub daemon: Option<DaemonStatus>,
}

/// What an adapter's build amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    Success(GraphOutput),
    /// Some projects failed; the rest are usable
    Partial {
        output: GraphOutput,
        errors: Vec<NxError>,
    },
    Fatal {
        errors: Vec<NxError>,
    },
}

impl BuildOutcome {
    pub fn fatal(error: NxError) -> Self {
        Self::Fatal {
            errors: vec![error],
        }
    }
}

/// Everything one build produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildResult {
    pub graph: WorkspaceGraph,
    pub source_maps: SourceMaps,
    /// Configuration with the graph merged in
    pub config: WorkspaceConfigFile,
    pub errors: Option<Vec<NxError>>,
    pub is_partial: bool,
    pub daemon: Option<DaemonStatus>,
    /// Adapter that produced the result
    pub adapter: &'static str,
}

impl BuildResult {
    fn from_outcome(
        mut config: WorkspaceConfigFile,
        outcome: BuildOutcome,
        adapter: &'static str,
    ) -> Self {
        let (output, errors, is_partial) = match outcome {
            BuildOutcome::Success(output) => (output, None, false),
            BuildOutcome::Partial { output, errors } => (output, Some(errors), true),
            BuildOutcome::Fatal { errors } => (GraphOutput::default(), Some(errors), false),
        };

        config.merge_graph(&output.graph);
        Self {
            graph: output.graph,
            source_maps: output.source_maps,
            config,
            errors,
            is_partial,
            daemon: output.daemon,
            adapter,
        }
    }
}

/// Builds graphs through a [`GraphRuntime`].
#[derive(Clone)]
pub struct GraphBuilder {
    runtime: Arc<dyn GraphRuntime>,
    reader: WorkspaceConfigReader,
    options: BuildOptions,
}

impl GraphBuilder {
    pub fn new(
        runtime: Arc<dyn GraphRuntime>,
        reader: WorkspaceConfigReader,
        options: BuildOptions,
    ) -> Self {
        Self {
            runtime,
            reader,
            options,
        }
    }

    /// Builder running `node` as configured.
    pub fn from_config(config: &ScopeConfig, reader: WorkspaceConfigReader) -> Self {
        Self::new(
            Arc::new(NodeRuntime::from_config(config)),
            reader,
            BuildOptions::from(config),
        )
    }

    pub fn reader(&self) -> &WorkspaceConfigReader {
        &self.reader
    }

    /// Build the graph of `workspace_root` for an installed `version`.
    pub async fn build(&self, workspace_root: &Path, version: &ToolVersion) -> BuildResult {
        let adapter = select_adapter(version);
        debug!("building {:?} with the {} adapter", workspace_root, adapter.name());

        let ctx = BuildContext {
            workspace_root,
            version,
            runtime: self.runtime.as_ref(),
            reader: &self.reader,
            options: &self.options,
        };

        // the graph API reads configuration itself; ours only enriches it
        let config = match adapter.read_config(&ctx).await {
            Ok(config) => config,
            Err(e) => {
                warn!("workspace configuration unreadable, building anyway: {}", e);
                WorkspaceConfigFile::degraded(workspace_root, &e)
            }
        };

        let outcome = adapter.build(&ctx).await;
        let result = BuildResult::from_outcome(config, outcome, adapter.name());

        if let Some(daemon) = &result.daemon {
            match &daemon.error {
                Some(error) => debug!("daemon status unavailable: {}", error),
                None => debug!(
                    "daemon enabled={} available={} reset={}",
                    daemon.enabled, daemon.available, daemon.reset
                ),
            }
        }
        match &result.errors {
            Some(errors) if result.is_partial => warn!(
                "partial graph for {:?}: {} projects, {} errors",
                workspace_root,
                result.graph.len(),
                errors.len()
            ),
            Some(errors) => warn!(
                "graph construction failed for {:?}: {}",
                workspace_root,
                errors
                    .first()
                    .map(NxError::summary)
                    .unwrap_or_default()
            ),
            None => info!(
                "built graph for {:?}: {} projects",
                workspace_root,
                result.graph.len()
            ),
        }
        result
    }
}
