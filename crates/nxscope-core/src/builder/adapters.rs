//! Version-specific graph adapters.
//!
//! Each adapter wraps one shape of the tool's graph API. [`select_adapter`]
//! picks one from the installed version; nothing else branches on versions.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::runtime::{BridgeModules, BridgeReport, BridgeRequest, BridgeResult, GraphEntry, GraphRuntime};
use super::{BuildOptions, BuildOutcome, GraphOutput};
use crate::classify::{classify, fatal_error};
use crate::error::{ConfigFileError, NxError, RuntimeError};
use crate::graph::{source_maps_from_raw, WorkspaceGraph};
use crate::locator::{locate, LEGACY_WORKSPACE_PACKAGE, NX_PACKAGE};
use crate::overrides;
use crate::version::ToolVersion;
use crate::workspace_config::{WorkspaceConfigFile, WorkspaceConfigReader};

/// Everything an adapter needs for one build.
pub struct BuildContext<'a> {
    pub workspace_root: &'a Path,
    pub version: &'a ToolVersion,
    pub runtime: &'a dyn GraphRuntime,
    pub reader: &'a WorkspaceConfigReader,
    pub options: &'a BuildOptions,
}

/// One shape of the tool's graph API.
#[async_trait]
pub trait GraphAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn read_config(
        &self,
        ctx: &BuildContext<'_>,
    ) -> Result<WorkspaceConfigFile, ConfigFileError>;

    async fn build(&self, ctx: &BuildContext<'_>) -> BuildOutcome;
}

/// Pick the adapter for an installed version.
pub fn select_adapter(version: &ToolVersion) -> Box<dyn GraphAdapter> {
    if !version.supports_project_graph() {
        Box::new(UnsupportedAdapter)
    } else if version.supports_source_maps() {
        Box::new(SourceMapAdapter)
    } else {
        Box::new(SingleEntryAdapter)
    }
}

/// Versions without a graph API: nothing to show, nothing wrong.
pub struct UnsupportedAdapter;

#[async_trait]
impl GraphAdapter for UnsupportedAdapter {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    async fn read_config(
        &self,
        ctx: &BuildContext<'_>,
    ) -> Result<WorkspaceConfigFile, ConfigFileError> {
        match ctx.reader.read_legacy(ctx.workspace_root).await {
            Ok(config) => Ok(config),
            Err(e) => {
                debug!("legacy configuration unreadable: {}", e);
                Ok(WorkspaceConfigFile::degraded(ctx.workspace_root, &e))
            }
        }
    }

    async fn build(&self, ctx: &BuildContext<'_>) -> BuildOutcome {
        debug!(
            "nx {} predates the project graph API, skipping graph construction",
            ctx.version
        );
        BuildOutcome::Success(GraphOutput::default())
    }
}

/// One graph entry point; every failure is fatal.
pub struct SingleEntryAdapter;

#[async_trait]
impl GraphAdapter for SingleEntryAdapter {
    fn name(&self) -> &'static str {
        "single-entry"
    }

    async fn read_config(
        &self,
        ctx: &BuildContext<'_>,
    ) -> Result<WorkspaceConfigFile, ConfigFileError> {
        ctx.reader.read(ctx.workspace_root).await
    }

    async fn build(&self, ctx: &BuildContext<'_>) -> BuildOutcome {
        let entry = if ctx.version.supports_async_graph() {
            GraphEntry::CreateProjectGraphAsync
        } else {
            GraphEntry::CreateProjectGraph
        };

        let request = match request_for(ctx, entry).await {
            Ok(request) => request,
            Err(e) => return BuildOutcome::fatal(runtime_error(&e)),
        };

        match ctx.runtime.invoke(&request).await {
            Ok(report) => {
                log_exit_calls(&report);
                let daemon = report.daemon;
                match report.result {
                    BridgeResult::Ok {
                        graph, file_map, ..
                    } => BuildOutcome::Success(GraphOutput {
                        graph: WorkspaceGraph::from_raw(&graph, file_map.as_ref()),
                        source_maps: Default::default(),
                        daemon,
                    }),
                    BridgeResult::Error { error } => BuildOutcome::fatal(fatal_error(&error)),
                }
            }
            Err(e) => BuildOutcome::fatal(runtime_error(&e)),
        }
    }
}

/// Combined graph + source map entry point inside a guarded region.
pub struct SourceMapAdapter;

#[async_trait]
impl GraphAdapter for SourceMapAdapter {
    fn name(&self) -> &'static str {
        "source-maps"
    }

    async fn read_config(
        &self,
        ctx: &BuildContext<'_>,
    ) -> Result<WorkspaceConfigFile, ConfigFileError> {
        ctx.reader.read(ctx.workspace_root).await
    }

    async fn build(&self, ctx: &BuildContext<'_>) -> BuildOutcome {
        let request =
            match request_for(ctx, GraphEntry::CreateProjectGraphAndSourceMapsAsync).await {
                Ok(request) => request,
                Err(e) => return BuildOutcome::fatal(runtime_error(&e)),
            };

        let guarded = overrides::guarded(ctx.options.silence_library_output, async {
            let report = ctx.runtime.invoke(&request).await;
            // replay exit attempts so the host-side intercept sees them
            if let Ok(report) = &report {
                for code in &report.exit_calls {
                    overrides::exit(*code);
                }
            }
            report
        })
        .await;

        for code in &guarded.exit_requests {
            warn!("graph construction attempted process exit with code {}", code);
        }

        let report = match guarded.value {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => return BuildOutcome::fatal(runtime_error(&e)),
            Err(panic) => {
                return BuildOutcome::fatal(NxError::named("GraphConstructionPanic", panic))
            }
        };

        let daemon = report.daemon;
        match report.result {
            BridgeResult::Ok {
                graph,
                source_maps,
                file_map,
            } => BuildOutcome::Success(GraphOutput {
                graph: WorkspaceGraph::from_raw(&graph, file_map.as_ref()),
                source_maps: source_maps
                    .as_ref()
                    .map(source_maps_from_raw)
                    .unwrap_or_default(),
                daemon,
            }),
            BridgeResult::Error { error } => {
                let classification = classify(&error);
                if !classification.is_partial_graph_error {
                    return BuildOutcome::Fatal {
                        errors: classification.errors,
                    };
                }
                let graph = classification
                    .partial_graph
                    .as_ref()
                    .map(|g| WorkspaceGraph::from_raw(g, None))
                    .unwrap_or_default();
                let source_maps = classification
                    .partial_source_maps
                    .as_ref()
                    .map(source_maps_from_raw)
                    .unwrap_or_default();
                BuildOutcome::Partial {
                    output: GraphOutput {
                        graph,
                        source_maps,
                        daemon,
                    },
                    errors: classification.errors,
                }
            }
        }
    }
}

/// Where the graph modules live for a version.
struct ModuleLayout {
    package: &'static str,
    project_graph: &'static str,
    output: &'static str,
    daemon_client: Option<&'static str>,
}

fn module_layout(version: &ToolVersion) -> ModuleLayout {
    if version.uses_nx_package() {
        ModuleLayout {
            package: NX_PACKAGE,
            project_graph: "src/project-graph/project-graph.js",
            output: "src/utils/output.js",
            daemon_client: Some("src/daemon/client/client.js"),
        }
    } else {
        ModuleLayout {
            package: LEGACY_WORKSPACE_PACKAGE,
            project_graph: "src/core/project-graph/index.js",
            output: "src/utilities/output.js",
            daemon_client: None,
        }
    }
}

const FILE_MAP_UTILS: &str = "src/project-graph/file-map-utils.js";

/// Locate the modules for `version` in the workspace.
pub async fn locate_modules(
    workspace_root: &Path,
    version: &ToolVersion,
) -> Result<BridgeModules, RuntimeError> {
    let layout = module_layout(version);
    let project_graph = locate(workspace_root, layout.package, layout.project_graph)
        .await
        .ok_or_else(|| {
            RuntimeError::module_not_found(format!("{}/{}", layout.package, layout.project_graph))
        })?;

    let optional = |relative: Option<&'static str>| async move {
        match relative {
            Some(relative) => locate(workspace_root, layout.package, relative).await,
            None => None,
        }
    };

    let file_map_utils = if version.supports_file_map_utils() {
        optional(Some(FILE_MAP_UTILS)).await
    } else {
        None
    };

    Ok(BridgeModules {
        project_graph,
        output: optional(Some(layout.output)).await,
        daemon_client: optional(layout.daemon_client).await,
        file_map_utils,
    })
}

async fn request_for(
    ctx: &BuildContext<'_>,
    entry: GraphEntry,
) -> Result<BridgeRequest, RuntimeError> {
    let modules = locate_modules(ctx.workspace_root, ctx.version).await?;
    Ok(BridgeRequest {
        workspace_root: PathBuf::from(ctx.workspace_root),
        entry,
        modules,
        include_file_map: ctx.options.include_file_map,
        silence_output: ctx.options.silence_library_output,
        reset_daemon: ctx.options.reset_daemon,
    })
}

fn runtime_error(err: &RuntimeError) -> NxError {
    let name = match err {
        RuntimeError::ModuleNotFound { .. } => "ModuleNotFound",
        _ => "GraphRuntimeError",
    };
    NxError::named(name, err.to_string())
}

fn log_exit_calls(report: &BridgeReport) {
    for code in &report.exit_calls {
        warn!("graph construction attempted process exit with code {}", code);
    }
}
