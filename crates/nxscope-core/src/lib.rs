//! nxscope Core - Nx workspace introspection
//!
//! This crate provides everything below the snapshot cache:
//! - Package location across node_modules, encapsulated installs and Yarn PnP
//! - Installed version detection and capability gating
//! - Workspace configuration reading (nx.json, workspace.json, project.json)
//! - Project graph construction through version-specific adapters
//! - Classification of partial-graph failures

pub mod builder;
pub mod classify;
pub mod error;
pub mod fs;
pub mod graph;
pub mod locator;
pub mod overrides;
pub mod package_manager;
pub mod pnp;
pub mod version;
pub mod workspace_config;

// Error re-exports
pub use error::{ConfigFileError, JsonFileError, NxError, RuntimeError};

// Builder re-exports
pub use builder::{
    select_adapter, BuildOptions, BuildOutcome, BuildResult, DaemonStatus, GraphAdapter,
    GraphBuilder, GraphRuntime, NodeRuntime,
};

pub use classify::{classify, Classification};
pub use fs::{parse_jsonc, JsonFileCache};
pub use graph::{GraphDependency, ProjectGraphNode, ProjectNodeData, SourceMaps, WorkspaceGraph};
pub use locator::{find_nx_package_path, locate, npm_dependencies};
pub use package_manager::{
    detect_package_manager, DetectedPackageManager, PackageManager, PackageManagerCommand,
};
pub use version::{ToolVersion, VersionGate};
pub use workspace_config::{
    ConfigFormat, NxJson, ProjectConfiguration, TargetConfiguration, WorkspaceConfigFile,
    WorkspaceConfigReader, WorkspaceLayout,
};
