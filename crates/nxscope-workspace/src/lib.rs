//! nxscope Workspace - Single-flight configuration snapshots
//!
//! This crate sits on top of `nxscope-core` and provides:
//! - [`ConfigurationSnapshot`]: the immutable result of one resolution cycle
//! - [`SnapshotCache`]: at most one resolution per root, shared by every caller
//! - [`SnapshotResolver`]: the seam between the cache and the pipeline
//! - [`Workspace`]: a root bound to a shared cache, with project views
//!
//! Resolution never fails. A workspace without the tool installed, an
//! unsupported version, a broken configuration or a panicking resolver all
//! produce a snapshot describing what went wrong.
//!
//! ## Example
//!
//! ```ignore
//! use nxscope_config::ScopeConfig;
//! use nxscope_workspace::{SnapshotCache, Workspace, WorkspaceResolver};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScopeConfig::default();
//!     let cache = Arc::new(SnapshotCache::new(Arc::new(WorkspaceResolver::from_config(&config))));
//!
//!     let workspace = Workspace::open("/path/to/monorepo", cache)?;
//!     let snapshot = workspace.snapshot(false).await;
//!     println!("{} projects", snapshot.graph.len());
//!
//!     // after nx.json changed on disk
//!     workspace.reset().await;
//!     Ok(())
//! }
//! ```

mod cache;
mod error;
mod resolver;
mod snapshot;
mod types;
mod workspace;

pub use cache::{CacheState, SnapshotCache, RESOLUTION_FAILED};
pub use error::WorkspaceError;
pub use resolver::{SnapshotResolver, WorkspaceResolver, DEPENDENCY_NOT_FOUND};
pub use snapshot::ConfigurationSnapshot;
pub use types::{ProjectDetails, ProjectSummary};
pub use workspace::{canonical_root, Workspace};

/// Result type for workspace operations.
pub type Result<T> = std::result::Result<T, WorkspaceError>;
