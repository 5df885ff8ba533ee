//! A single workspace root bound to a shared cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheState, SnapshotCache};
use crate::error::WorkspaceError;
use crate::snapshot::ConfigurationSnapshot;
use crate::types::{ProjectDetails, ProjectSummary};
use crate::Result;

/// Canonical form of a workspace root, so equal roots share one slot.
pub fn canonical_root(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(WorkspaceError::root_not_found(path));
    }
    if !path.is_dir() {
        return Err(WorkspaceError::not_a_directory(path));
    }
    Ok(path.canonicalize()?)
}

/// Handle on one workspace.
#[derive(Clone)]
pub struct Workspace {
    /// Canonical workspace root
    root: PathBuf,

    /// Cache shared with other handles
    cache: Arc<SnapshotCache>,
}

impl Workspace {
    /// Open the workspace at `root`.
    ///
    /// # Errors
    /// Fails when `root` is not an existing directory.
    pub fn open(root: impl AsRef<Path>, cache: Arc<SnapshotCache>) -> Result<Self> {
        let root = canonical_root(root)?;
        debug!("opened workspace {:?}", root);
        Ok(Self { root, cache })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    pub async fn snapshot(&self, force_reset: bool) -> Arc<ConfigurationSnapshot> {
        self.cache.get_snapshot(&self.root, force_reset).await
    }

    pub async fn reset(&self) {
        self.cache.reset(&self.root).await;
    }

    pub fn state(&self) -> CacheState {
        self.cache.state(&self.root)
    }

    pub async fn projects(&self) -> Vec<ProjectSummary> {
        self.snapshot(false).await.project_summaries()
    }

    /// Details of project `name` from the current snapshot.
    pub async fn project(&self, name: &str) -> Result<ProjectDetails> {
        self.snapshot(false)
            .await
            .project_details(name)
            .ok_or_else(|| WorkspaceError::project_not_found(name))
    }
}
