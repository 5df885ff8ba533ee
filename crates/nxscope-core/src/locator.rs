//! Package locator.
//!
//! Finds files inside installed dependencies of a workspace. Strategies are
//! tried in priority order and the first candidate whose *final* file exists
//! wins, so a half-finished install falls through to the next strategy:
//!
//! 1. Relative dependency names (`./tools/plugin`) resolve under the root.
//! 2. Yarn Plug'n'Play installs resolve through the PnP runtime state.
//! 3. `node_modules/<name>`, then the encapsulated
//!    `.nx/installation/node_modules/<name>`.
//!
//! Nothing here is cached: installs change between runs.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::fs::{directory_exists, file_exists};
use crate::pnp::{pnp_marker, PnpState};

/// Name of the workspace tool's package.
pub const NX_PACKAGE: &str = "nx";

/// Package that hosted the graph modules before they moved into `nx`.
pub const LEGACY_WORKSPACE_PACKAGE: &str = "@nrwl/workspace";

/// Install directories probed by the plain strategy, highest priority first.
pub const INSTALL_DIRS: &[&str] = &["node_modules", ".nx/installation/node_modules"];

/// Locate `relative_file` inside `dependency_name` as installed in `workspace_root`.
///
/// Returns `None` when no strategy yields an existing file. Callers decide
/// whether that is fatal.
pub async fn locate(
    workspace_root: &Path,
    dependency_name: &str,
    relative_file: impl AsRef<Path>,
) -> Option<PathBuf> {
    let relative_file = relative_file.as_ref();

    if is_path_like(dependency_name) {
        let candidate = workspace_root.join(dependency_name).join(relative_file);
        return existing(candidate).await;
    }

    if let Some(marker) = pnp_marker(workspace_root).await {
        trace!("workspace {:?} uses Plug'n'Play", workspace_root);
        if let Some(state) = PnpState::load(workspace_root, &marker).await {
            if let Some(dir) = state.resolve_package_dir(dependency_name) {
                if let Some(found) = existing(dir.join(relative_file)).await {
                    return Some(found);
                }
            }
        }
    }

    for install_dir in INSTALL_DIRS {
        let candidate = workspace_root
            .join(install_dir)
            .join(dependency_name)
            .join(relative_file);
        if let Some(found) = existing(candidate).await {
            return Some(found);
        }
    }

    debug!(
        "could not locate {}/{} in {:?}",
        dependency_name,
        relative_file.display(),
        workspace_root
    );
    None
}

/// Locate a file inside the installed `nx` package.
pub async fn find_nx_package_path(
    workspace_root: &Path,
    relative_file: impl AsRef<Path>,
) -> Option<PathBuf> {
    locate(workspace_root, NX_PACKAGE, relative_file).await
}

/// List installed package directories.
///
/// Reads `node_modules`, falling back to the encapsulated install when the
/// workspace has none. Scoped packages are expanded to `@scope/name`.
/// Result is sorted.
pub async fn npm_dependencies(workspace_root: &Path) -> Vec<PathBuf> {
    let mut install_dir = None;
    for dir in INSTALL_DIRS {
        let candidate = workspace_root.join(dir);
        if directory_exists(&candidate).await {
            install_dir = Some(candidate);
            break;
        }
    }
    let Some(install_dir) = install_dir else {
        return Vec::new();
    };

    let mut packages = Vec::new();
    for entry in list_dirs(&install_dir).await {
        let name = entry
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name.starts_with('.') {
            continue;
        }
        if name.starts_with('@') {
            packages.extend(list_dirs(&entry).await);
        } else {
            packages.push(entry);
        }
    }
    packages.sort();
    packages
}

async fn list_dirs(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return out;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        // follows symlinks so linked packages count
        if directory_exists(&entry.path()).await {
            out.push(entry.path());
        }
    }
    out
}

fn is_path_like(dependency_name: &str) -> bool {
    dependency_name.starts_with("./")
        || dependency_name.starts_with("../")
        || Path::new(dependency_name).is_absolute()
}

async fn existing(candidate: PathBuf) -> Option<PathBuf> {
    if file_exists(&candidate).await {
        Some(candidate)
    } else {
        None
    }
}
