//! Installed tool version and capability gating.
//!
//! The workspace tool changed its graph API shape several times. Every
//! version-dependent decision goes through [`ToolVersion`]'s capability
//! helpers instead of comparing version strings ad hoc.

use std::fmt;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fs::read_jsonc_file;
use crate::locator::{locate, LEGACY_WORKSPACE_PACKAGE, NX_PACKAGE};

/// Oldest major with a project graph API.
pub const MIN_SUPPORTED_MAJOR: u64 = 12;

static COERCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\d])(\d{1,16})(?:\.(\d{1,16}))?(?:\.(\d{1,16}))?(?:$|[^\d])")
        .expect("static pattern")
});

/// Version of the installed workspace tool.
///
/// Ordered by `(major, minor, patch)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ToolVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub full: String,
}

impl ToolVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            full: format!("{major}.{minor}.{patch}"),
        }
    }

    /// The conservative default for unknown installs.
    pub fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    /// Coerce arbitrary text into a version, taking the first `N[.N[.N]]` run.
    ///
    /// `"^17.2.0-beta.1"` becomes `17.2.0`; text without digits becomes `0.0.0`.
    pub fn coerce(raw: &str) -> Self {
        let Some(caps) = COERCE.captures(raw) else {
            return Self::zero();
        };
        let part = |i: usize| {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<u64>().ok())
                .unwrap_or(0)
        };
        Self::new(part(1), part(2), part(3))
    }

    fn semver(&self) -> Version {
        Version::new(self.major, self.minor, self.patch)
    }

    fn at_least(&self, major: u64, minor: u64, patch: u64) -> bool {
        self.semver() >= Version::new(major, minor, patch)
    }

    /// A project graph can be built at all.
    pub fn supports_project_graph(&self) -> bool {
        self.major >= MIN_SUPPORTED_MAJOR
    }

    /// `createProjectGraphAsync` exists.
    pub fn supports_async_graph(&self) -> bool {
        self.at_least(13, 0, 0)
    }

    /// Graph and source maps come from one combined entry point.
    pub fn supports_source_maps(&self) -> bool {
        self.at_least(17, 2, 0)
    }

    /// Graph modules live in `nx` rather than `@nrwl/workspace`.
    pub fn uses_nx_package(&self) -> bool {
        self.at_least(14, 0, 0)
    }

    /// `createProjectFileMapUsingProjectGraph` exists.
    pub fn supports_file_map_utils(&self) -> bool {
        self.at_least(16, 3, 1)
    }
}

impl Default for ToolVersion {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

/// Read the installed tool version of a workspace without memoization.
///
/// Looks at `nx/package.json`, then the legacy `@nrwl/workspace` manifest.
/// Returns `None` when neither manifest is installed.
pub async fn read_installed_version(workspace_root: &Path) -> Option<ToolVersion> {
    for package in [NX_PACKAGE, LEGACY_WORKSPACE_PACKAGE] {
        let Some(manifest) = locate(workspace_root, package, "package.json").await else {
            continue;
        };
        let version = match read_jsonc_file(&manifest).await {
            Ok(json) => json
                .get("version")
                .and_then(|v| v.as_str())
                .map(ToolVersion::coerce)
                .unwrap_or_default(),
            Err(e) => {
                debug!("unreadable manifest {:?}: {}", manifest, e);
                ToolVersion::zero()
            }
        };
        return Some(version);
    }
    None
}

/// Per-root memo of installed tool versions.
#[derive(Debug, Default)]
pub struct VersionGate {
    memo: DashMap<PathBuf, ToolVersion>,
}

impl VersionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Version installed in `workspace_root`, `0.0.0` when undiscoverable.
    pub async fn resolve(&self, workspace_root: &Path) -> ToolVersion {
        if let Some(cached) = self.memo.get(workspace_root) {
            return cached.clone();
        }

        let version = read_installed_version(workspace_root)
            .await
            .unwrap_or_default();
        debug!("workspace {:?} uses nx {}", workspace_root, version);
        self.memo
            .insert(workspace_root.to_path_buf(), version.clone());
        version
    }

    /// Forget the memoized version of one root.
    pub fn reset(&self, workspace_root: &Path) {
        self.memo.remove(workspace_root);
    }

    pub fn reset_all(&self) {
        self.memo.clear();
    }
}
