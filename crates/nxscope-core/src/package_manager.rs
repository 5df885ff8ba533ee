//! Package manager detection.
//!
//! A `packageManager` field in the root `package.json` (corepack) pins the
//! manager and wins over lock files. Pinned managers are invoked through
//! `corepack` so the pinned version is used.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::fs::{file_exists, read_jsonc_file};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

impl PackageManager {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Yarn => "yarn",
            Self::Pnpm => "pnpm",
            Self::Bun => "bun",
        }
    }

    /// Commands for this manager, prefixed with `corepack` when pinned.
    pub fn command(&self, via_corepack: bool) -> PackageManagerCommand {
        let pm = if via_corepack {
            format!("corepack {}", self.as_str())
        } else {
            self.as_str().to_string()
        };

        match self {
            Self::Npm => PackageManagerCommand {
                install: format!("{pm} install"),
                exec: "npx".to_string(),
                add: format!("{pm} install"),
                add_dev: format!("{pm} install -D"),
                list: format!("{pm} ls"),
            },
            Self::Yarn => PackageManagerCommand {
                install: pm.clone(),
                exec: pm.clone(),
                add: format!("{pm} add"),
                add_dev: format!("{pm} add -D"),
                list: format!("{pm} list"),
            },
            Self::Pnpm => PackageManagerCommand {
                install: format!("{pm} install"),
                exec: format!("{pm} exec"),
                add: format!("{pm} add"),
                add_dev: format!("{pm} add -D"),
                list: format!("{pm} ls --depth 100"),
            },
            Self::Bun => PackageManagerCommand {
                install: format!("{pm} install"),
                exec: "bunx".to_string(),
                add: format!("{pm} install"),
                add_dev: format!("{pm} install -D"),
                list: format!("{pm} pm ls"),
            },
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageManager {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "npm" => Ok(Self::Npm),
            "yarn" => Ok(Self::Yarn),
            "pnpm" => Ok(Self::Pnpm),
            "bun" => Ok(Self::Bun),
            other => Err(format!("unknown package manager '{other}'")),
        }
    }
}

/// Shell command prefixes for common package-manager operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManagerCommand {
    pub install: String,
    pub exec: String,
    pub add: String,
    pub add_dev: String,
    pub list: String,
}

/// Result of package manager detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedPackageManager {
    pub manager: PackageManager,
    /// Raw corepack pin, e.g. `yarn@4.7.0`
    pub corepack: Option<String>,
    pub command: PackageManagerCommand,
}

/// The name part of a `packageManager` value: `yarn@4.7.0` gives `yarn`.
pub fn extract_package_manager_name(spec: &str) -> &str {
    spec.split('@').next().unwrap_or_default()
}

/// The `packageManager` field of the root `package.json`, if any.
///
/// Missing or malformed manifests yield `None`.
pub async fn detect_corepack_package_manager(workspace_root: &Path) -> Option<String> {
    let manifest = read_jsonc_file(&workspace_root.join("package.json"))
        .await
        .ok()?;
    manifest
        .get("packageManager")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Detect the package manager of a workspace.
pub async fn detect_package_manager(workspace_root: &Path) -> DetectedPackageManager {
    if let Some(pin) = detect_corepack_package_manager(workspace_root).await {
        if let Ok(manager) = extract_package_manager_name(&pin).parse::<PackageManager>() {
            trace!("corepack pins {}", pin);
            return DetectedPackageManager {
                manager,
                command: manager.command(true),
                corepack: Some(pin),
            };
        }
    }

    let manager = detect_from_lock_files(workspace_root).await;
    DetectedPackageManager {
        manager,
        corepack: None,
        command: manager.command(false),
    }
}

async fn detect_from_lock_files(workspace_root: &Path) -> PackageManager {
    const LOCK_FILES: &[(&str, PackageManager)] = &[
        ("bun.lockb", PackageManager::Bun),
        ("bun.lock", PackageManager::Bun),
        ("pnpm-lock.yaml", PackageManager::Pnpm),
        ("yarn.lock", PackageManager::Yarn),
    ];

    for (file, manager) in LOCK_FILES {
        if file_exists(&workspace_root.join(file)).await {
            return *manager;
        }
    }
    PackageManager::Npm
}
