//! Workspace configuration files.
//!
//! Reads `nx.json`, `workspace.json` / `angular.json` (or standalone
//! `project.json` files), `lerna.json` and the installed lerna manifest
//! into a [`WorkspaceConfigFile`]. All JSON reads go through a shared
//! [`JsonFileCache`] so a watcher can invalidate them per root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::error::{ConfigFileError, NxError};
use crate::fs::{file_exists, JsonFileCache};
use crate::graph::WorkspaceGraph;
use crate::locator::locate;
use crate::version::ToolVersion;

pub const NX_JSON: &str = "nx.json";
pub const LERNA_JSON: &str = "lerna.json";
pub const PROJECT_JSON: &str = "project.json";

/// Workspace files listing projects, in lookup order.
pub const WORKSPACE_FILES: &[&str] = &["workspace.json", "angular.json"];

/// Directories never searched for `project.json`.
const DISCOVERY_IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".nx",
    ".yarn",
    ".angular",
    "dist",
    "tmp",
    "coverage",
];

/// A runnable target of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfiguration {
    #[serde(default, alias = "builder", skip_serializing_if = "Option::is_none")]
    pub executor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,

    /// Named configuration variants (`production`, `development`, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configurations: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_configuration: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One project as configured on disk (or as completed from the graph).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub root: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,

    #[serde(default, alias = "architect")]
    pub targets: BTreeMap<String, TargetConfiguration>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub implicit_dependencies: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// `workspaceLayout` as written in `nx.json`; both keys optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceLayoutOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apps_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub libs_dir: Option<String>,
}

/// Root `nx.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NxJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npm_scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_layout: Option<WorkspaceLayoutOverride>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_defaults: Option<Value>,

    /// Task runner options, including remote cache credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks_runner_options: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nx_cloud_access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_project: Option<String>,

    /// Per-project tags and implicit dependencies (workspaces before v13)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<BTreeMap<String, Value>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Resolved apps/libs directory conventions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceLayout {
    pub apps_dir: String,
    pub libs_dir: String,
}

impl WorkspaceLayout {
    /// Defaults: `packages/` for lerna repos, `apps/` + `libs/` otherwise.
    pub fn default_for(is_lerna: bool) -> Self {
        if is_lerna {
            Self {
                apps_dir: "packages".to_string(),
                libs_dir: "packages".to_string(),
            }
        } else {
            Self {
                apps_dir: "apps".to_string(),
                libs_dir: "libs".to_string(),
            }
        }
    }

    fn apply(&mut self, layout: &WorkspaceLayoutOverride) {
        if let Some(apps) = &layout.apps_dir {
            self.apps_dir = apps.clone();
        }
        if let Some(libs) = &layout.libs_dir {
            self.libs_dir = libs.clone();
        }
    }
}

impl Default for WorkspaceLayout {
    fn default() -> Self {
        Self::default_for(false)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigFormat {
    #[default]
    Nx,
    AngularCli,
}

/// Parsed workspace configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfigFile {
    pub projects: BTreeMap<String, ProjectConfiguration>,
    pub nx_json: Option<NxJson>,
    pub workspace_layout: WorkspaceLayout,
    /// Primary configuration file
    pub config_path: PathBuf,
    pub format: ConfigFormat,
    pub is_lerna: bool,
    pub lerna_uses_nx: bool,
    /// Files that could not be read; their projects are missing above
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub read_errors: Vec<NxError>,
}

impl WorkspaceConfigFile {
    /// Configuration with no projects, used when nothing could be read.
    pub fn empty(workspace_root: &Path) -> Self {
        Self {
            projects: BTreeMap::new(),
            nx_json: None,
            workspace_layout: WorkspaceLayout::default(),
            config_path: workspace_root.join(NX_JSON),
            format: ConfigFormat::Nx,
            is_lerna: false,
            lerna_uses_nx: false,
            read_errors: Vec::new(),
        }
    }

    /// Empty configuration remembering why the real one was unreadable.
    pub fn degraded(workspace_root: &Path, error: &ConfigFileError) -> Self {
        Self {
            read_errors: vec![NxError::from(error)],
            ..Self::empty(workspace_root)
        }
    }

    /// Overlay the resolved graph onto the configured projects.
    ///
    /// Graph data wins for projects present in both. Graph-only projects are
    /// added unless their name contains `:` (those are tool-internal).
    pub fn merge_graph(&mut self, graph: &WorkspaceGraph) {
        for (name, node) in &graph.nodes {
            match self.projects.get_mut(name) {
                Some(project) => {
                    project.root = node.data.root.clone();
                    if node.data.source_root.is_some() {
                        project.source_root = node.data.source_root.clone();
                    }
                    if node.data.project_type.is_some() {
                        project.project_type = node.data.project_type.clone();
                    }
                    project.targets = node.data.targets.clone();
                    project.tags = node.data.tags.clone();
                    project.files = node.data.files.clone();
                }
                None if name.contains(':') => {
                    trace!("skipping graph-only project {}", name);
                }
                None => {
                    self.projects.insert(
                        name.clone(),
                        ProjectConfiguration {
                            name: Some(name.clone()),
                            root: node.data.root.clone(),
                            source_root: node.data.source_root.clone(),
                            project_type: node.data.project_type.clone(),
                            targets: node.data.targets.clone(),
                            tags: node.data.tags.clone(),
                            implicit_dependencies: node.data.implicit_dependencies.clone(),
                            files: node.data.files.clone(),
                            extra: BTreeMap::new(),
                        },
                    );
                }
            }
        }
    }
}

/// Whether a lerna repo delegates task running to the workspace tool.
///
/// `nx.json` always wins. Otherwise an explicit `useNx` in `lerna.json`
/// decides, and without one lerna 6+ defaults to true.
pub fn lerna_uses_nx(has_nx_json: bool, lerna_json: Option<&Value>, lerna_major: Option<u64>) -> bool {
    if has_nx_json {
        return true;
    }
    if let Some(explicit) = lerna_json
        .and_then(|l| l.get("useNx"))
        .and_then(Value::as_bool)
    {
        return explicit;
    }
    lerna_major.is_some_and(|major| major >= 6)
}

/// Reads workspace configuration through a shared JSON cache.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceConfigReader {
    cache: Arc<JsonFileCache>,
}

impl WorkspaceConfigReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(cache: Arc<JsonFileCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<JsonFileCache> {
        &self.cache
    }

    /// Drop every cached read under `workspace_root`: `nx.json`,
    /// `workspace.json`, `angular.json`, `lerna.json` and all nested
    /// `project.json` / `package.json` files.
    pub fn invalidate(&self, workspace_root: &Path) {
        self.cache.clear_under(workspace_root);
    }

    /// Read configuration the current way: workspace file when present,
    /// otherwise discover standalone `project.json` files.
    pub async fn read(&self, workspace_root: &Path) -> Result<WorkspaceConfigFile, ConfigFileError> {
        self.read_with(workspace_root, true).await
    }

    /// Read configuration the pre-graph way: only `workspace.json` /
    /// `angular.json` plus per-project metadata in `nx.json`.
    pub async fn read_legacy(
        &self,
        workspace_root: &Path,
    ) -> Result<WorkspaceConfigFile, ConfigFileError> {
        self.read_with(workspace_root, false).await
    }

    /// Pick the read strategy for an installed version.
    pub async fn read_for(
        &self,
        workspace_root: &Path,
        version: &ToolVersion,
    ) -> Result<WorkspaceConfigFile, ConfigFileError> {
        if version.supports_project_graph() {
            self.read(workspace_root).await
        } else {
            self.read_legacy(workspace_root).await
        }
    }

    async fn read_with(
        &self,
        workspace_root: &Path,
        discover: bool,
    ) -> Result<WorkspaceConfigFile, ConfigFileError> {
        let nx_json: Option<NxJson> = self.read_optional(workspace_root, NX_JSON).await?;

        let mut workspace_file = None;
        for file in WORKSPACE_FILES {
            if let Some(value) = self.read_optional::<Value>(workspace_root, file).await? {
                workspace_file = Some((*file, value));
                break;
            }
        }

        let mut read_errors = Vec::new();
        let (mut projects, config_path, format) = match &workspace_file {
            Some((file, value)) => {
                let format = if *file == "angular.json" {
                    ConfigFormat::AngularCli
                } else {
                    ConfigFormat::Nx
                };
                let projects = self
                    .projects_from_workspace_file(workspace_root, file, value, &mut read_errors)
                    .await;
                (projects, workspace_root.join(file), format)
            }
            None => {
                let projects = if discover {
                    self.discover_projects(workspace_root, &mut read_errors).await?
                } else {
                    BTreeMap::new()
                };
                (projects, workspace_root.join(NX_JSON), ConfigFormat::Nx)
            }
        };

        if let Some(legacy) = nx_json.as_ref().and_then(|nx| nx.projects.as_ref()) {
            apply_legacy_project_metadata(&mut projects, legacy);
        }

        let is_lerna = file_exists(&workspace_root.join(LERNA_JSON)).await;
        let lerna_uses_nx = if is_lerna {
            let lerna_json: Option<Value> = self.read_optional(workspace_root, LERNA_JSON).await?;
            let lerna_major = self.installed_lerna_major(workspace_root).await;
            lerna_uses_nx(nx_json.is_some(), lerna_json.as_ref(), lerna_major)
        } else {
            false
        };

        let mut workspace_layout = WorkspaceLayout::default_for(is_lerna);
        if let Some(layout) = nx_json.as_ref().and_then(|nx| nx.workspace_layout.as_ref()) {
            workspace_layout.apply(layout);
        }

        debug!(
            "read {} projects from {:?}",
            projects.len(),
            config_path
        );

        Ok(WorkspaceConfigFile {
            projects,
            nx_json,
            workspace_layout,
            config_path,
            format,
            is_lerna,
            lerna_uses_nx,
            read_errors,
        })
    }

    async fn projects_from_workspace_file(
        &self,
        workspace_root: &Path,
        file: &str,
        value: &Value,
        read_errors: &mut Vec<NxError>,
    ) -> BTreeMap<String, ProjectConfiguration> {
        let mut projects = BTreeMap::new();
        let Some(entries) = value.get("projects").and_then(Value::as_object) else {
            return projects;
        };

        for (name, entry) in entries {
            let project = match entry {
                // string entries point at a directory holding project.json
                Value::String(dir) => {
                    let relative = Path::new(dir).join(PROJECT_JSON);
                    self.read_optional::<ProjectConfiguration>(workspace_root, &relative)
                        .await
                        .map(|project| {
                            let mut project = project.unwrap_or_default();
                            if project.root.is_empty() {
                                project.root = dir.clone();
                            }
                            project
                        })
                }
                other => serde_json::from_value::<ProjectConfiguration>(other.clone()).map_err(
                    |e| ConfigFileError::invalid_project(name, workspace_root.join(file), e),
                ),
            };
            match project {
                Ok(project) => {
                    projects.insert(name.clone(), project);
                }
                Err(e) => skip_unreadable(name, &e, read_errors),
            }
        }
        projects
    }

    async fn discover_projects(
        &self,
        workspace_root: &Path,
        read_errors: &mut Vec<NxError>,
    ) -> Result<BTreeMap<String, ProjectConfiguration>, ConfigFileError> {
        let root = workspace_root.to_path_buf();
        let files = tokio::task::spawn_blocking(move || discover_project_files(&root))
            .await
            .map_err(|e| ConfigFileError::Discovery(e.to_string()))?;

        let mut projects = BTreeMap::new();
        for relative in files {
            let mut project: ProjectConfiguration =
                match self.read_as(workspace_root, &relative).await {
                    Ok(project) => project,
                    Err(e) => {
                        skip_unreadable(&relative.display().to_string(), &e, read_errors);
                        continue;
                    }
                };
            let dir = relative
                .parent()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| ".".to_string());
            if project.root.is_empty() {
                project.root = dir.clone();
            }
            let name = project.name.clone().unwrap_or_else(|| {
                let base = if dir == "." { workspace_root } else { Path::new(&dir) };
                base.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or(dir)
            });
            projects.insert(name, project);
        }
        Ok(projects)
    }

    async fn installed_lerna_major(&self, workspace_root: &Path) -> Option<u64> {
        let manifest = locate(workspace_root, "lerna", "package.json").await?;
        let json = self.cache.read(manifest.parent()?, "package.json").await.ok()?;
        json.get("version")
            .and_then(Value::as_str)
            .map(|v| ToolVersion::coerce(v).major)
    }

    async fn read_as<T: DeserializeOwned>(
        &self,
        workspace_root: &Path,
        file: impl AsRef<Path>,
    ) -> Result<T, ConfigFileError> {
        Ok(self.cache.read_as(workspace_root, file).await?)
    }

    /// Like `read_as`, but a missing file is `None` instead of an error.
    async fn read_optional<T: DeserializeOwned>(
        &self,
        workspace_root: &Path,
        file: impl AsRef<Path>,
    ) -> Result<Option<T>, ConfigFileError> {
        match self.cache.read_as(workspace_root, file).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Record a project file that failed to read; the rest still load.
fn skip_unreadable(project: &str, error: &ConfigFileError, read_errors: &mut Vec<NxError>) {
    warn!("skipping unreadable project {}: {}", project, error);
    read_errors.push(NxError::from(error));
}

/// Merge `tags` / `implicitDependencies` from a pre-v13 `nx.json`.
fn apply_legacy_project_metadata(
    projects: &mut BTreeMap<String, ProjectConfiguration>,
    legacy: &BTreeMap<String, Value>,
) {
    for (name, meta) in legacy {
        let Some(project) = projects.get_mut(name) else {
            continue;
        };
        if project.tags.is_empty() {
            project.tags = string_list(meta.get("tags"));
        }
        if project.implicit_dependencies.is_empty() {
            project.implicit_dependencies = string_list(meta.get("implicitDependencies"));
        }
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Workspace-relative paths of every `project.json`, sorted.
fn discover_project_files(workspace_root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(workspace_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !DISCOVERY_IGNORED_DIRS
                    .iter()
                    .any(|ignored| entry.file_name() == *ignored)
        })
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == PROJECT_JSON)
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(workspace_root)
                .ok()
                .map(Path::to_path_buf)
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_lerna_decision_table() {
        let use_nx_false = json!({"useNx": false});
        let use_nx_true = json!({"useNx": true});
        let silent = json!({"version": "independent"});

        // nx.json wins over everything
        assert!(lerna_uses_nx(true, Some(&use_nx_false), Some(5)));
        // explicit flag next
        assert!(!lerna_uses_nx(false, Some(&use_nx_false), Some(7)));
        assert!(lerna_uses_nx(false, Some(&use_nx_true), Some(4)));
        // then the installed major
        assert!(lerna_uses_nx(false, Some(&silent), Some(6)));
        assert!(!lerna_uses_nx(false, Some(&silent), Some(5)));
        assert!(!lerna_uses_nx(false, None, None));
    }

    #[tokio::test]
    async fn test_read_workspace_json_with_string_paths() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "workspace.json",
            r#"{
              // comment
              "version": 2,
              "projects": {
                "app": "apps/app",
                "inline": {"root": "libs/inline", "architect": {"build": {"builder": "@angular/build:application"}}},
              }
            }"#,
        );
        write(
            temp.path(),
            "apps/app/project.json",
            r#"{"sourceRoot": "apps/app/src", "targets": {"serve": {"executor": "@nx/vite:dev-server"}}}"#,
        );
        write(temp.path(), "nx.json", r#"{"npmScope": "acme"}"#);

        let config = WorkspaceConfigReader::new().read(temp.path()).await.unwrap();

        assert_eq!(config.format, ConfigFormat::Nx);
        assert!(config.config_path.ends_with("workspace.json"));
        assert_eq!(config.projects["app"].root, "apps/app");
        assert_eq!(
            config.projects["app"].source_root.as_deref(),
            Some("apps/app/src")
        );
        assert_eq!(
            config.projects["inline"].targets["build"].executor.as_deref(),
            Some("@angular/build:application")
        );
        assert_eq!(
            config.nx_json.unwrap().npm_scope.as_deref(),
            Some("acme")
        );
        assert_eq!(config.workspace_layout, WorkspaceLayout::default());
    }

    #[tokio::test]
    async fn test_angular_json_format() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "angular.json",
            r#"{"projects": {"shop": {"root": "", "projectType": "application"}}}"#,
        );

        let config = WorkspaceConfigReader::new().read(temp.path()).await.unwrap();
        assert_eq!(config.format, ConfigFormat::AngularCli);
        assert_eq!(
            config.projects["shop"].project_type.as_deref(),
            Some("application")
        );
    }

    #[tokio::test]
    async fn test_discovers_project_json_files() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "nx.json", "{}");
        write(temp.path(), "libs/ui/project.json", r#"{"name": "shared-ui"}"#);
        write(temp.path(), "apps/web/project.json", r#"{"tags": ["type:app"]}"#);
        write(temp.path(), "node_modules/pkg/project.json", r#"{"name": "nope"}"#);

        let config = WorkspaceConfigReader::new().read(temp.path()).await.unwrap();
        let names: Vec<&String> = config.projects.keys().collect();
        assert_eq!(names, vec!["shared-ui", "web"]);
        assert_eq!(config.projects["web"].root, "apps/web");
        assert_eq!(config.projects["web"].tags, vec!["type:app"]);
    }

    #[tokio::test]
    async fn test_broken_project_json_is_skipped() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "nx.json", "{}");
        write(temp.path(), "libs/valid-a/project.json", r#"{"name": "valid-a"}"#);
        write(temp.path(), "libs/broken/project.json", r#"{"name": "broken", "#);
        write(temp.path(), "libs/valid-b/project.json", r#"{"name": "valid-b"}"#);

        let config = WorkspaceConfigReader::new().read(temp.path()).await.unwrap();

        let names: Vec<&String> = config.projects.keys().collect();
        assert_eq!(names, vec!["valid-a", "valid-b"]);
        assert_eq!(config.read_errors.len(), 1);
        assert_eq!(config.read_errors[0].name.as_deref(), Some("ConfigurationError"));
        assert!(config.read_errors[0]
            .file
            .as_deref()
            .is_some_and(|f| f.ends_with("libs/broken/project.json")));
    }

    #[tokio::test]
    async fn test_broken_workspace_entries_are_skipped() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "workspace.json",
            r#"{"projects": {"ok": "libs/ok", "bad-dir": "libs/bad", "bad-inline": {"tags": "not-a-list"}}}"#,
        );
        write(temp.path(), "libs/ok/project.json", "{}");
        write(temp.path(), "libs/bad/project.json", "{ nope");

        let config = WorkspaceConfigReader::new().read(temp.path()).await.unwrap();

        assert_eq!(config.projects.keys().collect::<Vec<_>>(), vec!["ok"]);
        assert_eq!(config.read_errors.len(), 2);
    }

    #[tokio::test]
    async fn test_legacy_read_skips_discovery_and_merges_nx_json_projects() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "workspace.json",
            r#"{"projects": {"api": {"root": "apps/api"}}}"#,
        );
        write(
            temp.path(),
            "nx.json",
            r#"{"projects": {"api": {"tags": ["scope:server"], "implicitDependencies": ["shared"]}}}"#,
        );
        write(temp.path(), "libs/other/project.json", "{}");

        let config = WorkspaceConfigReader::new()
            .read_legacy(temp.path())
            .await
            .unwrap();
        assert_eq!(config.projects.len(), 1);
        assert_eq!(config.projects["api"].tags, vec!["scope:server"]);
        assert_eq!(config.projects["api"].implicit_dependencies, vec!["shared"]);
    }

    #[tokio::test]
    async fn test_lerna_layout_and_nx_json_override() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lerna.json", r#"{"useNx": false}"#);

        let config = WorkspaceConfigReader::new().read(temp.path()).await.unwrap();
        assert!(config.is_lerna);
        assert!(!config.lerna_uses_nx);
        assert_eq!(config.workspace_layout.apps_dir, "packages");

        write(
            temp.path(),
            "nx.json",
            r#"{"workspaceLayout": {"appsDir": "applications"}}"#,
        );
        let config = WorkspaceConfigReader::new().read(temp.path()).await.unwrap();
        assert!(config.lerna_uses_nx);
        assert_eq!(config.workspace_layout.apps_dir, "applications");
        assert_eq!(config.workspace_layout.libs_dir, "packages");
    }

    #[tokio::test]
    async fn test_malformed_nx_json_is_an_error() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "nx.json", "{ \"npmScope\": ");

        let err = WorkspaceConfigReader::new()
            .read(temp.path())
            .await
            .unwrap_err();
        let nx: crate::NxError = (&err).into();
        assert!(nx.file.unwrap().ends_with("nx.json"));
    }

    #[tokio::test]
    async fn test_invalidate_drops_cached_reads() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "nx.json", r#"{"npmScope": "old"}"#);

        let reader = WorkspaceConfigReader::new();
        reader.read(temp.path()).await.unwrap();

        write(temp.path(), "nx.json", r#"{"npmScope": "new"}"#);
        let stale = reader.read(temp.path()).await.unwrap();
        assert_eq!(stale.nx_json.unwrap().npm_scope.as_deref(), Some("old"));

        reader.invalidate(temp.path());
        let fresh = reader.read(temp.path()).await.unwrap();
        assert_eq!(fresh.nx_json.unwrap().npm_scope.as_deref(), Some("new"));
    }

    #[test]
    fn test_merge_graph_prefers_graph_data() {
        let mut config = WorkspaceConfigFile::empty(Path::new("/w"));
        config.projects.insert(
            "a".to_string(),
            ProjectConfiguration {
                root: "old/a".to_string(),
                tags: vec!["stale".to_string()],
                ..Default::default()
            },
        );

        let graph = WorkspaceGraph::from_raw(
            &json!({
                "nodes": {
                    "a": {"name": "a", "data": {"root": "apps/a", "tags": ["fresh"], "targets": {"test": {}}}},
                    "b": {"name": "b", "data": {"root": "libs/b"}},
                    "a:e2e": {"name": "a:e2e", "data": {"root": "apps/a-e2e"}}
                },
                "dependencies": {}
            }),
            None,
        );

        config.merge_graph(&graph);

        assert_eq!(config.projects["a"].root, "apps/a");
        assert_eq!(config.projects["a"].tags, vec!["fresh"]);
        assert!(config.projects["a"].targets.contains_key("test"));
        assert_eq!(config.projects["b"].name.as_deref(), Some("b"));
        assert!(!config.projects.contains_key("a:e2e"));
    }
}
