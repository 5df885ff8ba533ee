//! Configuration snapshots.
//!
//! A [`ConfigurationSnapshot`] is everything one resolution cycle learned
//! about a workspace. It is immutable once built and shared behind an
//! `Arc`; the next cycle replaces it wholesale.

use std::path::{Path, PathBuf};

use nxscope_core::{
    BuildResult, NxError, ProjectConfiguration, SourceMaps, ToolVersion, WorkspaceConfigFile,
    WorkspaceGraph,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{ProjectDetails, ProjectSummary};

/// The externally visible result of resolving a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationSnapshot {
    pub workspace_root: PathBuf,
    pub graph: WorkspaceGraph,
    pub source_maps: SourceMaps,
    pub config_file: WorkspaceConfigFile,
    pub is_partial: bool,
    pub errors: Option<Vec<NxError>>,
    pub tool_version: ToolVersion,
    /// False only when the workspace tool could not be located at all
    pub is_valid: bool,
    /// Daemon state observed during the build, when the tool reported one
    pub daemon_enabled: Option<bool>,
}

impl ConfigurationSnapshot {
    /// Snapshot of a completed build.
    pub fn from_build(workspace_root: &Path, tool_version: ToolVersion, result: BuildResult) -> Self {
        Self {
            workspace_root: workspace_root.to_path_buf(),
            graph: result.graph,
            source_maps: result.source_maps,
            config_file: result.config,
            is_partial: result.is_partial,
            errors: result.errors,
            tool_version,
            is_valid: true,
            daemon_enabled: result.daemon.map(|d| d.enabled),
        }
    }

    /// Snapshot of a workspace that could not be resolved.
    ///
    /// The graph is empty and `error` is the only entry.
    pub fn invalid(workspace_root: &Path, error: NxError, config_file: Option<WorkspaceConfigFile>) -> Self {
        Self {
            workspace_root: workspace_root.to_path_buf(),
            graph: WorkspaceGraph::default(),
            source_maps: SourceMaps::new(),
            config_file: config_file.unwrap_or_else(|| WorkspaceConfigFile::empty(workspace_root)),
            is_partial: false,
            errors: Some(vec![error]),
            tool_version: ToolVersion::zero(),
            is_valid: false,
            daemon_enabled: None,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }

    /// SHA-256 of the graph's canonical JSON, lowercase hex.
    ///
    /// Graph maps are ordered, so equal graphs always hash equal.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        match serde_json::to_vec(&self.graph) {
            Ok(bytes) => hasher.update(&bytes),
            Err(_) => hasher.update(b"unserializable"),
        }
        format!("{:x}", hasher.finalize())
    }

    /// Configuration of a project, graph data merged in.
    pub fn project(&self, name: &str) -> Option<&ProjectConfiguration> {
        self.config_file.projects.get(name)
    }

    /// One summary per configured project, sorted by name.
    pub fn project_summaries(&self) -> Vec<ProjectSummary> {
        self.config_file
            .projects
            .iter()
            .map(|(name, project)| ProjectSummary {
                name: name.clone(),
                root: project.root.clone(),
                project_type: project
                    .project_type
                    .clone()
                    .or_else(|| self.graph.nodes.get(name).map(|n| n.node_type.clone()))
                    .filter(|t| !t.is_empty()),
                tags: project.tags.clone(),
                targets: project.targets.keys().cloned().collect(),
            })
            .collect()
    }

    /// Full view of one project with its edges and source map.
    pub fn project_details(&self, name: &str) -> Option<ProjectDetails> {
        let configuration = self.project(name)?.clone();
        let source_map = self.source_maps.get(&configuration.root).cloned();
        Some(ProjectDetails {
            name: name.to_string(),
            dependencies: self
                .graph
                .dependencies_of(name)
                .into_iter()
                .map(str::to_string)
                .collect(),
            dependents: self
                .graph
                .dependents_of(name)
                .into_iter()
                .map(str::to_string)
                .collect(),
            configuration,
            source_map,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxscope_core::{BuildResult, GraphDependency, ProjectGraphNode, ProjectNodeData};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn node(name: &str) -> ProjectGraphNode {
        ProjectGraphNode {
            name: name.to_string(),
            node_type: "lib".to_string(),
            data: ProjectNodeData {
                root: format!("libs/{name}"),
                ..Default::default()
            },
        }
    }

    fn snapshot(names: &[&str]) -> ConfigurationSnapshot {
        let mut graph = WorkspaceGraph::default();
        for name in names {
            graph.nodes.insert(name.to_string(), node(name));
            graph.dependencies.insert(name.to_string(), Vec::new());
        }
        let mut config = WorkspaceConfigFile::empty(Path::new("/w"));
        config.merge_graph(&graph);
        ConfigurationSnapshot::from_build(
            Path::new("/w"),
            ToolVersion::new(18, 0, 0),
            BuildResult {
                graph,
                source_maps: BTreeMap::new(),
                config,
                errors: None,
                is_partial: false,
                daemon: None,
                adapter: "source-maps",
            },
        )
    }

    #[test]
    fn test_fingerprint_is_stable_across_insertion_order() {
        let a = snapshot(&["a", "b", "c"]);
        let b = snapshot(&["c", "a", "b"]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        assert_ne!(a.fingerprint(), snapshot(&["a"]).fingerprint());
    }

    #[test]
    fn test_invalid_snapshot() {
        let snapshot = ConfigurationSnapshot::invalid(
            Path::new("/w"),
            NxError::named("DependencyNotFound", "nx is not installed"),
            None,
        );
        assert!(!snapshot.is_valid);
        assert!(snapshot.graph.is_empty());
        assert!(snapshot.has_errors());
        assert_eq!(snapshot.tool_version, ToolVersion::zero());
        assert_eq!(snapshot.config_file.config_path, Path::new("/w/nx.json"));
    }

    #[test]
    fn test_project_details_include_edges() {
        let mut snapshot = snapshot(&["app", "lib"]);
        snapshot.graph.dependencies.insert(
            "app".to_string(),
            vec![GraphDependency {
                source: "app".to_string(),
                target: "lib".to_string(),
                dependency_type: "static".to_string(),
            }],
        );

        let details = snapshot.project_details("lib").unwrap();
        assert_eq!(details.dependents, vec!["app"]);
        assert!(details.dependencies.is_empty());
        assert_eq!(details.configuration.root, "libs/lib");
        assert!(snapshot.project_details("missing").is_none());
    }

    #[test]
    fn test_project_summaries_are_sorted() {
        let summaries = snapshot(&["b", "a"]).project_summaries();
        let names: Vec<_> = summaries.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(summaries[0].project_type.as_deref(), Some("lib"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(snapshot(&["a"])).unwrap();
        assert_eq!(json["isValid"], true);
        assert_eq!(json["toolVersion"]["full"], "18.0.0");
        assert!(json["configFile"]["projects"]["a"].is_object());
    }
}
