//! Workspace project graph.
//!
//! [`WorkspaceGraph`] is the normalized form of the tool's project graph.
//! Nodes and dependency lists live in `BTreeMap`s so iteration order and
//! serialized output are lexicographic regardless of construction order.
//! External (`npm:`) nodes are dropped during normalization.

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::workspace_config::TargetConfiguration;

/// Prefix of external package node names.
pub const EXTERNAL_NODE_PREFIX: &str = "npm:";

/// Project root to property path to `[file, plugin]` of the defining source.
pub type SourceMaps = BTreeMap<String, BTreeMap<String, Value>>;

/// Read source maps leniently; anything that is not a map of maps is dropped.
pub fn source_maps_from_raw(raw: &Value) -> SourceMaps {
    raw.as_object()
        .map(|roots| {
            roots
                .iter()
                .filter_map(|(root, props)| {
                    let props = props.as_object()?;
                    let props = props
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect();
                    Some((root.clone(), props))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// A project in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectGraphNode {
    #[serde(default)]
    pub name: String,

    /// `app`, `lib` or `e2e`
    #[serde(rename = "type", default)]
    pub node_type: String,

    #[serde(default)]
    pub data: ProjectNodeData,
}

/// Configuration carried by a graph node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectNodeData {
    #[serde(default)]
    pub root: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,

    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfiguration>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub implicit_dependencies: Vec<String>,

    /// Workspace-relative source files
    #[serde(default, deserialize_with = "deserialize_files")]
    pub files: Vec<String>,

    /// Everything else the tool attaches (metadata, namedInputs, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Keys of node data read into named fields; the rest land in `extra`.
const KNOWN_DATA_KEYS: &[&str] = &[
    "root",
    "sourceRoot",
    "projectType",
    "targets",
    "tags",
    "implicitDependencies",
    "files",
];

impl ProjectGraphNode {
    /// Read a raw node field by field. A malformed field falls back to its
    /// default instead of losing the node; only non-objects are rejected.
    fn from_raw(key: &str, node: &Value) -> Option<Self> {
        let node = node.as_object()?;
        let name = node
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(key)
            .to_string();
        let node_type = node
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let data = node
            .get("data")
            .map(ProjectNodeData::from_raw)
            .unwrap_or_default();
        Some(Self {
            name,
            node_type,
            data,
        })
    }
}

impl ProjectNodeData {
    fn from_raw(raw: &Value) -> Self {
        let Some(data) = raw.as_object() else {
            return Self::default();
        };
        let string = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);

        let targets = data
            .get("targets")
            .and_then(Value::as_object)
            .map(|targets| {
                targets
                    .iter()
                    .filter_map(|(name, target)| {
                        match serde_json::from_value::<TargetConfiguration>(target.clone()) {
                            Ok(target) => Some((name.clone(), target)),
                            Err(e) => {
                                trace!("dropping unreadable target {}: {}", name, e);
                                None
                            }
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let extra = data
            .iter()
            .filter(|(key, _)| !KNOWN_DATA_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            root: string("root").unwrap_or_default(),
            source_root: string("sourceRoot"),
            project_type: string("projectType"),
            targets,
            tags: string_list(data.get("tags")),
            implicit_dependencies: string_list(data.get("implicitDependencies")),
            files: data.get("files").map(file_entries).unwrap_or_default(),
            extra,
        }
    }
}

/// A dependency edge between two projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDependency {
    pub source: String,
    pub target: String,

    /// `static`, `dynamic` or `implicit`
    #[serde(rename = "type", default)]
    pub dependency_type: String,
}

/// The resolved project graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceGraph {
    pub nodes: BTreeMap<String, ProjectGraphNode>,
    pub dependencies: BTreeMap<String, Vec<GraphDependency>>,
}

impl WorkspaceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize the tool's raw graph JSON.
    ///
    /// `file_map` is the output of the tool's file-map utility
    /// (`{ projectFileMap: { name: [..] } }` or the bare map); when given it
    /// replaces the files attached to each node.
    pub fn from_raw(raw: &Value, file_map: Option<&Value>) -> Self {
        let mut graph = Self::new();

        if let Some(nodes) = raw.get("nodes").and_then(Value::as_object) {
            for (key, node) in nodes {
                if is_external(key, node) {
                    continue;
                }
                match ProjectGraphNode::from_raw(key, node) {
                    Some(parsed) => {
                        graph.nodes.insert(key.clone(), parsed);
                    }
                    None => trace!("skipping graph node {}: not an object", key),
                }
            }
        }

        if let Some(deps) = raw.get("dependencies").and_then(Value::as_object) {
            for (key, edges) in deps {
                if key.starts_with(EXTERNAL_NODE_PREFIX) {
                    continue;
                }
                let edges: Vec<GraphDependency> = edges
                    .as_array()
                    .map(|list| {
                        list.iter()
                            .filter_map(|e| serde_json::from_value(e.clone()).ok())
                            .filter(|d: &GraphDependency| {
                                !d.target.starts_with(EXTERNAL_NODE_PREFIX)
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                graph.dependencies.insert(key.clone(), edges);
            }
        }

        if let Some(file_map) = file_map {
            graph.apply_file_map(file_map);
        }

        graph
    }

    fn apply_file_map(&mut self, file_map: &Value) {
        let map = file_map
            .get("projectFileMap")
            .unwrap_or(file_map)
            .as_object();
        let Some(map) = map else {
            return;
        };
        for (name, files) in map {
            if let Some(node) = self.nodes.get_mut(name) {
                node.data.files = file_entries(files);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Project names in lexicographic order.
    pub fn project_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Projects `name` depends on, restricted to nodes present in the graph.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.dependencies
            .get(name)
            .map(|edges| {
                edges
                    .iter()
                    .map(|e| e.target.as_str())
                    .filter(|t| self.nodes.contains_key(*t))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Projects that directly depend on `name`, sorted.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        let (graph, index) = self.petgraph();
        let Some(&idx) = index.get(name) else {
            return Vec::new();
        };
        let mut dependents: Vec<&str> = graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| graph[n])
            .collect();
        dependents.sort_unstable();
        dependents.dedup();
        dependents
    }

    /// Projects ordered so every project comes after its dependencies.
    ///
    /// Returns `None` when the dependency relation has a cycle.
    pub fn topological_order(&self) -> Option<Vec<&str>> {
        let (graph, _) = self.petgraph();
        let sorted = toposort(&graph, None).ok()?;
        // edges point from dependent to dependency
        Some(sorted.into_iter().rev().map(|n| graph[n]).collect())
    }

    /// petgraph view over the nodes present in the graph.
    fn petgraph(&self) -> (DiGraph<&str, ()>, HashMap<&str, NodeIndex>) {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), 0);
        let mut index = HashMap::with_capacity(self.nodes.len());
        for name in self.nodes.keys() {
            index.insert(name.as_str(), graph.add_node(name.as_str()));
        }
        for (source, edges) in &self.dependencies {
            let Some(&from) = index.get(source.as_str()) else {
                continue;
            };
            for edge in edges {
                if let Some(&to) = index.get(edge.target.as_str()) {
                    graph.update_edge(from, to, ());
                }
            }
        }
        (graph, index)
    }
}

fn is_external(key: &str, node: &Value) -> bool {
    key.starts_with(EXTERNAL_NODE_PREFIX)
        || node.get("type").and_then(Value::as_str) == Some("npm")
}

/// File entries are plain strings or `{ file, hash }` objects.
fn file_entries(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|entry| match entry {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(o) => o.get("file").and_then(Value::as_str).map(str::to_string),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// String entries of a list; anything else reads as empty.
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

fn deserialize_files<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(file_entries(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn raw_graph() -> Value {
        json!({
            "nodes": {
                "b": {"name": "b", "type": "lib", "data": {"root": "libs/b", "files": [{"file": "libs/b/index.ts", "hash": "1"}]}},
                "a": {"name": "a", "type": "app", "data": {"root": "apps/a", "tags": ["scope:a"], "targets": {"build": {"executor": "@nx/js:tsc"}}}},
                "c": {"name": "c", "type": "lib", "data": {"root": "libs/c"}},
                "npm:react": {"name": "npm:react", "type": "npm", "data": {"packageName": "react"}}
            },
            "externalNodes": {},
            "dependencies": {
                "a": [
                    {"source": "a", "target": "b", "type": "static"},
                    {"source": "a", "target": "npm:react", "type": "static"}
                ],
                "b": [{"source": "b", "target": "c", "type": "static"}],
                "c": [],
                "npm:react": []
            }
        })
    }

    #[test]
    fn test_nodes_iterate_sorted() {
        let graph = WorkspaceGraph::from_raw(&raw_graph(), None);
        let names: Vec<&str> = graph.project_names().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_external_nodes_dropped() {
        let graph = WorkspaceGraph::from_raw(&raw_graph(), None);
        assert!(!graph.nodes.contains_key("npm:react"));
        assert!(!graph.dependencies.contains_key("npm:react"));
        assert_eq!(graph.dependencies_of("a"), vec!["b"]);
    }

    #[test]
    fn test_node_data_parsed() {
        let graph = WorkspaceGraph::from_raw(&raw_graph(), None);
        let a = &graph.nodes["a"];
        assert_eq!(a.node_type, "app");
        assert_eq!(a.data.tags, vec!["scope:a"]);
        assert_eq!(
            a.data.targets["build"].executor.as_deref(),
            Some("@nx/js:tsc")
        );
        assert_eq!(graph.nodes["b"].data.files, vec!["libs/b/index.ts"]);
    }

    #[test]
    fn test_file_map_replaces_node_files() {
        let file_map = json!({
            "projectFileMap": {
                "c": [{"file": "libs/c/a.ts"}, "libs/c/b.ts"]
            }
        });
        let graph = WorkspaceGraph::from_raw(&raw_graph(), Some(&file_map));
        assert_eq!(graph.nodes["c"].data.files, vec!["libs/c/a.ts", "libs/c/b.ts"]);
    }

    #[test]
    fn test_dependents_and_topological_order() {
        let graph = WorkspaceGraph::from_raw(&raw_graph(), None);
        assert_eq!(graph.dependents_of("b"), vec!["a"]);
        assert!(graph.dependents_of("a").is_empty());
        assert_eq!(graph.topological_order(), Some(vec!["c", "b", "a"]));
    }

    #[test]
    fn test_cycle_has_no_topological_order() {
        let raw = json!({
            "nodes": {
                "x": {"name": "x", "data": {"root": "x"}},
                "y": {"name": "y", "data": {"root": "y"}}
            },
            "dependencies": {
                "x": [{"source": "x", "target": "y", "type": "static"}],
                "y": [{"source": "y", "target": "x", "type": "static"}]
            }
        });
        assert_eq!(WorkspaceGraph::from_raw(&raw, None).topological_order(), None);
    }

    #[test]
    fn test_nameless_node_takes_its_key() {
        let raw = json!({
            "nodes": {
                "a": {"data": {"root": "a"}},
                "b": {"type": "lib", "data": {"root": "b"}}
            }
        });
        let graph = WorkspaceGraph::from_raw(&raw, None);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.nodes["a"].name, "a");
        assert_eq!(graph.nodes["a"].node_type, "");
        assert_eq!(graph.nodes["b"].node_type, "lib");
    }

    #[test]
    fn test_malformed_fields_keep_the_node() {
        let raw = json!({
            "nodes": {
                "a": {"name": "a", "type": "lib", "data": {
                    "root": "libs/a",
                    "targets": {"build": null, "test": {"executor": "@nx/jest:jest"}},
                    "tags": "scope:a",
                    "implicitDependencies": ["b", 3],
                    "sourceRoot": 7,
                    "metadata": {"owner": "core"}
                }},
                "b": {"name": "b", "data": "not-an-object"},
                "c": "not-a-node"
            }
        });
        let graph = WorkspaceGraph::from_raw(&raw, None);
        assert_eq!(graph.project_names().collect::<Vec<_>>(), vec!["a", "b"]);

        let a = &graph.nodes["a"].data;
        assert_eq!(a.root, "libs/a");
        assert_eq!(a.targets.keys().collect::<Vec<_>>(), vec!["test"]);
        assert!(a.tags.is_empty());
        assert_eq!(a.implicit_dependencies, vec!["b"]);
        assert_eq!(a.source_root, None);
        assert_eq!(a.extra["metadata"], json!({"owner": "core"}));
        assert_eq!(graph.nodes["b"].data, ProjectNodeData::default());
    }

    #[test]
    fn test_partial_edges_are_ignored_in_views() {
        let raw = json!({
            "nodes": {"a": {"name": "a", "data": {"root": "a"}}},
            "dependencies": {"a": [{"source": "a", "target": "gone", "type": "static"}]}
        });
        let graph = WorkspaceGraph::from_raw(&raw, None);
        assert!(graph.dependencies_of("a").is_empty());
        assert_eq!(graph.topological_order(), Some(vec!["a"]));
    }
}
