//! Views of a snapshot handed to frontends.

use std::collections::BTreeMap;

use nxscope_core::ProjectConfiguration;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One line per project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub name: String,

    /// Workspace-relative root
    pub root: String,

    /// `application`, `library` or the graph node type
    pub project_type: Option<String>,

    pub tags: Vec<String>,

    /// Target names, sorted
    pub targets: Vec<String>,
}

/// Everything known about one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetails {
    pub name: String,

    pub configuration: ProjectConfiguration,

    /// Projects this one depends on
    pub dependencies: Vec<String>,

    /// Projects depending on this one
    pub dependents: Vec<String>,

    /// Property path to `[file, plugin]` that defined it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_map: Option<BTreeMap<String, Value>>,
}
