//! Graph runtime: the seam between the builder and the tool's JavaScript.
//!
//! [`NodeRuntime`] runs the embedded bridge script in a `node` child
//! process. The request goes in on stdin; the report comes back as one
//! stdout line prefixed with [`REPORT_MARKER`]. Every other output line is
//! forwarded to the library output sink.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use nxscope_config::ScopeConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::RuntimeError;
use crate::overrides::library_output;

/// The bridge script executed by [`NodeRuntime`].
pub const BRIDGE_SCRIPT: &str = include_str!("bridge.cjs");

/// Prefix of the stdout line carrying the JSON report.
pub const REPORT_MARKER: &str = "__NXSCOPE_REPORT__";

/// Graph construction entry point exported by the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphEntry {
    #[serde(rename = "createProjectGraph")]
    CreateProjectGraph,
    #[serde(rename = "createProjectGraphAsync")]
    CreateProjectGraphAsync,
    #[serde(rename = "createProjectGraphAndSourceMapsAsync")]
    CreateProjectGraphAndSourceMapsAsync,
}

/// Absolute paths of the tool modules the bridge loads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeModules {
    pub project_graph: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daemon_client: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_map_utils: Option<PathBuf>,
}

/// What the bridge should do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeRequest {
    pub workspace_root: PathBuf,
    pub entry: GraphEntry,
    pub modules: BridgeModules,
    pub include_file_map: bool,
    pub silence_output: bool,
    pub reset_daemon: bool,
}

/// Daemon state observed after extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonStatus {
    pub enabled: bool,
    pub available: bool,
    #[serde(default)]
    pub reset: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of the entry point call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BridgeResult {
    Ok {
        graph: Value,
        #[serde(default, rename = "sourceMaps")]
        source_maps: Option<Value>,
        #[serde(default, rename = "fileMap")]
        file_map: Option<Value>,
    },
    /// `error` is the serialized thrown value
    Error { error: Value },
}

/// The bridge's report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeReport {
    #[serde(flatten)]
    pub result: BridgeResult,
    /// Codes passed to `process.exit` while the entry point ran
    #[serde(default)]
    pub exit_calls: Vec<i32>,
    #[serde(default)]
    pub daemon: Option<DaemonStatus>,
}

/// Runs graph construction for a request.
#[async_trait]
pub trait GraphRuntime: Send + Sync {
    async fn invoke(&self, request: &BridgeRequest) -> Result<BridgeReport, RuntimeError>;
}

/// Runs the bridge under a `node` binary.
#[derive(Debug, Clone)]
pub struct NodeRuntime {
    binary: String,
    env: BTreeMap<String, String>,
}

impl NodeRuntime {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            env: BTreeMap::new(),
        }
    }

    /// Binary and extra environment from the tool configuration.
    pub fn from_config(config: &ScopeConfig) -> Self {
        Self {
            binary: config.node.binary.clone(),
            env: config.graph_env(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

impl Default for NodeRuntime {
    fn default() -> Self {
        Self::new("node")
    }
}

#[async_trait]
impl GraphRuntime for NodeRuntime {
    async fn invoke(&self, request: &BridgeRequest) -> Result<BridgeReport, RuntimeError> {
        debug!(
            "running {:?} via {} in {:?}",
            request.entry,
            self.binary,
            request.workspace_root
        );

        let mut child = Command::new(&self.binary)
            .arg("-e")
            .arg(BRIDGE_SCRIPT)
            .current_dir(&request.workspace_root)
            .env("CI", "false")
            .env("NX_PROJECT_GLOB_CACHE", "false")
            .env("NX_WORKSPACE_ROOT_PATH", &request.workspace_root)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RuntimeError::spawn(&self.binary, e))?;

        let payload = serde_json::to_vec(request)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await?;
            stdin.shutdown().await?;
        }

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let read_stdout = async {
            let mut report = None;
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Some(line) = lines.next_line().await? {
                    match line.strip_prefix(REPORT_MARKER) {
                        Some(json) => report = Some(json.to_string()),
                        None => library_output(&line),
                    }
                }
            }
            Ok::<_, std::io::Error>(report)
        };

        let read_stderr = async {
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Some(line) = lines.next_line().await? {
                    library_output(&line);
                }
            }
            Ok::<_, std::io::Error>(())
        };

        let (report, stderr_done) = tokio::join!(read_stdout, read_stderr);
        let status = child.wait().await?;
        stderr_done?;

        let Some(report) = report? else {
            return Err(RuntimeError::NoReport {
                status: status.to_string(),
            });
        };
        trace!("bridge report: {} bytes", report.len());
        Ok(serde_json::from_str(&report)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = BridgeRequest {
            workspace_root: PathBuf::from("/w"),
            entry: GraphEntry::CreateProjectGraphAndSourceMapsAsync,
            modules: BridgeModules {
                project_graph: PathBuf::from("/w/node_modules/nx/src/project-graph/project-graph.js"),
                ..Default::default()
            },
            include_file_map: true,
            silence_output: true,
            reset_daemon: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["entry"], "createProjectGraphAndSourceMapsAsync");
        assert_eq!(json["workspaceRoot"], "/w");
        assert_eq!(json["includeFileMap"], true);
        assert!(json["modules"].get("daemonClient").is_none());
    }

    #[test]
    fn test_ok_report_parses() {
        let report: BridgeReport = serde_json::from_value(json!({
            "status": "ok",
            "graph": {"nodes": {}, "dependencies": {}},
            "sourceMaps": {"apps/a": {}},
            "exitCalls": [1],
            "daemon": {"enabled": true, "available": false}
        }))
        .unwrap();

        assert_eq!(report.exit_calls, vec![1]);
        assert_eq!(report.daemon.unwrap().enabled, true);
        match report.result {
            BridgeResult::Ok {
                source_maps,
                file_map,
                ..
            } => {
                assert!(source_maps.is_some());
                assert!(file_map.is_none());
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_error_report_parses() {
        let report: BridgeReport = serde_json::from_value(json!({
            "status": "error",
            "error": {"name": "ProjectGraphError", "message": "m"}
        }))
        .unwrap();
        assert!(report.exit_calls.is_empty());
        assert!(matches!(report.result, BridgeResult::Error { .. }));
    }

    #[test]
    fn test_bridge_script_embeds_marker() {
        assert!(BRIDGE_SCRIPT.contains(REPORT_MARKER));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let runtime = NodeRuntime::new("nxscope-definitely-not-a-node-binary");
        let request = BridgeRequest {
            workspace_root: std::env::temp_dir(),
            entry: GraphEntry::CreateProjectGraph,
            modules: BridgeModules::default(),
            include_file_map: false,
            silence_output: true,
            reset_daemon: false,
        };
        let err = runtime.invoke(&request).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Spawn { .. }));
    }
}
