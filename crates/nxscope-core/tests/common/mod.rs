//! Shared helpers for nxscope-core integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use nxscope_core::builder::{BridgeReport, BridgeRequest, BridgeResult, GraphRuntime};
use nxscope_core::RuntimeError;
use serde_json::{json, Value};
use tempfile::TempDir;

/// Runtime returning a canned report and counting invocations.
pub struct FakeRuntime {
    report: BridgeReport,
    pub calls: Arc<AtomicUsize>,
    pub last_request: parking_lot::Mutex<Option<BridgeRequest>>,
}

impl FakeRuntime {
    pub fn new(report: BridgeReport) -> Self {
        Self {
            report,
            calls: Arc::new(AtomicUsize::new(0)),
            last_request: parking_lot::Mutex::new(None),
        }
    }

    pub fn ok(graph: Value) -> Self {
        Self::new(BridgeReport {
            result: BridgeResult::Ok {
                graph,
                source_maps: None,
                file_map: None,
            },
            exit_calls: Vec::new(),
            daemon: None,
        })
    }

    pub fn thrown(error: Value) -> Self {
        Self::new(BridgeReport {
            result: BridgeResult::Error { error },
            exit_calls: Vec::new(),
            daemon: None,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GraphRuntime for FakeRuntime {
    async fn invoke(&self, request: &BridgeRequest) -> Result<BridgeReport, RuntimeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock() = Some(request.clone());
        Ok(self.report.clone())
    }
}

/// Runtime that panics mid-construction.
pub struct PanickingRuntime;

#[async_trait]
impl GraphRuntime for PanickingRuntime {
    async fn invoke(&self, _request: &BridgeRequest) -> Result<BridgeReport, RuntimeError> {
        panic!("plugin crashed the graph runtime");
    }
}

pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Workspace with `nx` installed at `version` and its graph modules present.
pub fn workspace(version: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "nx.json", "{}");
    write(
        temp.path(),
        "node_modules/nx/package.json",
        &json!({"name": "nx", "version": version}).to_string(),
    );
    for module in [
        "src/project-graph/project-graph.js",
        "src/project-graph/file-map-utils.js",
        "src/utils/output.js",
        "src/daemon/client/client.js",
    ] {
        write(temp.path(), &format!("node_modules/nx/{module}"), "");
    }
    temp
}

/// Raw graph with nodes inserted in `names` order.
pub fn raw_graph(names: &[&str]) -> Value {
    let mut nodes = serde_json::Map::new();
    let mut deps = serde_json::Map::new();
    for name in names {
        nodes.insert(
            name.to_string(),
            json!({"name": name, "type": "lib", "data": {"root": format!("libs/{name}")}}),
        );
        deps.insert(name.to_string(), json!([]));
    }
    json!({"nodes": nodes, "dependencies": deps})
}
