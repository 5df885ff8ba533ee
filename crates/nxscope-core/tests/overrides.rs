//! Process-wide override restoration.
//!
//! These tests swap the global exit hook, so they live in their own test
//! binary and share a lock.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{raw_graph, workspace, FakeRuntime};
use nxscope_core::builder::{BridgeReport, BridgeResult};
use nxscope_core::overrides::{self, ExitHook};
use nxscope_core::{BuildOptions, GraphBuilder, ToolVersion, WorkspaceConfigReader};
use once_cell::sync::Lazy;
use serde_json::json;

static SERIAL: Lazy<tokio::sync::Mutex<()>> = Lazy::new(|| tokio::sync::Mutex::new(()));

/// Install a counting hook in place of the real one and return it.
fn install_counting_hook() -> (ExitHook, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let hook: ExitHook = {
        let count = Arc::clone(&count);
        Arc::new(move |_code| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    };
    overrides::set_exit_hook(Arc::clone(&hook));
    (hook, count)
}

#[tokio::test]
async fn test_exit_hook_restored_after_thrown_error() {
    let _serial = SERIAL.lock().await;
    let (original, count) = install_counting_hook();

    let ws = workspace("18.2.0");
    let runtime = Arc::new(FakeRuntime::new(BridgeReport {
        result: BridgeResult::Error {
            error: json!({"name": "Error", "message": "Cannot find configuration for task"}),
        },
        exit_calls: vec![1],
        daemon: None,
    }));
    let builder = GraphBuilder::new(runtime, WorkspaceConfigReader::new(), BuildOptions::default());

    let result = builder.build(ws.path(), &ToolVersion::new(18, 2, 0)).await;

    assert!(result.errors.is_some());
    // the replayed exit was intercepted, never reaching the original hook
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(Arc::ptr_eq(&overrides::current_exit_hook(), &original));
    assert!(!overrides::is_output_muted());

    overrides::exit(0);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_exit_hook_restored_after_panic() {
    let _serial = SERIAL.lock().await;
    let (original, count) = install_counting_hook();

    let out = overrides::guarded(true, async {
        assert!(overrides::is_output_muted());
        overrides::exit(2);
        panic!("graph construction threw");
    })
    .await;
    let value: Result<(), String> = out.value;

    assert!(value.is_err());
    assert_eq!(out.exit_requests, vec![2]);
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(Arc::ptr_eq(&overrides::current_exit_hook(), &original));
    assert!(!overrides::is_output_muted());
}

#[tokio::test]
async fn test_exit_hook_restored_after_success() {
    let _serial = SERIAL.lock().await;
    let (original, _count) = install_counting_hook();

    let ws = workspace("19.0.0");
    let builder = GraphBuilder::new(
        Arc::new(FakeRuntime::ok(raw_graph(&["a"]))),
        WorkspaceConfigReader::new(),
        BuildOptions::default(),
    );
    let result = builder.build(ws.path(), &ToolVersion::new(19, 0, 0)).await;

    assert_eq!(result.graph.len(), 1);
    assert!(Arc::ptr_eq(&overrides::current_exit_hook(), &original));
}
