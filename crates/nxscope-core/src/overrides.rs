//! Scoped process-wide overrides for graph construction.
//!
//! Code called while building a graph may try to terminate the process or
//! write to the library output sink. [`guarded`] swaps the process-wide exit
//! hook for one that only records the request and mutes the sink, then
//! restores both when the region ends. Restoration happens in a `Drop`
//! guard, so it also runs on early return and on panic. Guarded regions are
//! serialized by a process-wide async mutex.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

/// Process-exit hook.
pub type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

static EXIT_HOOK: Lazy<RwLock<ExitHook>> =
    Lazy::new(|| RwLock::new(Arc::new(|code| std::process::exit(code))));

static OUTPUT_MUTED: AtomicBool = AtomicBool::new(false);

static SCOPE_LOCK: Lazy<tokio::sync::Mutex<()>> = Lazy::new(|| tokio::sync::Mutex::new(()));

/// Target used for forwarded library output.
pub const LIBRARY_TARGET: &str = "nxscope::library";

/// Terminate through the current exit hook.
pub fn exit(code: i32) {
    let hook = current_exit_hook();
    hook(code);
}

/// The currently installed exit hook.
pub fn current_exit_hook() -> ExitHook {
    Arc::clone(&EXIT_HOOK.read())
}

/// Replace the exit hook, returning the previous one.
pub fn set_exit_hook(hook: ExitHook) -> ExitHook {
    std::mem::replace(&mut *EXIT_HOOK.write(), hook)
}

pub fn is_output_muted() -> bool {
    OUTPUT_MUTED.load(Ordering::SeqCst)
}

/// Forward one line of library output unless the sink is muted.
pub fn library_output(line: &str) {
    if !is_output_muted() {
        debug!(target: LIBRARY_TARGET, "{}", line);
    }
}

/// Result of a guarded region.
#[derive(Debug)]
pub struct Guarded<T> {
    /// The region's value, or the panic message if it panicked
    pub value: Result<T, String>,
    /// Exit codes requested (and suppressed) inside the region
    pub exit_requests: Vec<i32>,
}

/// Restores the previous hook and mute flag when dropped.
struct Restore {
    previous_hook: Option<ExitHook>,
    previous_muted: bool,
}

impl Drop for Restore {
    fn drop(&mut self) {
        if let Some(hook) = self.previous_hook.take() {
            set_exit_hook(hook);
        }
        OUTPUT_MUTED.store(self.previous_muted, Ordering::SeqCst);
    }
}

/// Run `fut` with exit intercepted and, if `silence_output`, output muted.
pub async fn guarded<F, T>(silence_output: bool, fut: F) -> Guarded<T>
where
    F: Future<Output = T>,
{
    let _serial = SCOPE_LOCK.lock().await;

    let requests = Arc::new(Mutex::new(Vec::new()));
    let intercept: ExitHook = {
        let requests = Arc::clone(&requests);
        Arc::new(move |code| {
            warn!("suppressed process exit with code {} during graph construction", code);
            requests.lock().push(code);
        })
    };

    let restore = Restore {
        previous_hook: Some(set_exit_hook(intercept)),
        previous_muted: OUTPUT_MUTED.swap(silence_output || is_output_muted(), Ordering::SeqCst),
    };

    let value = AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .map_err(panic_message);

    drop(restore);

    let exit_requests = std::mem::take(&mut *requests.lock());
    Guarded {
        value,
        exit_requests,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "graph construction panicked".to_string()
    }
}
