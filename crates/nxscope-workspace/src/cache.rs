//! Single-flight snapshot cache.
//!
//! At most one resolution runs per workspace root. Callers arriving while it
//! runs join the same shared future and receive the same `Arc`. The result
//! stays cached until an explicit reset.
//!
//! ## Slots
//!
//! ```text
//! (absent) --get--> InProgress --settles--> Cached
//!     ^                                        |
//!     +------------------reset-----------------+
//! ```
//!
//! A reset that arrives while a resolution is in flight waits for it to
//! settle first. Each resolution carries a generation number and only
//! stores its result if its slot still holds that generation.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use nxscope_core::NxError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::resolver::SnapshotResolver;
use crate::snapshot::ConfigurationSnapshot;

/// Name of the error carried by a snapshot whose resolution panicked.
pub const RESOLUTION_FAILED: &str = "ResolutionFailed";

type PendingSnapshot = Shared<BoxFuture<'static, Arc<ConfigurationSnapshot>>>;

/// Observable lifecycle of one root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheState {
    NotStarted,
    InProgress,
    Cached,
}

enum Slot {
    InProgress {
        generation: u64,
        pending: PendingSnapshot,
    },
    Cached {
        generation: u64,
        snapshot: Arc<ConfigurationSnapshot>,
    },
}

impl Slot {
    fn generation(&self) -> u64 {
        match self {
            Slot::InProgress { generation, .. } | Slot::Cached { generation, .. } => *generation,
        }
    }
}

type Slots = Arc<Mutex<HashMap<PathBuf, Slot>>>;

/// Memoizes one snapshot per workspace root.
pub struct SnapshotCache {
    /// Pipeline producing snapshots
    resolver: Arc<dyn SnapshotResolver>,

    /// Per-root slots; a missing entry means not started
    slots: Slots,

    /// Source of resolution generations
    generations: AtomicU64,
}

impl SnapshotCache {
    pub fn new(resolver: Arc<dyn SnapshotResolver>) -> Self {
        Self {
            resolver,
            slots: Arc::new(Mutex::new(HashMap::new())),
            generations: AtomicU64::new(0),
        }
    }

    /// Current snapshot of `workspace_root`, resolving it if needed.
    ///
    /// With `force_reset` the root is reset first, so the result is always
    /// fresh. Must be called within a tokio runtime.
    pub async fn get_snapshot(
        &self,
        workspace_root: &Path,
        force_reset: bool,
    ) -> Arc<ConfigurationSnapshot> {
        if force_reset {
            self.reset(workspace_root).await;
        }

        let pending = {
            let mut slots = self.slots.lock();
            match slots.get(workspace_root) {
                Some(Slot::Cached { snapshot, .. }) => return Arc::clone(snapshot),
                Some(Slot::InProgress { pending, .. }) => {
                    debug!("joining in-flight resolution of {:?}", workspace_root);
                    pending.clone()
                }
                None => {
                    let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
                    let pending = self.start(workspace_root.to_path_buf(), generation);
                    slots.insert(
                        workspace_root.to_path_buf(),
                        Slot::InProgress {
                            generation,
                            pending: pending.clone(),
                        },
                    );
                    pending
                }
            }
        };

        pending.await
    }

    /// Forget the snapshot of `workspace_root` and the resolver's cached reads.
    ///
    /// Waits for an in-flight resolution to settle before invalidating.
    pub async fn reset(&self, workspace_root: &Path) {
        let in_flight = match self.slots.lock().get(workspace_root) {
            Some(Slot::InProgress {
                generation,
                pending,
            }) => Some((*generation, pending.clone())),
            _ => None,
        };

        if let Some((generation, pending)) = in_flight {
            debug!(
                "reset of {:?} waiting for generation {}",
                workspace_root, generation
            );
            pending.await;
        }

        self.resolver.invalidate(workspace_root);

        let mut slots = self.slots.lock();
        let stale = match slots.get(workspace_root) {
            Some(Slot::Cached { .. }) => true,
            // a resolution started after the one we waited for is already fresh
            Some(Slot::InProgress { .. }) | None => false,
        };
        if stale {
            slots.remove(workspace_root);
        }
        info!("reset snapshot of {:?}", workspace_root);
    }

    /// Reset every known root.
    pub async fn reset_all(&self) {
        let roots: Vec<PathBuf> = self.slots.lock().keys().cloned().collect();
        for root in roots {
            self.reset(&root).await;
        }
    }

    pub fn state(&self, workspace_root: &Path) -> CacheState {
        match self.slots.lock().get(workspace_root) {
            None => CacheState::NotStarted,
            Some(Slot::InProgress { .. }) => CacheState::InProgress,
            Some(Slot::Cached { .. }) => CacheState::Cached,
        }
    }

    /// Cached snapshot without triggering a resolution.
    pub fn cached(&self, workspace_root: &Path) -> Option<Arc<ConfigurationSnapshot>> {
        match self.slots.lock().get(workspace_root) {
            Some(Slot::Cached { snapshot, .. }) => Some(Arc::clone(snapshot)),
            _ => None,
        }
    }

    /// Spawn a resolution and return the future every caller shares.
    ///
    /// The task runs to completion even if all callers go away.
    fn start(&self, workspace_root: PathBuf, generation: u64) -> PendingSnapshot {
        let resolver = Arc::clone(&self.resolver);
        let slots = Arc::clone(&self.slots);
        let task_root = workspace_root.clone();

        let task = tokio::spawn(async move {
            debug!("resolving {:?} (generation {})", task_root, generation);
            let snapshot = match AssertUnwindSafe(resolver.resolve(&task_root))
                .catch_unwind()
                .await
            {
                Ok(snapshot) => Arc::new(snapshot),
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    warn!("resolution of {:?} panicked: {}", task_root, message);
                    Arc::new(failed_snapshot(&task_root, message))
                }
            };

            let mut slots = slots.lock();
            let current = slots.get(&task_root).map(Slot::generation);
            if current == Some(generation) {
                slots.insert(
                    task_root,
                    Slot::Cached {
                        generation,
                        snapshot: Arc::clone(&snapshot),
                    },
                );
            } else {
                debug!(
                    "discarding stale resolution of {:?} (generation {})",
                    task_root, generation
                );
            }
            snapshot
        });

        async move {
            match task.await {
                Ok(snapshot) => snapshot,
                // only reachable when the runtime shuts down under the task
                Err(e) => Arc::new(failed_snapshot(&workspace_root, e.to_string())),
            }
        }
        .boxed()
        .shared()
    }
}

fn failed_snapshot(workspace_root: &Path, message: String) -> ConfigurationSnapshot {
    ConfigurationSnapshot::invalid(
        workspace_root,
        NxError::named(RESOLUTION_FAILED, message),
        None,
    )
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "snapshot resolution panicked".to_string()
    }
}
