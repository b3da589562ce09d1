//! Per-tree serialization of merge executions.
//!
//! The graph of one tree is the shared mutable resource; two overlapping
//! reconciliations interleaving redirects with a delete can leave edges
//! pointing at a removed row. A lease is taken before the first rewrite
//! and held until after the delete (or the failure), and a second caller
//! is refused rather than queued; the refusal maps to the conflict class
//! of [`MergeError`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::debug;

use vansh_types::TreeId;

use crate::error::MergeError;

/// Registry of trees with a reconciliation currently in flight.
///
/// Cloning shares the registry, so a workflow and its engine (or several
/// engines over the same backend) serialize against each other.
#[derive(Clone, Default)]
pub struct MergeLeases {
    inflight: Arc<Mutex<HashSet<TreeId>>>,
}

impl MergeLeases {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lease for `tree`, or refuse with `MergeInFlight` if a
    /// reconciliation already holds it. The lease is released when the
    /// returned guard drops, including on early error returns.
    pub fn acquire(&self, tree: TreeId) -> Result<LeaseGuard, MergeError> {
        let mut inflight = self.inflight.lock().expect("lock poisoned");
        if !inflight.insert(tree) {
            return Err(MergeError::MergeInFlight { tree });
        }
        debug!(tree = %tree.short_id(), "acquired merge lease");
        Ok(LeaseGuard {
            tree,
            inflight: Arc::clone(&self.inflight),
        })
    }

    /// Returns `true` if a reconciliation currently holds `tree`.
    pub fn is_held(&self, tree: TreeId) -> bool {
        self.inflight.lock().expect("lock poisoned").contains(&tree)
    }
}

/// Holds the per-tree lease; dropping releases it.
pub struct LeaseGuard {
    tree: TreeId,
    inflight: Arc<Mutex<HashSet<TreeId>>>,
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        self.inflight.lock().expect("lock poisoned").remove(&self.tree);
        debug!(tree = %self.tree.short_id(), "released merge lease");
    }
}
