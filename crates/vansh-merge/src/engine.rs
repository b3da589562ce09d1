//! The reconciliation saga: redirect every reference, verify, then delete.
//!
//! The storage adapter offers per-row atomicity only, so the merge cannot
//! be one transaction. Instead it is an ordered list of individually
//! idempotent steps: every rewrite selects rows by `= source` at execution
//! time, which makes re-running the whole sequence the correct recovery
//! from any partial failure. The one destructive, non-reversible step,
//! deleting the source member, runs last, gated by an explicit check that
//! no reference to the source survives anywhere.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use vansh_store::{EndpointRole, GraphStore, ReferenceCollection, ReferenceStore};
use vansh_types::{MemberId, TreeId};

use crate::error::{MergeError, MergeResult};
use crate::lease::MergeLeases;

/// A step of the reconciliation sequence, for failure reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeStep {
    /// Rewriting edge endpoints from the source to the target.
    RedirectEdges,
    /// Rewriting the member foreign key of one dependent collection.
    RewriteReferences(ReferenceCollection),
    /// Deleting self-loops and duplicate edges produced by the redirect.
    DropArtifacts,
    /// Verifying that no reference to the source survives.
    VerifyResidue,
    /// Deleting the source member row.
    DeleteSource,
}

impl std::fmt::Display for MergeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RedirectEdges => write!(f, "redirect-edges"),
            Self::RewriteReferences(collection) => {
                write!(f, "rewrite-references({collection})")
            }
            Self::DropArtifacts => write!(f, "drop-artifacts"),
            Self::VerifyResidue => write!(f, "verify-residue"),
            Self::DeleteSource => write!(f, "delete-source"),
        }
    }
}

/// What a completed reconciliation actually did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Edge endpoint rewrites (both roles combined).
    pub edges_redirected: usize,
    /// Foreign-key rewrites per dependent collection, in migration order.
    pub references_rewritten: Vec<(ReferenceCollection, usize)>,
    /// Redirected edges dropped because the target already held a
    /// semantically identical edge.
    pub duplicate_edges_dropped: usize,
    /// Redirected edges dropped because both endpoints became the target.
    pub self_loops_dropped: usize,
}

impl MergeReport {
    /// Total rows rewritten across the dependent collections.
    pub fn total_references_rewritten(&self) -> usize {
        self.references_rewritten.iter().map(|(_, n)| n).sum()
    }
}

/// Executes approved merges against a storage backend.
pub struct ReconciliationEngine<S> {
    store: Arc<S>,
    leases: MergeLeases,
}

impl<S> ReconciliationEngine<S>
where
    S: GraphStore + ReferenceStore,
{
    /// Create an engine with its own lease registry.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_leases(store, MergeLeases::new())
    }

    /// Create an engine sharing an existing lease registry, so several
    /// engines (or a workflow and an engine) serialize against each other.
    pub fn with_leases(store: Arc<S>, leases: MergeLeases) -> Self {
        Self { store, leases }
    }

    /// The lease registry this engine serializes on.
    pub fn leases(&self) -> &MergeLeases {
        &self.leases
    }

    /// Redirect every reference from `source` to `target` within `tree`,
    /// then delete `source`.
    ///
    /// Step order is load-bearing: all idempotent rewrites complete and are
    /// verified before the destructive delete. On any error the source
    /// member still exists and re-running `execute` converges: rows
    /// already migrated no longer match the `= source` filters.
    pub async fn execute(
        &self,
        source: MemberId,
        target: MemberId,
        tree: TreeId,
    ) -> MergeResult<MergeReport> {
        if source == target {
            return Err(MergeError::Validation(
                "source and target are the same member".into(),
            ));
        }

        let _lease = self.leases.acquire(tree)?;

        let source_row = self
            .store
            .get_member(source)
            .await?
            .ok_or(MergeError::MemberNotFound(source))?;
        let target_row = self
            .store
            .get_member(target)
            .await?
            .ok_or(MergeError::MemberNotFound(target))?;
        if source_row.tree != tree || target_row.tree != tree {
            return Err(MergeError::Validation(
                "source and target must both belong to the merge's tree".into(),
            ));
        }

        info!(
            tree = %tree.short_id(),
            source = %source.short_id(),
            target = %target.short_id(),
            "starting merge reconciliation"
        );

        // The two endpoint roles touch disjoint row sets, so the rewrites
        // may run concurrently; both must finish before anything else.
        let redirected = tokio::try_join!(
            self.store
                .rewrite_edge_endpoints(tree, EndpointRole::From, source, target),
            self.store
                .rewrite_edge_endpoints(tree, EndpointRole::To, source, target),
        )
        .map_err(|cause| MergeError::StepFailed {
            step: MergeStep::RedirectEdges,
            cause,
        })?;
        let edges_redirected = redirected.0 + redirected.1;

        let mut references_rewritten = Vec::with_capacity(ReferenceCollection::ALL.len());
        for collection in ReferenceCollection::ALL {
            let rewritten = self
                .store
                .rewrite_references(collection, source, target)
                .await
                .map_err(|cause| MergeError::StepFailed {
                    step: MergeStep::RewriteReferences(collection),
                    cause,
                })?;
            debug!(collection = %collection, count = rewritten, "rewrote references");
            references_rewritten.push((collection, rewritten));
        }

        let (self_loops_dropped, duplicate_edges_dropped) =
            self.drop_redirect_artifacts(tree).await?;

        // Nothing may still point at the source. A surviving reference
        // means an incomplete rewrite (or a collection missing from the
        // registry); deleting the source now would dangle it.
        let residual_edges = self
            .store
            .count_edges_referencing(tree, source)
            .await
            .map_err(|cause| MergeError::StepFailed {
                step: MergeStep::VerifyResidue,
                cause,
            })?;
        if residual_edges > 0 {
            return Err(MergeError::PartialMigration {
                step: MergeStep::VerifyResidue,
                source_member: source,
                remaining: residual_edges,
            });
        }
        for collection in ReferenceCollection::ALL {
            let remaining = self
                .store
                .count_references(collection, source)
                .await
                .map_err(|cause| MergeError::StepFailed {
                    step: MergeStep::VerifyResidue,
                    cause,
                })?;
            if remaining > 0 {
                return Err(MergeError::PartialMigration {
                    step: MergeStep::RewriteReferences(collection),
                    source_member: source,
                    remaining,
                });
            }
        }

        self.store
            .delete_member(source)
            .await
            .map_err(|cause| MergeError::StepFailed {
                step: MergeStep::DeleteSource,
                cause,
            })?;

        let report = MergeReport {
            edges_redirected,
            references_rewritten,
            duplicate_edges_dropped,
            self_loops_dropped,
        };
        info!(
            tree = %tree.short_id(),
            source = %source.short_id(),
            target = %target.short_id(),
            edges = report.edges_redirected,
            references = report.total_references_rewritten(),
            duplicates = report.duplicate_edges_dropped,
            "merge reconciliation complete"
        );
        Ok(report)
    }

    /// Delete the edges a redirect can produce but the graph must not
    /// keep: self-loops (an edge between source and target whose both
    /// endpoints became the target) and semantic duplicates (the target
    /// already held an identical relation to the same third member).
    ///
    /// Edges are scanned in stable id order, so the oldest row of a
    /// duplicate set survives.
    async fn drop_redirect_artifacts(&self, tree: TreeId) -> MergeResult<(usize, usize)> {
        let edges = self
            .store
            .list_edges(tree)
            .await
            .map_err(|cause| MergeError::StepFailed {
                step: MergeStep::DropArtifacts,
                cause,
            })?;

        let mut seen = HashSet::new();
        let mut self_loops = 0;
        let mut duplicates = 0;
        for edge in edges {
            let drop_reason = if edge.is_self_loop() {
                self_loops += 1;
                "self-loop"
            } else if !seen.insert(edge.semantic_key()) {
                duplicates += 1;
                "duplicate"
            } else {
                continue;
            };
            debug!(edge = %edge.id.short_id(), reason = drop_reason, "dropping redirect artifact");
            self.store
                .delete_edge(edge.id)
                .await
                .map_err(|cause| MergeError::StepFailed {
                    step: MergeStep::DropArtifacts,
                    cause,
                })?;
        }
        Ok((self_loops, duplicates))
    }
}
