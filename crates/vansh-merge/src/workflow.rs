//! The merge-request state machine.
//!
//! `pending --approve--> approved` and `pending --reject--> rejected`; both
//! terminal. Resolving an already-resolved request is a conflict, never a
//! silent no-op, so callers can tell a lost race from a logic error.
//!
//! Approval drives the reconciliation engine and writes the `approved`
//! status only **after** the engine reports success. A crash or failure
//! mid-migration therefore leaves the request pending; the retry re-enters
//! the saga from the top, which is safe because every pre-delete step is an
//! idempotent filtered rewrite.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use vansh_store::{GraphStore, MergeRequestStore, ReferenceStore};
use vansh_types::{MemberId, MergeRequest, MergeStatus, RequestId, TreeId, UserId};

use crate::authz::AuthorizationGate;
use crate::engine::{MergeReport, ReconciliationEngine};
use crate::error::{MergeError, MergeResult};
use crate::lease::MergeLeases;

/// Proposal, review, and resolution of duplicate-profile claims.
pub struct MergeWorkflow<S, G> {
    store: Arc<S>,
    gate: Arc<G>,
    engine: ReconciliationEngine<S>,
}

impl<S, G> MergeWorkflow<S, G>
where
    S: GraphStore + MergeRequestStore + ReferenceStore,
    G: AuthorizationGate,
{
    /// Create a workflow with its own merge-lease registry.
    pub fn new(store: Arc<S>, gate: Arc<G>) -> Self {
        Self::with_leases(store, gate, MergeLeases::new())
    }

    /// Create a workflow serializing merges on an existing lease registry.
    pub fn with_leases(store: Arc<S>, gate: Arc<G>, leases: MergeLeases) -> Self {
        let engine = ReconciliationEngine::with_leases(Arc::clone(&store), leases);
        Self {
            store,
            gate,
            engine,
        }
    }

    /// Propose that `source` is a duplicate of `target` within `tree`.
    ///
    /// Validated before any write: both members must exist and belong to
    /// `tree`, and a member cannot be merged into itself.
    pub async fn create_request(
        &self,
        tree: TreeId,
        source: MemberId,
        target: MemberId,
        requested_by: UserId,
    ) -> MergeResult<MergeRequest> {
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
                "both members must belong to the request's tree".into(),
            ));
        }

        let request = MergeRequest::propose(tree, source, target, requested_by)
            .map_err(|e| MergeError::Validation(e.to_string()))?;
        let request = self.store.create_request(request).await?;
        info!(
            request = %request.id.short_id(),
            tree = %tree.short_id(),
            source = %source.short_id(),
            target = %target.short_id(),
            "merge request created"
        );
        Ok(request)
    }

    /// Pending requests awaiting review in `tree`.
    pub async fn pending_requests(&self, tree: TreeId) -> MergeResult<Vec<MergeRequest>> {
        Ok(self.store.list_pending_requests(tree).await?)
    }

    /// Approve a pending request and execute the reconciliation.
    ///
    /// The acting user must pass the authorization gate for the request's
    /// tree; the check is a precondition of starting execution and is not
    /// repeated between migration steps. The request row is only marked
    /// `approved` once the engine has succeeded.
    pub async fn approve(
        &self,
        request: RequestId,
        acting_user: UserId,
    ) -> MergeResult<(MergeRequest, MergeReport)> {
        let request = self.load_unresolved(request).await?;
        self.authorize(request.tree, acting_user).await?;

        let report = self
            .engine
            .execute(request.source, request.target, request.tree)
            .await?;

        let resolved_at = Utc::now();
        self.store
            .set_request_status(request.id, MergeStatus::Approved, Some(resolved_at))
            .await?;
        info!(request = %request.id.short_id(), "merge request approved");

        let mut resolved = request;
        resolved.status = MergeStatus::Approved;
        resolved.resolved_at = Some(resolved_at);
        Ok((resolved, report))
    }

    /// Reject a pending request. Touches nothing but the request row.
    pub async fn reject(
        &self,
        request: RequestId,
        acting_user: UserId,
    ) -> MergeResult<MergeRequest> {
        let request = self.load_unresolved(request).await?;
        self.authorize(request.tree, acting_user).await?;

        let resolved_at = Utc::now();
        self.store
            .set_request_status(request.id, MergeStatus::Rejected, Some(resolved_at))
            .await?;
        info!(request = %request.id.short_id(), "merge request rejected");

        let mut resolved = request;
        resolved.status = MergeStatus::Rejected;
        resolved.resolved_at = Some(resolved_at);
        Ok(resolved)
    }

    async fn load_unresolved(&self, id: RequestId) -> MergeResult<MergeRequest> {
        let request = self
            .store
            .get_request(id)
            .await?
            .ok_or(MergeError::RequestNotFound(id))?;
        if request.is_resolved() {
            return Err(MergeError::AlreadyResolved { request: id });
        }
        Ok(request)
    }

    async fn authorize(&self, tree: TreeId, user: UserId) -> MergeResult<()> {
        if self.gate.is_admin(tree, user).await {
            Ok(())
        } else {
            Err(MergeError::Authorization { tree, user })
        }
    }
}
