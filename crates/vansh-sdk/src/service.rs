//! The façade tying stores, materializer, and merge workflow together.

use std::sync::Arc;

use tracing::debug;

use vansh_merge::{
    AuthorizationGate, MergeReport, MergeWorkflow, StaticAdminGate,
};
use vansh_store::{GraphStore, InMemoryGraphStore, MergeRequestStore, ReferenceStore};
use vansh_tree::{materialize, FamilyForest};
use vansh_types::{
    Member, MemberId, MergeRequest, RelationInput, RelationshipEdge, RequestId, TreeId, UserId,
};

use crate::error::{SdkError, SdkResult};

/// High-level family-graph API over any storage backend and gate.
pub struct FamilyTreeService<S, G> {
    store: Arc<S>,
    gate: Arc<G>,
    workflow: MergeWorkflow<S, G>,
}

impl FamilyTreeService<InMemoryGraphStore, StaticAdminGate> {
    /// A fully in-memory service. For tests, demos, and embedding.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryGraphStore::new()),
            Arc::new(StaticAdminGate::new()),
        )
    }
}

impl<S, G> FamilyTreeService<S, G>
where
    S: GraphStore + MergeRequestStore + ReferenceStore,
    G: AuthorizationGate,
{
    /// Create a service over an existing backend and authorization gate.
    pub fn new(store: Arc<S>, gate: Arc<G>) -> Self {
        let workflow = MergeWorkflow::new(Arc::clone(&store), Arc::clone(&gate));
        Self {
            store,
            gate,
            workflow,
        }
    }

    /// The storage backend this service operates on.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The authorization gate consulted for merge resolution.
    pub fn gate(&self) -> &Arc<G> {
        &self.gate
    }

    // ---- Graph operations ----

    /// Persist a new member record.
    pub async fn add_member(&self, member: Member) -> SdkResult<Member> {
        Ok(self.store.create_member(member).await?)
    }

    /// Read a member record.
    pub async fn member(&self, id: MemberId) -> SdkResult<Member> {
        self.store
            .get_member(id)
            .await?
            .ok_or(SdkError::MemberNotFound(id))
    }

    /// Record a relationship between two members of `tree`.
    ///
    /// Accepts the legacy `child` input direction and normalizes it before
    /// anything is persisted. Both members must already exist in `tree`.
    pub async fn relate(
        &self,
        tree: TreeId,
        from: MemberId,
        to: MemberId,
        input: RelationInput,
    ) -> SdkResult<RelationshipEdge> {
        for id in [from, to] {
            let row = self
                .store
                .get_member(id)
                .await?
                .ok_or(SdkError::MemberNotFound(id))?;
            if row.tree != tree {
                return Err(SdkError::Validation(format!(
                    "member {} belongs to a different tree",
                    id.short_id()
                )));
            }
        }
        let edge = RelationshipEdge::link(tree, from, to, input)?;
        debug!(edge = %edge.id.short_id(), kind = %edge.kind, "relating members");
        Ok(self.store.create_edge(edge).await?)
    }

    /// Materialize the renderable forest for `tree`.
    ///
    /// Reads the flat rows and runs the pure materializer; called on every
    /// tree view.
    pub async fn view(&self, tree: TreeId) -> SdkResult<FamilyForest> {
        let members = self.store.list_members(tree).await?;
        let edges = self.store.list_edges(tree).await?;
        Ok(materialize(&members, &edges))
    }

    // ---- Duplicate-profile merges ----

    /// Flag `source` as a duplicate of `target`, creating a pending
    /// merge request.
    pub async fn flag_duplicate(
        &self,
        tree: TreeId,
        source: MemberId,
        target: MemberId,
        requested_by: UserId,
    ) -> SdkResult<MergeRequest> {
        Ok(self
            .workflow
            .create_request(tree, source, target, requested_by)
            .await?)
    }

    /// Pending merge requests awaiting review in `tree`.
    pub async fn pending_merges(&self, tree: TreeId) -> SdkResult<Vec<MergeRequest>> {
        Ok(self.workflow.pending_requests(tree).await?)
    }

    /// Approve a pending merge request and execute the reconciliation.
    pub async fn approve_merge(
        &self,
        request: RequestId,
        acting_user: UserId,
    ) -> SdkResult<(MergeRequest, MergeReport)> {
        Ok(self.workflow.approve(request, acting_user).await?)
    }

    /// Reject a pending merge request, leaving the graph untouched.
    pub async fn reject_merge(
        &self,
        request: RequestId,
        acting_user: UserId,
    ) -> SdkResult<MergeRequest> {
        Ok(self.workflow.reject(request, acting_user).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use vansh_merge::MergeError;
    use vansh_store::ReferenceCollection;
    use vansh_types::{MergeStatus, RelationKind};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    struct Family {
        service: FamilyTreeService<InMemoryGraphStore, StaticAdminGate>,
        tree: TreeId,
        a: Member,
        b: Member,
        c: Member,
        admin: UserId,
        requester: UserId,
    }

    /// The worked example, built through the public API: members {A, B, C},
    /// edges (A,C,parent) and (A,B,spouse), one referencing row per
    /// dependent collection pointing at B, plus an admin for the tree.
    async fn family() -> anyhow::Result<Family> {
        init_tracing();
        let service = FamilyTreeService::in_memory();
        let tree = TreeId::new();

        let a = service.add_member(Member::new(tree, "A")).await?;
        let b = service
            .add_member(Member::new(tree, "B").with_generation(1))
            .await?;
        let c = service
            .add_member(Member::new(tree, "C").with_generation(1))
            .await?;
        service
            .relate(tree, a.id, c.id, RelationInput::Parent)
            .await?;
        service
            .relate(tree, a.id, b.id, RelationInput::Spouse)
            .await?;
        for collection in ReferenceCollection::ALL {
            service.store().seed_reference(collection, b.id);
        }

        let admin = UserId::new();
        service.gate().grant(tree, admin);

        Ok(Family {
            service,
            tree,
            a,
            b,
            c,
            admin,
            requester: UserId::new(),
        })
    }

    #[tokio::test]
    async fn builds_and_views_a_family() -> anyhow::Result<()> {
        let fx = family().await?;
        let forest = fx.service.view(fx.tree).await?;

        assert_eq!(forest.len(), 3);
        assert_eq!(forest.roots, vec![fx.a.id]);
        let a = forest.node(&fx.a.id).unwrap();
        assert_eq!(a.children, vec![fx.c.id]);
        assert_eq!(a.spouses, vec![fx.b.id]);
        assert!(!forest.is_degraded());
        Ok(())
    }

    #[tokio::test]
    async fn legacy_child_input_is_normalized_end_to_end() -> anyhow::Result<()> {
        let fx = family().await?;
        let grandchild = fx
            .service
            .add_member(Member::new(fx.tree, "Grandchild").with_generation(2))
            .await?;
        // "grandchild is a child of C", the legacy inverse direction.
        let edge = fx
            .service
            .relate(fx.tree, grandchild.id, fx.c.id, RelationInput::Child)
            .await?;
        assert_eq!(edge.kind, RelationKind::Parent);
        assert_eq!(edge.from, fx.c.id);

        let forest = fx.service.view(fx.tree).await?;
        assert_eq!(
            forest.node(&fx.c.id).unwrap().children,
            vec![grandchild.id]
        );
        Ok(())
    }

    #[tokio::test]
    async fn relate_rejects_members_outside_the_tree() -> anyhow::Result<()> {
        let fx = family().await?;
        let stranger = fx
            .service
            .add_member(Member::new(TreeId::new(), "Stranger"))
            .await?;

        let result = fx
            .service
            .relate(fx.tree, fx.a.id, stranger.id, RelationInput::Spouse)
            .await;
        assert!(matches!(result, Err(SdkError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn relate_rejects_self_relations() -> anyhow::Result<()> {
        let fx = family().await?;
        let result = fx
            .service
            .relate(fx.tree, fx.a.id, fx.a.id, RelationInput::Sibling)
            .await;
        assert!(matches!(result, Err(SdkError::InvalidInput(_))));
        Ok(())
    }

    #[tokio::test]
    async fn merge_lifecycle_end_to_end() -> anyhow::Result<()> {
        let fx = family().await?;

        let request = fx
            .service
            .flag_duplicate(fx.tree, fx.b.id, fx.c.id, fx.requester)
            .await?;
        assert_eq!(fx.service.pending_merges(fx.tree).await?.len(), 1);

        let (resolved, report) = fx.service.approve_merge(request.id, fx.admin).await?;
        assert_eq!(resolved.status, MergeStatus::Approved);
        assert!(resolved.resolved_at.is_some());
        assert_eq!(report.edges_redirected, 1);
        assert_eq!(report.total_references_rewritten(), 3);

        // The surviving view: A married to C, C the child of A, B gone.
        let forest = fx.service.view(fx.tree).await?;
        assert_eq!(forest.len(), 2);
        assert!(forest.node(&fx.b.id).is_none());
        let a = forest.node(&fx.a.id).unwrap();
        assert_eq!(a.spouses, vec![fx.c.id]);
        assert_eq!(a.children, vec![fx.c.id]);
        assert!(!forest.is_degraded());

        assert!(fx.service.pending_merges(fx.tree).await?.is_empty());

        // A second approval attempt reports the conflict.
        let err = fx
            .service
            .approve_merge(request.id, fx.admin)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SdkError::Merge(MergeError::AlreadyResolved { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn rejected_merge_leaves_the_view_unchanged() -> anyhow::Result<()> {
        let fx = family().await?;
        let before = fx.service.view(fx.tree).await?;

        let request = fx
            .service
            .flag_duplicate(fx.tree, fx.b.id, fx.c.id, fx.requester)
            .await?;
        let resolved = fx.service.reject_merge(request.id, fx.admin).await?;
        assert_eq!(resolved.status, MergeStatus::Rejected);

        let after = fx.service.view(fx.tree).await?;
        assert_eq!(before, after);
        Ok(())
    }

    #[tokio::test]
    async fn non_admin_cannot_resolve_merges() -> anyhow::Result<()> {
        let fx = family().await?;
        let request = fx
            .service
            .flag_duplicate(fx.tree, fx.b.id, fx.c.id, fx.requester)
            .await?;

        let err = fx
            .service
            .approve_merge(request.id, fx.requester)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SdkError::Merge(MergeError::Authorization { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn view_degrades_gracefully_on_corrupt_edges() -> anyhow::Result<()> {
        let fx = family().await?;
        // Bypass the API's validation to plant an edge whose endpoint is
        // not in the member set, as a botched import would.
        let ghost = MemberId::new();
        fx.service
            .store()
            .create_edge(
                RelationshipEdge::link(fx.tree, fx.a.id, ghost, RelationInput::Sibling).unwrap(),
            )
            .await?;

        let forest = fx.service.view(fx.tree).await?;
        assert_eq!(forest.len(), 3);
        assert!(forest.is_degraded());
        assert!(forest.node(&fx.a.id).unwrap().siblings.is_empty());
        Ok(())
    }
}
