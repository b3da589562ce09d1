//! The trait surfaces any persistence backend must implement.
//!
//! All implementations must satisfy these invariants:
//! - Writes are atomic per row; there is no multi-row transaction.
//! - Filtered rewrites (`rewrite_edge_endpoints`, `rewrite_references`)
//!   select rows by `= old` at execution time, so repeating a rewrite after
//!   a partial failure is a no-op for rows already migrated.
//! - Reads of a tree return every row scoped to that tree, in a stable
//!   order (sorted by row id).
//! - All I/O errors are propagated, never silently ignored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use vansh_types::{
    EdgeId, Member, MemberId, MergeRequest, MergeStatus, RelationshipEdge, RequestId, TreeId,
};

use crate::error::StoreResult;

/// Which endpoint column of an edge row a filtered rewrite targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndpointRole {
    From,
    To,
}

impl EndpointRole {
    /// Column name in the backing schema.
    pub fn column(&self) -> &'static str {
        match self {
            Self::From => "from_member",
            Self::To => "to_member",
        }
    }
}

/// Persistence for member and relationship-edge rows.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// All members of a tree, sorted by id.
    async fn list_members(&self, tree: TreeId) -> StoreResult<Vec<Member>>;

    /// Read a member by id. Returns `Ok(None)` if the row does not exist.
    async fn get_member(&self, id: MemberId) -> StoreResult<Option<Member>>;

    /// Insert a member row. Fails with `AlreadyExists` on id collision.
    async fn create_member(&self, member: Member) -> StoreResult<Member>;

    /// Delete a member row. Returns `true` if the row existed.
    ///
    /// Deletes only the member row itself; callers are responsible for
    /// migrating every reference first.
    async fn delete_member(&self, id: MemberId) -> StoreResult<bool>;

    /// All relationship edges of a tree, sorted by id.
    async fn list_edges(&self, tree: TreeId) -> StoreResult<Vec<RelationshipEdge>>;

    /// Insert an edge row. The edge must already be normalized (see
    /// `RelationshipEdge::link`); backends never see the legacy `child`
    /// direction.
    async fn create_edge(&self, edge: RelationshipEdge) -> StoreResult<RelationshipEdge>;

    /// Delete an edge row. Returns `true` if the row existed.
    async fn delete_edge(&self, id: EdgeId) -> StoreResult<bool>;

    /// Rewrite one endpoint column on every edge of `tree` where it equals
    /// `old`, setting it to `new`. Returns the number of rows rewritten.
    async fn rewrite_edge_endpoints(
        &self,
        tree: TreeId,
        role: EndpointRole,
        old: MemberId,
        new: MemberId,
    ) -> StoreResult<usize>;

    /// Number of edges in `tree` with `member` at either endpoint.
    async fn count_edges_referencing(
        &self,
        tree: TreeId,
        member: MemberId,
    ) -> StoreResult<usize>;
}

/// Persistence for merge-request rows.
#[async_trait]
pub trait MergeRequestStore: Send + Sync {
    /// Insert a request row. Fails with `AlreadyExists` on id collision.
    async fn create_request(&self, request: MergeRequest) -> StoreResult<MergeRequest>;

    /// Read a request by id. Returns `Ok(None)` if the row does not exist.
    async fn get_request(&self, id: RequestId) -> StoreResult<Option<MergeRequest>>;

    /// All pending requests of a tree, sorted by id.
    async fn list_pending_requests(&self, tree: TreeId) -> StoreResult<Vec<MergeRequest>>;

    /// Set a request's status and resolution timestamp.
    async fn set_request_status(
        &self,
        id: RequestId,
        status: MergeStatus,
        resolved_at: Option<DateTime<Utc>>,
    ) -> StoreResult<()>;
}

/// The collections outside the graph that hold a member foreign key.
///
/// The merge engine knows these only as "collection + key column to
/// rewrite". Adding a dependent collection means adding a variant here and
/// to [`ReferenceCollection::ALL`]; the engine's completeness check
/// iterates `ALL`, so a collection missing from the registry would leave
/// residual references and refuse the merge rather than dangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReferenceCollection {
    /// Life-event / timeline entries attached to a member.
    TimelineEvents,
    /// Messages addressed to a member for posterity.
    LegacyMessages,
    /// Rows linking a platform user account to a member profile.
    TreeMemberships,
}

impl ReferenceCollection {
    /// Every dependent collection, in migration order.
    pub const ALL: [Self; 3] = [
        Self::TimelineEvents,
        Self::LegacyMessages,
        Self::TreeMemberships,
    ];

    /// Table name in the backing schema.
    pub fn table(&self) -> &'static str {
        match self {
            Self::TimelineEvents => "timeline_events",
            Self::LegacyMessages => "legacy_messages",
            Self::TreeMemberships => "tree_memberships",
        }
    }

    /// Name of the member foreign-key column to rewrite.
    pub fn key_column(&self) -> &'static str {
        match self {
            Self::TimelineEvents => "member_id",
            Self::LegacyMessages => "target_member_id",
            Self::TreeMemberships => "member_id",
        }
    }
}

impl std::fmt::Display for ReferenceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.table())
    }
}

/// Persistence for the referencing collections.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Rewrite the member foreign key on every row of `collection` where it
    /// equals `old`, setting it to `new`. Returns the number of rows
    /// rewritten.
    async fn rewrite_references(
        &self,
        collection: ReferenceCollection,
        old: MemberId,
        new: MemberId,
    ) -> StoreResult<usize>;

    /// Number of rows in `collection` whose member foreign key is `member`.
    async fn count_references(
        &self,
        collection: ReferenceCollection,
        member: MemberId,
    ) -> StoreResult<usize>;
}
