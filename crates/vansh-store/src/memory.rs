use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use vansh_types::{
    EdgeId, Member, MemberId, MergeRequest, MergeStatus, RelationshipEdge, RequestId, TreeId,
};

use crate::error::{StoreError, StoreResult};
use crate::traits::{
    EndpointRole, GraphStore, MergeRequestStore, ReferenceCollection, ReferenceStore,
};

/// A row in one of the referencing collections, reduced to what the merge
/// engine needs: its identity and its member foreign key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRow {
    pub id: uuid::Uuid,
    pub member: MemberId,
}

/// In-memory, HashMap-based backend implementing every store surface.
///
/// Intended for tests and embedding. All rows are held in memory behind
/// `RwLock`s for safe concurrent access and cloned on read. Rewrites scan
/// for `= old` at call time, which makes them idempotent under retry: the
/// same contract a SQL `UPDATE ... WHERE fk = old` gives a real backend.
pub struct InMemoryGraphStore {
    members: RwLock<HashMap<MemberId, Member>>,
    edges: RwLock<HashMap<EdgeId, RelationshipEdge>>,
    requests: RwLock<HashMap<RequestId, MergeRequest>>,
    references: RwLock<HashMap<ReferenceCollection, Vec<ReferenceRow>>>,
}

impl InMemoryGraphStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            members: RwLock::new(HashMap::new()),
            edges: RwLock::new(HashMap::new()),
            requests: RwLock::new(HashMap::new()),
            references: RwLock::new(HashMap::new()),
        }
    }

    /// Number of member rows currently stored (across all trees).
    pub fn member_count(&self) -> usize {
        self.members.read().expect("lock poisoned").len()
    }

    /// Number of edge rows currently stored (across all trees).
    pub fn edge_count(&self) -> usize {
        self.edges.read().expect("lock poisoned").len()
    }

    /// Seed a row into a referencing collection. Test/import helper.
    pub fn seed_reference(&self, collection: ReferenceCollection, member: MemberId) -> uuid::Uuid {
        let row = ReferenceRow {
            id: uuid::Uuid::now_v7(),
            member,
        };
        let id = row.id;
        self.references
            .write()
            .expect("lock poisoned")
            .entry(collection)
            .or_default()
            .push(row);
        id
    }

    /// All rows of a referencing collection, sorted by row id.
    pub fn reference_rows(&self, collection: ReferenceCollection) -> Vec<ReferenceRow> {
        let map = self.references.read().expect("lock poisoned");
        let mut rows = map.get(&collection).cloned().unwrap_or_default();
        rows.sort_by_key(|r| r.id);
        rows
    }
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn list_members(&self, tree: TreeId) -> StoreResult<Vec<Member>> {
        let map = self.members.read().expect("lock poisoned");
        let mut rows: Vec<Member> = map.values().filter(|m| m.tree == tree).cloned().collect();
        rows.sort_by_key(|m| m.id);
        Ok(rows)
    }

    async fn get_member(&self, id: MemberId) -> StoreResult<Option<Member>> {
        let map = self.members.read().expect("lock poisoned");
        Ok(map.get(&id).cloned())
    }

    async fn create_member(&self, member: Member) -> StoreResult<Member> {
        let mut map = self.members.write().expect("lock poisoned");
        if map.contains_key(&member.id) {
            return Err(StoreError::AlreadyExists(member.id.to_string()));
        }
        debug!(member = %member.id.short_id(), tree = %member.tree.short_id(), "created member");
        map.insert(member.id, member.clone());
        Ok(member)
    }

    async fn delete_member(&self, id: MemberId) -> StoreResult<bool> {
        let mut map = self.members.write().expect("lock poisoned");
        let existed = map.remove(&id).is_some();
        if existed {
            debug!(member = %id.short_id(), "deleted member");
        }
        Ok(existed)
    }

    async fn list_edges(&self, tree: TreeId) -> StoreResult<Vec<RelationshipEdge>> {
        let map = self.edges.read().expect("lock poisoned");
        let mut rows: Vec<RelationshipEdge> =
            map.values().filter(|e| e.tree == tree).cloned().collect();
        rows.sort_by_key(|e| e.id);
        Ok(rows)
    }

    async fn create_edge(&self, edge: RelationshipEdge) -> StoreResult<RelationshipEdge> {
        let mut map = self.edges.write().expect("lock poisoned");
        if map.contains_key(&edge.id) {
            return Err(StoreError::AlreadyExists(edge.id.to_string()));
        }
        debug!(
            edge = %edge.id.short_id(),
            kind = %edge.kind,
            from = %edge.from.short_id(),
            to = %edge.to.short_id(),
            "created edge"
        );
        map.insert(edge.id, edge.clone());
        Ok(edge)
    }

    async fn delete_edge(&self, id: EdgeId) -> StoreResult<bool> {
        let mut map = self.edges.write().expect("lock poisoned");
        Ok(map.remove(&id).is_some())
    }

    async fn rewrite_edge_endpoints(
        &self,
        tree: TreeId,
        role: EndpointRole,
        old: MemberId,
        new: MemberId,
    ) -> StoreResult<usize> {
        let mut map = self.edges.write().expect("lock poisoned");
        let mut rewritten = 0;
        for edge in map.values_mut().filter(|e| e.tree == tree) {
            let endpoint = match role {
                EndpointRole::From => &mut edge.from,
                EndpointRole::To => &mut edge.to,
            };
            if *endpoint == old {
                *endpoint = new;
                rewritten += 1;
            }
        }
        debug!(
            tree = %tree.short_id(),
            column = role.column(),
            count = rewritten,
            "rewrote edge endpoints"
        );
        Ok(rewritten)
    }

    async fn count_edges_referencing(
        &self,
        tree: TreeId,
        member: MemberId,
    ) -> StoreResult<usize> {
        let map = self.edges.read().expect("lock poisoned");
        Ok(map
            .values()
            .filter(|e| e.tree == tree && e.involves(member))
            .count())
    }
}

#[async_trait]
impl MergeRequestStore for InMemoryGraphStore {
    async fn create_request(&self, request: MergeRequest) -> StoreResult<MergeRequest> {
        let mut map = self.requests.write().expect("lock poisoned");
        if map.contains_key(&request.id) {
            return Err(StoreError::AlreadyExists(request.id.to_string()));
        }
        debug!(request = %request.id.short_id(), "created merge request");
        map.insert(request.id, request.clone());
        Ok(request)
    }

    async fn get_request(&self, id: RequestId) -> StoreResult<Option<MergeRequest>> {
        let map = self.requests.read().expect("lock poisoned");
        Ok(map.get(&id).cloned())
    }

    async fn list_pending_requests(&self, tree: TreeId) -> StoreResult<Vec<MergeRequest>> {
        let map = self.requests.read().expect("lock poisoned");
        let mut rows: Vec<MergeRequest> = map
            .values()
            .filter(|r| r.tree == tree && r.status == MergeStatus::Pending)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    async fn set_request_status(
        &self,
        id: RequestId,
        status: MergeStatus,
        resolved_at: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let mut map = self.requests.write().expect("lock poisoned");
        let request = map.get_mut(&id).ok_or(StoreError::RequestNotFound(id))?;
        request.status = status;
        request.resolved_at = resolved_at;
        debug!(request = %id.short_id(), status = %status, "updated merge request");
        Ok(())
    }
}

#[async_trait]
impl ReferenceStore for InMemoryGraphStore {
    async fn rewrite_references(
        &self,
        collection: ReferenceCollection,
        old: MemberId,
        new: MemberId,
    ) -> StoreResult<usize> {
        let mut map = self.references.write().expect("lock poisoned");
        let mut rewritten = 0;
        if let Some(rows) = map.get_mut(&collection) {
            for row in rows.iter_mut().filter(|r| r.member == old) {
                row.member = new;
                rewritten += 1;
            }
        }
        debug!(
            collection = %collection,
            column = collection.key_column(),
            count = rewritten,
            "rewrote references"
        );
        Ok(rewritten)
    }

    async fn count_references(
        &self,
        collection: ReferenceCollection,
        member: MemberId,
    ) -> StoreResult<usize> {
        let map = self.references.read().expect("lock poisoned");
        Ok(map
            .get(&collection)
            .map(|rows| rows.iter().filter(|r| r.member == member).count())
            .unwrap_or(0))
    }
}

impl std::fmt::Debug for InMemoryGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryGraphStore")
            .field("members", &self.member_count())
            .field("edges", &self.edge_count())
            .finish()
    }
}
