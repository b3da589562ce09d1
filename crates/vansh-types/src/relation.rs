//! Typed relationship edges between members.
//!
//! Edges are directed rows `(from, to, kind)` scoped to one tree. Only
//! three kinds are ever persisted: `parent`, `spouse`, and `sibling`.
//! `spouse` and `sibling` are stored as a single directed row but are
//! semantically undirected; consumers must treat them symmetrically.
//!
//! Legacy imports additionally carry an inverse `child` direction. That
//! direction is normalized away at construction time: a `child` input
//! becomes a `parent` edge with swapped endpoints, so two directional
//! conventions for the same semantic relation can never coexist in storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::{EdgeId, MemberId, TreeId};

/// The persisted relation vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// `from` is a parent of `to`.
    Parent,
    /// `from` and `to` are spouses. Undirected.
    Spouse,
    /// `from` and `to` are siblings. Undirected.
    Sibling,
}

impl RelationKind {
    /// Returns `true` for kinds whose direction carries no meaning.
    pub fn is_symmetric(&self) -> bool {
        matches!(self, Self::Spouse | Self::Sibling)
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Parent => "parent",
            Self::Spouse => "spouse",
            Self::Sibling => "sibling",
        };
        write!(f, "{s}")
    }
}

/// Relation vocabulary accepted at the write boundary.
///
/// Includes the legacy inverse `child` direction, which exists only here:
/// [`RelationInput::normalize`] folds it into a `parent` edge with swapped
/// endpoints before anything reaches storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationInput {
    Parent,
    /// Legacy inverse of `parent`: `from` is a child of `to`.
    Child,
    Spouse,
    Sibling,
}

impl RelationInput {
    /// Normalize to the persisted vocabulary, swapping endpoints for the
    /// legacy `child` direction.
    pub fn normalize(self, from: MemberId, to: MemberId) -> (MemberId, MemberId, RelationKind) {
        match self {
            Self::Parent => (from, to, RelationKind::Parent),
            Self::Child => (to, from, RelationKind::Parent),
            Self::Spouse => (from, to, RelationKind::Spouse),
            Self::Sibling => (from, to, RelationKind::Sibling),
        }
    }
}

/// Canonical identity of an edge's meaning, used for deduplication.
///
/// For symmetric kinds the endpoint pair is ordered, so `(A spouse B)` and
/// `(B spouse A)` produce the same key. For `parent` the direction is part
/// of the meaning and is preserved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SemanticKey {
    pub kind: RelationKind,
    pub a: MemberId,
    pub b: MemberId,
}

/// A directed, typed link between two members of one tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    /// Row identifier.
    pub id: EdgeId,
    /// The tree both endpoints belong to.
    pub tree: TreeId,
    /// Source endpoint.
    pub from: MemberId,
    /// Target endpoint.
    pub to: MemberId,
    /// Relation kind. Always normalized, never the legacy `child`.
    pub kind: RelationKind,
    /// When the edge row was created.
    pub created_at: DateTime<Utc>,
}

impl RelationshipEdge {
    /// Create an edge from write-boundary input, normalizing the legacy
    /// `child` direction. Rejects self-relations.
    pub fn link(
        tree: TreeId,
        from: MemberId,
        to: MemberId,
        input: RelationInput,
    ) -> Result<Self, TypeError> {
        if from == to {
            return Err(TypeError::SelfRelation);
        }
        let (from, to, kind) = input.normalize(from, to);
        Ok(Self {
            id: EdgeId::new(),
            tree,
            from,
            to,
            kind,
            created_at: Utc::now(),
        })
    }

    /// Returns `true` if either endpoint is `member`.
    pub fn involves(&self, member: MemberId) -> bool {
        self.from == member || self.to == member
    }

    /// Returns `true` if both endpoints are the same member. Redirecting an
    /// edge between a merge's source and target produces such a loop; it
    /// carries no information and must be dropped.
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }

    /// The canonical identity of this edge's meaning.
    pub fn semantic_key(&self) -> SemanticKey {
        let (a, b) = if self.kind.is_symmetric() && self.to < self.from {
            (self.to, self.from)
        } else {
            (self.from, self.to)
        };
        SemanticKey {
            kind: self.kind,
            a,
            b,
        }
    }
}
