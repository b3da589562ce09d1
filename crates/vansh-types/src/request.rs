//! Duplicate-profile merge requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::{MemberId, RequestId, TreeId, UserId};

/// Lifecycle state of a merge request.
///
/// `Pending` is the only non-terminal state. Once a request is `Approved`
/// or `Rejected` it is immutable; any further resolution attempt is a
/// conflict, not a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStatus {
    Pending,
    Approved,
    Rejected,
}

impl MergeStatus {
    /// Returns `true` once the request can no longer change state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

/// A proposal that `source` is a duplicate of `target` within one tree.
///
/// `source` is the record that will be removed if the request is approved;
/// `target` is the record that survives and absorbs every reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergeRequest {
    /// Row identifier.
    pub id: RequestId,
    /// The tree both members belong to.
    pub tree: TreeId,
    /// The duplicate record to be removed.
    pub source: MemberId,
    /// The record to be kept.
    pub target: MemberId,
    /// Lifecycle state.
    pub status: MergeStatus,
    /// The user who flagged the duplicate.
    pub requested_by: UserId,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the request reached a terminal state, if it has.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl MergeRequest {
    /// Create a pending request. Rejects a self-merge proposal.
    pub fn propose(
        tree: TreeId,
        source: MemberId,
        target: MemberId,
        requested_by: UserId,
    ) -> Result<Self, TypeError> {
        if source == target {
            return Err(TypeError::SelfMerge);
        }
        Ok(Self {
            id: RequestId::new(),
            tree,
            source,
            target,
            status: MergeStatus::Pending,
            requested_by,
            created_at: Utc::now(),
            resolved_at: None,
        })
    }

    /// Returns `true` once the request can no longer change state.
    pub fn is_resolved(&self) -> bool {
        self.status.is_terminal()
    }
}
