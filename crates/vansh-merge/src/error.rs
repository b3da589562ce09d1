//! Error taxonomy for the merge workflow and reconciliation engine.
//!
//! The variants split along recovery lines: validation and authorization
//! failures are rejected before any mutation; conflicts refuse the second
//! caller and leave the first untouched; partial-migration failures are
//! surfaced (never swallowed) so the request stays pending and a retry
//! re-enters the saga from the top.

use vansh_store::StoreError;
use vansh_types::{MemberId, RequestId, TreeId, UserId};

use crate::engine::MergeStep;

/// Errors from merge-request handling and reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The operation's preconditions do not hold (self-merge, cross-tree
    /// references, malformed input). Nothing was mutated.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The acting user is not an admin of the tree. Nothing was mutated.
    #[error("user {user} is not an admin of tree {tree}")]
    Authorization { tree: TreeId, user: UserId },

    /// The request already reached a terminal state. Distinguishable from
    /// a race by the caller: the state did not change underneath them.
    #[error("merge request {request} is already resolved")]
    AlreadyResolved { request: RequestId },

    /// Another reconciliation is executing in the same tree. The in-flight
    /// operation proceeds unaffected; this caller is refused.
    #[error("a merge is already executing in tree {tree}")]
    MergeInFlight { tree: TreeId },

    /// A referenced member does not exist.
    #[error("member not found: {0}")]
    MemberNotFound(MemberId),

    /// A referenced merge request does not exist.
    #[error("merge request not found: {0}")]
    RequestNotFound(RequestId),

    /// A reconciliation step failed mid-saga. The source member still
    /// exists; re-running the saga converges.
    #[error("merge step {step} failed: {cause}")]
    StepFailed {
        step: MergeStep,
        #[source]
        cause: StoreError,
    },

    /// References to the source survived the rewrite steps, so the
    /// destructive delete was refused. The source member still exists.
    #[error(
        "migration incomplete at step {step}: {remaining} reference(s) to {source_member} remain; \
         source member was not deleted"
    )]
    PartialMigration {
        step: MergeStep,
        source_member: MemberId,
        remaining: usize,
    },

    /// Storage failure outside the saga's step sequence.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl MergeError {
    /// Returns `true` for the conflict class: a competing caller was
    /// refused and no state changed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyResolved { .. } | Self::MergeInFlight { .. })
    }

    /// Returns `true` if re-running the operation can succeed: the
    /// partial-migration class, where forward progress is preserved and
    /// the request must stay pending.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StepFailed { .. } | Self::PartialMigration { .. })
    }
}

/// Result alias for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;
