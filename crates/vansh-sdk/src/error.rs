use vansh_merge::MergeError;
use vansh_store::StoreError;
use vansh_types::{MemberId, TypeError};

/// Errors surfaced by the high-level API.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// Malformed input (self-relation, invalid identifier).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] TypeError),

    /// A referenced member does not exist.
    #[error("member not found: {0}")]
    MemberNotFound(MemberId),

    /// The operation's preconditions do not hold.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Failure from the merge workflow or reconciliation engine.
    #[error(transparent)]
    Merge(#[from] MergeError),

    /// Failure from the storage backend.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for high-level API operations.
pub type SdkResult<T> = Result<T, SdkError>;
