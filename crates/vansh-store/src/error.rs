use vansh_types::{EdgeId, MemberId, RequestId};

/// Errors from storage adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested member row was not found.
    #[error("member not found: {0}")]
    MemberNotFound(MemberId),

    /// The requested edge row was not found.
    #[error("edge not found: {0}")]
    EdgeNotFound(EdgeId),

    /// The requested merge-request row was not found.
    #[error("merge request not found: {0}")]
    RequestNotFound(RequestId),

    /// A row with this identifier already exists.
    #[error("row already exists: {0}")]
    AlreadyExists(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure (connection loss, constraint violation).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
