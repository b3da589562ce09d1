use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid vanshmala id: {0}")]
    InvalidVanshmalaId(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("a member cannot be related to itself")]
    SelfRelation,

    #[error("a member cannot be merged into itself")]
    SelfMerge,
}
