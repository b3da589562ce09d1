//! Foundation types for the Vanshmala family graph.
//!
//! This crate provides the identity, record, and relationship types used
//! throughout the Vanshmala core. Every other crate depends on `vansh-types`.
//!
//! # Key Types
//!
//! - [`TreeId`], [`MemberId`], [`UserId`], [`EdgeId`], [`RequestId`] — time-ordered UUID v7 identifiers
//! - [`VanshmalaId`] — Permanent human-facing genealogical identifier
//! - [`Member`] — A person record scoped to exactly one tree
//! - [`RelationshipEdge`] — A typed, directed link between two members
//! - [`RelationKind`] — The persisted relation vocabulary (`parent`, `spouse`, `sibling`)
//! - [`MergeRequest`] — A proposal that two members are the same real person

pub mod error;
pub mod id;
pub mod member;
pub mod relation;
pub mod request;

pub use error::TypeError;
pub use id::{EdgeId, MemberId, RequestId, TreeId, UserId};
pub use member::{Member, VanshmalaId, VitalStatus};
pub use relation::{RelationInput, RelationKind, RelationshipEdge, SemanticKey};
pub use request::{MergeRequest, MergeStatus};
