//! Storage adapter boundary for the Vanshmala family graph.
//!
//! Persistence backends expose three narrow trait surfaces: [`GraphStore`]
//! for members and relationship edges, [`MergeRequestStore`] for the merge
//! workflow's request rows, and [`ReferenceStore`] for the other
//! collections that hold a member foreign key. Backends guarantee per-row
//! atomicity only; there are no multi-row transactions, which is exactly
//! why the merge engine is built as a re-runnable saga.
//!
//! [`InMemoryGraphStore`] implements all three surfaces and backs the test
//! suites and embedded use.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryGraphStore, ReferenceRow};
pub use traits::{EndpointRole, GraphStore, MergeRequestStore, ReferenceCollection, ReferenceStore};
