//! Duplicate-profile merge for the Vanshmala family graph.
//!
//! Two person records believed to describe the same real person are
//! reconciled in two layers:
//!
//! - [`MergeWorkflow`] — the request state machine: a user flags a
//!   duplicate (`pending`), an authorized reviewer approves or rejects
//!   (terminal). A request is marked `approved` only **after** the
//!   reconciliation succeeds, so a crash mid-migration leaves it pending
//!   and retryable.
//! - [`ReconciliationEngine`] — the saga that redirects every reference
//!   from the source member to the target across the relationship edges
//!   and every dependent collection, verifies nothing still points at the
//!   source, and only then deletes the source row. Every step before the
//!   delete is an idempotent filtered rewrite, so recovery from any
//!   partial failure is simply re-running the whole sequence.
//!
//! Merge executions are serialized per tree by [`MergeLeases`]; a second
//! overlapping approval is refused rather than interleaved.

pub mod authz;
pub mod engine;
pub mod error;
pub mod lease;
pub mod workflow;

pub use authz::{AllowAllGate, AuthorizationGate, StaticAdminGate};
pub use engine::{MergeReport, MergeStep, ReconciliationEngine};
pub use error::{MergeError, MergeResult};
pub use lease::{LeaseGuard, MergeLeases};
pub use workflow::MergeWorkflow;
