//! Tree materialization for the Vanshmala family graph.
//!
//! [`materialize`] is the single entry point: it turns a flat set of member
//! rows and typed relationship edges into a [`FamilyForest`]: an
//! arena-style `id -> node` map plus one deterministic root per connected
//! component. The function is pure and synchronous; it is called on every
//! tree render and is idempotent and order-independent with respect to the
//! input arrays.
//!
//! Malformed input degrades gracefully: an edge referencing a member
//! outside the supplied set is dropped and reported as a
//! [`MaterializeWarning`], never a fatal error.

pub mod forest;
pub mod materialize;

pub use forest::{FamilyForest, FamilyNode};
pub use materialize::{materialize, MaterializeWarning};
