//! High-level embedding API for the Vanshmala family graph.
//!
//! [`FamilyTreeService`] wires a storage backend, the authorization gate,
//! the tree materializer, and the merge workflow into one façade:
//!
//! ```no_run
//! # async fn demo() -> Result<(), vansh_sdk::SdkError> {
//! use vansh_sdk::FamilyTreeService;
//! use vansh_types::{Member, RelationInput, TreeId};
//!
//! let service = FamilyTreeService::in_memory();
//! let tree = TreeId::new();
//! let amma = service.add_member(Member::new(tree, "Amma")).await?;
//! let son = service.add_member(Member::new(tree, "Son").with_generation(1)).await?;
//! service.relate(tree, amma.id, son.id, RelationInput::Parent).await?;
//!
//! let forest = service.view(tree).await?;
//! assert_eq!(forest.roots, vec![amma.id]);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod service;

pub use error::{SdkError, SdkResult};
pub use service::FamilyTreeService;
