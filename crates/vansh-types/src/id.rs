//! Typed identifiers for the Vanshmala core.
//!
//! All ids are UUID v7 newtypes. The v7 layout is time-ordered, so the id
//! itself doubles as a stable creation-order tie-break key wherever a
//! deterministic ordering is required.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Generate a new time-ordered identifier (UUID v7).
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// Create from an existing UUID.
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// The underlying UUID.
            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// Short representation (prefix + first 8 characters of the UUID).
            pub fn short_id(&self) -> String {
                format!("{}:{}", $prefix, &self.0.to_string()[..8])
            }

            /// Parse from a canonical UUID string.
            pub fn parse(s: &str) -> Result<Self, TypeError> {
                uuid::Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| TypeError::InvalidId(e.to_string()))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.short_id())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a family tree: the bounded namespace containing one
    /// extended family's members and edges.
    TreeId,
    "tree"
);

define_id!(
    /// Identifier of a person record within a tree.
    MemberId,
    "m"
);

define_id!(
    /// Identifier of a platform user account (which may be linked to a member).
    UserId,
    "u"
);

define_id!(
    /// Identifier of a relationship edge row.
    EdgeId,
    "e"
);

define_id!(
    /// Identifier of a merge request.
    RequestId,
    "req"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(MemberId::new(), MemberId::new());
        assert_ne!(TreeId::new(), TreeId::new());
    }

    #[test]
    fn ids_order_by_timestamp_prefix() {
        // v7 ids embed a millisecond timestamp in the high bits, so ids
        // minted in different milliseconds compare in creation order.
        let earlier = MemberId::from_uuid(uuid::Uuid::parse_str("017f22e2-79b0-7cc3-98c4-dc0c0c07398f").unwrap());
        let later = MemberId::from_uuid(uuid::Uuid::parse_str("017f22e2-79b1-7cc3-98c4-dc0c0c07398f").unwrap());
        assert!(earlier < later);
    }

    #[test]
    fn short_id_format() {
        let id = MemberId::from_uuid(uuid::Uuid::nil());
        assert_eq!(id.short_id(), "m:00000000");
    }

    #[test]
    fn parse_roundtrip() {
        let id = RequestId::new();
        let parsed = RequestId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            MemberId::parse("not-a-uuid"),
            Err(TypeError::InvalidId(_))
        ));
    }

    #[test]
    fn serde_roundtrip() {
        let id = TreeId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: TreeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
