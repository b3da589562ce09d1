//! Person records and the permanent vanshmala identifier.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::{MemberId, TreeId, UserId};

/// Alphabet for vanshmala identifiers. Crockford-style: no `I`, `L`, `O`
/// or `U`, so codes survive handwriting and speech.
const VANSHMALA_ALPHABET: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Number of code characters after the `VM-` prefix.
const VANSHMALA_LEN: usize = 8;

/// Permanent, human-facing genealogical identifier for a member.
///
/// A `VanshmalaId` is assigned once when the member record is created and
/// never changes afterward: it survives profile edits and is the id that
/// appears on printed family charts. Format: `VM-` followed by eight
/// characters from a 32-symbol alphabet.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VanshmalaId(String);

impl VanshmalaId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let code: String = (0..VANSHMALA_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..VANSHMALA_ALPHABET.len());
                VANSHMALA_ALPHABET[idx] as char
            })
            .collect();
        Self(format!("VM-{code}"))
    }

    /// Parse and validate an identifier in canonical `VM-XXXXXXXX` form.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let code = s
            .strip_prefix("VM-")
            .ok_or_else(|| TypeError::InvalidVanshmalaId(s.to_string()))?;
        if code.len() != VANSHMALA_LEN
            || !code.bytes().all(|b| VANSHMALA_ALPHABET.contains(&b))
        {
            return Err(TypeError::InvalidVanshmalaId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for VanshmalaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VanshmalaId({})", self.0)
    }
}

impl fmt::Display for VanshmalaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a member is living, and if not, when they died.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VitalStatus {
    /// The member is recorded as living.
    Alive,
    /// The member is recorded as deceased. The death date is optional;
    /// older records often carry only the fact of death.
    Deceased { death_date: Option<NaiveDate> },
}

impl VitalStatus {
    /// Returns `true` if the member is recorded as living.
    pub fn is_alive(&self) -> bool {
        matches!(self, Self::Alive)
    }
}

/// A person record scoped to exactly one tree.
///
/// A member belongs to its tree for the whole of its lifetime; merges
/// redirect references within a tree, never across trees. The
/// `generation_level` is a depth hint used only as an ordering heuristic;
/// it is not authoritative.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Row identifier.
    pub id: MemberId,
    /// The tree this member belongs to.
    pub tree: TreeId,
    /// Permanent human-facing genealogical identifier.
    pub vanshmala_id: VanshmalaId,
    /// Primary display name.
    pub display_name: String,
    /// Optional localized variant of the display name.
    pub localized_name: Option<String>,
    /// Platform user account linked to this profile, if any.
    pub linked_user: Option<UserId>,
    /// Living or deceased.
    pub vital_status: VitalStatus,
    /// Date of birth, if recorded.
    pub birth_date: Option<NaiveDate>,
    /// Integer depth hint from the tree's root. Not authoritative.
    pub generation_level: i32,
    /// Avatar image location, if any.
    pub avatar_url: Option<String>,
    /// Free-form biographical text.
    pub biography: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl Member {
    /// Create a new member record with a fresh id and vanshmala identifier.
    pub fn new(tree: TreeId, display_name: impl Into<String>) -> Self {
        Self {
            id: MemberId::new(),
            tree,
            vanshmala_id: VanshmalaId::generate(),
            display_name: display_name.into(),
            localized_name: None,
            linked_user: None,
            vital_status: VitalStatus::Alive,
            birth_date: None,
            generation_level: 0,
            avatar_url: None,
            biography: None,
            created_at: Utc::now(),
        }
    }

    /// Set the generation-level hint.
    pub fn with_generation(mut self, level: i32) -> Self {
        self.generation_level = level;
        self
    }

    /// Set the localized display-name variant.
    pub fn with_localized_name(mut self, name: impl Into<String>) -> Self {
        self.localized_name = Some(name.into());
        self
    }

    /// Link a platform user account to this profile.
    pub fn with_linked_user(mut self, user: UserId) -> Self {
        self.linked_user = Some(user);
        self
    }

    /// Override the creation timestamp. Intended for imports and tests.
    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    /// The deterministic ordering key used for root selection and adjacency
    /// ordering: generation level, then creation time, then id.
    pub fn ordering_key(&self) -> (i32, DateTime<Utc>, MemberId) {
        (self.generation_level, self.created_at, self.id)
    }
}
