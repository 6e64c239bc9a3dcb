//! Record identities and references.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use std::fmt;

/// Identity assigned to a record once it has been persisted.
///
/// Wraps a UUID and implements `Ord` for deterministic ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Create a new RecordId from a UUID.
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Create a new RecordId from a UUID string.
    pub fn from_str(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Generate a fresh random identity.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Whether this is the nil UUID, which the platform treats as "unsaved".
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Reference to a persisted record: kind plus identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Record kind (logical name).
    pub kind: String,
    /// Record identity.
    pub id: RecordId,
}

impl EntityRef {
    /// Create a new reference.
    pub fn new(kind: impl Into<String>, id: RecordId) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }

    /// Whether this reference points at the given kind.
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_ordering() {
        let a = RecordId::new(Uuid::from_u128(1));
        let b = RecordId::new(Uuid::from_u128(2));
        assert!(a < b);
    }

    #[test]
    fn test_entity_ref_display() {
        let r = EntityRef::new("bolt_rentalproject", RecordId::new(Uuid::from_u128(1)));
        assert_eq!(
            r.to_string(),
            "bolt_rentalproject(00000000-0000-0000-0000-000000000001)"
        );
        assert!(r.is_kind("bolt_rentalproject"));
        assert!(!r.is_kind("bolt_rentalcostsheet"));
    }

    #[test]
    fn test_nil_id() {
        assert!(RecordId::new(Uuid::nil()).is_nil());
        assert!(!RecordId::generate().is_nil());
    }
}
