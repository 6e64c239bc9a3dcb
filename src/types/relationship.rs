//! Relationship slots and retrieval specs.

use serde::{Deserialize, Serialize};

/// A named one-to-many link from a parent kind to a child kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Relationship {
    /// Relationship schema name; also the slot name on the parent record.
    pub name: String,
    /// Kind of the records in the slot.
    pub child_kind: String,
}

impl Relationship {
    /// Create a new relationship.
    pub fn new(name: impl Into<String>, child_kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            child_kind: child_kind.into(),
        }
    }
}

/// Which relationship slots to populate on a retrieve.
///
/// Every slot is queried with all columns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelationshipQuery {
    /// Slots to populate.
    pub relationships: Vec<Relationship>,
}

impl RelationshipQuery {
    /// Query with no related slots (record only).
    pub fn none() -> Self {
        Self::default()
    }

    /// Query populating a single slot.
    pub fn single(relationship: Relationship) -> Self {
        Self {
            relationships: vec![relationship],
        }
    }

    /// Query populating several slots.
    pub fn many(relationships: impl IntoIterator<Item = Relationship>) -> Self {
        Self {
            relationships: relationships.into_iter().collect(),
        }
    }

    /// Number of slots requested.
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// Whether no slots are requested.
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }
}
