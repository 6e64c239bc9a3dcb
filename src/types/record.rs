//! Record snapshots.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

use super::reference::{EntityRef, RecordId};
use super::value::FieldValue;

/// A record with its attribute bag and populated relationship slots.
///
/// Maps are `BTreeMap` so iteration and serialization are deterministic.
/// A record with `id == None` is unsaved.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    /// Record kind (logical name).
    pub kind: String,
    /// Identity, present once persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Attribute bag.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
    /// Relationship name -> child records present in that slot.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub related: BTreeMap<String, Vec<Record>>,
}

impl Record {
    /// Create an unsaved record of the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Create a persisted record of the given kind.
    pub fn with_id(kind: impl Into<String>, id: RecordId) -> Self {
        Self {
            kind: kind.into(),
            id: Some(id),
            ..Self::default()
        }
    }

    /// Builder-style field setter.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Builder-style child attachment.
    pub fn child(mut self, relationship: impl Into<String>, child: Record) -> Self {
        self.related.entry(relationship.into()).or_default().push(child);
        self
    }

    /// Whether the record has no identity (or the nil identity).
    pub fn is_unsaved(&self) -> bool {
        self.id.map_or(true, |id| id.is_nil())
    }

    /// Reference to this record, if persisted.
    pub fn to_ref(&self) -> Option<EntityRef> {
        match self.id {
            Some(id) if !id.is_nil() => Some(EntityRef::new(self.kind.clone(), id)),
            _ => None,
        }
    }

    /// Get a field value.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Get a text field.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_text)
    }

    /// Set a field value, returning the previous one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(name.into(), value.into())
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// Children in a relationship slot. Empty when the slot is absent.
    pub fn children(&self, relationship: &str) -> &[Record] {
        self.related
            .get(relationship)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total records in this tree, including this one.
    pub fn count_nodes(&self) -> usize {
        1 + self
            .related
            .values()
            .flatten()
            .map(Record::count_nodes)
            .sum::<usize>()
    }

    /// Whether every record in this tree is unsaved.
    pub fn all_unsaved(&self) -> bool {
        self.is_unsaved() && self.related.values().flatten().all(Record::all_unsaved)
    }

    /// Per-slot child counts.
    pub fn slot_counts(&self) -> BTreeMap<String, usize> {
        self.related
            .iter()
            .map(|(name, children)| (name.clone(), children.len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn id(n: u128) -> RecordId {
        RecordId::new(Uuid::from_u128(n))
    }

    #[test]
    fn test_unsaved() {
        assert!(Record::new("a").is_unsaved());
        assert!(Record::with_id("a", RecordId::new(Uuid::nil())).is_unsaved());
        assert!(!Record::with_id("a", id(1)).is_unsaved());
        assert!(Record::new("a").to_ref().is_none());
    }

    #[test]
    fn test_count_nodes() {
        let leaf = Record::with_id("leaf", id(3));
        let child = Record::with_id("child", id(2))
            .child("c_leaf", leaf.clone())
            .child("c_leaf", leaf);
        let root = Record::with_id("root", id(1)).child("r_child", child);

        assert_eq!(root.count_nodes(), 4);
        assert_eq!(root.children("r_child").len(), 1);
        assert!(root.children("missing").is_empty());
        assert!(!root.all_unsaved());
    }

    #[test]
    fn test_serde_omits_empty_slots() {
        let r = Record::new("leaf").field("name", "x");
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("related").is_none());
        assert!(json.get("id").is_none());

        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }
}
