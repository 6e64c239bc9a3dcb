//! Field values carried in a record's attribute bag.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use std::fmt;

use super::reference::EntityRef;

/// A single attribute value.
///
/// Serialized with an explicit `type` tag so fixtures stay readable and
/// round-trip without guessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Explicit null.
    Null,
    /// Single or multi-line text.
    Text(String),
    /// Whole number.
    Integer(i64),
    /// Decimal or currency amount.
    Decimal(f64),
    /// Two-option field.
    Boolean(bool),
    /// Date-only field.
    Date(NaiveDate),
    /// Date and time field.
    DateTime(DateTime<Utc>),
    /// Lookup to another record.
    Lookup(EntityRef),
    /// Option set (choice) value.
    OptionSet(i32),
    /// Unique identifier field.
    Guid(Uuid),
}

impl FieldValue {
    /// Text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Lookup target, if this is a lookup value.
    pub fn as_lookup(&self) -> Option<&EntityRef> {
        match self {
            Self::Lookup(r) => Some(r),
            _ => None,
        }
    }

    /// Date content, if this is a date value.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Whether this is the explicit null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Text(s) => write!(f, "{}", s),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Decimal(n) => write!(f, "{}", n),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Date(d) => write!(f, "{}", d),
            Self::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::Lookup(r) => write!(f, "{}", r),
            Self::OptionSet(n) => write!(f, "option:{}", n),
            Self::Guid(g) => write!(f, "{}", g),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Decimal(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<EntityRef> for FieldValue {
    fn from(r: EntityRef) -> Self {
        Self::Lookup(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordId;

    #[test]
    fn test_tagged_serialization() {
        let v = FieldValue::Text("Q1 Build".to_string());
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"type":"text","value":"Q1 Build"}"#);

        let null = serde_json::to_string(&FieldValue::Null).unwrap();
        assert_eq!(null, r#"{"type":"null"}"#);
    }

    #[test]
    fn test_accessors() {
        let lookup = FieldValue::Lookup(EntityRef::new(
            "bolt_rentalcostsheet",
            RecordId::new(Uuid::from_u128(7)),
        ));
        assert!(lookup.as_lookup().is_some());
        assert!(lookup.as_text().is_none());

        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(FieldValue::from(date).as_date(), Some(date));
        assert!(FieldValue::Null.is_null());
    }
}
