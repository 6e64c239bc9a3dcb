//! Declarative field overrides applied to clones.

use std::collections::BTreeMap;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::FieldValue;

/// A field whose clone value is computed rather than copied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FieldOverride {
    /// `source text + suffix`. A missing or non-text source yields just the suffix.
    AppendSuffix {
        /// Target field.
        field: String,
        /// Text appended to the source value.
        suffix: String,
    },
    /// The execution date.
    Today {
        /// Target field.
        field: String,
    },
    /// A constant value.
    Fixed {
        /// Target field.
        field: String,
        /// Value written to the clone.
        value: FieldValue,
    },
}

impl FieldOverride {
    /// Append `suffix` to the source value of `field`.
    pub fn append_suffix(field: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self::AppendSuffix {
            field: field.into(),
            suffix: suffix.into(),
        }
    }

    /// Set `field` to the execution date.
    pub fn today(field: impl Into<String>) -> Self {
        Self::Today { field: field.into() }
    }

    /// Set `field` to a constant.
    pub fn fixed(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Fixed {
            field: field.into(),
            value: value.into(),
        }
    }

    /// The field this override writes.
    pub fn field(&self) -> &str {
        match self {
            Self::AppendSuffix { field, .. } | Self::Today { field } | Self::Fixed { field, .. } => field,
        }
    }

    /// Whether the computed value depends on the execution date.
    pub fn is_time_dependent(&self) -> bool {
        matches!(self, Self::Today { .. })
    }

    /// Compute the override value from the source record's fields.
    pub fn compute(&self, source: &BTreeMap<String, FieldValue>, today: NaiveDate) -> FieldValue {
        match self {
            Self::AppendSuffix { field, suffix } => {
                let base = source.get(field).and_then(FieldValue::as_text).unwrap_or("");
                FieldValue::Text(format!("{}{}", base, suffix))
            }
            Self::Today { .. } => FieldValue::Date(today),
            Self::Fixed { value, .. } => value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[test]
    fn test_append_suffix() {
        let mut source = BTreeMap::new();
        source.insert("name".to_string(), FieldValue::from("Q1 Build"));

        let o = FieldOverride::append_suffix("name", " - COPY");
        assert_eq!(o.compute(&source, today()), FieldValue::from("Q1 Build - COPY"));
    }

    #[test]
    fn test_append_suffix_missing_source() {
        let o = FieldOverride::append_suffix("name", " - COPY");
        assert_eq!(o.compute(&BTreeMap::new(), today()), FieldValue::from(" - COPY"));
    }

    #[test]
    fn test_today_ignores_source() {
        let mut source = BTreeMap::new();
        source.insert(
            "due".to_string(),
            FieldValue::Date(NaiveDate::from_ymd_opt(2001, 1, 1).unwrap()),
        );

        let o = FieldOverride::today("due");
        assert!(o.is_time_dependent());
        assert_eq!(o.compute(&source, today()), FieldValue::Date(today()));
    }

    #[test]
    fn test_serde_shape() {
        let o: FieldOverride =
            serde_json::from_str(r#"{"op":"append_suffix","field":"n","suffix":"!"}"#).unwrap();
        assert_eq!(o, FieldOverride::append_suffix("n", "!"));
        assert_eq!(o.field(), "n");
    }
}
