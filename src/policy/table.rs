//! Field exemption policy: kind -> exemptions and overrides.
//!
//! Lookup order for a kind:
//!
//! 1. An explicit [`KindRule`] registered for the kind.
//! 2. A registered leaf kind, whose only exemption is `<kind>id`.
//! 3. Anything else passes through with no exemptions and no overrides.
//!
//! The third case is permissive on purpose: a field added to a known kind
//! is copied unless it is added to that kind's exemption list.
//!
//! Field-bag validation is opt-in. [`ExemptionPolicy::rental_project`]
//! declares no `known_fields`, so nothing is reported until a loaded policy
//! declares them for a kind.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::schema;
use crate::types::FieldValue;
use super::overrides::FieldOverride;

/// Error type for policy loading.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Policy file could not be read.
    #[error("Failed to read policy file {path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Policy JSON is malformed.
    #[error("Invalid policy JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// A rule was registered under an empty kind name.
    #[error("Policy rule has an empty kind name")]
    EmptyKind,
    /// Two overrides write the same field.
    #[error("Kind {kind} has more than one override for field {field}")]
    DuplicateOverride {
        /// Kind with the conflict.
        kind: String,
        /// Field written twice.
        field: String,
    },
}

/// Clone rule for one record kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KindRule {
    /// Fields never copied into a clone.
    #[serde(default)]
    pub exemptions: BTreeSet<String>,
    /// Fields whose clone value is computed.
    #[serde(default)]
    pub overrides: Vec<FieldOverride>,
    /// Fields this kind is expected to carry. `None` disables the check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_fields: Option<BTreeSet<String>>,
}

impl KindRule {
    /// Rule exempting the given fields.
    pub fn exempting<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exemptions: fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Add an override.
    pub fn with_override(mut self, field_override: FieldOverride) -> Self {
        self.overrides.push(field_override);
        self
    }

    /// Declare the expected field set.
    pub fn with_known_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// How a kind was resolved against the policy.
#[derive(Debug, Clone, PartialEq)]
pub enum KindResolution<'a> {
    /// Explicit rule.
    Rule(&'a KindRule),
    /// Registered leaf kind; only the generic identity field is exempt.
    Leaf(String),
    /// Not in the policy; everything passes through.
    Unknown,
}

/// Declarative table of per-kind clone rules.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExemptionPolicy {
    /// Explicit rules by kind.
    #[serde(default)]
    rules: BTreeMap<String, KindRule>,
    /// Kinds using the generic `<kind>id` exemption.
    #[serde(default)]
    leaf_kinds: BTreeSet<String>,
}

impl ExemptionPolicy {
    /// Create an empty policy. Every kind passes through.
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in policy for rental projects and their cost sheets.
    pub fn rental_project() -> Self {
        let project = KindRule::exempting(schema::PROJECT_EXEMPTIONS.iter().copied())
            .with_override(FieldOverride::append_suffix(
                schema::PROJECT_NAME_FIELD,
                schema::COPY_SUFFIX,
            ))
            .with_override(FieldOverride::today(schema::PROJECT_RFQ_DATE_FIELD))
            .with_override(FieldOverride::today(schema::PROJECT_BID_DUE_FIELD));

        let cost_sheet = KindRule::exempting(schema::COST_SHEET_EXEMPTIONS.iter().copied());

        let mut policy = Self::new()
            .with_rule(schema::PROJECT_KIND, project)
            .with_rule(schema::COST_SHEET_KIND, cost_sheet);
        for (kind, _) in schema::LEAF_RELATIONSHIPS {
            policy = policy.with_leaf_kind(*kind);
        }
        policy
    }

    /// Register an explicit rule for a kind, replacing any previous one.
    pub fn with_rule(mut self, kind: impl Into<String>, rule: KindRule) -> Self {
        self.rules.insert(kind.into(), rule);
        self
    }

    /// Register a leaf kind.
    pub fn with_leaf_kind(mut self, kind: impl Into<String>) -> Self {
        self.leaf_kinds.insert(kind.into());
        self
    }

    /// Load a policy from JSON text.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let policy: Self = serde_json::from_str(json)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load a policy from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Check structural consistency.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.rules.keys().chain(self.leaf_kinds.iter()).any(|k| k.is_empty()) {
            return Err(PolicyError::EmptyKind);
        }
        for (kind, rule) in &self.rules {
            let mut seen = BTreeSet::new();
            for o in &rule.overrides {
                if !seen.insert(o.field()) {
                    return Err(PolicyError::DuplicateOverride {
                        kind: kind.clone(),
                        field: o.field().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolve how a kind is treated.
    pub fn resolve(&self, kind: &str) -> KindResolution<'_> {
        if let Some(rule) = self.rules.get(kind) {
            KindResolution::Rule(rule)
        } else if self.leaf_kinds.contains(kind) {
            KindResolution::Leaf(schema::generic_id_field(kind))
        } else {
            KindResolution::Unknown
        }
    }

    /// Whether the kind has a rule or is a registered leaf.
    pub fn is_known_kind(&self, kind: &str) -> bool {
        !matches!(self.resolve(kind), KindResolution::Unknown)
    }

    /// Fields that must never be copied for `kind`.
    pub fn exemptions(&self, kind: &str) -> BTreeSet<String> {
        match self.resolve(kind) {
            KindResolution::Rule(rule) => rule.exemptions.clone(),
            KindResolution::Leaf(id_field) => BTreeSet::from([id_field]),
            KindResolution::Unknown => BTreeSet::new(),
        }
    }

    /// Computed values for `kind`, given the source record's fields.
    pub fn overrides(
        &self,
        kind: &str,
        source_fields: &BTreeMap<String, FieldValue>,
        today: NaiveDate,
    ) -> BTreeMap<String, FieldValue> {
        match self.resolve(kind) {
            KindResolution::Rule(rule) => rule
                .overrides
                .iter()
                .map(|o| (o.field().to_string(), o.compute(source_fields, today)))
                .collect(),
            KindResolution::Leaf(_) | KindResolution::Unknown => BTreeMap::new(),
        }
    }

    /// Fields present in `fields` that the kind's schema does not declare.
    ///
    /// Exempted and overridden fields are never reported. Empty when the
    /// kind has no declared schema.
    pub fn unknown_fields(&self, kind: &str, fields: &BTreeMap<String, FieldValue>) -> Vec<String> {
        let KindResolution::Rule(rule) = self.resolve(kind) else {
            return Vec::new();
        };
        let Some(known) = &rule.known_fields else {
            return Vec::new();
        };
        fields
            .keys()
            .filter(|name| {
                !known.contains(*name)
                    && !rule.exemptions.contains(*name)
                    && !rule.overrides.iter().any(|o| o.field() == name.as_str())
            })
            .cloned()
            .collect()
    }

    /// Stable fingerprint of the policy contents.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(self)
    }
}
