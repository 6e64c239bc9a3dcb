//! Clone operation settings.
//!
//! ## Configuration
//!
//! Environment variables (all optional):
//! - `CLONE_RECOMPUTE_ACTION`: recompute action name (default: `bolt_ACT_RentalCostSheetrollupautorecalc`)
//! - `CLONE_ROLLUP_WORKFLOW_ID`: rollup workflow id (default: `E30C8E78-1F0B-4A00-9FCB-53FD59E9758D`)
//! - `CLONE_STRIP_PARENT_LOOKUP`: `true` to drop leaf parent lookups from clones (default: false)
//! - `CLONE_POLICY_PATH`: JSON exemption policy replacing the built-in one

use chrono::{Local, NaiveDate};
use uuid::Uuid;

use crate::policy::{ExemptionPolicy, PolicyError};
use crate::schema;
use crate::types::Relationship;

/// Error type for settings loaded from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable holds an unparsable value.
    #[error("Invalid value for {var}: {value}")]
    InvalidVar {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },
    /// The policy file could not be loaded.
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),
}

/// Schema names and server-side routine identifiers used by a clone run.
#[derive(Debug, Clone, PartialEq)]
pub struct CloneSettings {
    /// Root kind; other targets are ignored.
    pub root_kind: String,
    /// Root -> child relationship.
    pub child_relationship: Relationship,
    /// Child -> leaf relationships.
    pub leaf_relationships: Vec<Relationship>,
    /// Lookup from a leaf back to its child parent.
    pub leaf_parent_lookup: String,
    /// Drop `leaf_parent_lookup` from leaf clones instead of relying on
    /// the deep-insert to rebind it.
    pub strip_parent_lookup: bool,
    /// Recompute action run on every cost sheet.
    pub recompute_action: String,
    /// Rollup-to-parent workflow run on source cost sheets.
    pub rollup_workflow_id: Uuid,
}

impl Default for CloneSettings {
    fn default() -> Self {
        Self {
            root_kind: schema::PROJECT_KIND.to_string(),
            child_relationship: schema::project_cost_sheets(),
            leaf_relationships: schema::cost_sheet_leaves(),
            leaf_parent_lookup: schema::LEAF_PARENT_LOOKUP_FIELD.to_string(),
            strip_parent_lookup: false,
            recompute_action: schema::RECOMPUTE_ACTION.to_string(),
            rollup_workflow_id: schema::ROLLUP_WORKFLOW_ID,
        }
    }
}

impl CloneSettings {
    /// Load settings from environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Ok(action) = std::env::var("CLONE_RECOMPUTE_ACTION") {
            if !action.is_empty() {
                settings.recompute_action = action;
            }
        }
        if let Ok(value) = std::env::var("CLONE_ROLLUP_WORKFLOW_ID") {
            settings.rollup_workflow_id = Uuid::parse_str(&value).map_err(|_| ConfigError::InvalidVar {
                var: "CLONE_ROLLUP_WORKFLOW_ID",
                value,
            })?;
        }
        if let Ok(value) = std::env::var("CLONE_STRIP_PARENT_LOOKUP") {
            settings.strip_parent_lookup = parse_bool(&value).ok_or(ConfigError::InvalidVar {
                var: "CLONE_STRIP_PARENT_LOOKUP",
                value,
            })?;
        }

        Ok(settings)
    }
}

/// Load the exemption policy named by `CLONE_POLICY_PATH`, or the built-in one.
pub fn policy_from_env() -> Result<ExemptionPolicy, ConfigError> {
    match std::env::var("CLONE_POLICY_PATH") {
        Ok(path) if !path.is_empty() => {
            tracing::info!(path = %path, "Loading exemption policy from file");
            Ok(ExemptionPolicy::from_path(path)?)
        }
        _ => Ok(ExemptionPolicy::rental_project()),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Source of "today" for date overrides.
pub trait Clock: Send + Sync {
    /// The current local date.
    fn today(&self) -> NaiveDate;
}

/// Wall clock in the host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to a single date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_schema() {
        let s = CloneSettings::default();
        assert_eq!(s.root_kind, "bolt_rentalproject");
        assert_eq!(s.child_relationship.child_kind, "bolt_rentalcostsheet");
        assert_eq!(s.leaf_relationships.len(), 5);
        assert!(!s.strip_parent_lookup);
        assert_eq!(s.recompute_action, "bolt_ACT_RentalCostSheetrollupautorecalc");
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_fixed_clock() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(FixedClock(d).today(), d);
    }
}
