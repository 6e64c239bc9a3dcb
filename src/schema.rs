//! Rental project schema names.
//!
//! ```text
//! bolt_rentalproject
//!   └─ bolt_rentalcostsheet            (bolt_bolt_rentalproject_bolt_rentalcostsheet)
//!        ├─ bolt_rentalgenerators      (bolt_bolt_rentalcostsheet_bolt_rentalgenerator)
//!        ├─ bolt_rentalcables          (bolt_bolt_rentalcostsheet_bolt_rentalcables)
//!        ├─ bolt_rentallabor           (bolt_bolt_rentalcostsheet_bolt_rentallabor)
//!        ├─ bolt_rentalmisc            (bolt_bolt_rentalcostsheet_bolt_rentalmisc)
//!        └─ bolt_rentalfreight         (bolt_bolt_rentalcostsheet_bolt_rentalfreight_RelatedCostSheet)
//! ```

use uuid::Uuid;

use crate::types::Relationship;

/// Root kind.
pub const PROJECT_KIND: &str = "bolt_rentalproject";
/// Root identity attribute.
pub const PROJECT_ID_FIELD: &str = "bolt_rentalprojectid";
/// Root display name.
pub const PROJECT_NAME_FIELD: &str = "bolt_rentalname";
/// Request-for-quote date, reset to today on clone.
pub const PROJECT_RFQ_DATE_FIELD: &str = "bolt_dateofrfq";
/// Bid due date, reset to today on clone.
pub const PROJECT_BID_DUE_FIELD: &str = "bolt_bidduedate";
/// Suffix appended to the display name of a clone.
pub const COPY_SUFFIX: &str = " - COPY";

/// Root fields that are never copied.
pub const PROJECT_EXEMPTIONS: &[&str] = &[
    PROJECT_ID_FIELD,
    "cr6f5_quotenumber",
    "bolt_jobnumber",
    "bolt_daterentalinfosheetsent",
    "bolt_daterentalinfosheetreceived",
    "bolt_datequotesenttocustomer",
    "bolt_actualclosedate",
    "bolt_poloireceiveddate",
    "bolt_customerpo",
    "overriddencreatedon",
    "bolt_sfid",
];

/// Cost sheet kind.
pub const COST_SHEET_KIND: &str = "bolt_rentalcostsheet";
/// Cost sheet identity attribute.
pub const COST_SHEET_ID_FIELD: &str = "bolt_rentalcostsheetid";
/// Project -> cost sheet relationship.
pub const PROJECT_COST_SHEETS: &str = "bolt_bolt_rentalproject_bolt_rentalcostsheet";

/// Cost sheet fields that are never copied.
pub const COST_SHEET_EXEMPTIONS: &[&str] = &[COST_SHEET_ID_FIELD, "bolt_quotenumber"];

/// Lookup from a leaf record back to its cost sheet.
pub const LEAF_PARENT_LOOKUP_FIELD: &str = "bolt_relatedcostsheetid";

/// Leaf kinds and the cost sheet relationship each hangs off.
pub const LEAF_RELATIONSHIPS: &[(&str, &str)] = &[
    ("bolt_rentalgenerators", "bolt_bolt_rentalcostsheet_bolt_rentalgenerator"),
    ("bolt_rentalcables", "bolt_bolt_rentalcostsheet_bolt_rentalcables"),
    ("bolt_rentallabor", "bolt_bolt_rentalcostsheet_bolt_rentallabor"),
    ("bolt_rentalmisc", "bolt_bolt_rentalcostsheet_bolt_rentalmisc"),
    (
        "bolt_rentalfreight",
        "bolt_bolt_rentalcostsheet_bolt_rentalfreight_RelatedCostSheet",
    ),
];

/// Server-side action recomputing cost sheet rollups.
pub const RECOMPUTE_ACTION: &str = "bolt_ACT_RentalCostSheetrollupautorecalc";

/// Workflow "Rollup Revenue to Project".
pub const ROLLUP_WORKFLOW_ID: Uuid = Uuid::from_u128(0xE30C8E78_1F0B_4A00_9FCB_53FD59E9758D);

/// The project -> cost sheet relationship.
pub fn project_cost_sheets() -> Relationship {
    Relationship::new(PROJECT_COST_SHEETS, COST_SHEET_KIND)
}

/// The five cost sheet -> leaf relationships.
pub fn cost_sheet_leaves() -> Vec<Relationship> {
    LEAF_RELATIONSHIPS
        .iter()
        .map(|(kind, name)| Relationship::new(*name, *kind))
        .collect()
}

/// Identity attribute of a kind without an explicit rule: `<kind>id`.
pub fn generic_id_field(kind: &str) -> String {
    format!("{}id", kind.to_lowercase())
}
