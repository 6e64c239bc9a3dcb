//! Clone transformer: turns one snapshot record into a clone-ready record.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::policy::{ExemptionPolicy, KindResolution};
use crate::types::Record;

/// Per-record clone step. Never looks at children.
///
/// Output depends only on the input record, the policy, and `today`.
#[derive(Debug, Clone, Copy)]
pub struct CloneTransformer<'a> {
    policy: &'a ExemptionPolicy,
    today: NaiveDate,
}

impl<'a> CloneTransformer<'a> {
    /// Create a transformer for a given execution date.
    pub fn new(policy: &'a ExemptionPolicy, today: NaiveDate) -> Self {
        Self { policy, today }
    }

    /// Execution date used by date overrides.
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// The policy in use.
    pub fn policy(&self) -> &'a ExemptionPolicy {
        self.policy
    }

    /// Clone `record` as a record of `kind`.
    ///
    /// 1. Copy the field bag
    /// 2. Remove every exempted field
    /// 3. Clear the identity
    /// 4. Apply overrides computed from the source fields
    /// 5. Detach relationship slots
    pub fn clone_record(&self, record: &Record, kind: &str) -> Record {
        if let KindResolution::Unknown = self.policy.resolve(kind) {
            warn!(kind = %kind, "No clone rule for kind; copying every field");
        }

        let mut fields = record.fields.clone();
        for name in self.policy.exemptions(kind) {
            fields.remove(&name);
        }
        fields.extend(self.policy.overrides(kind, &record.fields, self.today));

        debug!(
            kind = %kind,
            source = ?record.id,
            copied = fields.len(),
            "Prepared clone record"
        );

        Record {
            kind: record.kind.clone(),
            id: None,
            fields,
            related: Default::default(),
        }
    }

    /// Fields of `record` that `kind`'s declared schema does not know about.
    pub fn unexpected_fields(&self, record: &Record, kind: &str) -> Vec<String> {
        let unknown = self.policy.unknown_fields(kind, &record.fields);
        if !unknown.is_empty() {
            warn!(kind = %kind, fields = ?unknown, "Copying fields missing from the kind schema");
        }
        unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::record_fingerprint;
    use crate::schema;
    use crate::types::{FieldValue, RecordId};
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    fn source_project() -> Record {
        Record::with_id(schema::PROJECT_KIND, RecordId::new(Uuid::from_u128(1)))
            .field("bolt_rentalprojectid", FieldValue::Guid(Uuid::from_u128(1)))
            .field("bolt_rentalname", "Q1 Build")
            .field("cr6f5_quotenumber", "Q-1001")
            .field("bolt_jobnumber", "J-77")
            .field("bolt_customerpo", "PO-9")
            .field("bolt_dateofrfq", NaiveDate::from_ymd_opt(2023, 1, 1).unwrap())
            .field("bolt_site", "Dock 4")
            .child(
                schema::PROJECT_COST_SHEETS,
                Record::with_id(schema::COST_SHEET_KIND, RecordId::new(Uuid::from_u128(2))),
            )
    }

    #[test]
    fn test_project_clone() {
        let policy = ExemptionPolicy::rental_project();
        let t = CloneTransformer::new(&policy, today());
        let clone = t.clone_record(&source_project(), schema::PROJECT_KIND);

        assert!(clone.id.is_none());
        assert!(clone.related.is_empty());
        assert!(clone.get("bolt_rentalprojectid").is_none());
        assert!(clone.get("cr6f5_quotenumber").is_none());
        assert!(clone.get("bolt_jobnumber").is_none());
        assert!(clone.get("bolt_customerpo").is_none());
        assert_eq!(clone.get_text("bolt_rentalname"), Some("Q1 Build - COPY"));
        assert_eq!(clone.get("bolt_dateofrfq"), Some(&FieldValue::Date(today())));
        assert_eq!(clone.get("bolt_bidduedate"), Some(&FieldValue::Date(today())));
        assert_eq!(clone.get_text("bolt_site"), Some("Dock 4"));
    }

    #[test]
    fn test_source_untouched() {
        let policy = ExemptionPolicy::rental_project();
        let source = source_project();
        let before = source.clone();

        let _ = CloneTransformer::new(&policy, today()).clone_record(&source, schema::PROJECT_KIND);
        assert_eq!(source, before);
    }

    #[test]
    fn test_same_inputs_same_output() {
        let policy = ExemptionPolicy::rental_project();
        let t = CloneTransformer::new(&policy, today());
        let a = t.clone_record(&source_project(), schema::PROJECT_KIND);
        let b = t.clone_record(&source_project(), schema::PROJECT_KIND);
        assert_eq!(a, b);
        assert_eq!(record_fingerprint(&a), record_fingerprint(&b));

        let later = NaiveDate::from_ymd_opt(2024, 5, 18).unwrap();
        let c = CloneTransformer::new(&policy, later).clone_record(&source_project(), schema::PROJECT_KIND);
        assert_ne!(a, c);
        assert_eq!(a.get("bolt_rentalname"), c.get("bolt_rentalname"));
    }

    #[test]
    fn test_leaf_generic_identity_removed() {
        let policy = ExemptionPolicy::rental_project();
        let parent = crate::types::EntityRef::new(schema::COST_SHEET_KIND, RecordId::new(Uuid::from_u128(2)));
        let leaf = Record::with_id("bolt_rentallabor", RecordId::new(Uuid::from_u128(3)))
            .field("bolt_rentallaborid", FieldValue::Guid(Uuid::from_u128(3)))
            .field("bolt_hours", 12i64)
            .field(schema::LEAF_PARENT_LOOKUP_FIELD, parent.clone());

        let clone = CloneTransformer::new(&policy, today()).clone_record(&leaf, "bolt_rentallabor");
        assert!(clone.id.is_none());
        assert!(clone.get("bolt_rentallaborid").is_none());
        assert_eq!(clone.get("bolt_hours"), Some(&FieldValue::Integer(12)));
        // Parent lookup is left for the deep-insert to rebind
        assert_eq!(
            clone.get(schema::LEAF_PARENT_LOOKUP_FIELD).and_then(FieldValue::as_lookup),
            Some(&parent)
        );
    }

    #[test]
    fn test_unknown_kind_copies_everything() {
        let policy = ExemptionPolicy::rental_project();
        let record = Record::with_id("account", RecordId::new(Uuid::from_u128(4)))
            .field("accountid", FieldValue::Guid(Uuid::from_u128(4)))
            .field("name", "Contoso");

        let clone = CloneTransformer::new(&policy, today()).clone_record(&record, "account");
        assert!(clone.id.is_none());
        assert_eq!(clone.fields, record.fields);
    }
}
