//! Graph fetcher: reads the source hierarchy as read-only snapshots.

use tracing::debug;

use crate::config::CloneSettings;
use crate::store::{OrganizationService, ServiceError};
use crate::types::{EntityRef, Record, RelationshipQuery};

/// Reads a root with its child slot, or a child with its leaf slots.
///
/// Each fetch is one round trip. There is no retry; any service error is
/// returned as is.
pub struct GraphFetcher<'a, S: OrganizationService + ?Sized> {
    service: &'a S,
    settings: &'a CloneSettings,
}

impl<'a, S: OrganizationService + ?Sized> GraphFetcher<'a, S> {
    /// Create a fetcher over a service channel.
    pub fn new(service: &'a S, settings: &'a CloneSettings) -> Self {
        Self { service, settings }
    }

    /// Root record with its child slot populated (children are shallow).
    pub async fn fetch_root_with_children(&self, root: &EntityRef) -> Result<Record, ServiceError> {
        let query = RelationshipQuery::single(self.settings.child_relationship.clone());
        let mut record = self.service.retrieve_with_related(root, &query).await?;
        ensure_slots(&mut record, &query);

        debug!(
            target_ref = %root,
            children = record.children(&self.settings.child_relationship.name).len(),
            "Fetched root with children"
        );
        Ok(record)
    }

    /// Child record with every leaf slot populated.
    pub async fn fetch_child_with_grandchildren(&self, child: &EntityRef) -> Result<Record, ServiceError> {
        let query = RelationshipQuery::many(self.settings.leaf_relationships.iter().cloned());
        let mut record = self.service.retrieve_with_related(child, &query).await?;
        ensure_slots(&mut record, &query);

        debug!(
            target_ref = %child,
            leaves = record.count_nodes() - 1,
            "Fetched child with grandchildren"
        );
        Ok(record)
    }
}

/// Requested slots are always present, empty when nothing is related.
fn ensure_slots(record: &mut Record, query: &RelationshipQuery) {
    for relationship in &query.relationships {
        record.related.entry(relationship.name.clone()).or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use crate::store::InMemoryOrganizationService;
    use crate::types::RecordId;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_fetch_child_populates_all_leaf_slots() {
        let service = InMemoryOrganizationService::rental();
        let cs = service
            .seed(
                Record::with_id(schema::COST_SHEET_KIND, RecordId::new(Uuid::from_u128(2))).child(
                    "bolt_bolt_rentalcostsheet_bolt_rentalcables",
                    Record::new("bolt_rentalcables"),
                ),
            )
            .unwrap();
        let settings = CloneSettings::default();
        let fetcher = GraphFetcher::new(&service, &settings);

        let record = fetcher.fetch_child_with_grandchildren(&cs).await.unwrap();
        assert_eq!(record.related.len(), 5);
        assert_eq!(record.children("bolt_bolt_rentalcostsheet_bolt_rentalcables").len(), 1);
        assert!(record.children("bolt_bolt_rentalcostsheet_bolt_rentalmisc").is_empty());
    }

    #[tokio::test]
    async fn test_fetch_root_missing_propagates() {
        let service = InMemoryOrganizationService::rental();
        let settings = CloneSettings::default();
        let fetcher = GraphFetcher::new(&service, &settings);

        let missing = EntityRef::new(schema::PROJECT_KIND, RecordId::new(Uuid::from_u128(1)));
        assert!(fetcher.fetch_root_with_children(&missing).await.is_err());
    }
}
