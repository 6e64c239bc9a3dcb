//! Graph cloner: builds a fresh clone tree from a source snapshot.
//!
//! ## Algorithm
//!
//! 1. Clone the root (no slots)
//! 2. If the root's child slot is empty, the single-node clone is the payload
//! 3. For each source child:
//!    - fetch it with its leaf slots
//!    - clone the child
//!    - clone every leaf in every leaf slot and drop its `<kind>id` field
//!      whatever the policy says; leaf lookups back to the
//!      source child are kept for the deep-insert to rebind (or dropped
//!      when `strip_parent_lookup` is set)
//! 4. Attach each finished child clone to the root clone's slot
//!
//! The snapshot is never mutated; every level of the clone is a new tree.

use tracing::{debug, info};

use crate::canonical::record_fingerprint;
use crate::config::CloneSettings;
use crate::error::CloneError;
use crate::fetch::GraphFetcher;
use crate::schema;
use crate::store::OrganizationService;
use crate::transform::CloneTransformer;
use crate::types::{EntityRef, Record};

/// A clone tree ready for deep-insert, plus what it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct ClonePlan {
    /// Root clone with nested child and leaf clones. Every node is unsaved.
    pub payload: Record,
    /// Source children, in the order they were cloned.
    pub source_children: Vec<EntityRef>,
    /// `(kind, field)` pairs copied despite not being in the kind's schema.
    pub unexpected_fields: Vec<(String, String)>,
}

impl ClonePlan {
    /// Whether the source root had at least one child.
    pub fn has_children(&self) -> bool {
        !self.source_children.is_empty()
    }

    /// Records the deep-insert will create.
    pub fn record_count(&self) -> usize {
        self.payload.count_nodes()
    }
}

/// Walks a fetched root snapshot and assembles its clone.
pub struct GraphCloner<'a, S: OrganizationService + ?Sized> {
    fetcher: GraphFetcher<'a, S>,
    transformer: CloneTransformer<'a>,
    settings: &'a CloneSettings,
}

impl<'a, S: OrganizationService + ?Sized> GraphCloner<'a, S> {
    /// Create a cloner.
    pub fn new(
        fetcher: GraphFetcher<'a, S>,
        transformer: CloneTransformer<'a>,
        settings: &'a CloneSettings,
    ) -> Self {
        Self {
            fetcher,
            transformer,
            settings,
        }
    }

    /// Build the clone tree for `root`, a snapshot from
    /// [`GraphFetcher::fetch_root_with_children`].
    pub async fn clone_graph(&self, root: &Record) -> Result<ClonePlan, CloneError> {
        let mut unexpected = Vec::new();
        let mut payload = self.clone_one(root, &self.settings.root_kind, &mut unexpected);

        let child_slot = &self.settings.child_relationship;
        let sources = root.children(&child_slot.name);
        if sources.is_empty() {
            info!(kind = %root.kind, "Root has no children; cloning root only");
            return Ok(ClonePlan {
                payload,
                source_children: Vec::new(),
                unexpected_fields: unexpected,
            });
        }

        let mut source_children = Vec::with_capacity(sources.len());
        let mut cloned_children = Vec::with_capacity(sources.len());

        for source in sources {
            let child_ref = source.to_ref().ok_or_else(|| {
                CloneError::MalformedSnapshot(format!(
                    "{} in slot {} has no identity",
                    source.kind, child_slot.name
                ))
            })?;

            let subtree = self.fetcher.fetch_child_with_grandchildren(&child_ref).await?;
            let cloned = self.clone_child(&subtree, &mut unexpected);
            debug!(
                source = %child_ref,
                records = cloned.count_nodes(),
                "Prepared child clone with leaves"
            );

            source_children.push(child_ref);
            cloned_children.push(cloned);
        }

        payload.related.insert(child_slot.name.clone(), cloned_children);

        info!(
            children = source_children.len(),
            records = payload.count_nodes(),
            fingerprint = %record_fingerprint(&payload),
            "Clone tree assembled"
        );

        Ok(ClonePlan {
            payload,
            source_children,
            unexpected_fields: unexpected,
        })
    }

    fn clone_child(&self, subtree: &Record, unexpected: &mut Vec<(String, String)>) -> Record {
        let mut cloned = self.clone_one(
            subtree,
            &self.settings.child_relationship.child_kind,
            unexpected,
        );

        for (slot, leaves) in &subtree.related {
            let leaf_clones = leaves
                .iter()
                .map(|leaf| {
                    let mut c = self.clone_one(leaf, &leaf.kind, unexpected);
                    // Leaf identity goes by slot position, even for kinds the policy omits
                    c.remove(&schema::generic_id_field(&leaf.kind));
                    if self.settings.strip_parent_lookup {
                        c.remove(&self.settings.leaf_parent_lookup);
                    }
                    c
                })
                .collect();
            cloned.related.insert(slot.clone(), leaf_clones);
        }

        cloned
    }

    fn clone_one(&self, record: &Record, kind: &str, unexpected: &mut Vec<(String, String)>) -> Record {
        for field in self.transformer.unexpected_fields(record, kind) {
            unexpected.push((kind.to_string(), field));
        }
        self.transformer.clone_record(record, kind)
    }
}
