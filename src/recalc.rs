//! Consistency recalculator: re-runs rollups after the clone is persisted.
//!
//! Clone-side children get the recompute action once. Source-side children
//! get the recompute action and then the rollup-to-parent workflow. Both
//! sides are re-fetched: the clone side because `create` only returns the
//! root identity, the source side so the targets reflect current state.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CloneSettings;
use crate::error::CloneError;
use crate::fetch::GraphFetcher;
use crate::store::OrganizationService;
use crate::types::{EntityRef, Record};

/// Calls issued by a recalculation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecalcSummary {
    /// Recompute actions on clone-side children.
    pub clone_actions: usize,
    /// Recompute actions on source-side children.
    pub source_actions: usize,
    /// Rollup workflows on source-side children.
    pub source_workflows: usize,
}

impl RecalcSummary {
    /// Total remote calls issued (fetches excluded).
    pub fn total_calls(&self) -> usize {
        self.clone_actions + self.source_actions + self.source_workflows
    }
}

/// Runs the recompute action and rollup workflow on both hierarchies.
pub struct ConsistencyRecalculator<'a, S: OrganizationService + ?Sized> {
    service: &'a S,
    settings: &'a CloneSettings,
}

impl<'a, S: OrganizationService + ?Sized> ConsistencyRecalculator<'a, S> {
    /// Create a recalculator.
    pub fn new(service: &'a S, settings: &'a CloneSettings) -> Self {
        Self { service, settings }
    }

    /// Recalculate the clone hierarchy, then the source hierarchy.
    pub async fn recalculate(
        &self,
        source_root: &EntityRef,
        clone_root: &EntityRef,
    ) -> Result<RecalcSummary, CloneError> {
        let clone_actions = self.recalculate_clone(clone_root).await?;
        let (source_actions, source_workflows) = self.recalculate_source(source_root).await?;
        let summary = RecalcSummary {
            clone_actions,
            source_actions,
            source_workflows,
        };

        info!(
            clone_actions = summary.clone_actions,
            source_actions = summary.source_actions,
            source_workflows = summary.source_workflows,
            "Rollups recalculated"
        );
        Ok(summary)
    }

    /// Recompute action once per child of the new root.
    pub async fn recalculate_clone(&self, clone_root: &EntityRef) -> Result<usize, CloneError> {
        let root = GraphFetcher::new(self.service, self.settings)
            .fetch_root_with_children(clone_root)
            .await?;

        let mut issued = 0;
        for child in self.child_refs(&root)? {
            self.service
                .execute_action(&self.settings.recompute_action, &child)
                .await?;
            debug!(target_ref = %child, action = %self.settings.recompute_action, "Recomputed clone child");
            issued += 1;
        }
        Ok(issued)
    }

    /// Recompute action plus rollup workflow per child of the source root.
    pub async fn recalculate_source(&self, source_root: &EntityRef) -> Result<(usize, usize), CloneError> {
        let root = GraphFetcher::new(self.service, self.settings)
            .fetch_root_with_children(source_root)
            .await?;

        let (mut actions, mut workflows) = (0, 0);
        for child in self.child_refs(&root)? {
            self.service
                .execute_action(&self.settings.recompute_action, &child)
                .await?;
            actions += 1;

            self.service
                .execute_workflow(self.settings.rollup_workflow_id, child.id)
                .await?;
            workflows += 1;

            debug!(target_ref = %child, "Recomputed and rolled up source child");
        }
        Ok((actions, workflows))
    }

    fn child_refs(&self, root: &Record) -> Result<Vec<EntityRef>, CloneError> {
        root.children(&self.settings.child_relationship.name)
            .iter()
            .map(|child| {
                child.to_ref().ok_or_else(|| {
                    CloneError::MalformedSnapshot(format!("{} child has no identity", root.kind))
                })
            })
            .collect()
    }
}
