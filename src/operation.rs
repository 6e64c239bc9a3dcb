//! Clone operation: fetch → clone → persist → recalculate.
//!
//! One invocation is one linear sequence of remote calls. Nothing runs
//! concurrently and nothing is rolled back: a failure after `create`
//! leaves the persisted clone in place, partially recalculated.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::cloner::GraphCloner;
use crate::config::{Clock, CloneSettings, SystemClock};
use crate::error::CloneError;
use crate::fetch::GraphFetcher;
use crate::policy::ExemptionPolicy;
use crate::recalc::{ConsistencyRecalculator, RecalcSummary};
use crate::store::OrganizationService;
use crate::transform::CloneTransformer;
use crate::types::EntityRef;

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneReport {
    /// Children of the source root at fetch time.
    pub source_children: usize,
    /// Records in the deep-insert payload.
    pub records_created: usize,
    /// Recalculation calls issued.
    pub recalc: RecalcSummary,
    /// `(kind, field)` pairs copied despite not being in the kind's schema.
    pub unexpected_fields: Vec<(String, String)>,
    /// Fingerprint of the exemption policy used.
    pub policy_fingerprint: String,
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneOutcome {
    /// The newly created root.
    pub cloned: EntityRef,
    /// Run details.
    pub report: CloneReport,
}

/// Clones a root record and its hierarchy through an organization service.
pub struct CloneProjectOperation<S: OrganizationService + ?Sized> {
    service: Arc<S>,
    policy: ExemptionPolicy,
    settings: CloneSettings,
    clock: Arc<dyn Clock>,
}

impl<S: OrganizationService + ?Sized> CloneProjectOperation<S> {
    /// Operation with the built-in rental policy, default settings and the system clock.
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            policy: ExemptionPolicy::rental_project(),
            settings: CloneSettings::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the exemption policy.
    pub fn with_policy(mut self, policy: ExemptionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the settings.
    pub fn with_settings(mut self, settings: CloneSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The exemption policy.
    pub fn policy(&self) -> &ExemptionPolicy {
        &self.policy
    }

    /// The settings.
    pub fn settings(&self) -> &CloneSettings {
        &self.settings
    }

    /// Get a reference to the service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Clone the record `target` points at.
    ///
    /// Returns `Ok(None)` without any remote call when `target` is not of
    /// the root kind. Service faults come back as
    /// [`CloneError::OperationFailed`]; any other error is traced and
    /// returned unchanged.
    pub async fn execute(&self, target: &EntityRef) -> Result<Option<CloneOutcome>, CloneError> {
        if !target.is_kind(&self.settings.root_kind) {
            debug!(target_ref = %target, root_kind = %self.settings.root_kind, "Target is not a root record; nothing to do");
            return Ok(None);
        }

        let span = info_span!("clone_project", target_ref = %target);
        match self.run(target).instrument(span).await {
            Ok(outcome) => Ok(Some(outcome)),
            Err(e) => {
                let e = e.for_target(target);
                if !e.is_operation_failure() {
                    error!(target_ref = %target, error = %e, detail = ?e, "Clone failed unexpectedly");
                }
                Err(e)
            }
        }
    }

    async fn run(&self, target: &EntityRef) -> Result<CloneOutcome, CloneError> {
        let service: &S = &self.service;
        let today = self.clock.today();
        info!(
            today = %today,
            policy = %self.policy.fingerprint(),
            "Starting clone"
        );

        let snapshot = GraphFetcher::new(service, &self.settings)
            .fetch_root_with_children(target)
            .await?;
        let source_children = snapshot.children(&self.settings.child_relationship.name).len();
        info!(children = source_children, "Fetched source root");

        let cloner = GraphCloner::new(
            GraphFetcher::new(service, &self.settings),
            CloneTransformer::new(&self.policy, today),
            &self.settings,
        );
        let plan = cloner.clone_graph(&snapshot).await?;
        if !plan.payload.all_unsaved() {
            return Err(CloneError::MalformedSnapshot(
                "clone payload carries a source identity".to_string(),
            ));
        }

        info!(records = plan.record_count(), "Creating clone");
        let new_id = service.create(&plan.payload).await?;
        let cloned = EntityRef::new(target.kind.clone(), new_id);
        info!(cloned = %cloned, "Clone created");

        let recalc = if source_children > 0 {
            ConsistencyRecalculator::new(service, &self.settings)
                .recalculate(target, &cloned)
                .await
                .map_err(|e| {
                    warn!(cloned = %cloned, "Clone persisted but rollup recalculation did not finish");
                    e
                })?
        } else {
            RecalcSummary::default()
        };

        info!(cloned = %cloned, "Clone finished");
        Ok(CloneOutcome {
            cloned,
            report: CloneReport {
                source_children,
                records_created: plan.record_count(),
                recalc,
                unexpected_fields: plan.unexpected_fields,
                policy_fingerprint: self.policy.fingerprint(),
            },
        })
    }
}

/// Clone `target` with the built-in policy and default settings.
///
/// Returns the new root reference, or `None` when `target` is not a root record.
pub async fn clone_project<S>(service: Arc<S>, target: &EntityRef) -> Result<Option<EntityRef>, CloneError>
where
    S: OrganizationService + ?Sized,
{
    let outcome = CloneProjectOperation::new(service).execute(target).await?;
    Ok(outcome.map(|o| o.cloned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::config::FixedClock;
    use crate::schema;
    use crate::store::{InMemoryOrganizationService, ServiceOp};
    use crate::types::{Record, RecordId};
    use uuid::Uuid;

    fn id(n: u128) -> RecordId {
        RecordId::new(Uuid::from_u128(n))
    }

    #[tokio::test]
    async fn test_non_root_target_is_noop() {
        let service = Arc::new(InMemoryOrganizationService::rental());
        let target = EntityRef::new(schema::COST_SHEET_KIND, id(1));

        let out = CloneProjectOperation::new(Arc::clone(&service)).execute(&target).await.unwrap();
        assert!(out.is_none());
        assert!(service.journal().is_empty());
    }

    #[tokio::test]
    async fn test_root_only_clone() {
        let service = Arc::new(InMemoryOrganizationService::rental());
        let target = service
            .seed(Record::with_id(schema::PROJECT_KIND, id(1)).field("bolt_rentalname", "Solo"))
            .unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();

        let outcome = CloneProjectOperation::new(Arc::clone(&service))
            .with_clock(FixedClock(today))
            .execute(&target)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.cloned.kind, target.kind);
        assert_ne!(outcome.cloned.id, target.id);
        assert_eq!(outcome.report.records_created, 1);
        assert_eq!(outcome.report.recalc, RecalcSummary::default());
        assert_eq!(service.created_records(), 1);
        assert_eq!(service.call_count(ServiceOp::ExecuteAction), 0);
        assert_eq!(service.call_count(ServiceOp::ExecuteWorkflow), 0);

        let stored = service.record(&outcome.cloned).unwrap();
        assert_eq!(stored.get_text("bolt_rentalname"), Some("Solo - COPY"));
    }

    #[tokio::test]
    async fn test_clone_project_helper() {
        let service = Arc::new(InMemoryOrganizationService::rental());
        let target = service.seed(Record::with_id(schema::PROJECT_KIND, id(1))).unwrap();

        let cloned = clone_project(Arc::clone(&service), &target).await.unwrap().unwrap();
        assert!(service.record(&cloned).is_some());
    }
}
