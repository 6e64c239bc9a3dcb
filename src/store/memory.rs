//! In-memory organization service for testing and fixtures.
//!
//! Records are stored flat; relationship slots are resolved through the
//! child's lookup field, the same way the platform resolves one-to-many
//! relationships. Deep-insert binds every nested child's lookup field to
//! its newly created parent.

use std::collections::BTreeMap;
use std::sync::Arc;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema;
use crate::types::{EntityRef, FieldValue, Record, RecordId, RelationshipQuery};
use super::{OrganizationService, ServiceError, ServiceFault};

/// Fault code for a missing record.
pub const FAULT_RECORD_NOT_FOUND: i32 = -2147220969;
/// Fault code for an unknown relationship or kind mismatch.
pub const FAULT_INVALID_RELATIONSHIP: i32 = -2147217149;
/// Fault code for a duplicate identity on create.
pub const FAULT_DUPLICATE_RECORD: i32 = -2147220937;
/// Fault code for an unregistered action or workflow.
pub const FAULT_UNKNOWN_OPERATION: i32 = -2147220891;

/// Service operation, for journaling and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ServiceOp {
    /// `retrieve_with_related`.
    Retrieve,
    /// `create`.
    Create,
    /// `execute_action`.
    ExecuteAction,
    /// `execute_workflow`.
    ExecuteWorkflow,
}

/// A successful call recorded in the journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServiceCall {
    /// Record retrieved with the named slots.
    Retrieve {
        /// Retrieved record.
        target: EntityRef,
        /// Relationship names populated.
        relationships: Vec<String>,
    },
    /// Deep-insert.
    Create {
        /// New root.
        root: EntityRef,
        /// Records created, root included.
        records: usize,
    },
    /// Named action.
    Action {
        /// Action name.
        action: String,
        /// Target record.
        target: EntityRef,
    },
    /// Workflow.
    Workflow {
        /// Workflow identifier.
        workflow_id: Uuid,
        /// Target record identity.
        target: RecordId,
    },
}

/// How a relationship slot maps onto stored records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipBinding {
    /// Kind owning the slot.
    pub parent_kind: String,
    /// Kind of the records in the slot.
    pub child_kind: String,
    /// Lookup field on the child pointing at the parent.
    pub lookup_field: String,
}

impl RelationshipBinding {
    /// Create a new binding.
    pub fn new(
        parent_kind: impl Into<String>,
        child_kind: impl Into<String>,
        lookup_field: impl Into<String>,
    ) -> Self {
        Self {
            parent_kind: parent_kind.into(),
            child_kind: child_kind.into(),
            lookup_field: lookup_field.into(),
        }
    }
}

/// Flat record table handed to action and workflow handlers.
#[derive(Debug, Clone, Default)]
pub struct RecordTable {
    records: BTreeMap<EntityRef, Record>,
}

impl RecordTable {
    /// Get a record.
    pub fn get(&self, target: &EntityRef) -> Option<&Record> {
        self.records.get(target)
    }

    /// Get a record mutably.
    pub fn get_mut(&mut self, target: &EntityRef) -> Option<&mut Record> {
        self.records.get_mut(target)
    }

    /// Find a record by identity alone.
    pub fn find_by_id(&self, id: RecordId) -> Option<&Record> {
        self.records.values().find(|r| r.id == Some(id))
    }

    /// Records of `kind` whose `lookup_field` points at `parent`, ordered by identity.
    pub fn children_of(&self, kind: &str, lookup_field: &str, parent: &EntityRef) -> Vec<&Record> {
        self.records
            .values()
            .filter(|r| r.kind == kind)
            .filter(|r| r.get(lookup_field).and_then(FieldValue::as_lookup) == Some(parent))
            .collect()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn insert(&mut self, record: Record) {
        if let Some(r) = record.to_ref() {
            self.records.insert(r, record);
        }
    }
}

/// Server-side routine run by `execute_action` / `execute_workflow`.
pub type OperationHandler =
    Arc<dyn Fn(&mut RecordTable, &EntityRef) -> Result<(), ServiceFault> + Send + Sync>;

#[derive(Default)]
struct ServiceState {
    table: RecordTable,
    journal: Vec<ServiceCall>,
    attempts: BTreeMap<ServiceOp, usize>,
    faults: BTreeMap<ServiceOp, (Option<usize>, ServiceError)>,
}

/// In-memory organization service.
///
/// Actions and workflows that have no registered handler are still
/// accepted and journaled.
#[derive(Default)]
pub struct InMemoryOrganizationService {
    bindings: BTreeMap<String, RelationshipBinding>,
    actions: BTreeMap<String, OperationHandler>,
    workflows: BTreeMap<Uuid, OperationHandler>,
    strict_operations: bool,
    journal_disabled: bool,
    state: RwLock<ServiceState>,
}

impl std::fmt::Debug for InMemoryOrganizationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("InMemoryOrganizationService")
            .field("bindings", &self.bindings)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("workflows", &self.workflows.keys().collect::<Vec<_>>())
            .field("records", &state.table.len())
            .field("journal", &state.journal.len())
            .finish()
    }
}

impl InMemoryOrganizationService {
    /// Create a new empty service with no relationships.
    pub fn new() -> Self {
        Self::default()
    }

    /// Service with the rental project relationships registered.
    pub fn rental() -> Self {
        let mut service = Self::new().with_relationship(
            schema::PROJECT_COST_SHEETS,
            RelationshipBinding::new(
                schema::PROJECT_KIND,
                schema::COST_SHEET_KIND,
                "bolt_relatedrentalprojectid",
            ),
        );
        for (kind, name) in schema::LEAF_RELATIONSHIPS {
            service = service.with_relationship(
                *name,
                RelationshipBinding::new(
                    schema::COST_SHEET_KIND,
                    *kind,
                    schema::LEAF_PARENT_LOOKUP_FIELD,
                ),
            );
        }
        service
    }

    /// Register a relationship.
    pub fn with_relationship(mut self, name: impl Into<String>, binding: RelationshipBinding) -> Self {
        self.bindings.insert(name.into(), binding);
        self
    }

    /// Register an action handler.
    pub fn with_action<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut RecordTable, &EntityRef) -> Result<(), ServiceFault> + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Arc::new(handler));
        self
    }

    /// Register a workflow handler.
    pub fn with_workflow<F>(mut self, workflow_id: Uuid, handler: F) -> Self
    where
        F: Fn(&mut RecordTable, &EntityRef) -> Result<(), ServiceFault> + Send + Sync + 'static,
    {
        self.workflows.insert(workflow_id, Arc::new(handler));
        self
    }

    /// Reject actions and workflows without a registered handler.
    pub fn strict_operations(mut self) -> Self {
        self.strict_operations = true;
        self
    }

    /// Stop journaling calls. Counters that read the journal stay at zero.
    pub fn without_journal(mut self) -> Self {
        self.journal_disabled = true;
        self
    }

    /// Look up a relationship binding.
    pub fn binding(&self, name: &str) -> Option<&RelationshipBinding> {
        self.bindings.get(name)
    }

    /// Seed a persisted record tree directly, bypassing the journal.
    ///
    /// Nested children are bound to their parent like a deep-insert, but
    /// keep the identities they carry (fresh ones are assigned when absent).
    pub fn seed(&self, record: Record) -> Result<EntityRef, ServiceError> {
        let mut staged = Vec::new();
        let root = self.stage(record, None, &mut staged)?;
        let mut state = self.state.write();
        for r in staged {
            state.table.insert(r);
        }
        Ok(root)
    }

    /// Fail every call of `op` with `error`.
    pub fn fail_on(&self, op: ServiceOp, error: ServiceError) {
        self.state.write().faults.insert(op, (None, error));
    }

    /// Fail only the `nth` (1-based) call of `op` with `error`.
    pub fn fail_on_nth(&self, op: ServiceOp, nth: usize, error: ServiceError) {
        self.state.write().faults.insert(op, (Some(nth), error));
    }

    /// Remove any injected failure for `op`.
    pub fn clear_failure(&self, op: ServiceOp) {
        self.state.write().faults.remove(&op);
    }

    /// Snapshot of the call journal.
    pub fn journal(&self) -> Vec<ServiceCall> {
        self.state.read().journal.clone()
    }

    /// Number of journaled calls of `op`.
    pub fn call_count(&self, op: ServiceOp) -> usize {
        self.state
            .read()
            .journal
            .iter()
            .filter(|c| c.op() == op)
            .count()
    }

    /// Total records created through `create` (nested records included).
    pub fn created_records(&self) -> usize {
        self.state
            .read()
            .journal
            .iter()
            .map(|c| match c {
                ServiceCall::Create { records, .. } => *records,
                _ => 0,
            })
            .sum()
    }

    /// Stored copy of a record (fields only, no slots).
    pub fn record(&self, target: &EntityRef) -> Option<Record> {
        self.state.read().table.get(target).cloned()
    }

    /// Total stored records.
    pub fn num_records(&self) -> usize {
        self.state.read().table.len()
    }

    fn record_call(&self, state: &mut ServiceState, call: ServiceCall) {
        if !self.journal_disabled {
            state.journal.push(call);
        }
    }

    fn check_fault(&self, op: ServiceOp) -> Result<(), ServiceError> {
        let mut state = self.state.write();
        let attempt = {
            let n = state.attempts.entry(op).or_insert(0);
            *n += 1;
            *n
        };
        match state.faults.get(&op) {
            Some((None, error)) => Err(error.clone()),
            Some((Some(nth), error)) if *nth == attempt => Err(error.clone()),
            _ => Ok(()),
        }
    }

    fn stage(
        &self,
        mut record: Record,
        parent: Option<(&EntityRef, &RelationshipBinding)>,
        staged: &mut Vec<Record>,
    ) -> Result<EntityRef, ServiceError> {
        let id = match record.id {
            Some(id) if !id.is_nil() => id,
            _ => RecordId::generate(),
        };
        let this = EntityRef::new(record.kind.clone(), id);
        record.id = Some(id);
        record.set(schema::generic_id_field(&record.kind), FieldValue::Guid(id.as_uuid()));

        if let Some((parent_ref, binding)) = parent {
            if binding.child_kind != record.kind {
                return Err(ServiceFault::new(
                    FAULT_INVALID_RELATIONSHIP,
                    format!(
                        "Record of kind {} cannot be placed in a slot of kind {}",
                        record.kind, binding.child_kind
                    ),
                )
                .into());
            }
            record.set(binding.lookup_field.clone(), FieldValue::Lookup(parent_ref.clone()));
        }

        let related = std::mem::take(&mut record.related);
        staged.push(record);

        for (name, children) in related {
            let binding = self.bindings.get(&name).ok_or_else(|| {
                ServiceFault::new(
                    FAULT_INVALID_RELATIONSHIP,
                    format!("Relationship {} is not defined", name),
                )
            })?;
            if binding.parent_kind != this.kind {
                return Err(ServiceFault::new(
                    FAULT_INVALID_RELATIONSHIP,
                    format!("Relationship {} does not belong to {}", name, this.kind),
                )
                .into());
            }
            for child in children {
                self.stage(child, Some((&this, binding)), staged)?;
            }
        }

        Ok(this)
    }
}

impl ServiceCall {
    /// Operation this call belongs to.
    pub fn op(&self) -> ServiceOp {
        match self {
            Self::Retrieve { .. } => ServiceOp::Retrieve,
            Self::Create { .. } => ServiceOp::Create,
            Self::Action { .. } => ServiceOp::ExecuteAction,
            Self::Workflow { .. } => ServiceOp::ExecuteWorkflow,
        }
    }
}

#[async_trait]
impl OrganizationService for InMemoryOrganizationService {
    async fn retrieve_with_related(
        &self,
        target: &EntityRef,
        query: &RelationshipQuery,
    ) -> Result<Record, ServiceError> {
        self.check_fault(ServiceOp::Retrieve)?;

        let mut state = self.state.write();
        let mut record = state
            .table
            .get(target)
            .cloned()
            .ok_or_else(|| {
                ServiceFault::new(FAULT_RECORD_NOT_FOUND, format!("{} does not exist", target))
            })?;

        for relationship in &query.relationships {
            let binding = self.bindings.get(&relationship.name).ok_or_else(|| {
                ServiceFault::new(
                    FAULT_INVALID_RELATIONSHIP,
                    format!("Relationship {} is not defined", relationship.name),
                )
            })?;
            if binding.parent_kind != target.kind || binding.child_kind != relationship.child_kind {
                return Err(ServiceFault::new(
                    FAULT_INVALID_RELATIONSHIP,
                    format!(
                        "Relationship {} does not link {} to {}",
                        relationship.name, target.kind, relationship.child_kind
                    ),
                )
                .into());
            }
            let children = state
                .table
                .children_of(&binding.child_kind, &binding.lookup_field, target)
                .into_iter()
                .cloned()
                .collect();
            record.related.insert(relationship.name.clone(), children);
        }

        self.record_call(&mut state, ServiceCall::Retrieve {
            target: target.clone(),
            relationships: query.relationships.iter().map(|r| r.name.clone()).collect(),
        });
        Ok(record)
    }

    async fn create(&self, record: &Record) -> Result<RecordId, ServiceError> {
        self.check_fault(ServiceOp::Create)?;

        let mut staged = Vec::new();
        let root = self.stage(record.clone(), None, &mut staged)?;

        let mut state = self.state.write();
        if let Some(existing) = staged.iter().filter_map(Record::to_ref).find(|r| state.table.get(r).is_some()) {
            return Err(ServiceFault::new(
                FAULT_DUPLICATE_RECORD,
                format!("{} already exists", existing),
            )
            .into());
        }

        let count = staged.len();
        for r in staged {
            state.table.insert(r);
        }
        self.record_call(&mut state, ServiceCall::Create {
            root: root.clone(),
            records: count,
        });
        Ok(root.id)
    }

    async fn execute_action(&self, action: &str, target: &EntityRef) -> Result<(), ServiceError> {
        self.check_fault(ServiceOp::ExecuteAction)?;

        let mut state = self.state.write();
        if state.table.get(target).is_none() {
            return Err(ServiceFault::new(
                FAULT_RECORD_NOT_FOUND,
                format!("{} does not exist", target),
            )
            .into());
        }
        match self.actions.get(action) {
            Some(handler) => handler(&mut state.table, target)?,
            None if self.strict_operations => {
                return Err(ServiceFault::new(
                    FAULT_UNKNOWN_OPERATION,
                    format!("Action {} is not registered", action),
                )
                .into());
            }
            None => {}
        }

        self.record_call(&mut state, ServiceCall::Action {
            action: action.to_string(),
            target: target.clone(),
        });
        Ok(())
    }

    async fn execute_workflow(&self, workflow_id: Uuid, target: RecordId) -> Result<(), ServiceError> {
        self.check_fault(ServiceOp::ExecuteWorkflow)?;

        let mut state = self.state.write();
        let target_ref = state
            .table
            .find_by_id(target)
            .and_then(Record::to_ref)
            .ok_or_else(|| {
                ServiceFault::new(FAULT_RECORD_NOT_FOUND, format!("Record {} does not exist", target))
            })?;
        match self.workflows.get(&workflow_id) {
            Some(handler) => handler(&mut state.table, &target_ref)?,
            None if self.strict_operations => {
                return Err(ServiceFault::new(
                    FAULT_UNKNOWN_OPERATION,
                    format!("Workflow {} is not registered", workflow_id),
                )
                .into());
            }
            None => {}
        }

        self.record_call(&mut state, ServiceCall::Workflow { workflow_id, target });
        Ok(())
    }
}
