//! Organization service: the persistence and action gateway.
//!
//! The clone kernel is purely a caller of this trait. It never talks to a
//! storage backend directly.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{EntityRef, Record, RecordId, RelationshipQuery};

/// Structured failure reported by the service (permission denied,
/// validation failure, missing record, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("Service fault {code}: {message}")]
pub struct ServiceFault {
    /// Service error code.
    pub code: i32,
    /// Human readable message.
    pub message: String,
}

impl ServiceFault {
    /// Create a new fault.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error type for service calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    /// The service rejected the call with a structured fault.
    #[error(transparent)]
    Fault(#[from] ServiceFault),
    /// The service could not be reached.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    /// Anything else that went wrong on the caller's side of the channel.
    #[error("Internal service error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// The structured fault, if this error is one.
    pub fn as_fault(&self) -> Option<&ServiceFault> {
        match self {
            Self::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

/// Trait for the service channel every remote operation goes through.
///
/// Calls are issued strictly one at a time by the kernel.
#[async_trait]
pub trait OrganizationService: Send + Sync {
    /// Read one record with all fields and populate the requested slots,
    /// each with all fields. Requested slots with no children come back empty.
    async fn retrieve_with_related(
        &self,
        target: &EntityRef,
        query: &RelationshipQuery,
    ) -> Result<Record, ServiceError>;

    /// Deep-insert a record and every record in its populated slots.
    /// Returns the new root identity.
    async fn create(&self, record: &Record) -> Result<RecordId, ServiceError>;

    /// Invoke a named server-side action against a target record.
    async fn execute_action(&self, action: &str, target: &EntityRef) -> Result<(), ServiceError>;

    /// Invoke a server-side workflow by identifier against a target record.
    async fn execute_workflow(&self, workflow_id: Uuid, target: RecordId) -> Result<(), ServiceError>;
}

pub use memory::{InMemoryOrganizationService, ServiceCall, ServiceOp};
