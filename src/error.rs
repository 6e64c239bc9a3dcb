//! Error type for the clone operation.

use crate::store::{ServiceError, ServiceFault};
use crate::types::EntityRef;

/// Error type for clone operations.
///
/// Service faults surface as [`CloneError::OperationFailed`]; everything
/// else is returned unchanged.
#[derive(Debug, thiserror::Error)]
pub enum CloneError {
    /// The service rejected a call while cloning `target`.
    #[error("An error occurred while cloning {target}: {fault}")]
    OperationFailed {
        /// Root being cloned.
        target: EntityRef,
        /// Fault reported by the service.
        #[source]
        fault: ServiceFault,
    },
    /// Non-fault service error (unreachable service, channel failure).
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// A fetched snapshot is missing something the clone depends on.
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),
}

impl CloneError {
    /// Wrap a service fault raised while cloning `target`; other errors pass through.
    pub fn for_target(self, target: &EntityRef) -> Self {
        match self {
            Self::Service(ServiceError::Fault(fault)) => Self::OperationFailed {
                target: target.clone(),
                fault,
            },
            other => other,
        }
    }

    /// Whether this is a wrapped service fault.
    pub fn is_operation_failure(&self) -> bool {
        matches!(self, Self::OperationFailed { .. })
    }
}
