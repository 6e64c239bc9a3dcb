//! # project-clone-kernel
//!
//! Deep-clones a rental project together with its cost sheets and their
//! line records, then recalculates rollups on both hierarchies.
//!
//! ## Core Contract
//!
//! 1. Given a reference to a project, fetch it with its cost sheets
//! 2. Build an all-new clone tree: identities cleared, exempted fields
//!    removed, overrides applied, relationship shape preserved
//! 3. Persist the whole tree with a single deep-insert
//! 4. Recompute cost sheet rollups on the clone (once each) and on the
//!    source (recompute plus rollup workflow each)
//! 5. Return a reference to the new project
//!
//! ## Architecture
//!
//! ```text
//! GraphFetcher → GraphCloner → OrganizationService::create → ConsistencyRecalculator
//!                     ↓
//!         CloneTransformer + ExemptionPolicy
//! ```
//!
//! ## Failure Model
//!
//! - Service faults are wrapped in [`CloneError::OperationFailed`]
//! - Any other error is traced and returned unchanged
//! - No retries and no rollback: a failure after create leaves the clone
//!   persisted and partially recalculated

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod schema;
pub mod policy;
pub mod store;
pub mod canonical;
pub mod config;
pub mod error;
pub mod fetch;
pub mod transform;
pub mod cloner;
pub mod recalc;
pub mod operation;

// Re-exports
pub use types::{RecordId, EntityRef, FieldValue, Record, Relationship, RelationshipQuery};
pub use policy::{ExemptionPolicy, KindRule, KindResolution, FieldOverride, PolicyError};
pub use store::{OrganizationService, ServiceError, ServiceFault, InMemoryOrganizationService};
pub use canonical::{canonical_hash, canonical_hash_hex, record_fingerprint};
pub use config::{CloneSettings, ConfigError, Clock, SystemClock, FixedClock};
pub use error::CloneError;
pub use fetch::GraphFetcher;
pub use transform::CloneTransformer;
pub use cloner::{GraphCloner, ClonePlan};
pub use recalc::{ConsistencyRecalculator, RecalcSummary};
pub use operation::{CloneProjectOperation, CloneOutcome, CloneReport, clone_project};
