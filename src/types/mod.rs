//! Core types for the clone kernel.

pub mod reference;
pub mod value;
pub mod record;
pub mod relationship;

pub use reference::{RecordId, EntityRef};
pub use value::FieldValue;
pub use record::Record;
pub use relationship::{Relationship, RelationshipQuery};
