//! Field exemption policy definitions.

pub mod overrides;
pub mod table;

pub use overrides::FieldOverride;
pub use table::{ExemptionPolicy, KindRule, KindResolution, PolicyError};
