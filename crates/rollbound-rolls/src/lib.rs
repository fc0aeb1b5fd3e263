//! The roll registry (C4) and rights selection (C5).

pub mod frozen;
pub mod keys;
pub mod registry;
pub mod rights;

pub use frozen::Bucket as FrozenBucket;
pub use registry::{require_snapshot_index, RollRegistry};
pub use rights::{baking_rights_owner, endorsement_rights_owner, owner, Purpose};
