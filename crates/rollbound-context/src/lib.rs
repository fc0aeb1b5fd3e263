//! The context abstraction (C2): a persistent, transactional key-value map
//! with fork/commit/discard backtracking, copy-snapshots, and scoped
//! gas/storage/origination-nonce counters.

pub mod accessor;
pub mod context;
pub mod nonce;
pub mod resource;
pub mod snapshot;

pub use accessor::{MapStore, StateAccess};
pub use context::{Context, ForkId};
pub use nonce::OriginationNonce;
pub use resource::ResourceMeter;
pub use snapshot::SnapshotStore;
