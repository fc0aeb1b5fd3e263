//! The block lifecycle (C7): `begin_application`, `apply_operation`, and
//! `finalize_application`, wiring the roll registry (C4), rights selection
//! (C5), and the operation pipeline (C6) into one per-block transition.

pub mod header;
pub mod lifecycle;

pub use header::BlockHeader;
pub use lifecycle::{
    apply_manager_batch, apply_operation, begin_application, finalize_application,
    last_block_priority, FinalizationOutcome,
};
