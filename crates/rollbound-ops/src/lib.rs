//! The operation pipeline (C6): precheck/apply for every operation kind,
//! internal-operation recursion, and the voting subsystem.

pub mod accounts;
pub mod activation;
pub mod endorsement;
pub mod evidence;
pub mod fitness;
pub mod manager;
pub mod operation;
pub mod pipeline;
pub mod seed_nonce;
pub mod voting;

pub use manager::{ManagerBatchEntry};
pub use operation::{
    BakedBlockEvidence, BalanceUpdate, BalanceUpdateKind, ContentOutcome, InternalOperation,
    ManagerContent, ManagerOperation, Operation, OperationResult, SingleEndorsement, Vote,
};
pub use pipeline::{dispatch, dispatch_manager_batch, BlockView, Envelope};
