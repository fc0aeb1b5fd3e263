//! Core error types, following the teacher's convention of one `thiserror`
//! enum per concern plus a shared `ErrorCode` trait that assigns every
//! variant a stable, machine-readable string id (see
//! `ioi_types::error::ErrorCode` for the pattern this mirrors).

use thiserror::Error;

/// A stable, machine-readable identifier for an error variant, serialized
/// alongside any associated data as `{ id: "domain.name", data: ... }`.
pub trait ErrorCode {
    fn code(&self) -> &'static str;
}

/// Checked-arithmetic failures on [`crate::Tez`] amounts.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithError {
    #[error("tez amount overflowed")]
    Overflow,
    #[error("tez amount underflowed")]
    Underflow,
}

impl ErrorCode for ArithError {
    fn code(&self) -> &'static str {
        match self {
            ArithError::Overflow => "arith.overflow",
            ArithError::Underflow => "arith.underflow",
        }
    }
}

/// Errors raised by the context abstraction (C2).
#[derive(Error, Debug)]
pub enum StateError {
    #[error("required key not found at path: {0}")]
    StorageError(String),
    #[error("{0}")]
    Arith(#[from] ArithError),
    #[error("gas limit exceeded: consumed {consumed}, limit {limit}")]
    GasExhausted { consumed: u64, limit: u64 },
    #[error("storage-space limit exceeded: consumed {consumed}, limit {limit}")]
    StorageExhausted { consumed: u64, limit: u64 },
    #[error("unknown snapshot tag")]
    UnknownSnapshot,
    #[error("decode failed: {0}")]
    Decode(String),
}

impl ErrorCode for StateError {
    fn code(&self) -> &'static str {
        match self {
            StateError::StorageError(_) => "state.storage_error",
            StateError::Arith(e) => e.code(),
            StateError::GasExhausted { .. } => "state.gas_exhausted",
            StateError::StorageExhausted { .. } => "state.storage_exhausted",
            StateError::UnknownSnapshot => "state.unknown_snapshot",
            StateError::Decode(_) => "state.decode_error",
        }
    }
}

/// The four propagation classes from the spec's error-handling design.
/// Every [`OperationError`] carries one so callers can branch on
/// "can this ever become valid" without re-deriving it from the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Can never become valid: permanently rejected.
    Permanent,
    /// Valid on a different branch; a mempool may retry on reorg.
    Branch,
    /// Valid later on the same branch (e.g. too-early evidence).
    Temporary,
    /// Previously valid, now pruned.
    Outdated,
}

/// Errors raised while prechecking or applying a single operation (C6).
#[derive(Error, Debug)]
pub enum OperationError {
    #[error("wrong endorsement predecessor")]
    WrongEndorsementPredecessor,
    #[error("invalid endorsement level")]
    InvalidEndorsementLevel,
    #[error("duplicate endorsement for slot {0}")]
    DuplicateEndorsement(u16),
    #[error("no roll snapshot for cycle {0:?}")]
    NoRollSnapshotForCycle(crate::Cycle),
    #[error("invalid activation: no such commitment")]
    InvalidActivation,
    #[error("too early double-{kind} evidence: level {level}, current {current}")]
    TooEarlyEvidence { kind: &'static str, level: u32, current: u32 },
    #[error("outdated double-{kind} evidence: level {level}, last allowed {last}")]
    OutdatedEvidence { kind: &'static str, level: u32, last: u32 },
    #[error("invalid double-{kind} evidence: identical operation used twice")]
    InvalidDoubleEvidence { kind: &'static str },
    #[error("inconsistent double-{kind} evidence: signers differ")]
    InconsistentEvidence { kind: &'static str },
    #[error("no frozen balance for the accused delegate in the accused cycle")]
    UnrequiredEvidence,
    #[error("counter mismatch: expected {expected}, got {got}")]
    CounterMismatch { expected: u64, got: u64 },
    #[error("source account {0:?} is not allocated")]
    SourceNotAllocated(crate::PublicKeyHash),
    #[error("manager key already revealed in this batch")]
    MultipleRevelation,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("internal operation replay: nonce {0}")]
    InternalOperationReplay(u32),
    #[error("not in a voting period accepting this operation")]
    WrongVotingPeriod,
    #[error("{0}")]
    State(#[from] StateError),
}

impl OperationError {
    pub fn severity(&self) -> Severity {
        use OperationError::*;
        match self {
            WrongEndorsementPredecessor
            | InvalidEndorsementLevel
            | DuplicateEndorsement(_)
            | InvalidActivation
            | InvalidDoubleEvidence { .. }
            | InconsistentEvidence { .. }
            | UnrequiredEvidence
            | CounterMismatch { .. }
            | MultipleRevelation
            | InvalidSignature
            | InsufficientBalance
            | InternalOperationReplay(_) => Severity::Permanent,
            SourceNotAllocated(_) => Severity::Branch,
            NoRollSnapshotForCycle(_) | TooEarlyEvidence { .. } | WrongVotingPeriod => Severity::Temporary,
            OutdatedEvidence { .. } => Severity::Outdated,
            State(_) => Severity::Permanent,
        }
    }
}

impl ErrorCode for OperationError {
    fn code(&self) -> &'static str {
        use OperationError::*;
        match self {
            WrongEndorsementPredecessor => "op.wrong_endorsement_predecessor",
            InvalidEndorsementLevel => "op.invalid_endorsement_level",
            DuplicateEndorsement(_) => "op.duplicate_endorsement",
            NoRollSnapshotForCycle(_) => "op.no_roll_snapshot_for_cycle",
            InvalidActivation => "op.invalid_activation",
            TooEarlyEvidence { .. } => "op.too_early_evidence",
            OutdatedEvidence { .. } => "op.outdated_evidence",
            InvalidDoubleEvidence { .. } => "op.invalid_double_evidence",
            InconsistentEvidence { .. } => "op.inconsistent_evidence",
            UnrequiredEvidence => "op.unrequired_evidence",
            CounterMismatch { .. } => "op.counter_mismatch",
            SourceNotAllocated(_) => "op.source_not_allocated",
            MultipleRevelation => "op.multiple_revelation",
            InvalidSignature => "op.invalid_signature",
            InsufficientBalance => "op.insufficient_balance",
            InternalOperationReplay(_) => "op.internal_operation_replay",
            WrongVotingPeriod => "op.wrong_voting_period",
            State(e) => e.code(),
        }
    }
}

/// Errors raised by the block lifecycle (C7). Header-level failures abort
/// the whole block; no partial state is ever persisted.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("proof-of-work stamp does not meet the required threshold")]
    InvalidProofOfWork,
    #[error("fitness did not strictly increase over the predecessor")]
    InvalidFitnessGap,
    #[error("block signature does not match the expected baker")]
    InvalidBakerSignature,
    #[error("seed-nonce commitment presence did not match what this level expects")]
    UnexpectedCommitment,
    #[error("{0}")]
    Operation(#[from] OperationError),
    #[error("{0}")]
    State(#[from] StateError),
}

impl ErrorCode for ChainError {
    fn code(&self) -> &'static str {
        match self {
            ChainError::InvalidProofOfWork => "chain.invalid_pow",
            ChainError::InvalidFitnessGap => "chain.invalid_fitness_gap",
            ChainError::InvalidBakerSignature => "chain.invalid_baker_signature",
            ChainError::UnexpectedCommitment => "chain.unexpected_commitment",
            ChainError::Operation(e) => e.code(),
            ChainError::State(e) => e.code(),
        }
    }
}
