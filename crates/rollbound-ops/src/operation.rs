//! The operation type, §4.5: one tagged sum per operation kind, each with a
//! positionally-matching result variant, following the "existential/GADT-
//! encoded operation kinds" re-architecture guidance — a plain `enum`
//! dispatch, the same shape the teacher's `ChainTransaction`/
//! `ApplicationTransaction` dispatch in `tx/src/unified/mod.rs` uses.

use parity_scale_codec::{Decode, Encode};
use rollbound_types::{BlockHash, ContractAddress, Cycle, NonceHash, PublicKeyHash, Tez};
use serde::{Deserialize, Serialize};

#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SingleEndorsement {
    pub level: u32,
    pub block: BlockHash,
    pub slots: Vec<u16>,
    pub signer: PublicKeyHash,
}

#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BakedBlockEvidence {
    pub level: u32,
    pub priority: u32,
    pub signer: PublicKeyHash,
}

#[derive(Encode, Decode, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vote {
    Yay,
    Nay,
    Pass,
}

/// The four manager-operation contents, §4.5.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ManagerContent {
    Reveal { public_key: Vec<u8> },
    Transaction { amount: Tez, destination: ContractAddress, parameters: Vec<u8> },
    Origination {
        manager: PublicKeyHash,
        delegate: Option<PublicKeyHash>,
        spendable: bool,
        delegatable: bool,
        credit: Tez,
        script: Option<Vec<u8>>,
    },
    Delegation { delegate: Option<PublicKeyHash> },
}

#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ManagerOperation {
    pub source: ContractAddress,
    pub fee: Tez,
    pub counter: u64,
    pub gas_limit: u64,
    pub storage_limit: u64,
    pub content: ManagerContent,
}

/// One internal operation emitted during the apply of a manager operation's
/// content, carrying the replay-protection nonce described in §4.5.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InternalOperation {
    pub nonce: u32,
    pub source: ContractAddress,
    pub content: ManagerContent,
}

/// One entry of a contents-list, §4.5/§4.6's "Batch semantics": a single
/// non-manager operation, or one manager operation within a linear batch.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Endorsements { block: BlockHash, level: u32, slots: Vec<u16> },
    SeedNonceRevelation { level: u32, nonce: NonceHash },
    DoubleEndorsementEvidence { op1: SingleEndorsement, op2: SingleEndorsement },
    DoubleBakingEvidence { bh1: BakedBlockEvidence, bh2: BakedBlockEvidence },
    ActivateAccount { pkh: PublicKeyHash, activation_code: Vec<u8> },
    Proposals { period: u32, proposals: Vec<rollbound_types::Digest32> },
    Ballot { period: u32, proposal: rollbound_types::Digest32, vote: Vote },
    Manager(ManagerOperation),
}

/// A canonical, inspectable credit/debit effect record, resolving the spec's
/// Open Question in favor of emitting balance updates rather than leaving
/// them implicit in context mutations (see DESIGN.md).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceUpdate {
    pub delegate: PublicKeyHash,
    pub cycle: Cycle,
    pub kind: BalanceUpdateKind,
    pub delta: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BalanceUpdateKind {
    Deposits,
    Fees,
    Rewards,
    Contract,
}

/// One manager content's outcome within a batch: `Applied` carries whatever
/// effect record the content produced plus any internal operations that were
/// themselves applied; `Failed`/`Skipped` mirror §7's batch propagation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentOutcome {
    Applied { balance_updates: Vec<BalanceUpdate>, internal_results: Vec<ContentOutcome> },
    Failed { errors: Vec<String> },
    Skipped,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationResult {
    Endorsements { balance_updates: Vec<BalanceUpdate> },
    SeedNonceRevelation { balance_updates: Vec<BalanceUpdate> },
    DoubleEndorsementEvidence { balance_updates: Vec<BalanceUpdate> },
    DoubleBakingEvidence { balance_updates: Vec<BalanceUpdate> },
    ActivateAccount { balance_updates: Vec<BalanceUpdate> },
    Proposals,
    Ballot,
    /// One outcome per manager operation in the batch, positionally matching
    /// the input contents-list (§4.5's "Batch semantics").
    ManagerBatch { outcomes: Vec<ContentOutcome> },
}
