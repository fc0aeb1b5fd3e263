//! Top-level operation dispatch, §4.5/§4.6: routes one contents-list entry
//! to its precheck/apply function. Grouping a block's manager operations
//! into contiguous batches is a block-lifecycle concern (C7); this module
//! dispatches whatever unit of work it is handed.

use crate::manager::ManagerBatchEntry;
use crate::operation::{BakedBlockEvidence, Operation, OperationResult, SingleEndorsement};
use crate::{activation, evidence, manager, seed_nonce, voting};
use rollbound_context::Context;
use rollbound_crypto::SignatureVerifier;
use rollbound_types::{Cycle, Digest32, OperationError, ProtocolConstants, PublicKeyHash};

/// Everything a single operation's precheck/apply needs to know about the
/// block it is being applied in, gathered in one place so call sites don't
/// thread a dozen positional parameters through `dispatch`.
pub struct BlockView<'a> {
    pub constants: &'a ProtocolConstants,
    pub seed: Digest32,
    pub predecessor_hash: rollbound_types::BlockHash,
    pub current_level: u32,
    pub baker: PublicKeyHash,
    pub block_priority: u32,
    pub fitness_gap: u32,
}

impl<'a> BlockView<'a> {
    fn current_cycle(&self) -> Cycle {
        rollbound_types::Level::from_raw(self.current_level, self.constants).cycle
    }
}

/// A decoded operation together with the wrapper-signature material every
/// variant but `Manager` checks directly (manager operations carry their own
/// per-entry signature via [`ManagerBatchEntry`]).
pub struct Envelope {
    pub operation: Operation,
    pub signer: PublicKeyHash,
    pub watermark: u8,
    pub message: Vec<u8>,
    pub signature: Vec<u8>,
}

pub fn dispatch(
    ctx: &mut Context,
    verifier: &dyn SignatureVerifier,
    view: &BlockView<'_>,
    accuser: &PublicKeyHash,
    envelope: &Envelope,
) -> Result<OperationResult, OperationError> {
    match &envelope.operation {
        Operation::Endorsements { block, level, slots } => crate::endorsement::apply_endorsements(
            ctx,
            verifier,
            view.constants,
            view.seed,
            view.predecessor_hash,
            view.current_level,
            *block,
            *level,
            slots,
            &envelope.signer,
            envelope.watermark,
            &envelope.message,
            &envelope.signature,
            view.block_priority,
            view.fitness_gap,
        ),
        Operation::SeedNonceRevelation { level, nonce } => {
            seed_nonce::apply_seed_nonce_revelation(ctx, view.constants, *level, nonce.as_ref())
        }
        Operation::DoubleEndorsementEvidence { op1, op2 } => {
            evidence_for_endorsement(ctx, view, accuser, op1, op2)
        }
        Operation::DoubleBakingEvidence { bh1, bh2 } => evidence_for_baking(ctx, view, accuser, bh1, bh2),
        Operation::ActivateAccount { pkh, activation_code } => activation::apply_activate_account(ctx, view.constants, pkh, activation_code),
        Operation::Proposals { period, proposals } => voting::apply_proposals(ctx, &envelope.signer, *period, proposals),
        Operation::Ballot { period, proposal, vote } => voting::apply_ballot(ctx, &envelope.signer, *period, proposal, *vote),
        Operation::Manager(op) => {
            let entry = ManagerBatchEntry {
                operation: op.clone(),
                watermark: envelope.watermark,
                message: envelope.message.clone(),
                signature: envelope.signature.clone(),
            };
            manager::apply_manager_batch(ctx, view.constants, verifier, &view.baker, view.current_cycle(), &[entry])
        }
    }
}

fn evidence_for_endorsement(
    ctx: &mut Context,
    view: &BlockView<'_>,
    accuser: &PublicKeyHash,
    op1: &SingleEndorsement,
    op2: &SingleEndorsement,
) -> Result<OperationResult, OperationError> {
    evidence::apply_double_endorsement_evidence(ctx, view.constants, view.seed, view.current_level, accuser, op1, op2)
}

fn evidence_for_baking(
    ctx: &mut Context,
    view: &BlockView<'_>,
    accuser: &PublicKeyHash,
    bh1: &BakedBlockEvidence,
    bh2: &BakedBlockEvidence,
) -> Result<OperationResult, OperationError> {
    evidence::apply_double_baking_evidence(ctx, view.constants, view.seed, view.current_level, accuser, bh1, bh2)
}

/// Applies a contiguous run of manager operations as a single batch (§4.5
/// "Batch semantics"). Callers (C7) are responsible for grouping a block's
/// manager operations this way before calling in.
pub fn dispatch_manager_batch(
    ctx: &mut Context,
    verifier: &dyn SignatureVerifier,
    view: &BlockView<'_>,
    entries: &[ManagerBatchEntry],
) -> Result<OperationResult, OperationError> {
    manager::apply_manager_batch(ctx, view.constants, verifier, &view.baker, view.current_cycle(), entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollbound_context::MapStore;
    use rollbound_crypto::FixedVerifier;
    use rollbound_rolls::RollRegistry;
    use rollbound_types::BlockHash;

    #[test]
    fn endorsement_envelope_dispatches_to_endorsement_apply() {
        let mut ctx = Context::new(MapStore::new());
        let constants = ProtocolConstants { blocks_per_cycle: 8, ..ProtocolConstants::default() };
        let d = PublicKeyHash([4u8; 20]);
        {
            let mut registry = RollRegistry::new(&mut ctx, constants.tokens_per_roll, constants.preserved_cycles);
            registry.add_amount(&d, constants.tokens_per_roll).unwrap();
            registry.snapshot_rolls_for_cycle(Cycle(0)).unwrap();
        }
        let mut verifier = FixedVerifier::new();
        verifier.accept(d, 2, b"msg".to_vec(), b"sig".to_vec());
        let pred = BlockHash::from([9u8; 32]);
        let view = BlockView {
            constants: &constants,
            seed: Digest32([1u8; 32]),
            predecessor_hash: pred,
            current_level: 1,
            baker: d,
            block_priority: 0,
            fitness_gap: 0,
        };
        let envelope = Envelope {
            operation: Operation::Endorsements { block: pred, level: 0, slots: vec![0] },
            signer: d,
            watermark: 2,
            message: b"msg".to_vec(),
            signature: b"sig".to_vec(),
        };
        let result = dispatch(&mut ctx, &verifier, &view, &d, &envelope).unwrap();
        assert!(matches!(result, OperationResult::Endorsements { .. }));
    }
}
