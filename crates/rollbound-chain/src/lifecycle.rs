//! Block lifecycle (C7), §4.6: `begin_application` validates a header before
//! any of its operations are applied, `apply_operation` threads each
//! contents-list entry through the C6 pipeline with a fresh origination
//! nonce, and `finalize_application` settles deposits/rewards and drives the
//! cycle-boundary bookkeeping (roll snapshots, deactivation, voting).

use crate::header::BlockHeader;
use parity_scale_codec::Encode;
use rollbound_context::{Context, StateAccess};
use rollbound_crypto::SignatureVerifier;
use rollbound_ops::pipeline::{BlockView, Envelope};
use rollbound_ops::{seed_nonce, voting, ManagerBatchEntry, OperationResult};
use rollbound_rolls::{baking_rights_owner, FrozenBucket, RollRegistry};
use rollbound_types::{ChainError, Cycle, Digest32, Level, OperationHash, ProtocolConstants, PublicKeyHash, Tez};

/// The watermark tag a block header's signature is checked under, distinct
/// from the endorsement/manager-operation watermarks used elsewhere (§6
/// "watermark-tagged signature coverage").
const BLOCK_WATERMARK: u8 = 1;

const LAST_PRIORITY_KEY: &[u8] = b"chain/last_block_priority";

/// Everything about the header that its signature covers — all of it except
/// the signature itself.
fn signing_bytes(header: &BlockHeader) -> Vec<u8> {
    (
        header.predecessor,
        header.level,
        header.priority,
        header.declared_fitness,
        header.seed_nonce_hash,
        header.proof_of_work_nonce,
    )
        .encode()
}

/// Whether `header`'s proof-of-work stamp meets the threshold. The
/// distilled spec derives the threshold "from baker priority"; no scaling
/// function is given, so (DESIGN.md) every priority is held to the same
/// `constants.proof_of_work_threshold`.
fn check_proof_of_work(header: &BlockHeader, constants: &ProtocolConstants) -> Result<(), ChainError> {
    let digest = rollbound_crypto::hash(&signing_bytes(header)).map_err(|e| {
        ChainError::State(rollbound_types::StateError::Decode(e.to_string()))
    })?;
    let stamp = u64::from_be_bytes(digest.0[0..8].try_into().unwrap());
    if stamp > constants.proof_of_work_threshold {
        return Err(ChainError::InvalidProofOfWork);
    }
    Ok(())
}

/// `begin_application(ctx, header, pred_ts)`, §4.6: validates the header
/// against the context and returns the baker it resolves to. `pred_ts` (the
/// predecessor's timestamp) has no bearing on any check this core performs —
/// there is no minimum block-time enforcement in scope — so it is not
/// threaded through; callers that need it for display can read it off their
/// own predecessor record.
pub fn begin_application(
    ctx: &mut Context,
    constants: &ProtocolConstants,
    verifier: &dyn SignatureVerifier,
    seed: Digest32,
    predecessor_fitness: u32,
    header: &BlockHeader,
) -> Result<PublicKeyHash, ChainError> {
    check_proof_of_work(header, constants)?;
    if header.declared_fitness <= predecessor_fitness {
        return Err(ChainError::InvalidFitnessGap);
    }

    let level = Level::from_raw(header.level, constants);
    let baker = baking_rights_owner(ctx, seed, &level, header.priority, constants.tokens_per_roll, constants.preserved_cycles)?;

    if !verifier.verify(&baker, BLOCK_WATERMARK, &signing_bytes(header), &header.signature) {
        return Err(ChainError::InvalidBakerSignature);
    }
    if header.seed_nonce_hash.is_some() != level.expected_commitment {
        return Err(ChainError::UnexpectedCommitment);
    }

    rollbound_ops::fitness::add(ctx, 1)?;
    Ok(baker)
}

/// `apply_operation(ctx, mode, pred_block, hash, op)`, §4.6: seeds the
/// origination nonce from this operation's own hash, dispatches it through
/// the C6 pipeline, then resets gas/storage and clears the nonce — all
/// per-operation scoping, independent of any other entry in the block.
pub fn apply_operation(
    ctx: &mut Context,
    verifier: &dyn SignatureVerifier,
    view: &BlockView<'_>,
    accuser: &PublicKeyHash,
    operation_hash: OperationHash,
    envelope: &Envelope,
) -> Result<OperationResult, ChainError> {
    ctx.set_origination_nonce(operation_hash);
    let result = rollbound_ops::dispatch(ctx, verifier, view, accuser, envelope);
    ctx.gas.set_unlimited();
    ctx.storage_space.set_unlimited();
    ctx.unset_origination_nonce();
    Ok(result?)
}

/// As [`apply_operation`], but for one linear batch of manager operations —
/// a block's manager operations are grouped into contiguous batches before
/// reaching this layer (§4.5 "Batch semantics" is a C6 concern; grouping
/// contiguous entries into one batch is the block lifecycle's job).
pub fn apply_manager_batch(
    ctx: &mut Context,
    verifier: &dyn SignatureVerifier,
    view: &BlockView<'_>,
    batch_hash: OperationHash,
    entries: &[ManagerBatchEntry],
) -> Result<OperationResult, ChainError> {
    ctx.set_origination_nonce(batch_hash);
    let result = rollbound_ops::dispatch_manager_batch(ctx, verifier, view, entries);
    ctx.gas.set_unlimited();
    ctx.storage_space.set_unlimited();
    ctx.unset_origination_nonce();
    Ok(result?)
}

fn store_last_block_priority(ctx: &mut Context, priority: u32) -> Result<(), ChainError> {
    Ok(ctx.insert(LAST_PRIORITY_KEY, &priority.to_be_bytes())?)
}

pub fn last_block_priority(ctx: &dyn StateAccess) -> Result<Option<u32>, rollbound_types::StateError> {
    match ctx.get(LAST_PRIORITY_KEY)? {
        Some(bytes) => Ok(Some(u32::from_be_bytes(bytes.try_into().map_err(|_| {
            rollbound_types::StateError::Decode("expected 4-byte priority".into())
        })?))),
        None => Ok(None),
    }
}

/// What [`finalize_application`] did, for callers (e.g. the node binary's
/// logging) that want to report cycle-boundary events without re-deriving
/// them from the header.
#[derive(Debug, Clone, Default)]
pub struct FinalizationOutcome {
    pub fitness: u32,
    pub cycle_ended: bool,
    pub roll_snapshot_taken: bool,
    pub forfeited_nonce_commitments: usize,
    pub deactivated: Vec<PublicKeyHash>,
}

/// `finalize_application(ctx, header, baker)`, §4.6. `seed` is this block's
/// C3 seed, reused (alongside `"roll_snapshot"`) to draw the surviving
/// index when a cycle ends and `freeze_rolls_for_cycle` runs.
pub fn finalize_application(
    ctx: &mut Context,
    constants: &ProtocolConstants,
    header: &BlockHeader,
    baker: &PublicKeyHash,
    seed: Digest32,
) -> Result<FinalizationOutcome, ChainError> {
    let level = Level::from_raw(header.level, constants);

    // Step 1. Endorsement deposits/fees/rewards are credited directly into
    // the frozen buckets at apply time (§4.5), so by the time finalization
    // runs they are already frozen; steps 2-3 have nothing left to do beyond
    // this block-level deposit and reward.
    rollbound_rolls::frozen::credit(ctx, FrozenBucket::Deposits, baker, level.cycle, constants.block_security_deposit)?;
    rollbound_rolls::frozen::credit(ctx, FrozenBucket::Rewards, baker, level.cycle, constants.block_reward)?;

    // Step 4.
    if let Some(seed_hash) = header.seed_nonce_hash {
        seed_nonce::record_commitment(
            ctx,
            header.level,
            &seed_nonce::NonceCommitment {
                hash: seed_hash,
                delegate: *baker,
                fees: Tez::ZERO,
                rewards: constants.seed_nonce_revelation_tip,
            },
        )?;
    }

    // Step 5.
    store_last_block_priority(ctx, header.priority)?;

    let fitness = rollbound_ops::fitness::read(ctx)?;
    rollbound_ops::fitness::reset(ctx)?;

    // Step 6.
    let mut roll_snapshot_taken = false;
    if constants.blocks_per_roll_snapshot > 0
        && (level.cycle_position + 1) % constants.blocks_per_roll_snapshot == 0
    {
        let mut registry = RollRegistry::new(ctx, constants.tokens_per_roll, constants.preserved_cycles);
        registry.snapshot_rolls_for_cycle(level.cycle.checked_add(constants.preserved_cycles + 2))?;
        roll_snapshot_taken = true;
    }

    // Step 7: cycle end.
    let mut outcome = FinalizationOutcome {
        fitness,
        cycle_ended: false,
        roll_snapshot_taken,
        forfeited_nonce_commitments: 0,
        deactivated: Vec::new(),
    };
    if level.cycle_position + 1 == constants.blocks_per_cycle {
        outcome.cycle_ended = true;

        // (a)
        outcome.forfeited_nonce_commitments = seed_nonce::forfeit_unrevealed_in_cycle(ctx, constants, level.cycle)?;

        // (b)
        if let Some(to_clear) = level.cycle.checked_sub(constants.preserved_cycles) {
            let mut registry = RollRegistry::new(ctx, constants.tokens_per_roll, constants.preserved_cycles);
            registry.clear_cycle(to_clear)?;
        }

        // (c) Draw the one surviving periodic snapshot for the cycle whose
        // collection window (step 6, over the preceding cycles) just closed,
        // and delete the rest.
        {
            let mut registry = RollRegistry::new(ctx, constants.tokens_per_roll, constants.preserved_cycles);
            registry.freeze_rolls_for_cycle(seed, level.cycle.checked_add(constants.preserved_cycles + 1))?;
        }

        // (d)
        {
            let mut registry = RollRegistry::new(ctx, constants.tokens_per_roll, constants.preserved_cycles);
            registry.init_snapshot_cycle(level.cycle.checked_add(constants.preserved_cycles + 3))?;
        }

        // (e)
        {
            let mut registry = RollRegistry::new(ctx, constants.tokens_per_roll, constants.preserved_cycles);
            outcome.deactivated = registry.deactivate_due_by(level.cycle.checked_add(1))?;
        }

        // (f)
        let next_level = Level::from_raw(header.level + 1, constants);
        if next_level.voting_period != level.voting_period {
            voting::advance_period(ctx, level.voting_period)?;
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollbound_context::MapStore;
    use rollbound_crypto::FixedVerifier;
    use rollbound_types::BlockHash;

    fn constants() -> ProtocolConstants {
        ProtocolConstants {
            blocks_per_cycle: 4,
            blocks_per_voting_period: 16,
            blocks_per_commitment: 2,
            blocks_per_roll_snapshot: 2,
            preserved_cycles: 2,
            proof_of_work_threshold: u64::MAX,
            ..ProtocolConstants::default()
        }
    }

    fn header(level: u32, priority: u32, fitness: u32) -> BlockHeader {
        BlockHeader {
            predecessor: BlockHash::from([0u8; 32]),
            level,
            priority,
            declared_fitness: fitness,
            seed_nonce_hash: None,
            proof_of_work_nonce: 0,
            signature: Vec::new(),
        }
    }

    fn seeded_registry(ctx: &mut Context, constants: &ProtocolConstants, delegate: &PublicKeyHash) {
        let mut registry = RollRegistry::new(ctx, constants.tokens_per_roll, constants.preserved_cycles);
        registry.add_amount(delegate, constants.tokens_per_roll).unwrap();
        registry.snapshot_rolls_for_cycle(Cycle(0)).unwrap();
    }

    #[test]
    fn begin_application_rejects_a_stale_fitness_gap() {
        let mut ctx = Context::new(MapStore::new());
        let constants = constants();
        let d = PublicKeyHash([1u8; 20]);
        seeded_registry(&mut ctx, &constants, &d);

        let verifier = FixedVerifier::new();
        let h = header(0, 0, 5);
        let err = begin_application(&mut ctx, &constants, &verifier, Digest32([7u8; 32]), 5, &h).unwrap_err();
        assert!(matches!(err, ChainError::InvalidFitnessGap));
    }

    #[test]
    fn begin_application_accepts_the_rights_owner_signature() {
        let mut ctx = Context::new(MapStore::new());
        let constants = constants();
        let d = PublicKeyHash([1u8; 20]);
        seeded_registry(&mut ctx, &constants, &d);

        let h = header(0, 0, 1);
        let mut verifier = FixedVerifier::new();
        verifier.accept(d, BLOCK_WATERMARK, signing_bytes(&h), b"sig".to_vec());
        let mut signed = h;
        signed.signature = b"sig".to_vec();

        let baker = begin_application(&mut ctx, &constants, &verifier, Digest32([7u8; 32]), 0, &signed).unwrap();
        assert_eq!(baker, d);
        assert_eq!(rollbound_ops::fitness::read(&ctx).unwrap(), 1);
    }

    #[test]
    fn begin_application_rejects_an_unexpected_commitment_flag() {
        let mut ctx = Context::new(MapStore::new());
        let constants = constants();
        let d = PublicKeyHash([1u8; 20]);
        seeded_registry(&mut ctx, &constants, &d);

        // Level 0's cycle_position (0) is within blocks_per_commitment (2), so
        // a commitment is expected; omitting one must be rejected.
        let h = header(0, 0, 1);
        let mut verifier = FixedVerifier::new();
        verifier.accept(d, BLOCK_WATERMARK, signing_bytes(&h), b"sig".to_vec());
        let mut signed = h;
        signed.signature = b"sig".to_vec();
        let err = begin_application(&mut ctx, &constants, &verifier, Digest32([7u8; 32]), 0, &signed).unwrap_err();
        assert!(matches!(err, ChainError::UnexpectedCommitment));
    }

    #[test]
    fn finalize_at_cycle_end_clears_old_cycle_and_deactivates_due_delegates() {
        let mut ctx = Context::new(MapStore::new());
        let constants = constants();
        let baker = PublicKeyHash([2u8; 20]);
        let other = PublicKeyHash([3u8; 20]);
        seeded_registry(&mut ctx, &constants, &baker);
        {
            let mut registry = RollRegistry::new(&mut ctx, constants.tokens_per_roll, constants.preserved_cycles);
            registry.add_amount(&other, constants.tokens_per_roll).unwrap();
            registry.schedule_deactivation(&other, Cycle(1)).unwrap();
        }

        // Level 3 is cycle_position 3 of a 4-block cycle: the last block.
        let h = header(3, 0, 10);
        let outcome = finalize_application(&mut ctx, &constants, &h, &baker, Digest32([7u8; 32])).unwrap();

        assert!(outcome.cycle_ended);
        assert_eq!(outcome.deactivated, vec![other]);
        assert_eq!(
            rollbound_rolls::frozen::balance(&ctx, FrozenBucket::Deposits, &baker, Cycle(0)).unwrap(),
            constants.block_security_deposit
        );
        assert_eq!(last_block_priority(&ctx).unwrap(), Some(0));
    }
}
