//! End-to-end block-lifecycle scenarios (§8's "seed the suite" list,
//! scenario 1 in particular): the deeper per-operation mechanics for
//! double-evidence and roll conservation already have focused unit coverage
//! in `rollbound-ops`/`rollbound-rolls`; these tests check that C7 actually
//! wires `begin_application` → `apply_operation` → `finalize_application`
//! together the way §4.6 describes.

use rollbound_chain::{apply_operation, begin_application, finalize_application, BlockHeader};
use rollbound_context::{Context, MapStore};
use rollbound_crypto::FixedVerifier;
use rollbound_ops::pipeline::{BlockView, Envelope};
use rollbound_ops::operation::Operation;
use rollbound_rolls::RollRegistry;
use rollbound_types::{BlockHash, Cycle, Digest32, OperationError, ProtocolConstants, PublicKeyHash};

fn constants() -> ProtocolConstants {
    ProtocolConstants {
        blocks_per_cycle: 8,
        blocks_per_voting_period: 32,
        blocks_per_commitment: 4,
        blocks_per_roll_snapshot: 4,
        preserved_cycles: 2,
        proof_of_work_threshold: u64::MAX,
        ..ProtocolConstants::default()
    }
}

fn genesis_with_delegate(constants: &ProtocolConstants, delegate: &PublicKeyHash) -> Context {
    let mut ctx = Context::new(MapStore::new());
    let mut registry = RollRegistry::new(&mut ctx, constants.tokens_per_roll, constants.preserved_cycles);
    registry.add_amount(delegate, constants.tokens_per_roll).unwrap();
    registry.snapshot_rolls_for_cycle(Cycle(0)).unwrap();
    ctx
}

/// A full single-block pass: `begin_application` resolves the baker and
/// checks the header, an endorsement operation is applied against the
/// resulting context, and `finalize_application` freezes the block-level
/// deposit/reward.
#[test]
fn a_block_with_one_endorsement_applies_end_to_end() {
    let constants = constants();
    let delegate = PublicKeyHash([4u8; 20]);
    let mut ctx = genesis_with_delegate(&constants, &delegate);

    let predecessor = BlockHash::from([9u8; 32]);
    let header = BlockHeader {
        predecessor,
        level: 1,
        priority: 0,
        declared_fitness: 1,
        seed_nonce_hash: None,
        proof_of_work_nonce: 0,
        signature: Vec::new(),
    };
    let seed = Digest32([3u8; 32]);

    // Level 1's cycle_position (1) is within blocks_per_commitment (4), so a
    // commitment is expected in the header.
    let mut header = header;
    header.seed_nonce_hash = Some(Digest32([1u8; 32]));
    let mut verifier = FixedVerifier::new();
    verifier.accept(delegate, 1, header_signing_bytes(&header), b"block-sig".to_vec());
    header.signature = b"block-sig".to_vec();

    let baker = begin_application(&mut ctx, &constants, &verifier, seed, 0, &header).unwrap();
    assert_eq!(baker, delegate);

    verifier.accept(delegate, 2, b"endorse".to_vec(), b"endorse-sig".to_vec());
    let view = BlockView {
        constants: &constants,
        seed,
        predecessor_hash: predecessor,
        current_level: header.level,
        baker,
        block_priority: header.priority,
        fitness_gap: 1,
    };
    let envelope = Envelope {
        operation: Operation::Endorsements { block: predecessor, level: 0, slots: vec![0] },
        signer: delegate,
        watermark: 2,
        message: b"endorse".to_vec(),
        signature: b"endorse-sig".to_vec(),
    };
    apply_operation(&mut ctx, &verifier, &view, &delegate, Digest32([5u8; 32]), &envelope).unwrap();

    let outcome = finalize_application(&mut ctx, &constants, &header, &baker, seed).unwrap();
    // begin_application's +1 plus the one endorsed slot's +1.
    assert_eq!(outcome.fitness, 2);
    assert!(!outcome.cycle_ended);
    assert_eq!(
        rollbound_rolls::frozen::balance(&ctx, rollbound_rolls::FrozenBucket::Deposits, &delegate, Cycle(0)).unwrap(),
        constants.block_security_deposit.checked_add(constants.endorsement_security_deposit).unwrap()
    );
}

#[test]
fn begin_application_rejects_a_block_not_signed_by_the_rights_owner() {
    let constants = constants();
    let delegate = PublicKeyHash([4u8; 20]);
    let impostor = PublicKeyHash([6u8; 20]);
    let mut ctx = genesis_with_delegate(&constants, &delegate);

    let mut header = BlockHeader {
        predecessor: BlockHash::from([9u8; 32]),
        level: 0,
        priority: 0,
        declared_fitness: 1,
        seed_nonce_hash: Some(Digest32([1u8; 32])),
        proof_of_work_nonce: 0,
        signature: Vec::new(),
    };
    let mut verifier = FixedVerifier::new();
    verifier.accept(impostor, 1, header_signing_bytes(&header), b"block-sig".to_vec());
    header.signature = b"block-sig".to_vec();

    let err = begin_application(&mut ctx, &constants, &verifier, Digest32([3u8; 32]), 0, &header).unwrap_err();
    assert!(matches!(err, rollbound_types::ChainError::InvalidBakerSignature));
}

#[test]
fn apply_operation_propagates_a_pipeline_error_as_a_chain_error() {
    let constants = constants();
    let delegate = PublicKeyHash([4u8; 20]);
    let mut ctx = genesis_with_delegate(&constants, &delegate);
    let predecessor = BlockHash::from([9u8; 32]);
    let verifier = FixedVerifier::new();
    let view = BlockView {
        constants: &constants,
        seed: Digest32([3u8; 32]),
        predecessor_hash: predecessor,
        current_level: 1,
        baker: delegate,
        block_priority: 0,
        fitness_gap: 0,
    };
    let envelope = Envelope {
        operation: Operation::Endorsements { block: BlockHash::from([1u8; 32]), level: 0, slots: vec![0] },
        signer: delegate,
        watermark: 2,
        message: b"endorse".to_vec(),
        signature: b"endorse-sig".to_vec(),
    };
    let err = apply_operation(&mut ctx, &verifier, &view, &delegate, Digest32([5u8; 32]), &envelope).unwrap_err();
    assert!(matches!(
        err,
        rollbound_types::ChainError::Operation(OperationError::WrongEndorsementPredecessor)
    ));
}

/// Mirrors `rollbound_chain::lifecycle::signing_bytes` so tests can produce
/// matching signed messages without that helper being public API.
fn header_signing_bytes(header: &BlockHeader) -> Vec<u8> {
    use parity_scale_codec::Encode;
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
