//! A local, in-memory devnet loop — the workspace's analog of the teacher's
//! `ioi-cli::commands::node` devnet command, scoped down to what C1-C7 alone
//! can drive: a single delegate bakes every block in priority order, no
//! networking, no mempool, no persistence (all explicit Non-goals).

use parity_scale_codec::Encode;
use rollbound_chain::{begin_application, finalize_application, BlockHeader};
use rollbound_context::{Context, MapStore};
use rollbound_crypto::FixedVerifier;
use rollbound_rolls::RollRegistry;
use rollbound_types::{BlockHash, ChainError, Cycle, Digest32, ProtocolConstants, PublicKeyHash};
use tracing::info;

/// One baker, one roll, no endorsers: enough to exercise C7's per-block and
/// cycle-boundary bookkeeping without a real network of validators.
pub fn run(constants: &ProtocolConstants, blocks_to_bake: u32) -> Result<(), ChainError> {
    let delegate = PublicKeyHash([1u8; 20]);
    let mut ctx = Context::new(MapStore::new());
    {
        let mut registry = RollRegistry::new(&mut ctx, constants.tokens_per_roll, constants.preserved_cycles);
        registry.add_amount(&delegate, constants.tokens_per_roll)?;
        registry.snapshot_rolls_for_cycle(Cycle(0))?;
    }

    let seed = Digest32([0u8; 32]);
    let mut predecessor = BlockHash::from([0u8; 32]);
    let mut predecessor_fitness = 0u32;

    for level in 0..blocks_to_bake {
        let mut header = BlockHeader {
            predecessor,
            level,
            priority: 0,
            declared_fitness: predecessor_fitness + 1,
            seed_nonce_hash: None,
            proof_of_work_nonce: 0,
            signature: Vec::new(),
        };
        let message = signing_bytes(&header);
        let mut verifier = FixedVerifier::new();
        verifier.accept(delegate, 1, message.clone(), b"devnet-sig".to_vec());
        header.signature = b"devnet-sig".to_vec();

        let baker = begin_application(&mut ctx, constants, &verifier, seed, predecessor_fitness, &header)?;
        let outcome = finalize_application(&mut ctx, constants, &header, &baker, seed)?;

        info!(
            level,
            fitness = outcome.fitness,
            cycle_ended = outcome.cycle_ended,
            deactivated = outcome.deactivated.len(),
            "baked block"
        );

        predecessor_fitness = header.declared_fitness;
        predecessor = block_hash(&header);
    }

    Ok(())
}

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

fn block_hash(header: &BlockHeader) -> BlockHash {
    let mut bytes = [0u8; 32];
    let encoded = header.encode();
    let len = encoded.len().min(32);
    bytes[..len].copy_from_slice(&encoded[..len]);
    BlockHash::from(bytes)
}
