//! `Endorsements`, §4.5.

use crate::fitness;
use crate::operation::{BalanceUpdate, BalanceUpdateKind, OperationResult};
use rollbound_context::{Context, StateAccess};
use rollbound_crypto::SignatureVerifier;
use rollbound_rolls::{endorsement_rights_owner, FrozenBucket};
use rollbound_types::{BlockHash, Digest32, Level, OperationError, ProtocolConstants, PublicKeyHash, Tez};

fn slot_key(level: u32, slot: u16) -> Vec<u8> {
    [b"endorsement/recorded/".as_slice(), &level.to_be_bytes(), &slot.to_be_bytes()].concat()
}

/// Endorsement reward as a function of the baking priority that produced the
/// endorsed block and the number of priorities skipped before it — a
/// deliberately simple monotone-decreasing formula; the exact reward curve
/// is a protocol-constant concern the distilled spec leaves unspecified
/// beyond naming the two inputs.
fn endorsement_reward(constants: &ProtocolConstants, block_priority: u32, _gap: u32) -> Tez {
    if block_priority == 0 {
        constants.endorsement_security_deposit
    } else {
        Tez::from_mutez(constants.endorsement_security_deposit.0 / 2)
    }
}

#[allow(clippy::too_many_arguments)]
pub fn apply_endorsements(
    ctx: &mut Context,
    verifier: &dyn SignatureVerifier,
    constants: &ProtocolConstants,
    seed: Digest32,
    predecessor_hash: BlockHash,
    current_level: u32,
    block: BlockHash,
    level: u32,
    slots: &[u16],
    wrapper_signer: &PublicKeyHash,
    watermark: u8,
    message: &[u8],
    signature: &[u8],
    block_priority: u32,
    fitness_gap: u32,
) -> Result<OperationResult, OperationError> {
    if block != predecessor_hash {
        return Err(OperationError::WrongEndorsementPredecessor);
    }
    if current_level == 0 || level != current_level - 1 {
        return Err(OperationError::InvalidEndorsementLevel);
    }
    for &slot in slots {
        if ctx.mem(&slot_key(level, slot)).map_err(OperationError::State)? {
            return Err(OperationError::DuplicateEndorsement(slot));
        }
    }

    let endorsed_level = Level::from_raw(level, constants);
    let mut owners = Vec::with_capacity(slots.len());
    for &slot in slots {
        owners.push(endorsement_rights_owner(
            ctx,
            seed,
            &endorsed_level,
            slot as u32,
            constants.tokens_per_roll,
            constants.preserved_cycles,
        )?);
    }
    if owners.iter().any(|o| o != wrapper_signer) {
        return Err(OperationError::InvalidSignature);
    }
    if !verifier.verify(wrapper_signer, watermark, message, signature) {
        return Err(OperationError::InvalidSignature);
    }

    for &slot in slots {
        ctx.insert(&slot_key(level, slot), &[1]).map_err(OperationError::State)?;
    }
    fitness::add(ctx, slots.len() as u32).map_err(OperationError::State)?;

    let current_cycle = Level::from_raw(current_level, constants).cycle;
    let deposit = Tez::from_mutez(constants.endorsement_security_deposit.0 * slots.len() as u64);
    rollbound_rolls::frozen::credit(ctx, FrozenBucket::Deposits, wrapper_signer, current_cycle, deposit)
        .map_err(OperationError::State)?;
    let reward = endorsement_reward(constants, block_priority, fitness_gap);
    rollbound_rolls::frozen::credit(ctx, FrozenBucket::Rewards, wrapper_signer, current_cycle, reward)
        .map_err(OperationError::State)?;

    Ok(OperationResult::Endorsements {
        balance_updates: vec![
            BalanceUpdate { delegate: *wrapper_signer, cycle: current_cycle, kind: BalanceUpdateKind::Deposits, delta: deposit.0 as i64 },
            BalanceUpdate { delegate: *wrapper_signer, cycle: current_cycle, kind: BalanceUpdateKind::Rewards, delta: reward.0 as i64 },
        ],
    })
}
