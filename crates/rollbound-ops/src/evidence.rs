//! `Double_endorsement_evidence` / `Double_baking_evidence`, §4.5.
//!
//! Both evidence kinds share the same staleness window and slashing
//! mechanics (§4.5, §8 scenarios 1-5); only what identifies the accused
//! delegate differs.

use crate::operation::{BakedBlockEvidence, BalanceUpdate, BalanceUpdateKind, OperationResult, SingleEndorsement};
use rollbound_context::Context;
use rollbound_rolls::{baking_rights_owner, endorsement_rights_owner, FrozenBucket};
use rollbound_types::{Digest32, Level, OperationError, ProtocolConstants, PublicKeyHash, Tez};

/// The last block level whose fork is still eligible for denunciation.
/// §8: "Evidence whose level equals `last_allowed_fork_level` is accepted;
/// one less is outdated; one equal to `current_level` is too-early." Decided
/// (DESIGN.md) as `current_level - preserved_cycles * blocks_per_cycle`.
fn last_allowed_fork_level(current_level: u32, constants: &ProtocolConstants) -> u32 {
    current_level.saturating_sub(constants.preserved_cycles * constants.blocks_per_cycle)
}

fn check_staleness(kind: &'static str, level: u32, current_level: u32, constants: &ProtocolConstants) -> Result<(), OperationError> {
    if level >= current_level {
        return Err(OperationError::TooEarlyEvidence { kind, level, current: current_level });
    }
    let last_allowed = last_allowed_fork_level(current_level, constants);
    if level < last_allowed {
        return Err(OperationError::OutdatedEvidence { kind, level, last: last_allowed });
    }
    Ok(())
}

fn slash(ctx: &mut Context, accused: &PublicKeyHash, cycle: rollbound_types::Cycle, accuser: &PublicKeyHash) -> Result<Vec<BalanceUpdate>, OperationError> {
    let deposits = rollbound_rolls::frozen::balance(ctx, FrozenBucket::Deposits, accused, cycle).map_err(OperationError::State)?;
    let fees = rollbound_rolls::frozen::balance(ctx, FrozenBucket::Fees, accused, cycle).map_err(OperationError::State)?;
    let rewards = rollbound_rolls::frozen::balance(ctx, FrozenBucket::Rewards, accused, cycle).map_err(OperationError::State)?;
    if deposits.is_zero() && fees.is_zero() && rewards.is_zero() {
        return Err(OperationError::UnrequiredEvidence);
    }

    let slashed = rollbound_rolls::frozen::slash_all(ctx, accused, cycle).map_err(OperationError::State)?;
    let reward_to_accuser = Tez::from_mutez(slashed.0 / 2);
    rollbound_rolls::frozen::credit(ctx, FrozenBucket::Rewards, accuser, cycle, reward_to_accuser).map_err(OperationError::State)?;

    Ok(vec![
        BalanceUpdate { delegate: *accused, cycle, kind: BalanceUpdateKind::Deposits, delta: -(deposits.0 as i64) },
        BalanceUpdate { delegate: *accused, cycle, kind: BalanceUpdateKind::Fees, delta: -(fees.0 as i64) },
        BalanceUpdate { delegate: *accused, cycle, kind: BalanceUpdateKind::Rewards, delta: -(rewards.0 as i64) },
        BalanceUpdate { delegate: *accuser, cycle, kind: BalanceUpdateKind::Rewards, delta: reward_to_accuser.0 as i64 },
    ])
}

#[allow(clippy::too_many_arguments)]
pub fn apply_double_endorsement_evidence(
    ctx: &mut Context,
    constants: &ProtocolConstants,
    seed: Digest32,
    current_level: u32,
    accuser: &PublicKeyHash,
    op1: &SingleEndorsement,
    op2: &SingleEndorsement,
) -> Result<OperationResult, OperationError> {
    const KIND: &str = "endorsement";
    if op1.level != op2.level || op1.block == op2.block {
        return Err(OperationError::InvalidDoubleEvidence { kind: KIND });
    }
    check_staleness(KIND, op1.level, current_level, constants)?;

    let level = Level::from_raw(op1.level, constants);
    for (op, sign) in [(op1, &op1.signer), (op2, &op2.signer)] {
        for &slot in &op.slots {
            let owner = endorsement_rights_owner(ctx, seed, &level, slot as u32, constants.tokens_per_roll, constants.preserved_cycles)?;
            if owner != *sign {
                return Err(OperationError::InvalidSignature);
            }
        }
    }
    if op1.signer != op2.signer {
        return Err(OperationError::InconsistentEvidence { kind: KIND });
    }

    let balance_updates = slash(ctx, &op1.signer, level.cycle, accuser)?;
    Ok(OperationResult::DoubleEndorsementEvidence { balance_updates })
}

pub fn apply_double_baking_evidence(
    ctx: &mut Context,
    constants: &ProtocolConstants,
    seed: Digest32,
    current_level: u32,
    accuser: &PublicKeyHash,
    bh1: &BakedBlockEvidence,
    bh2: &BakedBlockEvidence,
) -> Result<OperationResult, OperationError> {
    const KIND: &str = "baking";
    if bh1.level != bh2.level || (bh1.priority == bh2.priority && bh1.signer == bh2.signer) {
        return Err(OperationError::InvalidDoubleEvidence { kind: KIND });
    }
    check_staleness(KIND, bh1.level, current_level, constants)?;

    let level = Level::from_raw(bh1.level, constants);
    for bh in [bh1, bh2] {
        let owner = baking_rights_owner(ctx, seed, &level, bh.priority, constants.tokens_per_roll, constants.preserved_cycles)?;
        if owner != bh.signer {
            return Err(OperationError::InvalidSignature);
        }
    }
    if bh1.signer != bh2.signer {
        return Err(OperationError::InconsistentEvidence { kind: KIND });
    }

    let balance_updates = slash(ctx, &bh1.signer, level.cycle, accuser)?;
    Ok(OperationResult::DoubleBakingEvidence { balance_updates })
}
