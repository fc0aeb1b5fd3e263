//! `Seed_nonce_revelation`, §4.5.

use crate::operation::{BalanceUpdate, BalanceUpdateKind, OperationResult};
use rollbound_context::{Context, StateAccess};
use rollbound_crypto::hash;
use rollbound_types::{Cycle, Level, NonceHash, OperationError, ProtocolConstants, PublicKeyHash, Tez};

const COMMITMENT_PREFIX: &[u8] = b"seed_nonce/commitment/";

fn commitment_key(level: u32) -> Vec<u8> {
    [COMMITMENT_PREFIX, &level.to_be_bytes()].concat()
}

/// The record written by `finalize_application` when a header carries a
/// `seed_nonce_hash` (§4.6 step 4): who committed it and what they are owed
/// once the nonce is revealed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NonceCommitment {
    pub hash: NonceHash,
    pub delegate: PublicKeyHash,
    pub fees: Tez,
    pub rewards: Tez,
}

fn encode_commitment(c: &NonceCommitment) -> Vec<u8> {
    let mut out = Vec::with_capacity(32 + 20 + 8 + 8);
    out.extend_from_slice(c.hash.as_ref());
    out.extend_from_slice(c.delegate.as_ref());
    out.extend_from_slice(&c.fees.0.to_be_bytes());
    out.extend_from_slice(&c.rewards.0.to_be_bytes());
    out
}

fn decode_commitment(bytes: &[u8]) -> Result<NonceCommitment, OperationError> {
    if bytes.len() != 32 + 20 + 8 + 8 {
        return Err(OperationError::State(rollbound_types::StateError::Decode(
            "malformed nonce commitment record".into(),
        )));
    }
    let hash: [u8; 32] = bytes[0..32].try_into().unwrap();
    let delegate: [u8; 20] = bytes[32..52].try_into().unwrap();
    let fees = u64::from_be_bytes(bytes[52..60].try_into().unwrap());
    let rewards = u64::from_be_bytes(bytes[60..68].try_into().unwrap());
    Ok(NonceCommitment {
        hash: hash.into(),
        delegate: PublicKeyHash(delegate),
        fees: Tez(fees),
        rewards: Tez(rewards),
    })
}

pub fn record_commitment(ctx: &mut dyn StateAccess, level: u32, commitment: &NonceCommitment) -> Result<(), rollbound_types::StateError> {
    ctx.insert(&commitment_key(level), &encode_commitment(commitment))
}

pub fn read_commitment(ctx: &dyn StateAccess, level: u32) -> Result<Option<NonceCommitment>, OperationError> {
    match ctx.get(&commitment_key(level)).map_err(OperationError::State)? {
        Some(bytes) => Ok(Some(decode_commitment(&bytes)?)),
        None => Ok(None),
    }
}

pub fn clear_commitment(ctx: &mut dyn StateAccess, level: u32) -> Result<(), rollbound_types::StateError> {
    ctx.delete(&commitment_key(level))
}

pub fn apply_seed_nonce_revelation(
    ctx: &mut dyn StateAccess,
    constants: &ProtocolConstants,
    level: u32,
    nonce: &[u8],
) -> Result<OperationResult, OperationError> {
    let commitment = read_commitment(ctx, level)?.ok_or(OperationError::State(
        rollbound_types::StateError::StorageError(format!("no seed-nonce commitment recorded at level {level}")),
    ))?;
    let computed = hash(nonce).map_err(|e| OperationError::State(rollbound_types::StateError::Decode(e.to_string())))?;
    if computed != commitment.hash {
        return Err(OperationError::State(rollbound_types::StateError::Decode(
            "revealed nonce does not match its commitment".into(),
        )));
    }
    clear_commitment(ctx, level).map_err(OperationError::State)?;

    let cycle = Level::from_raw(level, constants).cycle;
    rollbound_rolls::frozen::credit(ctx, rollbound_rolls::FrozenBucket::Rewards, &commitment.delegate, cycle, constants.seed_nonce_revelation_tip)
        .map_err(OperationError::State)?;

    Ok(OperationResult::SeedNonceRevelation {
        balance_updates: vec![BalanceUpdate {
            delegate: commitment.delegate,
            cycle,
            kind: BalanceUpdateKind::Rewards,
            delta: constants.seed_nonce_revelation_tip.0 as i64,
        }],
    })
}

/// §4.6 step 7a: every commitment still outstanding when its cycle ends goes
/// unrevealed forever — the tip it would have paid is simply never credited,
/// so forfeiture is just clearing the commitment record. Returns how many
/// were forfeited.
pub fn forfeit_unrevealed_in_cycle(ctx: &mut Context, constants: &ProtocolConstants, cycle: Cycle) -> Result<usize, OperationError> {
    let mut forfeited = 0;
    for (key, _) in ctx.prefix_scan(COMMITMENT_PREFIX) {
        let level_bytes = &key[COMMITMENT_PREFIX.len()..];
        let Ok(arr) = <[u8; 4]>::try_from(level_bytes) else { continue };
        let level = u32::from_be_bytes(arr);
        if Level::from_raw(level, constants).cycle == cycle {
            ctx.delete(&key).map_err(OperationError::State)?;
            forfeited += 1;
        }
    }
    Ok(forfeited)
}

fn _cycle_hint(_: Cycle) {}

#[cfg(test)]
mod tests {
    use super::*;
    use rollbound_context::MapStore;

    #[test]
    fn revelation_matching_commitment_credits_the_tip() {
        let mut store = MapStore::new();
        let constants = ProtocolConstants { blocks_per_cycle: 8, ..ProtocolConstants::default() };
        let delegate = PublicKeyHash([6u8; 20]);
        let nonce = b"some-preimage";
        let digest = hash(nonce).unwrap();
        record_commitment(&mut store, 3, &NonceCommitment { hash: digest, delegate, fees: Tez::ZERO, rewards: Tez::ZERO }).unwrap();

        let result = apply_seed_nonce_revelation(&mut store, &constants, 3, nonce).unwrap();
        assert!(matches!(result, OperationResult::SeedNonceRevelation { .. }));
        assert!(read_commitment(&store, 3).unwrap().is_none());
    }

    #[test]
    fn forfeit_clears_only_commitments_in_the_given_cycle() {
        let mut ctx = Context::new(MapStore::new());
        let constants = ProtocolConstants { blocks_per_cycle: 8, ..ProtocolConstants::default() };
        let delegate = PublicKeyHash([1u8; 20]);
        record_commitment(&mut ctx, 3, &NonceCommitment { hash: hash(b"a").unwrap(), delegate, fees: Tez::ZERO, rewards: Tez::ZERO }).unwrap();
        record_commitment(&mut ctx, 9, &NonceCommitment { hash: hash(b"b").unwrap(), delegate, fees: Tez::ZERO, rewards: Tez::ZERO }).unwrap();

        let forfeited = forfeit_unrevealed_in_cycle(&mut ctx, &constants, Cycle(0)).unwrap();
        assert_eq!(forfeited, 1);
        assert!(read_commitment(&ctx, 3).unwrap().is_none());
        assert!(read_commitment(&ctx, 9).unwrap().is_some());
    }

    #[test]
    fn mismatched_nonce_is_rejected() {
        let mut store = MapStore::new();
        let constants = ProtocolConstants::default();
        let delegate = PublicKeyHash([6u8; 20]);
        record_commitment(&mut store, 3, &NonceCommitment { hash: hash(b"right").unwrap(), delegate, fees: Tez::ZERO, rewards: Tez::ZERO }).unwrap();
        assert!(apply_seed_nonce_revelation(&mut store, &constants, 3, b"wrong").is_err());
    }
}
