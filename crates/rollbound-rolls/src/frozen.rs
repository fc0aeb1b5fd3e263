//! Per-delegate, per-cycle frozen balances (§3's "Frozen balance"): deposits,
//! fees, and rewards escrowed for a cycle, subject to slashing (C6's
//! denunciation evidence) or unfreezing (C7's `finalize_application`).
//! Lives alongside the roll registry because the data model places it on the
//! same `Delegate` record as `change`/`roll_list_head`.

use rollbound_context::StateAccess;
use rollbound_types::{Cycle, PublicKeyHash, StateError, Tez};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Deposits,
    Fees,
    Rewards,
}

impl Bucket {
    fn segment(self) -> &'static [u8] {
        match self {
            Bucket::Deposits => b"deposits/",
            Bucket::Fees => b"fees/",
            Bucket::Rewards => b"rewards/",
        }
    }
}

fn key(bucket: Bucket, delegate: &PublicKeyHash, cycle: Cycle) -> Vec<u8> {
    [b"roll/frozen/".as_slice(), bucket.segment(), delegate.as_ref(), &cycle.0.to_be_bytes()].concat()
}

fn read(ctx: &dyn StateAccess, bucket: Bucket, delegate: &PublicKeyHash, cycle: Cycle) -> Result<Tez, StateError> {
    match ctx.get(&key(bucket, delegate, cycle))? {
        Some(bytes) => {
            let arr: [u8; 8] = bytes.try_into().map_err(|_| StateError::Decode("expected 8-byte tez amount".into()))?;
            Ok(Tez(u64::from_be_bytes(arr)))
        }
        None => Ok(Tez::ZERO),
    }
}

fn write(ctx: &mut dyn StateAccess, bucket: Bucket, delegate: &PublicKeyHash, cycle: Cycle, value: Tez) -> Result<(), StateError> {
    if value.is_zero() {
        ctx.delete(&key(bucket, delegate, cycle))
    } else {
        ctx.insert(&key(bucket, delegate, cycle), &value.0.to_be_bytes())
    }
}

pub fn balance(ctx: &dyn StateAccess, bucket: Bucket, delegate: &PublicKeyHash, cycle: Cycle) -> Result<Tez, StateError> {
    read(ctx, bucket, delegate, cycle)
}

pub fn credit(ctx: &mut dyn StateAccess, bucket: Bucket, delegate: &PublicKeyHash, cycle: Cycle, amount: Tez) -> Result<(), StateError> {
    let current = read(ctx, bucket, delegate, cycle)?;
    write(ctx, bucket, delegate, cycle, current.checked_add(amount)?)
}

pub fn debit(ctx: &mut dyn StateAccess, bucket: Bucket, delegate: &PublicKeyHash, cycle: Cycle, amount: Tez) -> Result<(), StateError> {
    let current = read(ctx, bucket, delegate, cycle)?;
    write(ctx, bucket, delegate, cycle, current.checked_sub(amount)?)
}

/// Zeroes all three buckets for `(delegate, cycle)` and returns the sum that
/// was removed — the amount a slashing denunciation takes from a delegate.
pub fn slash_all(ctx: &mut dyn StateAccess, delegate: &PublicKeyHash, cycle: Cycle) -> Result<Tez, StateError> {
    let mut total = Tez::ZERO;
    for bucket in [Bucket::Deposits, Bucket::Fees, Bucket::Rewards] {
        let amount = read(ctx, bucket, delegate, cycle)?;
        total = total.checked_add(amount)?;
        write(ctx, bucket, delegate, cycle, Tez::ZERO)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollbound_context::MapStore;

    #[test]
    fn credit_then_slash_zeroes_every_bucket() {
        let mut store = MapStore::new();
        let d = PublicKeyHash([1u8; 20]);
        credit(&mut store, Bucket::Deposits, &d, Cycle(3), Tez::from_mutez(100)).unwrap();
        credit(&mut store, Bucket::Fees, &d, Cycle(3), Tez::from_mutez(10)).unwrap();
        credit(&mut store, Bucket::Rewards, &d, Cycle(3), Tez::from_mutez(5)).unwrap();

        let slashed = slash_all(&mut store, &d, Cycle(3)).unwrap();
        assert_eq!(slashed, Tez::from_mutez(115));
        assert_eq!(balance(&store, Bucket::Deposits, &d, Cycle(3)).unwrap(), Tez::ZERO);
        assert_eq!(balance(&store, Bucket::Fees, &d, Cycle(3)).unwrap(), Tez::ZERO);
        assert_eq!(balance(&store, Bucket::Rewards, &d, Cycle(3)).unwrap(), Tez::ZERO);
    }

    #[test]
    fn debit_past_balance_underflows() {
        let mut store = MapStore::new();
        let d = PublicKeyHash([2u8; 20]);
        let err = debit(&mut store, Bucket::Deposits, &d, Cycle(0), Tez::from_mutez(1)).unwrap_err();
        assert!(matches!(err, StateError::Arith(_)));
    }
}
