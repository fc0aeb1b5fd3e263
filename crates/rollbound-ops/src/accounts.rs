//! Implicit/originated contract state: balance, manager-operation counter,
//! allocation, and revealed manager key. Grounded in the teacher's nonce
//! bookkeeping (`ioi_tx::system::nonce`: one key per account, strict
//! next-value check, atomic bump) generalized from a single nonce counter to
//! the richer per-contract record this spec's manager operations need.
//!
//! Balance and delegate changes here also keep C4's roll registry in step
//! (spec.md Invariant 1: `change(D) + |rolls(D)| * tokens_per_roll ==
//! total_delegated_stake(D)`), the way the teacher's stake-weighted registry
//! crates update bonded stake from the same call sites that move balance.

use rollbound_context::{Context, StateAccess};
use rollbound_rolls::RollRegistry;
use rollbound_types::{ContractAddress, ProtocolConstants, PublicKeyHash, StateError, Tez};

fn balance_key(addr: &ContractAddress) -> Vec<u8> {
    [b"account/balance/".as_slice(), &addr.0].concat()
}

fn counter_key(addr: &ContractAddress) -> Vec<u8> {
    [b"account/counter/".as_slice(), &addr.0].concat()
}

fn manager_key_key(addr: &ContractAddress) -> Vec<u8> {
    [b"account/manager_key/".as_slice(), &addr.0].concat()
}

fn delegate_key(addr: &ContractAddress) -> Vec<u8> {
    [b"account/delegate/".as_slice(), &addr.0].concat()
}

/// `true` once an account has received any balance or been originated — the
/// precondition manager-operation precheck step 1 checks for `source`.
pub fn is_allocated(ctx: &dyn StateAccess, addr: &ContractAddress) -> Result<bool, StateError> {
    ctx.mem(&balance_key(addr))
}

pub fn balance(ctx: &dyn StateAccess, addr: &ContractAddress) -> Result<Tez, StateError> {
    match ctx.get(&balance_key(addr))? {
        Some(bytes) => {
            let arr: [u8; 8] = bytes.try_into().map_err(|_| StateError::Decode("expected 8-byte tez balance".into()))?;
            Ok(Tez(u64::from_be_bytes(arr)))
        }
        None => Ok(Tez::ZERO),
    }
}

fn set_balance(ctx: &mut dyn StateAccess, addr: &ContractAddress, value: Tez) -> Result<(), StateError> {
    ctx.insert(&balance_key(addr), &value.0.to_be_bytes())
}

pub fn credit(ctx: &mut Context, constants: &ProtocolConstants, addr: &ContractAddress, amount: Tez) -> Result<(), StateError> {
    let current = balance(ctx, addr)?;
    set_balance(ctx, addr, current.checked_add(amount)?)?;
    restake(ctx, constants, addr, amount, true)
}

pub fn debit(ctx: &mut Context, constants: &ProtocolConstants, addr: &ContractAddress, amount: Tez) -> Result<(), StateError> {
    let current = balance(ctx, addr)?;
    set_balance(ctx, addr, current.checked_sub(amount)?)?;
    restake(ctx, constants, addr, amount, false)
}

/// Moves `amount` into or out of `addr`'s current delegate's roll stake, if
/// it has one. Called from every balance-mutating entry point so the roll
/// registry never drifts from the account ledger it is derived from.
fn restake(ctx: &mut Context, constants: &ProtocolConstants, addr: &ContractAddress, amount: Tez, credit: bool) -> Result<(), StateError> {
    if amount == Tez::ZERO {
        return Ok(());
    }
    if let Some(d) = delegate(ctx, addr)? {
        let mut registry = RollRegistry::new(ctx, constants.tokens_per_roll, constants.preserved_cycles);
        if credit {
            registry.add_amount(&d, amount)?;
        } else {
            registry.remove_amount(&d, amount)?;
        }
    }
    Ok(())
}

pub fn counter(ctx: &dyn StateAccess, addr: &ContractAddress) -> Result<u64, StateError> {
    match ctx.get(&counter_key(addr))? {
        Some(bytes) => {
            let arr: [u8; 8] = bytes.try_into().map_err(|_| StateError::Decode("expected 8-byte counter".into()))?;
            Ok(u64::from_be_bytes(arr))
        }
        None => Ok(0),
    }
}

pub fn set_counter(ctx: &mut dyn StateAccess, addr: &ContractAddress, value: u64) -> Result<(), StateError> {
    ctx.insert(&counter_key(addr), &value.to_be_bytes())
}

pub fn manager_key_revealed(ctx: &dyn StateAccess, addr: &ContractAddress) -> Result<bool, StateError> {
    ctx.mem(&manager_key_key(addr))
}

pub fn reveal_manager_key(ctx: &mut dyn StateAccess, addr: &ContractAddress, key_bytes: &[u8]) -> Result<(), StateError> {
    ctx.insert(&manager_key_key(addr), key_bytes)
}

pub fn delegate(ctx: &dyn StateAccess, addr: &ContractAddress) -> Result<Option<rollbound_types::PublicKeyHash>, StateError> {
    match ctx.get(&delegate_key(addr))? {
        Some(bytes) => {
            let arr: [u8; 20] = bytes.try_into().map_err(|_| StateError::Decode("expected 20-byte delegate hash".into()))?;
            Ok(Some(rollbound_types::PublicKeyHash(arr)))
        }
        None => Ok(None),
    }
}

/// Sets `addr`'s delegate and moves its current balance's roll contribution
/// from the old delegate (if any) to the new one (if any), preserving
/// Invariant 1 across the relationship change itself, not just balance
/// changes under a fixed delegate.
pub fn set_delegate(
    ctx: &mut Context,
    constants: &ProtocolConstants,
    addr: &ContractAddress,
    new_delegate: Option<PublicKeyHash>,
) -> Result<(), StateError> {
    let current_balance = balance(ctx, addr)?;
    let old_delegate = delegate(ctx, addr)?;
    match new_delegate {
        Some(d) => ctx.insert(&delegate_key(addr), d.as_ref())?,
        None => ctx.delete(&delegate_key(addr))?,
    }
    if old_delegate == new_delegate || current_balance == Tez::ZERO {
        return Ok(());
    }
    let mut registry = RollRegistry::new(ctx, constants.tokens_per_roll, constants.preserved_cycles);
    if let Some(old) = old_delegate {
        registry.remove_amount(&old, current_balance)?;
    }
    if let Some(new) = new_delegate {
        registry.add_amount(&new, current_balance)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollbound_context::MapStore;

    #[test]
    fn credit_allocates_and_debit_restores_zero() {
        let mut ctx = Context::new(MapStore::new());
        let constants = ProtocolConstants::default();
        let addr = ContractAddress([7u8; 20]);
        assert!(!is_allocated(&ctx, &addr).unwrap());

        credit(&mut ctx, &constants, &addr, Tez::from_mutez(100)).unwrap();
        assert!(is_allocated(&ctx, &addr).unwrap());
        assert_eq!(balance(&ctx, &addr).unwrap(), Tez::from_mutez(100));

        debit(&mut ctx, &constants, &addr, Tez::from_mutez(100)).unwrap();
        assert_eq!(balance(&ctx, &addr).unwrap(), Tez::ZERO);
    }

    #[test]
    fn counter_starts_at_zero_and_is_settable() {
        let mut store = MapStore::new();
        let addr = ContractAddress([8u8; 20]);
        assert_eq!(counter(&store, &addr).unwrap(), 0);
        set_counter(&mut store, &addr, 1).unwrap();
        assert_eq!(counter(&store, &addr).unwrap(), 1);
    }

    /// Invariant 1: crediting a delegated account moves the same amount into
    /// its delegate's `change` accumulator in the roll registry.
    #[test]
    fn crediting_a_delegated_account_stakes_its_delegate() {
        let mut ctx = Context::new(MapStore::new());
        let constants = ProtocolConstants::default();
        let addr = ContractAddress([7u8; 20]);
        let delegate_pkh = PublicKeyHash([1u8; 20]);
        set_delegate(&mut ctx, &constants, &addr, Some(delegate_pkh)).unwrap();

        credit(&mut ctx, &constants, &addr, Tez::from_mutez(500)).unwrap();
        assert_eq!(
            RollRegistry::new(&mut ctx, constants.tokens_per_roll, constants.preserved_cycles).change(&delegate_pkh).unwrap(),
            Tez::from_mutez(500)
        );

        debit(&mut ctx, &constants, &addr, Tez::from_mutez(200)).unwrap();
        assert_eq!(
            RollRegistry::new(&mut ctx, constants.tokens_per_roll, constants.preserved_cycles).change(&delegate_pkh).unwrap(),
            Tez::from_mutez(300)
        );
    }

    /// Switching delegates moves the balance's whole roll contribution from
    /// the old delegate to the new one in a single call.
    #[test]
    fn switching_delegate_moves_stake_between_delegates() {
        let mut ctx = Context::new(MapStore::new());
        let constants = ProtocolConstants::default();
        let addr = ContractAddress([7u8; 20]);
        let old_delegate = PublicKeyHash([1u8; 20]);
        let new_delegate = PublicKeyHash([2u8; 20]);
        set_delegate(&mut ctx, &constants, &addr, Some(old_delegate)).unwrap();
        credit(&mut ctx, &constants, &addr, Tez::from_mutez(500)).unwrap();

        set_delegate(&mut ctx, &constants, &addr, Some(new_delegate)).unwrap();

        let registry = RollRegistry::new(&mut ctx, constants.tokens_per_roll, constants.preserved_cycles);
        assert_eq!(registry.change(&old_delegate).unwrap(), Tez::ZERO);
        assert_eq!(registry.change(&new_delegate).unwrap(), Tez::from_mutez(500));
    }
}
