//! `Activate_account`, §4.5: one-shot credit of a fundraiser commitment to
//! its implicit contract.

use crate::accounts;
use crate::operation::{BalanceUpdate, BalanceUpdateKind, OperationResult};
use rollbound_context::{Context, StateAccess};
use rollbound_crypto::blinded_pkh;
use rollbound_types::{ContractAddress, Cycle, OperationError, ProtocolConstants, PublicKeyHash, Tez};

fn commitment_key(blinded: &rollbound_types::Digest32) -> Vec<u8> {
    [b"activation/commitment/".as_slice(), blinded.as_ref()].concat()
}

pub fn record_commitment(ctx: &mut dyn StateAccess, blinded: &rollbound_types::Digest32, amount: Tez) -> Result<(), rollbound_types::StateError> {
    ctx.insert(&commitment_key(blinded), &amount.0.to_be_bytes())
}

fn read_commitment(ctx: &dyn StateAccess, blinded: &rollbound_types::Digest32) -> Result<Option<Tez>, rollbound_types::StateError> {
    match ctx.get(&commitment_key(blinded))? {
        Some(bytes) => {
            let arr: [u8; 8] = bytes
                .try_into()
                .map_err(|_| rollbound_types::StateError::Decode("expected 8-byte commitment amount".into()))?;
            Ok(Some(Tez(u64::from_be_bytes(arr))))
        }
        None => Ok(None),
    }
}

/// The implicit contract for a public-key hash shares its 20 bytes, the same
/// convention the teacher's identity module uses for deriving an address
/// from a key hash.
fn implicit_contract(pkh: &PublicKeyHash) -> ContractAddress {
    ContractAddress(pkh.0)
}

pub fn apply_activate_account(
    ctx: &mut Context,
    constants: &ProtocolConstants,
    pkh: &PublicKeyHash,
    activation_code: &[u8],
) -> Result<OperationResult, OperationError> {
    let blinded = blinded_pkh(activation_code, pkh).map_err(|e| OperationError::State(rollbound_types::StateError::Decode(e.to_string())))?;
    let amount = read_commitment(ctx, &blinded).map_err(OperationError::State)?.ok_or(OperationError::InvalidActivation)?;
    ctx.delete(&commitment_key(&blinded)).map_err(OperationError::State)?;

    let contract = implicit_contract(pkh);
    accounts::credit(ctx, constants, &contract, amount).map_err(OperationError::State)?;

    Ok(OperationResult::ActivateAccount {
        balance_updates: vec![BalanceUpdate { delegate: *pkh, cycle: Cycle(0), kind: BalanceUpdateKind::Contract, delta: amount.0 as i64 }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollbound_context::MapStore;

    #[test]
    fn activation_credits_once_then_deletes_commitment() {
        let mut ctx = Context::new(MapStore::new());
        let constants = ProtocolConstants::default();
        let pkh = PublicKeyHash([3u8; 20]);
        let code = b"fundraiser-code";
        let blinded = blinded_pkh(code, &pkh).unwrap();
        record_commitment(&mut ctx, &blinded, Tez::from_mutez(500)).unwrap();

        let result = apply_activate_account(&mut ctx, &constants, &pkh, code).unwrap();
        assert!(matches!(result, OperationResult::ActivateAccount { .. }));
        assert_eq!(accounts::balance(&ctx, &implicit_contract(&pkh)).unwrap(), Tez::from_mutez(500));

        let err = apply_activate_account(&mut ctx, &constants, &pkh, code).unwrap_err();
        assert!(matches!(err, OperationError::InvalidActivation));
    }

    #[test]
    fn wrong_activation_code_is_rejected() {
        let mut ctx = Context::new(MapStore::new());
        let constants = ProtocolConstants::default();
        let pkh = PublicKeyHash([3u8; 20]);
        let blinded = blinded_pkh(b"right-code", &pkh).unwrap();
        record_commitment(&mut ctx, &blinded, Tez::from_mutez(500)).unwrap();
        let err = apply_activate_account(&mut ctx, &constants, &pkh, b"wrong-code").unwrap_err();
        assert!(matches!(err, OperationError::InvalidActivation));
    }
}
