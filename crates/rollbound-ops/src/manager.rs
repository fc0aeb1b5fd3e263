//! Manager operations, §4.5: the two-phase precheck/apply pipeline, plus
//! internal-operation recursion with nonce replay protection.

use crate::accounts;
use crate::operation::{ContentOutcome, ManagerContent, ManagerOperation, InternalOperation, OperationResult};
use rollbound_context::Context;
use rollbound_crypto::SignatureVerifier;
use rollbound_rolls::{FrozenBucket, RollRegistry};
use rollbound_types::{ContractAddress, Cycle, OperationError, ProtocolConstants, PublicKeyHash, StateError, Tez};
use std::collections::HashSet;

/// One manager operation plus the wrapper-signature material it must be
/// checked against (watermark-tagged coverage, §6 "operation wire format").
pub struct ManagerBatchEntry {
    pub operation: ManagerOperation,
    pub watermark: u8,
    pub message: Vec<u8>,
    pub signature: Vec<u8>,
}

fn source_identity(source: &ContractAddress) -> PublicKeyHash {
    PublicKeyHash(source.0)
}

fn map_balance_error(e: StateError) -> OperationError {
    match e {
        StateError::Arith(_) => OperationError::InsufficientBalance,
        other => OperationError::State(other),
    }
}

/// Precheck step, §4.5: source allocated, counter in strict sequence,
/// reveal recorded (rejecting a second reveal within the same batch),
/// signature verified against the now-known manager key, counter bumped,
/// fee debited and credited to the block's baker. These effects are written
/// directly to `ctx` — outside any fork — so they survive a later apply
/// failure, per "precheck effects are not rolled back".
#[allow(clippy::too_many_arguments)]
fn precheck_one(
    ctx: &mut Context,
    constants: &ProtocolConstants,
    verifier: &dyn SignatureVerifier,
    baker: &PublicKeyHash,
    current_cycle: Cycle,
    entry: &ManagerBatchEntry,
    revealed_this_batch: &mut HashSet<ContractAddress>,
) -> Result<(), OperationError> {
    let op = &entry.operation;
    if !accounts::is_allocated(ctx, &op.source).map_err(OperationError::State)? {
        return Err(OperationError::SourceNotAllocated(source_identity(&op.source)));
    }

    let expected = accounts::counter(ctx, &op.source).map_err(OperationError::State)? + 1;
    if op.counter != expected {
        return Err(OperationError::CounterMismatch { expected, got: op.counter });
    }

    if let ManagerContent::Reveal { public_key } = &op.content {
        let already_revealed = revealed_this_batch.contains(&op.source)
            || accounts::manager_key_revealed(ctx, &op.source).map_err(OperationError::State)?;
        if already_revealed {
            return Err(OperationError::MultipleRevelation);
        }
        accounts::reveal_manager_key(ctx, &op.source, public_key).map_err(OperationError::State)?;
        revealed_this_batch.insert(op.source);
    }

    let signer = source_identity(&op.source);
    if !verifier.verify(&signer, entry.watermark, &entry.message, &entry.signature) {
        return Err(OperationError::InvalidSignature);
    }

    accounts::set_counter(ctx, &op.source, op.counter).map_err(OperationError::State)?;
    accounts::debit(ctx, constants, &op.source, op.fee).map_err(map_balance_error)?;
    rollbound_rolls::frozen::credit(ctx, FrozenBucket::Fees, baker, current_cycle, op.fee).map_err(OperationError::State)?;
    Ok(())
}

/// Applies one internal operation's content, recursing into whatever further
/// internal operations it emits. There is no script interpreter in this
/// core (§6 names it a consumed, out-of-scope interface), so `emitted`
/// parameters to [`apply_content`] are always empty today; the recursion and
/// replay-protection bookkeeping are in place for when one is wired in.
fn apply_internal_operation(
    ctx: &mut Context,
    constants: &ProtocolConstants,
    current_cycle: Cycle,
    seen_nonces: &mut HashSet<u32>,
    op: &InternalOperation,
) -> ContentOutcome {
    if !seen_nonces.insert(op.nonce) {
        return ContentOutcome::Failed { errors: vec![OperationError::InternalOperationReplay(op.nonce).to_string()] };
    }
    let fork = ctx.fork();
    match apply_content(ctx, constants, current_cycle, &op.source, &op.content) {
        Ok((balance_updates, emitted)) => {
            let internal_results = apply_internal_operations(ctx, constants, current_cycle, seen_nonces, &emitted);
            let all_ok = internal_results.iter().all(|r| matches!(r, ContentOutcome::Applied { .. }));
            if all_ok {
                ctx.commit(fork);
                ContentOutcome::Applied { balance_updates, internal_results }
            } else {
                ctx.discard(fork);
                ContentOutcome::Failed { errors: vec!["an internal operation in this subtree failed".into()] }
            }
        }
        Err(e) => {
            ctx.discard(fork);
            ContentOutcome::Failed { errors: vec![e.to_string()] }
        }
    }
}

/// FIFO application with the same Applied/Failed/Skipped propagation as the
/// top-level batch: the first failure aborts the remaining queue.
fn apply_internal_operations(
    ctx: &mut Context,
    constants: &ProtocolConstants,
    current_cycle: Cycle,
    seen_nonces: &mut HashSet<u32>,
    ops: &[InternalOperation],
) -> Vec<ContentOutcome> {
    let mut results = Vec::with_capacity(ops.len());
    let mut failed = false;
    for op in ops {
        if failed {
            results.push(ContentOutcome::Skipped);
            continue;
        }
        let outcome = apply_internal_operation(ctx, constants, current_cycle, seen_nonces, op);
        if matches!(outcome, ContentOutcome::Failed { .. }) {
            failed = true;
        }
        results.push(outcome);
    }
    results
}

type BalanceUpdates = Vec<crate::operation::BalanceUpdate>;

/// Executes one content value against the context, returning its balance
/// effects and any internal operations it would emit (always empty without a
/// script interpreter — see [`apply_internal_operation`]).
fn apply_content(
    ctx: &mut Context,
    constants: &ProtocolConstants,
    current_cycle: Cycle,
    source: &ContractAddress,
    content: &ManagerContent,
) -> Result<(BalanceUpdates, Vec<InternalOperation>), OperationError> {
    use crate::operation::{BalanceUpdate, BalanceUpdateKind};
    match content {
        ManagerContent::Reveal { .. } => Ok((Vec::new(), Vec::new())),
        ManagerContent::Transaction { amount, destination, .. } => {
            accounts::debit(ctx, constants, source, *amount).map_err(map_balance_error)?;
            accounts::credit(ctx, constants, destination, *amount).map_err(OperationError::State)?;
            Ok((
                vec![
                    BalanceUpdate { delegate: source_identity(source), cycle: Cycle(0), kind: BalanceUpdateKind::Contract, delta: -(amount.0 as i64) },
                    BalanceUpdate { delegate: source_identity(destination), cycle: Cycle(0), kind: BalanceUpdateKind::Contract, delta: amount.0 as i64 },
                ],
                Vec::new(),
            ))
        }
        ManagerContent::Origination { delegate, credit, .. } => {
            accounts::debit(ctx, constants, source, *credit).map_err(map_balance_error)?;
            let fresh = ctx
                .fresh_contract_from_current_nonce(|bytes| {
                    let digest: [u8; 32] = rollbound_crypto::hash(bytes).map(|d| d.0).unwrap_or([0u8; 32]);
                    digest
                })
                .ok_or(OperationError::State(StateError::StorageError("no origination nonce set for this block".into())))?;
            accounts::credit(ctx, constants, &fresh, *credit).map_err(OperationError::State)?;
            if let Some(d) = delegate {
                accounts::set_delegate(ctx, constants, &fresh, Some(*d)).map_err(OperationError::State)?;
                reactivate_if_inactive(ctx, constants, current_cycle, d).map_err(OperationError::State)?;
            }
            Ok((
                vec![BalanceUpdate { delegate: source_identity(source), cycle: Cycle(0), kind: BalanceUpdateKind::Contract, delta: -(credit.0 as i64) }],
                Vec::new(),
            ))
        }
        ManagerContent::Delegation { delegate } => {
            accounts::set_delegate(ctx, constants, source, *delegate).map_err(OperationError::State)?;
            if let Some(d) = delegate {
                reactivate_if_inactive(ctx, constants, current_cycle, d).map_err(OperationError::State)?;
            }
            Ok((Vec::new(), Vec::new()))
        }
    }
}

/// Designating `delegate` (registering it or delegating to it) is this
/// core's only path back from deactivation, §4.3's `set_active`: a
/// deactivated delegate has no other way to re-enter the active set.
fn reactivate_if_inactive(ctx: &mut Context, constants: &ProtocolConstants, current_cycle: Cycle, delegate: &PublicKeyHash) -> Result<(), StateError> {
    let mut registry = RollRegistry::new(ctx, constants.tokens_per_roll, constants.preserved_cycles);
    if registry.is_inactive(delegate)? {
        registry.set_active(delegate, current_cycle)?;
    }
    Ok(())
}

/// Applies a full manager batch (§4.5, §7 "Batch semantics"): precheck every
/// entry in order first (any precheck failure rejects the whole operation —
/// precheck is not itself subject to per-entry Skipped semantics), then
/// apply each content in its own fork, with the first apply failure marking
/// every following entry `Skipped`.
pub fn apply_manager_batch(
    ctx: &mut Context,
    constants: &ProtocolConstants,
    verifier: &dyn SignatureVerifier,
    baker: &PublicKeyHash,
    current_cycle: Cycle,
    batch: &[ManagerBatchEntry],
) -> Result<OperationResult, OperationError> {
    let mut revealed_this_batch = HashSet::new();
    for entry in batch {
        precheck_one(ctx, constants, verifier, baker, current_cycle, entry, &mut revealed_this_batch)?;
    }

    let mut outcomes = Vec::with_capacity(batch.len());
    let mut failed = false;
    let mut seen_nonces = HashSet::new();
    for entry in batch {
        if failed {
            outcomes.push(ContentOutcome::Skipped);
            continue;
        }
        let fork = ctx.fork();
        match apply_content(ctx, constants, current_cycle, &entry.operation.source, &entry.operation.content) {
            Ok((balance_updates, emitted)) => {
                let internal_results = apply_internal_operations(ctx, constants, current_cycle, &mut seen_nonces, &emitted);
                let all_ok = internal_results.iter().all(|r| matches!(r, ContentOutcome::Applied { .. }));
                if all_ok {
                    ctx.commit(fork);
                    outcomes.push(ContentOutcome::Applied { balance_updates, internal_results });
                } else {
                    ctx.discard(fork);
                    failed = true;
                    outcomes.push(ContentOutcome::Failed { errors: vec!["an internal operation in this content failed".into()] });
                }
            }
            Err(e) => {
                ctx.discard(fork);
                failed = true;
                outcomes.push(ContentOutcome::Failed { errors: vec![e.to_string()] });
            }
        }
    }

    Ok(OperationResult::ManagerBatch { outcomes })
}
