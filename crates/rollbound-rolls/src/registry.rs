//! The roll registry (C4): per-delegate linked lists of owned rolls, a limbo
//! freelist, the delegate change accumulator, and cycle-scoped ownership
//! snapshots.
//!
//! Grounded in the teacher's capability-based registry pattern
//! (`ioi_system::KvSystemState` plus its per-concern
//! `ValidatorRegistry`/`EvidenceRegistry` traits in `system/src/lib.rs`):
//! `RollRegistry` is the single typed wrapper over the context, with one
//! private key-prefix constant per map (`keys.rs`) and the
//! linked-list edits expressed as explicit pre/post total-state
//! transformations rather than in-memory pointers, per the "Design Notes"
//! list-integrity requirement.

use crate::keys;
use rollbound_context::{Context, StateAccess};
use rollbound_crypto::{sequence, take_int32, SeedError};
use rollbound_types::{Cycle, Digest32, OperationError, PublicKeyHash, Roll, StateError, Tez};

/// The C3 seed tag `freeze_rolls_for_cycle` draws its surviving-snapshot
/// index under, per spec.md §4.3.
const ROLL_SNAPSHOT_TAG: &[u8] = b"roll_snapshot";

fn seed_expand_error(e: SeedError) -> StateError {
    StateError::Decode(e.to_string())
}

fn read_u32(ctx: &dyn StateAccess, key: &[u8]) -> Result<Option<u32>, StateError> {
    match ctx.get(key)? {
        Some(bytes) => {
            let arr: [u8; 4] = bytes
                .try_into()
                .map_err(|_| StateError::Decode("expected 4-byte integer".into()))?;
            Ok(Some(u32::from_be_bytes(arr)))
        }
        None => Ok(None),
    }
}

fn write_u32(ctx: &mut dyn StateAccess, key: &[u8], value: u32) -> Result<(), StateError> {
    ctx.insert(key, &value.to_be_bytes())
}

fn read_roll(ctx: &dyn StateAccess, key: &[u8]) -> Result<Option<Roll>, StateError> {
    Ok(read_u32(ctx, key)?.map(Roll))
}

fn write_roll(ctx: &mut dyn StateAccess, key: &[u8], roll: Roll) -> Result<(), StateError> {
    write_u32(ctx, key, roll.0)
}

fn read_delegate(ctx: &dyn StateAccess, key: &[u8]) -> Result<Option<PublicKeyHash>, StateError> {
    match ctx.get(key)? {
        Some(bytes) => {
            let arr: [u8; 20] = bytes
                .try_into()
                .map_err(|_| StateError::Decode("expected 20-byte public key hash".into()))?;
            Ok(Some(PublicKeyHash(arr)))
        }
        None => Ok(None),
    }
}

fn write_delegate(ctx: &mut dyn StateAccess, key: &[u8], delegate: &PublicKeyHash) -> Result<(), StateError> {
    ctx.insert(key, delegate.as_ref())
}

fn read_tez(ctx: &dyn StateAccess, key: &[u8]) -> Result<Tez, StateError> {
    match ctx.get(key)? {
        Some(bytes) => {
            let arr: [u8; 8] = bytes.try_into().map_err(|_| StateError::Decode("expected 8-byte tez amount".into()))?;
            Ok(Tez(u64::from_be_bytes(arr)))
        }
        None => Ok(Tez::ZERO),
    }
}

fn write_tez(ctx: &mut dyn StateAccess, key: &[u8], tez: Tez) -> Result<(), StateError> {
    ctx.insert(key, &tez.0.to_be_bytes())
}

/// A typed view over the roll maps, scoped to one [`Context`]. Holds the
/// concrete context (rather than `&mut dyn StateAccess`) because
/// [`snapshot_rolls_for_cycle`](Self::snapshot_rolls_for_cycle) and
/// [`clear_cycle`](Self::clear_cycle) need the context's copy-snapshot
/// store, not just plain key-value access.
pub struct RollRegistry<'a> {
    ctx: &'a mut Context,
    tokens_per_roll: Tez,
    preserved_cycles: u32,
}

impl<'a> RollRegistry<'a> {
    pub fn new(ctx: &'a mut Context, tokens_per_roll: Tez, preserved_cycles: u32) -> Self {
        Self { ctx, tokens_per_roll, preserved_cycles }
    }

    fn next_roll(&self) -> Result<Roll, StateError> {
        Ok(Roll(read_u32(self.ctx, &keys::next_roll())?.unwrap_or(0)))
    }

    fn set_next_roll(&mut self, roll: Roll) -> Result<(), StateError> {
        write_u32(self.ctx, &keys::next_roll(), roll.0)
    }

    fn pop_limbo(&mut self) -> Result<Roll, StateError> {
        match read_roll(self.ctx, &keys::limbo_head())? {
            Some(head) => {
                let succ = read_roll(self.ctx, &keys::successor(head))?;
                match succ {
                    Some(s) => write_roll(self.ctx, &keys::limbo_head(), s)?,
                    None => self.ctx.delete(&keys::limbo_head())?,
                }
                self.ctx.delete(&keys::successor(head))?;
                Ok(head)
            }
            None => {
                let fresh = self.next_roll()?;
                self.set_next_roll(fresh.next())?;
                Ok(fresh)
            }
        }
    }

    fn push_limbo(&mut self, roll: Roll) -> Result<(), StateError> {
        if let Some(head) = read_roll(self.ctx, &keys::limbo_head())? {
            write_roll(self.ctx, &keys::successor(roll), head)?;
        } else {
            self.ctx.delete(&keys::successor(roll))?;
        }
        write_roll(self.ctx, &keys::limbo_head(), roll)
    }

    /// Whether `delegate` currently carries the `Inactive_delegate` flag.
    pub fn is_inactive(&self, delegate: &PublicKeyHash) -> Result<bool, StateError> {
        self.ctx.mem(&keys::inactive_delegate(delegate))
    }

    /// The cycle `delegate` is currently scheduled to become inactive at, if
    /// it has one scheduled.
    pub fn deactivation_cycle(&self, delegate: &PublicKeyHash) -> Result<Option<Cycle>, StateError> {
        Ok(read_u32(self.ctx, &keys::deactivation_cycle(delegate))?.map(Cycle))
    }

    /// `change(D)`, §4.3: the tez accumulated toward `D`'s next roll, below
    /// `tokens_per_roll`. Public so callers can check Invariant 1
    /// (`change(D) + |rolls(D)| * tokens_per_roll == total_delegated_stake(D)`).
    pub fn change(&self, delegate: &PublicKeyHash) -> Result<Tez, StateError> {
        read_tez(self.ctx, &keys::delegate_change(delegate))
    }

    fn set_change(&mut self, delegate: &PublicKeyHash, change: Tez) -> Result<(), StateError> {
        write_tez(self.ctx, &keys::delegate_change(delegate), change)
    }

    fn list_head(&self, delegate: &PublicKeyHash) -> Result<Option<Roll>, StateError> {
        read_roll(self.ctx, &keys::delegate_roll_list(delegate))
    }

    fn set_list_head(&mut self, delegate: &PublicKeyHash, head: Option<Roll>) -> Result<(), StateError> {
        match head {
            Some(r) => write_roll(self.ctx, &keys::delegate_roll_list(delegate), r),
            None => self.ctx.delete(&keys::delegate_roll_list(delegate)),
        }
    }

    /// Pushes one freshly drawn (or recycled) roll onto `delegate`'s list and
    /// records its ownership, returning the roll id.
    fn push_roll_to_delegate(&mut self, delegate: &PublicKeyHash) -> Result<Roll, StateError> {
        let roll = self.pop_limbo()?;
        let old_head = self.list_head(delegate)?;
        match old_head {
            Some(h) => write_roll(self.ctx, &keys::successor(roll), h)?,
            None => self.ctx.delete(&keys::successor(roll))?,
        }
        write_delegate(self.ctx, &keys::owner(roll), delegate)?;
        self.set_list_head(delegate, Some(roll))?;
        Ok(roll)
    }

    /// Pops `delegate`'s head roll, pushing it back to limbo. Returns the
    /// popped roll, or `None` if the delegate's list was already empty.
    fn pop_roll_from_delegate(&mut self, delegate: &PublicKeyHash) -> Result<Option<Roll>, StateError> {
        match self.list_head(delegate)? {
            Some(head) => {
                let next = read_roll(self.ctx, &keys::successor(head))?;
                self.ctx.delete(&keys::owner(head))?;
                self.ctx.delete(&keys::successor(head))?;
                self.set_list_head(delegate, next)?;
                self.push_limbo(head)?;
                Ok(Some(head))
            }
            None => Ok(None),
        }
    }

    /// `add_amount(ctx, delegate, amount)`, §4.3.
    pub fn add_amount(&mut self, delegate: &PublicKeyHash, amount: Tez) -> Result<(), StateError> {
        let mut change = self.change(delegate)?.checked_add(amount)?;
        while !self.is_inactive(delegate)? && change.0 >= self.tokens_per_roll.0 {
            self.push_roll_to_delegate(delegate)?;
            change = change.checked_sub(self.tokens_per_roll)?;
        }
        self.set_change(delegate, change)
    }

    /// `remove_amount(ctx, delegate, amount)`, §4.3. Callers are expected to
    /// have checked `amount` against the delegate's total staked tez
    /// (invariant 1); if they haven't, an exhausted roll list surfaces as an
    /// `Underflow` from the final `checked_sub` rather than silently
    /// clamping.
    pub fn remove_amount(&mut self, delegate: &PublicKeyHash, amount: Tez) -> Result<(), StateError> {
        let mut change = self.change(delegate)?;
        while !self.is_inactive(delegate)? && amount.0 > change.0 {
            match self.pop_roll_from_delegate(delegate)? {
                Some(_) => change = change.checked_add(self.tokens_per_roll)?,
                None => break,
            }
        }
        change = change.checked_sub(amount)?;
        self.set_change(delegate, change)?;

        let inactive = self.is_inactive(delegate)?;
        if !inactive && change.is_zero() && self.list_head(delegate)?.is_none() {
            self.ctx.delete(&keys::delegate_change(delegate))?;
        }
        Ok(())
    }

    /// `set_inactive(delegate)`, §4.3: drains every owned roll into limbo,
    /// crediting `change` for each one.
    pub fn set_inactive(&mut self, delegate: &PublicKeyHash) -> Result<(), StateError> {
        self.ctx.insert(&keys::inactive_delegate(delegate), &[1])?;
        let mut change = self.change(delegate)?;
        while self.pop_roll_from_delegate(delegate)?.is_some() {
            change = change.checked_add(self.tokens_per_roll)?;
        }
        self.set_change(delegate, change)
    }

    /// `set_active(delegate)`, §4.3: clears the inactive flag, re-creates
    /// rolls from the accumulated `change` as `add_amount` would, and pushes
    /// `deactivation_cycle` out so the delegate isn't immediately due again
    /// at the next cycle boundary. If it was previously inactive, the
    /// horizon resets to `max(current, current_cycle + 1 + preserved_cycles)`;
    /// otherwise it simply extends the existing horizon by `preserved_cycles`.
    pub fn set_active(&mut self, delegate: &PublicKeyHash, current_cycle: Cycle) -> Result<(), StateError> {
        let was_inactive = self.is_inactive(delegate)?;
        self.ctx.delete(&keys::inactive_delegate(delegate))?;
        let mut change = self.change(delegate)?;
        while change.0 >= self.tokens_per_roll.0 {
            self.push_roll_to_delegate(delegate)?;
            change = change.checked_sub(self.tokens_per_roll)?;
        }
        self.set_change(delegate, change)?;

        let existing = read_u32(self.ctx, &keys::deactivation_cycle(delegate))?.unwrap_or(current_cycle.0);
        let horizon = if was_inactive {
            existing.max(current_cycle.0.saturating_add(1).saturating_add(self.preserved_cycles))
        } else {
            existing.saturating_add(self.preserved_cycles)
        };
        self.schedule_deactivation(delegate, Cycle(horizon))
    }

    /// `snapshot_rolls_for_cycle(cycle)`, §4.3: copy-snapshots the live
    /// `Owner` map under a fresh `(cycle, index)` tag, records the current
    /// `next_roll` bound for later rejection sampling, and points
    /// `Snapshot_for_cycle[cycle]` at the snapshot just written so rights
    /// resolution always names an index that actually exists.
    pub fn snapshot_rolls_for_cycle(&mut self, cycle: Cycle) -> Result<(), StateError> {
        let index = read_u32(self.ctx, &keys::snapshot_count(cycle))?.unwrap_or(0);
        let tag = keys::snapshot_tag(cycle, index);
        self.ctx.take_snapshot(b"roll/owner/", tag);
        let next_roll = self.next_roll()?;
        write_u32(self.ctx, &keys::last_for_snapshot(cycle, index), next_roll.0)?;
        write_u32(self.ctx, &keys::snapshot_count(cycle), index + 1)?;
        write_u32(self.ctx, &keys::snapshot_for_cycle(cycle), index)
    }

    /// `freeze_rolls_for_cycle(cycle)`, §4.3: draws one surviving index among
    /// the periodic snapshots taken for `cycle` via the C3 seed sequence
    /// keyed on `"roll_snapshot"`, deletes every other snapshot (and its
    /// `Last_for_snapshot` entry), and points `Snapshot_for_cycle[cycle]` at
    /// the survivor. Drawing the survivor only now, after every periodic
    /// snapshot for the cycle has already been taken, is what prevents a
    /// baker from grinding which snapshot ends up deciding rights. A no-op
    /// if no periodic snapshot was ever taken for `cycle`.
    pub fn freeze_rolls_for_cycle(&mut self, seed: Digest32, cycle: Cycle) -> Result<(), StateError> {
        let max_index = read_u32(self.ctx, &keys::snapshot_count(cycle))?.unwrap_or(0);
        if max_index == 0 {
            return Ok(());
        }

        let mut seq = sequence(seed, ROLL_SNAPSHOT_TAG, cycle.0).map_err(seed_expand_error)?;
        let survivor = take_int32(&mut seq, max_index).map_err(seed_expand_error)?;

        for index in 0..max_index {
            if index != survivor {
                self.ctx.snapshots.delete(&keys::snapshot_tag(cycle, index));
                self.ctx.delete(&keys::last_for_snapshot(cycle, index))?;
            }
        }
        write_u32(self.ctx, &keys::snapshot_for_cycle(cycle), survivor)?;
        self.ctx.delete(&keys::snapshot_count(cycle))
    }

    pub fn current_snapshot_index(&self, cycle: Cycle) -> Result<Option<u32>, StateError> {
        read_u32(self.ctx, &keys::snapshot_for_cycle(cycle))
    }

    pub fn last_for_snapshot(&self, cycle: Cycle, index: u32) -> Result<Option<u32>, StateError> {
        read_u32(self.ctx, &keys::last_for_snapshot(cycle, index))
    }

    /// `clear_cycle(cycle)`, §4.3: deletes the surviving snapshot (both its
    /// copied contents and the registry's own per-cycle bookkeeping) for
    /// `cycle`.
    pub fn clear_cycle(&mut self, cycle: Cycle) -> Result<(), StateError> {
        if let Some(index) = self.current_snapshot_index(cycle)? {
            self.ctx.snapshots.delete(&keys::snapshot_tag(cycle, index));
            self.ctx.delete(&keys::last_for_snapshot(cycle, index))?;
        }
        self.ctx.delete(&keys::snapshot_count(cycle))?;
        self.ctx.delete(&keys::snapshot_for_cycle(cycle))
    }

    pub fn preserved_cycles(&self) -> u32 {
        self.preserved_cycles
    }

    /// `init empty Snapshot_for_cycle(cycle)`, §4.6 step 7d: makes the cycle's
    /// snapshot counter explicit at zero rather than leaving it implicit by
    /// absence, so a later `current_snapshot_index` reports `Some(0)` before
    /// the cycle's first periodic snapshot is taken.
    pub fn init_snapshot_cycle(&mut self, cycle: Cycle) -> Result<(), StateError> {
        if self.current_snapshot_index(cycle)?.is_none() {
            write_u32(self.ctx, &keys::snapshot_for_cycle(cycle), 0)?;
        }
        Ok(())
    }

    /// Schedules `delegate` to become inactive at `cycle` unless it is
    /// re-activated first, replacing any previously scheduled cycle.
    pub fn schedule_deactivation(&mut self, delegate: &PublicKeyHash, cycle: Cycle) -> Result<(), StateError> {
        if let Some(previous) = read_u32(self.ctx, &keys::deactivation_cycle(delegate))? {
            self.ctx.delete(&keys::deactivation_schedule(Cycle(previous), delegate))?;
        }
        write_u32(self.ctx, &keys::deactivation_cycle(delegate), cycle.0)?;
        self.ctx.insert(&keys::deactivation_schedule(cycle, delegate), &[1])
    }

    /// `deactivate delegates whose deactivation_cycle <= cycle`, §4.6 step
    /// 7e: finds every delegate scheduled at or before `cycle`, marks them
    /// inactive, and clears their schedule entry.
    pub fn deactivate_due_by(&mut self, cycle: Cycle) -> Result<Vec<PublicKeyHash>, StateError> {
        let prefix = keys::deactivation_schedule_prefix();
        let due: Vec<(Vec<u8>, PublicKeyHash)> = self
            .ctx
            .prefix_scan(&prefix)
            .into_iter()
            .filter_map(|(key, _)| {
                let rest = &key[prefix.len()..];
                if rest.len() < 4 + 20 {
                    return None;
                }
                let cycle_bytes: [u8; 4] = rest[0..4].try_into().ok()?;
                let scheduled = Cycle(u32::from_be_bytes(cycle_bytes));
                if scheduled.0 > cycle.0 {
                    return None;
                }
                let pkh_bytes: [u8; 20] = rest[4..24].try_into().ok()?;
                Some((key.clone(), PublicKeyHash(pkh_bytes)))
            })
            .collect();

        let mut deactivated = Vec::with_capacity(due.len());
        for (key, delegate) in due {
            self.ctx.delete(&key)?;
            self.ctx.delete(&keys::deactivation_cycle(&delegate))?;
            if !self.is_inactive(&delegate)? {
                self.set_inactive(&delegate)?;
            }
            deactivated.push(delegate);
        }
        Ok(deactivated)
    }

    pub fn owner_of(&self, roll: Roll) -> Result<Option<PublicKeyHash>, StateError> {
        read_delegate(self.ctx, &keys::owner(roll))
    }
}

/// Looks up `No_roll_snapshot_for_cycle` when the registry has no surviving
/// snapshot index for `cycle` — the precondition [`crate::rights::owner`]
/// checks before drawing.
pub fn require_snapshot_index(registry: &RollRegistry<'_>, cycle: Cycle) -> Result<u32, OperationError> {
    registry
        .current_snapshot_index(cycle)?
        .ok_or(OperationError::NoRollSnapshotForCycle(cycle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollbound_context::MapStore;

    fn new_ctx() -> Context {
        Context::new(MapStore::new())
    }

    fn pkh(b: u8) -> PublicKeyHash {
        PublicKeyHash([b; 20])
    }

    #[test]
    fn add_amount_allocates_rolls_once_threshold_crossed() {
        let mut ctx = new_ctx();
        let mut registry = RollRegistry::new(&mut ctx, Tez::from_mutez(100), 2);
        let d = pkh(1);
        registry.add_amount(&d, Tez::from_mutez(250)).unwrap();

        assert_eq!(registry.change(&d).unwrap(), Tez::from_mutez(50));
        let head = registry.list_head(&d).unwrap();
        assert!(head.is_some());
    }

    #[test]
    fn add_then_remove_same_amount_restores_change_and_limbo_grows() {
        let mut ctx = new_ctx();
        let mut registry = RollRegistry::new(&mut ctx, Tez::from_mutez(100), 2);
        let d = pkh(2);
        registry.add_amount(&d, Tez::from_mutez(250)).unwrap();
        registry.remove_amount(&d, Tez::from_mutez(150)).unwrap();

        assert_eq!(registry.change(&d).unwrap(), Tez::from_mutez(0));
        assert!(registry.list_head(&d).unwrap().is_some());
    }

    #[test]
    fn roll_conservation_scenario_from_testable_properties() {
        // Add 2.5 rolls, then remove 1.5 rolls: delegate ends with 1 roll and
        // zero change; next_roll increases by 2 (two rolls allocated, one
        // returned to limbo and not reallocated).
        let mut ctx = new_ctx();
        let mut registry = RollRegistry::new(&mut ctx, Tez::from_mutez(100), 2);
        let d = pkh(3);
        registry.add_amount(&d, Tez::from_mutez(250)).unwrap();
        assert_eq!(registry.next_roll().unwrap(), Roll(2));

        registry.remove_amount(&d, Tez::from_mutez(150)).unwrap();
        assert_eq!(registry.change(&d).unwrap(), Tez::from_mutez(0));
        assert_eq!(registry.next_roll().unwrap(), Roll(2));

        let head = registry.list_head(&d).unwrap().expect("one roll remains");
        assert!(registry.successor_of(head).unwrap().is_none());
    }

    #[test]
    fn scheduled_deactivation_fires_only_once_due() {
        let mut ctx = new_ctx();
        let mut registry = RollRegistry::new(&mut ctx, Tez::from_mutez(100), 2);
        let d = pkh(6);
        registry.add_amount(&d, Tez::from_mutez(100)).unwrap();
        registry.schedule_deactivation(&d, Cycle(5)).unwrap();

        assert!(registry.deactivate_due_by(Cycle(4)).unwrap().is_empty());
        assert!(!registry.is_inactive(&d).unwrap());

        let due = registry.deactivate_due_by(Cycle(5)).unwrap();
        assert_eq!(due, vec![d]);
        assert!(registry.is_inactive(&d).unwrap());

        assert!(registry.deactivate_due_by(Cycle(10)).unwrap().is_empty());
    }

    #[test]
    fn set_inactive_then_active_round_trips_roll_count() {
        let mut ctx = new_ctx();
        let mut registry = RollRegistry::new(&mut ctx, Tez::from_mutez(100), 2);
        let d = pkh(4);
        registry.add_amount(&d, Tez::from_mutez(300)).unwrap();
        assert!(registry.list_head(&d).unwrap().is_some());

        registry.set_inactive(&d).unwrap();
        assert!(registry.list_head(&d).unwrap().is_none());
        assert_eq!(registry.change(&d).unwrap(), Tez::from_mutez(300));

        registry.set_active(&d, Cycle(4)).unwrap();
        assert!(registry.list_head(&d).unwrap().is_some());
        assert_eq!(registry.change(&d).unwrap(), Tez::from_mutez(0));
        // Previously inactive: horizon resets to current_cycle + 1 + preserved_cycles.
        assert_eq!(registry.deactivation_cycle(&d).unwrap(), Some(Cycle(7)));
    }

    #[test]
    fn set_active_on_an_already_active_delegate_extends_by_preserved_cycles() {
        let mut ctx = new_ctx();
        let mut registry = RollRegistry::new(&mut ctx, Tez::from_mutez(100), 2);
        let d = pkh(11);
        registry.add_amount(&d, Tez::from_mutez(100)).unwrap();
        registry.schedule_deactivation(&d, Cycle(10)).unwrap();

        registry.set_active(&d, Cycle(4)).unwrap();
        assert_eq!(registry.deactivation_cycle(&d).unwrap(), Some(Cycle(12)));
    }

    #[test]
    fn snapshot_then_clear_matches_owner_map_at_snapshot_instant() {
        let mut ctx = new_ctx();
        let mut registry = RollRegistry::new(&mut ctx, Tez::from_mutez(100), 2);
        let d = pkh(5);
        registry.add_amount(&d, Tez::from_mutez(100)).unwrap();
        let roll = registry.list_head(&d).unwrap().unwrap();

        registry.snapshot_rolls_for_cycle(Cycle(7)).unwrap();
        assert_eq!(registry.current_snapshot_index(Cycle(7)).unwrap(), Some(0));
        assert_eq!(registry.last_for_snapshot(Cycle(7), 0).unwrap(), Some(1));

        // Ownership changes after the snapshot must not be visible in it.
        registry.remove_amount(&d, Tez::from_mutez(100)).unwrap();
        assert_eq!(
            ctx.snapshots.read(&keys::snapshot_tag(Cycle(7), 0), &keys::owner(roll)).unwrap(),
            Some(d.as_ref().to_vec())
        );

        let mut registry = RollRegistry::new(&mut ctx, Tez::from_mutez(100), 2);
        registry.clear_cycle(Cycle(7)).unwrap();
        assert_eq!(registry.current_snapshot_index(Cycle(7)).unwrap(), None);
        assert!(!ctx.snapshots.exists(&keys::snapshot_tag(Cycle(7), 0)));
    }

    #[test]
    fn freeze_rolls_for_cycle_leaves_exactly_one_surviving_snapshot() {
        let mut ctx = new_ctx();
        let mut registry = RollRegistry::new(&mut ctx, Tez::from_mutez(100), 2);
        let d = pkh(7);
        registry.add_amount(&d, Tez::from_mutez(100)).unwrap();
        for _ in 0..4 {
            registry.snapshot_rolls_for_cycle(Cycle(3)).unwrap();
        }
        assert_eq!(
            read_u32(&ctx, &keys::snapshot_count(Cycle(3))).unwrap(),
            Some(4)
        );

        let mut registry = RollRegistry::new(&mut ctx, Tez::from_mutez(100), 2);
        registry.freeze_rolls_for_cycle(Digest32([2u8; 32]), Cycle(3)).unwrap();

        let surviving = registry.current_snapshot_index(Cycle(3)).unwrap().expect("a survivor is recorded");
        assert!(surviving < 4);
        let mut survivors = 0;
        for index in 0..4 {
            if ctx.snapshots.exists(&keys::snapshot_tag(Cycle(3), index)) {
                survivors += 1;
                assert_eq!(index, surviving);
            }
        }
        assert_eq!(survivors, 1);
        assert_eq!(read_u32(&ctx, &keys::snapshot_count(Cycle(3))).unwrap(), None);
    }

    #[test]
    fn freeze_rolls_for_cycle_is_a_no_op_when_nothing_was_snapshotted() {
        let mut ctx = new_ctx();
        let mut registry = RollRegistry::new(&mut ctx, Tez::from_mutez(100), 2);
        registry.freeze_rolls_for_cycle(Digest32([2u8; 32]), Cycle(9)).unwrap();
        assert_eq!(registry.current_snapshot_index(Cycle(9)).unwrap(), None);
    }
}

impl<'a> RollRegistry<'a> {
    #[cfg(test)]
    fn successor_of(&self, roll: Roll) -> Result<Option<Roll>, StateError> {
        read_roll(self.ctx, &keys::successor(roll))
    }
}
