//! State-key conventions for the roll registry, following the teacher's
//! practice of fixed, private key-prefix constants per map
//! (`ioi_system::KvSystemState`'s per-registry prefixes in
//! `system/src/lib.rs`).

use rollbound_types::{Cycle, PublicKeyHash, Roll};

const OWNER: &[u8] = b"roll/owner/";
const SUCCESSOR: &[u8] = b"roll/successor/";
const DELEGATE_ROLL_LIST: &[u8] = b"roll/delegate_roll_list/";
const DELEGATE_CHANGE: &[u8] = b"roll/delegate_change/";
const INACTIVE_DELEGATE: &[u8] = b"roll/inactive_delegate/";
const DEACTIVATION_CYCLE: &[u8] = b"roll/deactivation_cycle/";
const DEACTIVATION_SCHEDULE: &[u8] = b"roll/deactivation_schedule/";
const LIMBO_HEAD: &[u8] = b"roll/limbo_head";
const NEXT_ROLL: &[u8] = b"roll/next";
const SNAPSHOT_FOR_CYCLE: &[u8] = b"roll/snapshot_for_cycle/";
const SNAPSHOT_COUNT: &[u8] = b"roll/snapshot_count/";
const LAST_FOR_SNAPSHOT: &[u8] = b"roll/last_for_snapshot/";

pub fn owner(roll: Roll) -> Vec<u8> {
    [OWNER, &roll.0.to_be_bytes()].concat()
}

pub fn successor(roll: Roll) -> Vec<u8> {
    [SUCCESSOR, &roll.0.to_be_bytes()].concat()
}

pub fn delegate_roll_list(delegate: &PublicKeyHash) -> Vec<u8> {
    [DELEGATE_ROLL_LIST, delegate.as_ref()].concat()
}

pub fn delegate_change(delegate: &PublicKeyHash) -> Vec<u8> {
    [DELEGATE_CHANGE, delegate.as_ref()].concat()
}

pub fn inactive_delegate(delegate: &PublicKeyHash) -> Vec<u8> {
    [INACTIVE_DELEGATE, delegate.as_ref()].concat()
}

pub fn deactivation_cycle(delegate: &PublicKeyHash) -> Vec<u8> {
    [DEACTIVATION_CYCLE, delegate.as_ref()].concat()
}

/// Indexes a delegate's scheduled deactivation by the cycle it falls due,
/// so cycle-end processing can find everyone due without scanning every
/// delegate (§4.6 step 7e, "deactivate delegates whose deactivation_cycle
/// <= cycle + 1").
pub fn deactivation_schedule(cycle: Cycle, delegate: &PublicKeyHash) -> Vec<u8> {
    [DEACTIVATION_SCHEDULE, &cycle.0.to_be_bytes()[..], delegate.as_ref()].concat()
}

pub fn deactivation_schedule_prefix() -> Vec<u8> {
    DEACTIVATION_SCHEDULE.to_vec()
}

pub fn limbo_head() -> Vec<u8> {
    LIMBO_HEAD.to_vec()
}

pub fn next_roll() -> Vec<u8> {
    NEXT_ROLL.to_vec()
}

pub fn snapshot_for_cycle(cycle: Cycle) -> Vec<u8> {
    [SNAPSHOT_FOR_CYCLE, &cycle.0.to_be_bytes()].concat()
}

/// How many periodic snapshots have been taken for `cycle` so far — the
/// allocation counter `snapshot_rolls_for_cycle` uses to pick a fresh index,
/// and the `max_index` bound `freeze_rolls_for_cycle` draws a survivor from.
/// Distinct from [`snapshot_for_cycle`], which names the one index currently
/// in use for rights resolution.
pub fn snapshot_count(cycle: Cycle) -> Vec<u8> {
    [SNAPSHOT_COUNT, &cycle.0.to_be_bytes()].concat()
}

pub fn last_for_snapshot(cycle: Cycle, index: u32) -> Vec<u8> {
    [LAST_FOR_SNAPSHOT, &cycle.0.to_be_bytes(), &index.to_be_bytes()].concat()
}

/// The owner-map prefix for a given `(cycle, index)` snapshot tag, built the
/// same way [`owner`] builds the live-map key so a snapshot copy of the live
/// prefix lines up byte-for-byte with post-snapshot reads of the same roll.
pub fn snapshot_tag(cycle: Cycle, index: u32) -> Vec<u8> {
    [b"roll_owner_snapshot/", &cycle.0.to_be_bytes()[..], &index.to_be_bytes()[..]].concat()
}
