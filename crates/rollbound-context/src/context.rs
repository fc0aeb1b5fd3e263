//! The top-level `Context`: a `MapStore` base overlaid by a stack of
//! copy-on-write forks, plus the gas/storage meters, snapshot registry, and
//! origination nonce the core threads through block and operation
//! application. This is the "context" referenced everywhere in §4 and §5 —
//! the single mutable state value every pure transition function takes and
//! returns.

use crate::accessor::{MapStore, StateAccess};
use crate::nonce::OriginationNonce;
use crate::resource::ResourceMeter;
use crate::snapshot::SnapshotStore;
use rollbound_types::{BlockHash, StateError};
use std::collections::BTreeMap;

/// A write-set local to one fork level. `None` marks a delete.
type WriteSet = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

/// A handle to an open fork, returned by [`Context::fork`]. Must be passed
/// back to exactly one of [`Context::commit`] / [`Context::discard`], and
/// only while it is the innermost open fork — nested forks must be
/// closed in LIFO order, matching the single-threaded, backtracking
/// execution model of §5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkId(usize);

pub struct Context {
    base: MapStore,
    forks: Vec<WriteSet>,
    pub snapshots: SnapshotStore,
    pub gas: ResourceMeter,
    pub storage_space: ResourceMeter,
    origination_nonce: Option<OriginationNonce>,
}

impl Context {
    pub fn new(base: MapStore) -> Self {
        Self {
            base,
            forks: Vec::new(),
            snapshots: SnapshotStore::new(),
            gas: ResourceMeter::unlimited(),
            storage_space: ResourceMeter::unlimited(),
            origination_nonce: None,
        }
    }

    /// Opens a new fork on top of the current state. Every subsequent
    /// `get`/`insert`/`delete` is visible only within this fork until it is
    /// committed or discarded.
    pub fn fork(&mut self) -> ForkId {
        self.forks.push(WriteSet::new());
        ForkId(self.forks.len() - 1)
    }

    /// Adopts the writes of the innermost fork into its parent (or into the
    /// base store, if it was the outermost fork). The fee/counter effects a
    /// caller wants to survive a later `discard` must be written *before*
    /// opening the fork they want to be able to back out of.
    pub fn commit(&mut self, fork: ForkId) {
        assert_eq!(fork.0, self.forks.len() - 1, "forks must be closed in LIFO order");
        let writes = self.forks.pop().expect("fork stack not empty");
        match self.forks.last_mut() {
            Some(parent) => parent.extend(writes),
            None => {
                for (key, value) in writes {
                    match value {
                        Some(v) => {
                            let _ = self.base.insert(&key, &v);
                        }
                        None => {
                            let _ = self.base.delete(&key);
                        }
                    }
                }
            }
        }
    }

    /// Drops the innermost fork's writes entirely. This is how the pipeline
    /// backtracks a failed internal operation or a failed manager-operation
    /// content while leaving everything written before the fork was opened
    /// (fees, counters) intact.
    pub fn discard(&mut self, fork: ForkId) {
        assert_eq!(fork.0, self.forks.len() - 1, "forks must be closed in LIFO order");
        self.forks.pop();
    }

    pub fn depth(&self) -> usize {
        self.forks.len()
    }

    pub fn set_origination_nonce(&mut self, block_hash: BlockHash) {
        self.origination_nonce = Some(OriginationNonce::new(block_hash));
    }

    pub fn unset_origination_nonce(&mut self) {
        self.origination_nonce = None;
    }

    pub fn fresh_contract_from_current_nonce(
        &mut self,
        hash_fn: impl Fn(&[u8]) -> [u8; 32],
    ) -> Option<rollbound_types::ContractAddress> {
        self.origination_nonce.as_mut().map(|n| n.next_address(hash_fn))
    }

    /// Iterates all entries currently visible under `prefix` (overlay writes
    /// merged over the base), in key order. Used by `snapshot()` to copy a
    /// sub-tree.
    pub fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut merged: BTreeMap<Vec<u8>, Option<Vec<u8>>> = BTreeMap::new();
        for (k, v) in self.base.prefix_iter(prefix) {
            merged.insert(k.to_vec(), Some(v.to_vec()));
        }
        for fork in &self.forks {
            for (k, v) in fork.range(prefix.to_vec()..) {
                if !k.starts_with(prefix) {
                    continue;
                }
                merged.insert(k.clone(), v.clone());
            }
        }
        merged
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect()
    }

    /// Copies every entry under `prefix` into an immutable snapshot keyed by
    /// `tag` (§4.1's `snapshot(path, tag)`).
    pub fn take_snapshot(&mut self, prefix: &[u8], tag: Vec<u8>) {
        let entries = self.prefix_scan(prefix);
        let refs = entries.iter().map(|(k, v)| (k.as_slice(), v.as_slice()));
        self.snapshots.snapshot(tag, refs);
    }
}

impl StateAccess for Context {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        for fork in self.forks.iter().rev() {
            if let Some(v) = fork.get(key) {
                return Ok(v.clone());
            }
        }
        self.base.get(key)
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        match self.forks.last_mut() {
            Some(top) => {
                top.insert(key.to_vec(), Some(value.to_vec()));
                Ok(())
            }
            None => self.base.insert(key, value),
        }
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        match self.forks.last_mut() {
            Some(top) => {
                top.insert(key.to_vec(), None);
                Ok(())
            }
            None => self.base.delete(key),
        }
    }
}
