//! Immutable, tag-keyed copies of a key prefix, used by the roll registry to
//! freeze `Owner` at cycle boundaries (§4.1, §4.3). Realized as a plain
//! cloned `BTreeMap` per tag — an O(1) *logical* copy as the spec requires;
//! we don't special-case structural sharing, matching the design note that
//! physical sharing is an implementation detail left open.

use rollbound_types::StateError;
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone)]
pub struct SnapshotStore {
    snapshots: BTreeMap<Vec<u8>, BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies every entry under `prefix`, as currently visible, into a new
    /// immutable snapshot keyed by `tag`. Overwrites any existing snapshot
    /// under the same tag.
    pub fn snapshot<'a>(
        &mut self,
        tag: Vec<u8>,
        entries: impl Iterator<Item = (&'a [u8], &'a [u8])>,
    ) {
        let copy: BTreeMap<Vec<u8>, Vec<u8>> =
            entries.map(|(k, v)| (k.to_vec(), v.to_vec())).collect();
        self.snapshots.insert(tag, copy);
    }

    pub fn exists(&self, tag: &[u8]) -> bool {
        self.snapshots.contains_key(tag)
    }

    pub fn delete(&mut self, tag: &[u8]) {
        self.snapshots.remove(tag);
    }

    pub fn read(&self, tag: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        match self.snapshots.get(tag) {
            Some(map) => Ok(map.get(key).cloned()),
            None => Err(StateError::UnknownSnapshot),
        }
    }

    /// All `(key, value)` pairs in the snapshot, in key order. Used by rights
    /// selection to look up the owner of a drawn roll.
    pub fn iter(&self, tag: &[u8]) -> Result<impl Iterator<Item = (&[u8], &[u8])>, StateError> {
        self.snapshots
            .get(tag)
            .map(|map| map.iter().map(|(k, v)| (k.as_slice(), v.as_slice())))
            .ok_or(StateError::UnknownSnapshot)
    }
}
