//! The base key-value interface, consumed behind `&dyn StateAccess` so the
//! rest of the core never depends on a concrete storage backend — mirroring
//! `ioi_api::state::StateAccess`, the teacher's dyn-safe storage trait.

use rollbound_types::StateError;

/// A dyn-safe key-value accessor. The transition function is written
/// entirely in terms of this trait; which concrete store backs it (an
/// in-memory map for tests, a persistent backend in a real node) is an
/// external collaborator's concern, as called out in the core's scope.
pub trait StateAccess: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError>;
    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError>;
    fn delete(&mut self, key: &[u8]) -> Result<(), StateError>;

    fn mem(&self, key: &[u8]) -> Result<bool, StateError> {
        Ok(self.get(key)?.is_some())
    }
}

/// An in-memory `StateAccess` implementation backed by a sorted map. Stands
/// in for the external, persistent key-value backend named out of scope in
/// the core's purpose statement; sufficient for deterministic tests and for
/// driving the transition function outside of a real node.
#[derive(Debug, Default, Clone)]
pub struct MapStore {
    entries: std::collections::BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MapStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterates all entries whose key starts with `prefix`, in key order.
    pub fn prefix_iter<'a>(&'a self, prefix: &'a [u8]) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        self.entries
            .range(prefix.to_vec()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

impl StateAccess for MapStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self.entries.get(key).cloned())
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        self.entries.remove(key);
        Ok(())
    }
}
