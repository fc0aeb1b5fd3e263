//! Gas and storage-space accounting: per-operation scoped counters with a
//! checkpoint/consumed-since protocol, matching §4.1's
//! `set_limit` / `consumed_since(checkpoint)` / `set_unlimited`.

use rollbound_types::StateError;

/// A single bounded counter (used independently for gas and for
/// storage-space). `None` limit means unlimited.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceMeter {
    consumed: u64,
    limit: Option<u64>,
}

impl ResourceMeter {
    pub fn unlimited() -> Self {
        Self { consumed: 0, limit: None }
    }

    pub fn set_limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    pub fn set_unlimited(&mut self) {
        self.limit = None;
    }

    /// Returns a checkpoint that can later be passed to [`Self::consumed_since`].
    pub fn checkpoint(&self) -> u64 {
        self.consumed
    }

    pub fn consumed_since(&self, checkpoint: u64) -> u64 {
        self.consumed.saturating_sub(checkpoint)
    }

    /// Debits `amount`, failing if doing so would exceed the current limit.
    pub fn consume(&mut self, amount: u64, on_limit: impl FnOnce(u64, u64) -> StateError) -> Result<(), StateError> {
        let next = self.consumed.saturating_add(amount);
        if let Some(limit) = self.limit {
            if next > limit {
                return Err(on_limit(next, limit));
            }
        }
        self.consumed = next;
        Ok(())
    }
}
