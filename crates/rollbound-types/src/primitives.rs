//! Core primitive types shared by every component of the core: levels, cycles,
//! rolls, tez amounts with checked arithmetic, and the opaque hash/key types
//! the rest of the workspace threads around.

use crate::constants::ProtocolConstants;
use crate::error::ArithError;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte BLAKE3/SHA-256-family digest, used for block hashes, operation
/// hashes, nonce hashes and evidence ids alike.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Digest32(pub [u8; 32]);

impl fmt::Debug for Digest32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl AsRef<[u8]> for Digest32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Digest32 {
    fn from(v: [u8; 32]) -> Self {
        Self(v)
    }
}

/// A block hash. Distinct newtype from [`OperationHash`] so the two can never
/// be confused at a call site, even though both are 32-byte digests.
pub type BlockHash = Digest32;
/// The hash of a signed operation envelope.
pub type OperationHash = Digest32;
/// The hash committed to in a seed-nonce commitment.
pub type NonceHash = Digest32;

/// A public-key hash identifying a delegate or implicit account. Opaque at
/// this layer — the cryptography crate owns how it is derived from a key.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKeyHash(pub [u8; 20]);

impl fmt::Debug for PublicKeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkh:{}", hex::encode(self.0))
    }
}

impl AsRef<[u8]> for PublicKeyHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A contract address. Implicit accounts and originated contracts share this
/// representation; which one it is follows from how it was produced.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ContractAddress(pub [u8; 20]);

/// An opaque, process-wide monotonic roll id. Never renumbered; a deleted
/// roll returns to limbo rather than being reused under a new id.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Roll(pub u32);

impl Roll {
    pub fn next(self) -> Roll {
        Roll(self.0 + 1)
    }
}

/// A non-negative integer cycle number.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Cycle(pub u32);

impl Cycle {
    pub fn succ(self) -> Cycle {
        Cycle(self.0 + 1)
    }

    pub fn pred(self) -> Option<Cycle> {
        self.0.checked_sub(1).map(Cycle)
    }

    pub fn checked_add(self, n: u32) -> Cycle {
        Cycle(self.0 + n)
    }

    pub fn checked_sub(self, n: u32) -> Option<Cycle> {
        self.0.checked_sub(n).map(Cycle)
    }
}

/// A raw block level plus everything derivable from it given the protocol
/// constants: its cycle, its position within that cycle, the voting period it
/// falls in, and whether this level is expected to carry a seed-nonce
/// commitment.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Level {
    pub level: u32,
    pub cycle: Cycle,
    pub cycle_position: u32,
    pub voting_period: u32,
    pub expected_commitment: bool,
}

impl Level {
    /// Derives a full `Level` from a raw integer level and the protocol
    /// constants in effect. `level` is 0-indexed (genesis is level 0, which
    /// always falls in cycle 0 at position 0).
    pub fn from_raw(level: u32, constants: &ProtocolConstants) -> Level {
        let cycle = Cycle(level / constants.blocks_per_cycle);
        let cycle_position = level % constants.blocks_per_cycle;
        let voting_period = level / constants.blocks_per_voting_period;
        let expected_commitment = cycle_position < constants.blocks_per_commitment;
        Level {
            level,
            cycle,
            cycle_position,
            voting_period,
            expected_commitment,
        }
    }

    pub fn pred(&self, constants: &ProtocolConstants) -> Option<Level> {
        self.level.checked_sub(1).map(|l| Level::from_raw(l, constants))
    }
}

/// A money amount denominated in the smallest indivisible unit ("mutez"),
/// with checked arithmetic — every operation that could wrap returns an
/// error rather than silently wrapping.
#[derive(Encode, Decode, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tez(pub u64);

impl fmt::Debug for Tez {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}tz", self.0 / 1_000_000, self.0 % 1_000_000)
    }
}

impl Tez {
    pub const ZERO: Tez = Tez(0);

    pub fn from_mutez(v: u64) -> Tez {
        Tez(v)
    }

    pub fn checked_add(self, other: Tez) -> Result<Tez, ArithError> {
        self.0.checked_add(other.0).map(Tez).ok_or(ArithError::Overflow)
    }

    pub fn checked_sub(self, other: Tez) -> Result<Tez, ArithError> {
        self.0.checked_sub(other.0).map(Tez).ok_or(ArithError::Underflow)
    }

    pub fn checked_mul(self, n: u64) -> Result<Tez, ArithError> {
        self.0.checked_mul(n).map(Tez).ok_or(ArithError::Overflow)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tez_checked_arithmetic() {
        let a = Tez::from_mutez(u64::MAX);
        assert_eq!(a.checked_add(Tez::from_mutez(1)), Err(ArithError::Overflow));
        assert_eq!(Tez::ZERO.checked_sub(Tez::from_mutez(1)), Err(ArithError::Underflow));
        assert_eq!(Tez::from_mutez(3).checked_mul(4), Ok(Tez::from_mutez(12)));
    }

    #[test]
    fn level_derivation_matches_cycle_boundaries() {
        let constants = ProtocolConstants {
            blocks_per_cycle: 8,
            blocks_per_voting_period: 32,
            blocks_per_commitment: 4,
            ..ProtocolConstants::default()
        };
        let l0 = Level::from_raw(0, &constants);
        assert_eq!(l0.cycle, Cycle(0));
        assert!(l0.expected_commitment);

        let l8 = Level::from_raw(8, &constants);
        assert_eq!(l8.cycle, Cycle(1));
        assert_eq!(l8.cycle_position, 0);

        let l11 = Level::from_raw(11, &constants);
        assert_eq!(l11.cycle, Cycle(1));
        assert_eq!(l11.cycle_position, 3);
        assert!(!Level::from_raw(12, &constants).expected_commitment);
    }
}
