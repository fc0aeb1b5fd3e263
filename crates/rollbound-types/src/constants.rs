//! Protocol-version constants.
//!
//! The original source wires these in as compiled-in protocol parameters
//! rather than deriving them; we carry them the same way, as a single
//! `serde`-deserializable struct so a network can be configured from TOML
//! without touching code, matching `ioi-types::config`'s pattern of
//! small, serde-derived parameter structs with explicit defaults.

use crate::primitives::Tez;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProtocolConstants {
    /// Number of blocks in one cycle.
    pub blocks_per_cycle: u32,
    /// Number of blocks in one voting period.
    pub blocks_per_voting_period: u32,
    /// Number of blocks at the start of a cycle during which a seed-nonce
    /// commitment is expected in the header.
    pub blocks_per_commitment: u32,
    /// Number of blocks between roll-snapshot refreshes.
    pub blocks_per_roll_snapshot: u32,
    /// Number of past cycles whose frozen state (rights, deposits) remains
    /// live for denunciation and unfreezing purposes.
    pub preserved_cycles: u32,
    /// Tez required to create one roll.
    pub tokens_per_roll: Tez,
    /// Fixed deposit escrowed per included endorsement slot.
    pub endorsement_security_deposit: Tez,
    /// Fixed deposit escrowed per baked block.
    pub block_security_deposit: Tez,
    /// Number of endorsement slots per level.
    pub endorsers_per_block: u32,
    /// Base block reward, before priority/gap adjustment.
    pub block_reward: Tez,
    /// Tip paid to whoever reveals a seed nonce.
    pub seed_nonce_revelation_tip: Tez,
    /// Leading zero-bit threshold for the block's proof-of-work stamp.
    pub proof_of_work_threshold: u64,
}

impl Default for ProtocolConstants {
    fn default() -> Self {
        ProtocolConstants {
            blocks_per_cycle: 4096,
            blocks_per_voting_period: 4096 * 8,
            blocks_per_commitment: 32,
            blocks_per_roll_snapshot: 256,
            preserved_cycles: 5,
            tokens_per_roll: Tez(8_000_000_000),
            endorsement_security_deposit: Tez(64_000_000),
            block_security_deposit: Tez(512_000_000),
            endorsers_per_block: 32,
            block_reward: Tez(16_000_000),
            seed_nonce_revelation_tip: Tez(125_000),
            proof_of_work_threshold: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_round_trip() {
        let constants = ProtocolConstants::default();
        let s = toml::to_string(&constants).unwrap();
        let back: ProtocolConstants = toml::from_str(&s).unwrap();
        assert_eq!(constants, back);
    }
}
