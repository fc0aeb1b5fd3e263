//! The block header shape consumed by [`crate::lifecycle::begin_application`].

use parity_scale_codec::{Decode, Encode};
use rollbound_types::{BlockHash, NonceHash};
use serde::{Deserialize, Serialize};

#[derive(Encode, Decode, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub predecessor: BlockHash,
    pub level: u32,
    pub priority: u32,
    /// The fitness this header claims for its block; must strictly exceed
    /// the predecessor's recorded fitness (§4.6 step 2).
    pub declared_fitness: u32,
    pub seed_nonce_hash: Option<NonceHash>,
    pub proof_of_work_nonce: u64,
    pub signature: Vec<u8>,
}
