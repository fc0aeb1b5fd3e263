//! The hashing and blinding primitives §6 asks the core to consume,
//! implemented over `dcrypt`'s SHA-256, exactly as the teacher derives
//! `AccountId` in `ioi_types::app::identity::account_id_from_key_material`.

use dcrypt::algorithms::hash::{HashFunction, Sha256 as DcryptSha256};
use dcrypt::algorithms::ByteSerializable;
use rollbound_types::{Digest32, PublicKeyHash};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("hashing failed: {0}")]
    Hash(String),
}

/// `hash(bytes) -> 32-byte digest`, §6.
pub fn hash(bytes: &[u8]) -> Result<Digest32, CryptoError> {
    let digest = DcryptSha256::digest(bytes)
        .map_err(|e| CryptoError::Hash(e.to_string()))?
        .to_bytes();
    let arr: [u8; 32] = digest
        .try_into()
        .map_err(|_| CryptoError::Hash("sha256 digest was not 32 bytes".into()))?;
    Ok(Digest32(arr))
}

/// `blinded_pkh(activation_code, pkh)`, §6: used once per `Activate_account`
/// to look up the commitment table entry under a blinded key so the
/// commitment isn't linkable to the activating key before it is claimed.
pub fn blinded_pkh(activation_code: &[u8], pkh: &PublicKeyHash) -> Result<Digest32, CryptoError> {
    let mut preimage = Vec::with_capacity(activation_code.len() + pkh.0.len());
    preimage.extend_from_slice(activation_code);
    preimage.extend_from_slice(&pkh.0);
    hash(&preimage)
}
