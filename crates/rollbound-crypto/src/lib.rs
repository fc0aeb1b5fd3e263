//! Hashing, the deterministic seed sequence (C3), and the signature-verifier
//! seam consumed by the transition-function core.

pub mod hash;
pub mod seed;
pub mod signature;

pub use hash::{blinded_pkh, hash, CryptoError};
pub use seed::{sequence, take_int32, SeedError, SeedSequence};
pub use signature::{FixedVerifier, SignatureVerifier};
