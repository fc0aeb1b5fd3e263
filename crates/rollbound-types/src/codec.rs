//! The canonical, deterministic binary codec for all consensus-critical
//! state and wire data.
//!
//! A thin wrapper around `parity-scale-codec` (SCALE): compact, deterministic,
//! and endian-stable, which is exactly what §6 requires of the operation wire
//! format and what the context needs for anything written to state.

use parity_scale_codec::{Decode, DecodeAll, Encode};

/// Encodes a value into its canonical SCALE-encoded bytes.
pub fn to_bytes_canonical<T: Encode>(v: &T) -> Vec<u8> {
    v.encode()
}

/// Decodes a value from canonical SCALE-encoded bytes, failing fast on any
/// malformed or truncated input.
pub fn from_bytes_canonical<T: Decode>(b: &[u8]) -> Result<T, String> {
    T::decode_all(&mut &*b).map_err(|e| format!("canonical decode failed: {}", e))
}
