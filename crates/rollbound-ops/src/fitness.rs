//! The block-scoped fitness accumulator. Endorsement application (§4.5)
//! increases fitness; block finalization (C7, `rollbound-chain`) reads and
//! resets it. Kept as a plain context counter so `rollbound-ops` never has
//! to depend on `rollbound-chain`.

use rollbound_context::StateAccess;
use rollbound_types::StateError;

const KEY: &[u8] = b"chain/fitness_delta";

pub fn add(ctx: &mut dyn StateAccess, delta: u32) -> Result<(), StateError> {
    let current = read(ctx)?;
    ctx.insert(KEY, &(current + delta).to_be_bytes())
}

pub fn read(ctx: &dyn StateAccess) -> Result<u32, StateError> {
    match ctx.get(KEY)? {
        Some(bytes) => {
            let arr: [u8; 4] = bytes.try_into().map_err(|_| StateError::Decode("expected 4-byte fitness delta".into()))?;
            Ok(u32::from_be_bytes(arr))
        }
        None => Ok(0),
    }
}

pub fn reset(ctx: &mut dyn StateAccess) -> Result<(), StateError> {
    ctx.delete(KEY)
}
