//! The deterministic seed sequence (C3): a byte stream keyed by a cycle seed
//! and a purpose tag, consumed by rights selection (C5) via rejection
//! sampling to draw uniform integers modulo a bound.
//!
//! Grounded in the teacher's use of `dcrypt::algorithms::xof::Blake3Xof` for
//! deterministic digests (`ioi_types::app::penalties::evidence_id`): the
//! stream is the output of a BLAKE3 XOF keyed by `seed || tag || offset_be`.

use dcrypt::algorithms::xof::{ExtendableOutputFunction, Blake3Xof};
use rollbound_types::Digest32;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("seed expansion failed: {0}")]
    Expand(String),
}

/// One purpose-scoped seed stream, drawn at a given `offset`. Constructed by
/// [`sequence`]; consumed one `u32` at a time via [`take_int32`].
pub struct SeedSequence {
    stream: Vec<u8>,
    cursor: usize,
    seed: Digest32,
    tag: &'static [u8],
    counter: u32,
}

const INT32_WIDTH: usize = 4;
/// Number of bytes drawn from the XOF per rejection-sampling attempt. Each
/// attempt consumes one counter value's worth of output.
const CHUNK: usize = 32;

impl SeedSequence {
    /// `sequence(seed, offset)`: derives the first chunk of the stream keyed
    /// by `seed || tag || offset_be`, with `offset` folded into the initial
    /// counter so distinct offsets never collide on the same prefix.
    fn new(seed: Digest32, tag: &'static [u8], offset: u32) -> Result<Self, SeedError> {
        let mut expander = Self {
            stream: Vec::new(),
            cursor: 0,
            seed,
            tag,
            counter: offset,
        };
        expander.refill()?;
        Ok(expander)
    }

    fn refill(&mut self) -> Result<(), SeedError> {
        let mut preimage = Vec::with_capacity(32 + self.tag.len() + INT32_WIDTH);
        preimage.extend_from_slice(self.seed.as_ref());
        preimage.extend_from_slice(self.tag);
        preimage.extend_from_slice(&self.counter.to_be_bytes());
        self.stream = Blake3Xof::generate(&preimage, CHUNK)
            .map_err(|e| SeedError::Expand(e.to_string()))?;
        self.cursor = 0;
        self.counter = self.counter.wrapping_add(1);
        Ok(())
    }

    fn next_u32(&mut self) -> Result<u32, SeedError> {
        if self.cursor + INT32_WIDTH > self.stream.len() {
            self.refill()?;
        }
        let bytes: [u8; INT32_WIDTH] =
            self.stream[self.cursor..self.cursor + INT32_WIDTH].try_into().unwrap();
        self.cursor += INT32_WIDTH;
        Ok(u32::from_be_bytes(bytes))
    }
}

/// `sequence(seed, offset)`, §4.2.
pub fn sequence(seed: Digest32, tag: &'static [u8], offset: u32) -> Result<SeedSequence, SeedError> {
    SeedSequence::new(seed, tag, offset)
}

/// `take_int32(seq, bound)`, §4.2: draws a uniform integer in `[0, bound)` by
/// rejection sampling — draws are discarded until one falls in the largest
/// multiple of `bound` that fits in a u32, so the result is exactly uniform
/// with no modulo bias.
pub fn take_int32(seq: &mut SeedSequence, bound: u32) -> Result<u32, SeedError> {
    assert!(bound > 0, "bound must be positive");
    let limit = u32::MAX - (u32::MAX % bound);
    loop {
        let draw = seq.next_u32()?;
        if draw < limit {
            return Ok(draw % bound);
        }
    }
}
