//! Sequence number arithmetic.
//!
//! Block and message sequences are 32-bit serial numbers. `0` is reserved
//! for "never written" (blocks) and "none yet" (messages), so counters wrap
//! from `u32::MAX` straight to `1`.
//!
//! Ordering uses serial-number arithmetic: `a` is newer than `b` when the
//! forward distance from `b` to `a` is less than half the number space.
//! The ring never holds more than `u32::MAX / 2` blocks, so the live window
//! is always ordered correctly across a wrap.

/// Sequence number stamped on a committed block.
pub type BlockSeq = u32;

/// Sequence number assigned to a message at write time.
pub type MessageSeq = u32;

const HALF_RANGE: u32 = 1 << 31;

/// Returns the sequence following `seq`, skipping the reserved `0`.
#[must_use]
pub const fn next(seq: u32) -> u32 {
    match seq.wrapping_add(1) {
        0 => 1,
        n => n,
    }
}

/// Returns `true` if `a` was issued after `b`.
#[must_use]
pub const fn is_newer(a: u32, b: u32) -> bool {
    let distance = a.wrapping_sub(b);
    distance != 0 && distance < HALF_RANGE
}
