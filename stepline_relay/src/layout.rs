//! Byte layout of the shared region: the external contract with the
//! pulse engine.
//!
//! Every field is an unsigned 32-bit value at a fixed 4-byte-aligned
//! offset. The engine program hard-codes these offsets; they cannot change
//! without a matching engine build.

use static_assertions::const_assert_eq;

use stepline_common::AXIS_COUNT;

/// Commit semaphore. The write to this offset is the sole "new parameters
/// are ready" signal and must be the last write of any update batch.
pub const SEMAPHORE_OFFSET: usize = 0;

/// Global axis enable (0 = disabled, 1 = enabled, 2 = shutdown sentinel).
pub const ALL_AXES_ENABLE_OFFSET: usize = 4;

/// First axis block starts after the semaphore and global enable words.
const AXIS_BLOCK_BASE: usize = 8;

/// Each axis block is three u32 fields: enabled, period, direction.
const AXIS_BLOCK_STRIDE: usize = 12;

/// Total field count: semaphore + global enable + 6 × 3 axis fields.
pub const REGION_WORDS: usize = 2 + AXIS_COUNT * 3;

/// Region size in bytes, zero-initialized before the engine starts.
pub const REGION_SIZE: usize = REGION_WORDS * 4;

/// Offset of the enabled flag for `axis` (0 disabled, 1 enabled).
#[inline]
pub const fn axis_enabled_offset(axis: usize) -> usize {
    AXIS_BLOCK_BASE + AXIS_BLOCK_STRIDE * axis
}

/// Offset of the pulse period (the countdown reload value) for `axis`.
#[inline]
pub const fn axis_period_offset(axis: usize) -> usize {
    AXIS_BLOCK_BASE + AXIS_BLOCK_STRIDE * axis + 4
}

/// Offset of the direction-pin state for `axis`.
#[inline]
pub const fn axis_direction_offset(axis: usize) -> usize {
    AXIS_BLOCK_BASE + AXIS_BLOCK_STRIDE * axis + 8
}

// The engine contract, pinned at compile time.
const_assert_eq!(REGION_SIZE, 80);
const_assert_eq!(axis_enabled_offset(0), 8);
const_assert_eq!(axis_period_offset(0), 12);
const_assert_eq!(axis_direction_offset(0), 16);
const_assert_eq!(axis_enabled_offset(5), 68);
const_assert_eq!(axis_direction_offset(5) + 4, REGION_SIZE);
