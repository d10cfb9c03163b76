//! System-wide constants for strata.
//!
//! Chunk geometry for 64-bit addressable buffers, the length thresholds the
//! sorter dispatches on, and the limits of the dynamic bit-vector.

// =============================================================================
// Native Buffer Constants
// =============================================================================

/// Largest capacity, in bytes, a single native buffer may have (2^31 - 1).
///
/// Native buffers are addressed with 32-bit signed offsets; anything larger
/// has to be spread over several chunks.
pub const MAX_NATIVE_CAPACITY: usize = i32::MAX as usize;

/// Default alignment for direct memory blocks (4 KB page alignment).
pub const DIRECT_ALIGNMENT: usize = 4096;

/// Size of the staging buffer used when streaming buffer contents through
/// a byte channel.
pub const CHANNEL_STAGING_SIZE: usize = 64 * 1024;

// =============================================================================
// Compound Buffer Constants
// =============================================================================

/// log2 of the compound buffer chunk size.
pub const CHUNK_BITS: u32 = 30;

/// Size of every interior chunk of a compound buffer (1 GB).
pub const CHUNK_SIZE: usize = 1 << CHUNK_BITS;

/// Smallest configurable chunk exponent (8 byte chunks, tests only).
pub const MIN_CHUNK_BITS: u32 = 3;

/// Largest configurable chunk exponent.
pub const MAX_CHUNK_BITS: u32 = CHUNK_BITS;

/// Minimum growth factor, in percent, of an append buffer.
pub const GROWTH_PERCENT: u64 = 150;

// =============================================================================
// Sort Constants
// =============================================================================

/// Ranges shorter than this are insertion sorted.
pub const INSERTION_SORT_THRESHOLD: usize = 100;

/// Ranges of 32/64-bit integers at least this long are radix sorted.
pub const RADIX_SORT_THRESHOLD: usize = 10_000_000;

/// Ranges of bytes at least this long are counting sorted.
pub const BYTE_COUNTING_SORT_THRESHOLD: usize = 100_000;

// =============================================================================
// Bit-vector Constants
// =============================================================================

/// Largest addressable bit index (2^31 - 1).
pub const MAX_BIT_INDEX: usize = i32::MAX as usize;

/// Largest backing capacity of a bit-vector, in bytes.
pub const MAX_BITSET_CAPACITY: usize = (MAX_BIT_INDEX >> 3) + 1;

/// Size of the bit-vector wire header: one offset byte plus a 4 byte length.
pub const BITSET_WIRE_HEADER_SIZE: usize = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_geometry() {
        assert_eq!(CHUNK_SIZE, 1_073_741_824);
        assert!(CHUNK_SIZE <= MAX_NATIVE_CAPACITY);
        assert!(2 * CHUNK_SIZE > MAX_NATIVE_CAPACITY);
    }

    #[test]
    fn test_bitset_limits() {
        assert_eq!(MAX_BITSET_CAPACITY, 268_435_456);
        assert_eq!(MAX_BITSET_CAPACITY * 8 - 1, MAX_BIT_INDEX);
    }
}
