//! Benchmark utilities and helpers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_bitset::DynamicBitSet;
use strata_buffer::{DoubleBuffer, IntBuffer, LongBuffer, ShortBuffer};

/// Generates random `i32` values.
pub fn random_ints(count: usize) -> Vec<i32> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count).map(|_| rng.gen()).collect()
}

/// Generates random `i64` values.
pub fn random_longs(count: usize) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count).map(|_| rng.gen()).collect()
}

/// Generates random `i16` values.
pub fn random_shorts(count: usize) -> Vec<i16> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count).map(|_| rng.gen()).collect()
}

/// Generates random doubles with roughly one NaN per hundred values.
pub fn random_doubles(count: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|_| {
            if rng.gen_ratio(1, 100) {
                f64::NAN
            } else {
                rng.gen_range(-1.0e6..1.0e6)
            }
        })
        .collect()
}

/// Copies values into a fresh typed buffer.
pub fn int_buffer(values: &[i32]) -> IntBuffer {
    IntBuffer::from_slice(values).expect("int buffer")
}

/// Copies values into a fresh typed buffer.
pub fn long_buffer(values: &[i64]) -> LongBuffer {
    LongBuffer::from_slice(values).expect("long buffer")
}

/// Copies values into a fresh typed buffer.
pub fn short_buffer(values: &[i16]) -> ShortBuffer {
    ShortBuffer::from_slice(values).expect("short buffer")
}

/// Copies values into a fresh typed buffer.
pub fn double_buffer(values: &[f64]) -> DoubleBuffer {
    DoubleBuffer::from_slice(values).expect("double buffer")
}

/// Builds a resizable bitset with `count` random bits below `universe`.
pub fn random_bitset(count: usize, universe: usize, seed: u64) -> DynamicBitSet {
    let mut rng = StdRng::seed_from_u64(seed);
    DynamicBitSet::from_indices((0..count).map(|_| rng.gen_range(0..universe))).expect("bitset")
}
