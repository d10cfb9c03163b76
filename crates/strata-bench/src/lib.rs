//! Strata Performance Benchmarks
//!
//! This crate contains benchmarks for the strata memory substrate:
//! - Adaptive sorting of typed buffers (insertion, heap, radix, counting)
//! - Dynamic bit-vector mutation, set algebra and serialization
//! - Big buffer writes, reads and growable append/trim
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench -p strata-bench
//! ```

pub mod utils;
