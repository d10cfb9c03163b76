//! Configuration for strata.
//!
//! The memory configuration is a plain value injected into allocators; no
//! component reads it from ambient global state.

mod memory;

pub use memory::{MemoryConfig, DIRECT_MEMORY_ENV};
