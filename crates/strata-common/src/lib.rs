//! # strata-common
//!
//! Common types, errors and memory primitives for strata.
//!
//! This crate provides the foundation shared by every strata component:
//!
//! - **Errors**: Unified error handling with `StrataError`
//! - **Config**: Memory configuration (`MemoryConfig`), injected into allocators
//! - **Constants**: Chunk geometry, sort thresholds and bit-vector limits
//! - **Memory**: Raw zero-filled memory blocks, heap or direct (page aligned)
//!
//! ## Example
//!
//! ```rust
//! use strata_common::config::MemoryConfig;
//! use strata_common::memory::MemoryBlock;
//! use strata_common::StrataResult;
//!
//! fn example() -> StrataResult<()> {
//!     let config = MemoryConfig::default();
//!     let block = MemoryBlock::allocate(64, config.memory_kind(), config.direct_alignment)?;
//!     block.set(0, 42);
//!     assert_eq!(block.get(0), 42);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod memory;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use error::{ErrorCode, StrataError, StrataResult};
