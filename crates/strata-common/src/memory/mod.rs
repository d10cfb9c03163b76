//! Memory management utilities for strata.
//!
//! Every buffer handle in strata is a view over a reference counted
//! [`MemoryBlock`]. Blocks come in two kinds:
//!
//! - **Heap**: byte aligned, the default
//! - **Direct**: aligned to the configured boundary (4 KB by default), usable
//!   for direct I/O
//!
//! Both are zero-filled on allocation and freed when the last handle drops.

mod block;

pub use block::{MemoryBlock, MemoryKind};
