//! # strata-buffer
//!
//! Byte buffers and in-place algorithms for the strata columnar substrate.
//!
//! This crate implements:
//! - **Buffer**: native buffers (at most 2^31 - 1 bytes) sharing reference
//!   counted storage between duplicates and slices
//! - **TypedBuffer**: fixed-width typed views over a native buffer
//! - **BigBuffer**: 64-bit addressable buffers spanning several native chunks
//! - **GrowableBigBuffer**: an append buffer growing into big buffers
//! - **ops / sort / search**: range checks, sortedness, deduplication,
//!   channel I/O, adaptive in-place sorting and binary search
//!
//! Handles are single-threaded: storage is shared through `Rc`, so no
//! buffer type is `Send` or `Sync`.
//!
//! ## Example
//!
//! ```rust
//! use strata_buffer::{search, sort, Allocator};
//!
//! let allocator = Allocator::default();
//! let mut ints = allocator.allocate_typed::<i32>(3).unwrap();
//! for (i, v) in [3, 1, 2].into_iter().enumerate() {
//!     ints.put_at(i, v).unwrap();
//! }
//! sort::sort(&mut ints, 0, 3).unwrap();
//! assert_eq!(ints.to_vec(), vec![1, 2, 3]);
//! assert_eq!(search::binary_search(&ints, 0, 3, 2).unwrap(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Generates named relative and absolute accessors for one element kind on
/// top of the generic `get_value`/`put_value` family.
macro_rules! value_accessors {
    ($index:ty; $($ty:ty => $get:ident, $put:ident, $get_at:ident, $put_at:ident;)*) => {
        $(
            #[doc = concat!("Relative `", stringify!($ty), "` get.")]
            #[inline]
            pub fn $get(&mut self) -> StrataResult<$ty> {
                self.get_value::<$ty>()
            }

            #[doc = concat!("Relative `", stringify!($ty), "` put.")]
            #[inline]
            pub fn $put(&mut self, value: $ty) -> StrataResult<()> {
                self.put_value::<$ty>(value)
            }

            #[doc = concat!("Absolute `", stringify!($ty), "` get at a byte index.")]
            #[inline]
            pub fn $get_at(&self, index: $index) -> StrataResult<$ty> {
                self.get_value_at::<$ty>(index)
            }

            #[doc = concat!("Absolute `", stringify!($ty), "` put at a byte index.")]
            #[inline]
            pub fn $put_at(&mut self, index: $index, value: $ty) -> StrataResult<()> {
                self.put_value_at::<$ty>(index, value)
            }
        )*
    };
}

pub mod allocator;
pub mod big;
pub mod buffer;
pub mod element;
pub mod growable;
pub mod ops;
pub mod order;
pub mod search;
pub mod sort;
pub mod typed;

pub use allocator::Allocator;
pub use big::{BigBuffer, SmallBuffer};
pub use buffer::Buffer;
pub use element::{Element, ElementStore};
pub use growable::GrowableBigBuffer;
pub use ops::ByteCursor;
pub use order::ByteOrder;
pub use typed::{ByteView, DoubleBuffer, FloatBuffer, IntBuffer, LongBuffer, ShortBuffer, TypedBuffer};
