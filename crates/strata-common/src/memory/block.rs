//! Raw zero-filled memory blocks.
//!
//! A block is shared by every buffer handle that views it, and handles
//! mutate it through a shared reference. This is sound because the block
//! never hands out references into its memory: all access copies bytes in or
//! out through raw pointers, and the block is neither `Send` nor `Sync`, so
//! all handles to one block live on one thread.

use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::{self, NonNull};

use crate::error::{StrataError, StrataResult};

/// Backing kind of a memory block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    /// Ordinary byte-aligned heap memory.
    Heap,
    /// Memory aligned to an I/O friendly boundary.
    Direct,
}

/// A fixed-size, zero-initialized region of memory.
///
/// # Example
///
/// ```rust
/// use strata_common::memory::{MemoryBlock, MemoryKind};
///
/// let block = MemoryBlock::allocate(8192, MemoryKind::Direct, 4096).unwrap();
/// assert!(block.is_aligned_to(4096));
/// block.write(0, &[1, 2, 3]);
/// let mut out = [0u8; 3];
/// block.read(0, &mut out);
/// assert_eq!(out, [1, 2, 3]);
/// ```
pub struct MemoryBlock {
    ptr: NonNull<u8>,
    len: usize,
    alignment: usize,
    kind: MemoryKind,
}

impl MemoryBlock {
    /// Allocates a zero-filled block of `len` bytes.
    ///
    /// Heap blocks ignore `alignment`. A zero-length block owns no memory.
    pub fn allocate(len: usize, kind: MemoryKind, alignment: usize) -> StrataResult<Self> {
        let alignment = match kind {
            MemoryKind::Heap => 1,
            MemoryKind::Direct => alignment,
        };
        if !alignment.is_power_of_two() {
            return Err(StrataError::invalid_argument(format!(
                "alignment must be a power of 2, got {alignment}"
            )));
        }

        if len == 0 {
            return Ok(Self::empty(kind));
        }

        let layout = Layout::from_size_align(len, alignment)
            .map_err(|_| StrataError::AllocationFailed { size: len })?;

        // SAFETY: layout has a non-zero size (checked above)
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or(StrataError::AllocationFailed { size: len })?;

        if kind == MemoryKind::Direct {
            tracing::debug!(len, alignment, "allocated direct memory block");
        }

        Ok(Self {
            ptr,
            len,
            alignment,
            kind,
        })
    }

    /// Creates a block that owns no memory.
    #[must_use]
    pub const fn empty(kind: MemoryKind) -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            alignment: 1,
            kind,
        }
    }

    /// Returns the size of the block in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the block is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the backing kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> MemoryKind {
        self.kind
    }

    /// Returns true for direct blocks.
    #[inline]
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.kind == MemoryKind::Direct
    }

    /// Returns the alignment the block was allocated with.
    #[inline]
    #[must_use]
    pub const fn alignment(&self) -> usize {
        self.alignment
    }

    /// Checks if the block start is aligned to the specified alignment.
    #[inline]
    #[must_use]
    pub fn is_aligned_to(&self, alignment: usize) -> bool {
        (self.ptr.as_ptr() as usize) % alignment == 0
    }

    #[inline]
    fn check(&self, offset: usize, len: usize) {
        assert!(
            offset <= self.len && len <= self.len - offset,
            "block access [{offset}, {offset}+{len}) out of bounds for length {}",
            self.len
        );
    }

    /// Reads one byte.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is out of bounds.
    #[inline]
    #[must_use]
    pub fn get(&self, offset: usize) -> u8 {
        self.check(offset, 1);
        // SAFETY: offset is in bounds
        unsafe { self.ptr.as_ptr().add(offset).read() }
    }

    /// Writes one byte.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is out of bounds.
    #[inline]
    pub fn set(&self, offset: usize, value: u8) {
        self.check(offset, 1);
        // SAFETY: offset is in bounds; no reference into the block exists
        unsafe { self.ptr.as_ptr().add(offset).write(value) }
    }

    /// Copies `dst.len()` bytes starting at `offset` into `dst`.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    #[inline]
    pub fn read(&self, offset: usize, dst: &mut [u8]) {
        self.check(offset, dst.len());
        // SAFETY: range is in bounds; `dst` cannot alias block memory because
        // the block never lends out references to it
        unsafe { ptr::copy_nonoverlapping(self.ptr.as_ptr().add(offset), dst.as_mut_ptr(), dst.len()) }
    }

    /// Copies `src` into the block starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    #[inline]
    pub fn write(&self, offset: usize, src: &[u8]) {
        self.check(offset, src.len());
        // SAFETY: range is in bounds; `src` cannot alias block memory
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), self.ptr.as_ptr().add(offset), src.len()) }
    }

    /// Reads `N` bytes into an array.
    #[inline]
    #[must_use]
    pub fn read_array<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut out = [0u8; N];
        self.read(offset, &mut out);
        out
    }

    /// Fills `len` bytes starting at `offset` with `value`.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn fill(&self, offset: usize, len: usize, value: u8) {
        self.check(offset, len);
        // SAFETY: range is in bounds
        unsafe { ptr::write_bytes(self.ptr.as_ptr().add(offset), value, len) }
    }

    /// Copies `len` bytes from `src[src_offset..]` into `self[dst_offset..]`.
    ///
    /// `src` may be this very block, in which case the ranges may overlap and
    /// the copy behaves like `memmove`.
    ///
    /// # Panics
    ///
    /// Panics if either range is out of bounds.
    pub fn copy_from(&self, dst_offset: usize, src: &MemoryBlock, src_offset: usize, len: usize) {
        src.check(src_offset, len);
        self.check(dst_offset, len);
        // SAFETY: both ranges are in bounds; `ptr::copy` tolerates overlap
        // when both sides are the same allocation
        unsafe {
            ptr::copy(
                src.ptr.as_ptr().add(src_offset),
                self.ptr.as_ptr().add(dst_offset),
                len,
            );
        }
    }

    /// Returns true if both handles refer to the same allocation.
    #[inline]
    #[must_use]
    pub fn same_block(&self, other: &MemoryBlock) -> bool {
        ptr::eq(self, other)
    }
}

impl Drop for MemoryBlock {
    fn drop(&mut self) {
        if self.len == 0 {
            return;
        }
        // SAFETY: ptr was allocated with exactly this layout in `allocate`
        unsafe {
            let layout = Layout::from_size_align_unchecked(self.len, self.alignment);
            alloc::dealloc(self.ptr.as_ptr(), layout);
        }
    }
}

impl fmt::Debug for MemoryBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBlock")
            .field("len", &self.len)
            .field("kind", &self.kind)
            .field("alignment", &self.alignment)
            .finish()
    }
}
