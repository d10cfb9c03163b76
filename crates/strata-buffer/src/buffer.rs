//! Native byte buffers.
//!
//! A [`Buffer`] is a window `[base, base + capacity)` over a reference counted
//! [`MemoryBlock`] together with its own `position`, `limit` and byte order.
//! Duplicates and slices share the block; copies allocate a new one.
//!
//! Every buffer maintains `0 <= position <= limit <= capacity`, and a native
//! buffer never exceeds `2^31 - 1` bytes.

use std::fmt;
use std::rc::Rc;

use strata_common::constants::{DIRECT_ALIGNMENT, MAX_NATIVE_CAPACITY};
use strata_common::memory::{MemoryBlock, MemoryKind};
use strata_common::{StrataError, StrataResult};

use crate::element::{Element, ElementStore};
use crate::ops::check_range;
use crate::order::ByteOrder;

thread_local! {
    static EMPTY_BLOCK: Rc<MemoryBlock> = Rc::new(MemoryBlock::empty(MemoryKind::Heap));
}

/// A native, 32-bit addressable byte buffer.
///
/// Cloning a buffer is the same as [`Buffer::duplicate`]: the clone shares
/// storage but has its own position and limit.
///
/// # Example
///
/// ```rust
/// use strata_buffer::{Buffer, ByteOrder};
///
/// let mut buf = Buffer::allocate(8).unwrap().with_order(ByteOrder::BigEndian);
/// buf.put_i32(0x0102_0304).unwrap();
/// buf.flip();
/// assert_eq!(buf.remaining(), 4);
/// assert_eq!(buf.get_at(0).unwrap(), 0x01);
/// assert_eq!(buf.get_i32().unwrap(), 0x0102_0304);
/// ```
#[derive(Clone)]
pub struct Buffer {
    block: Rc<MemoryBlock>,
    base: usize,
    capacity: usize,
    position: usize,
    limit: usize,
    order: ByteOrder,
}

impl Buffer {
    /// Allocates a zero-filled heap buffer in native byte order.
    pub fn allocate(capacity: usize) -> StrataResult<Self> {
        Self::allocate_in(capacity, MemoryKind::Heap, 1, ByteOrder::native())
    }

    /// Allocates a zero-filled, page aligned buffer in native byte order.
    pub fn allocate_direct(capacity: usize) -> StrataResult<Self> {
        Self::allocate_in(capacity, MemoryKind::Direct, DIRECT_ALIGNMENT, ByteOrder::native())
    }

    /// Allocates a zero-filled buffer of the given kind and order.
    ///
    /// The result has position 0 and limit equal to its capacity.
    pub fn allocate_in(
        capacity: usize,
        kind: MemoryKind,
        alignment: usize,
        order: ByteOrder,
    ) -> StrataResult<Self> {
        if capacity > MAX_NATIVE_CAPACITY {
            return Err(StrataError::capacity(capacity as u64, MAX_NATIVE_CAPACITY as u64));
        }
        let block = MemoryBlock::allocate(capacity, kind, alignment)?;
        Ok(Self::over(Rc::new(block), order))
    }

    /// Creates a heap buffer holding a copy of `bytes`, ready to be read.
    pub fn from_slice(bytes: &[u8]) -> StrataResult<Self> {
        let mut buf = Self::allocate(bytes.len())?;
        buf.block.write(0, bytes);
        buf.limit = bytes.len();
        Ok(buf)
    }

    /// Returns a zero-capacity buffer.
    ///
    /// All empty buffers of a thread share one storage block.
    #[must_use]
    pub fn empty() -> Self {
        Self::over(EMPTY_BLOCK.with(Rc::clone), ByteOrder::native())
    }

    /// Allocates a new buffer with the same backing kind and byte order as
    /// this one.
    pub fn allocate_like(&self, capacity: usize) -> StrataResult<Self> {
        let kind = self.block.kind();
        let alignment = match kind {
            MemoryKind::Direct if !self.block.is_empty() => self.block.alignment(),
            MemoryKind::Direct => DIRECT_ALIGNMENT,
            MemoryKind::Heap => 1,
        };
        Self::allocate_in(capacity, kind, alignment, self.order)
    }

    fn over(block: Rc<MemoryBlock>, order: ByteOrder) -> Self {
        let capacity = block.len();
        Self {
            block,
            base: 0,
            capacity,
            position: 0,
            limit: capacity,
            order,
        }
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    /// Returns the capacity in bytes.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the position.
    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the limit.
    #[inline]
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns `limit - position`.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    /// Returns true if `position < limit`.
    #[inline]
    #[must_use]
    pub fn has_remaining(&self) -> bool {
        self.position < self.limit
    }

    /// Sets the position. Fails if it would exceed the limit.
    pub fn set_position(&mut self, position: usize) -> StrataResult<()> {
        if position > self.limit {
            return Err(StrataError::index(position as u64, self.limit as u64));
        }
        self.position = position;
        Ok(())
    }

    /// Sets the limit, pulling the position back if it lies beyond it.
    pub fn set_limit(&mut self, limit: usize) -> StrataResult<()> {
        if limit > self.capacity {
            return Err(StrataError::index(limit as u64, self.capacity as u64));
        }
        self.limit = limit;
        self.position = self.position.min(limit);
        Ok(())
    }

    /// Resets position to 0 and limit to capacity.
    pub fn clear(&mut self) {
        self.position = 0;
        self.limit = self.capacity;
    }

    /// Sets limit to position and position to 0.
    pub fn flip(&mut self) {
        self.limit = self.position;
        self.position = 0;
    }

    /// Resets the position to 0.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Returns the byte order.
    #[inline]
    #[must_use]
    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// Changes the byte order of this handle only.
    pub fn set_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    /// Returns this handle with the given byte order.
    #[must_use]
    pub fn with_order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        self
    }

    /// Returns the backing memory kind.
    #[inline]
    #[must_use]
    pub fn memory_kind(&self) -> MemoryKind {
        self.block.kind()
    }

    /// Returns true if the buffer is backed by direct memory.
    #[inline]
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.block.is_direct()
    }

    /// Returns true if both buffers view the same non-empty storage block.
    #[must_use]
    pub fn shares_storage_with(&self, other: &Buffer) -> bool {
        !self.block.is_empty() && self.block.same_block(&other.block)
    }

    // =========================================================================
    // Single byte access
    // =========================================================================

    /// Relative get of one byte.
    pub fn get(&mut self) -> StrataResult<u8> {
        if self.position >= self.limit {
            return Err(StrataError::underflow(1, 0));
        }
        let value = self.block.get(self.base + self.position);
        self.position += 1;
        Ok(value)
    }

    /// Relative put of one byte.
    pub fn put(&mut self, value: u8) -> StrataResult<()> {
        if self.position >= self.limit {
            return Err(StrataError::overflow(1, 0));
        }
        self.block.set(self.base + self.position, value);
        self.position += 1;
        Ok(())
    }

    /// Absolute get of one byte. `index` must be below the limit.
    pub fn get_at(&self, index: usize) -> StrataResult<u8> {
        if index >= self.limit {
            return Err(StrataError::index(index as u64, self.limit as u64));
        }
        Ok(self.block.get(self.base + index))
    }

    /// Absolute put of one byte. `index` must be below the limit.
    pub fn put_at(&mut self, index: usize, value: u8) -> StrataResult<()> {
        if index >= self.limit {
            return Err(StrataError::index(index as u64, self.limit as u64));
        }
        self.block.set(self.base + index, value);
        Ok(())
    }

    // =========================================================================
    // Multi-byte access
    // =========================================================================

    /// Relative get of one element in this buffer's byte order.
    pub fn get_value<T: Element>(&mut self) -> StrataResult<T> {
        let remaining = self.remaining();
        if remaining < T::SIZE {
            return Err(StrataError::underflow(T::SIZE as u64, remaining as u64));
        }
        let value = self.read_element(self.position);
        self.position += T::SIZE;
        Ok(value)
    }

    /// Relative put of one element in this buffer's byte order.
    pub fn put_value<T: Element>(&mut self, value: T) -> StrataResult<()> {
        let remaining = self.remaining();
        if remaining < T::SIZE {
            return Err(StrataError::overflow(T::SIZE as u64, remaining as u64));
        }
        self.write_element(self.position, value);
        self.position += T::SIZE;
        Ok(())
    }

    /// Absolute get of one element starting at byte `index`.
    pub fn get_value_at<T: Element>(&self, index: usize) -> StrataResult<T> {
        self.check_value_index::<T>(index)?;
        Ok(self.read_element(index))
    }

    /// Absolute put of one element starting at byte `index`.
    pub fn put_value_at<T: Element>(&mut self, index: usize, value: T) -> StrataResult<()> {
        self.check_value_index::<T>(index)?;
        self.write_element(index, value);
        Ok(())
    }

    value_accessors! {
        usize;
        i16 => get_i16, put_i16, get_i16_at, put_i16_at;
        i32 => get_i32, put_i32, get_i32_at, put_i32_at;
        i64 => get_i64, put_i64, get_i64_at, put_i64_at;
        f32 => get_f32, put_f32, get_f32_at, put_f32_at;
        f64 => get_f64, put_f64, get_f64_at, put_f64_at;
    }

    #[inline]
    fn check_value_index<T: Element>(&self, index: usize) -> StrataResult<()> {
        if index > self.limit || self.limit - index < T::SIZE {
            return Err(StrataError::index(index as u64, self.limit as u64));
        }
        Ok(())
    }

    #[inline]
    fn read_element<T: Element>(&self, index: usize) -> T {
        let mut raw = [0u8; 8];
        self.block.read(self.base + index, &mut raw[..T::SIZE]);
        T::decode(&raw, self.order)
    }

    #[inline]
    fn write_element<T: Element>(&self, index: usize, value: T) {
        let mut raw = [0u8; 8];
        value.encode(self.order, &mut raw);
        self.block.write(self.base + index, &raw[..T::SIZE]);
    }

    // =========================================================================
    // Bulk transfer
    // =========================================================================

    /// Fills `dst` from the position onward and advances the position.
    pub fn get_slice(&mut self, dst: &mut [u8]) -> StrataResult<()> {
        let remaining = self.remaining();
        if dst.len() > remaining {
            return Err(StrataError::underflow(dst.len() as u64, remaining as u64));
        }
        self.block.read(self.base + self.position, dst);
        self.position += dst.len();
        Ok(())
    }

    /// Writes `src` at the position and advances the position.
    pub fn put_slice(&mut self, src: &[u8]) -> StrataResult<()> {
        let remaining = self.remaining();
        if src.len() > remaining {
            return Err(StrataError::overflow(src.len() as u64, remaining as u64));
        }
        self.block.write(self.base + self.position, src);
        self.position += src.len();
        Ok(())
    }

    /// Transfers all remaining bytes of `src` into this buffer, advancing
    /// both positions.
    ///
    /// The two buffers may view overlapping regions of one block; the copy
    /// then behaves like `memmove`.
    pub fn put_buffer(&mut self, src: &mut Buffer) -> StrataResult<()> {
        let n = src.remaining();
        let remaining = self.remaining();
        if n > remaining {
            return Err(StrataError::overflow(n as u64, remaining as u64));
        }
        self.block
            .copy_from(self.base + self.position, &src.block, src.base + src.position, n);
        self.position += n;
        src.position += n;
        Ok(())
    }

    /// Sets every byte of `[from, to)` to `value`.
    pub fn fill(&mut self, from: usize, to: usize, value: u8) -> StrataResult<()> {
        check_range(from, to, self.capacity)?;
        self.block.fill(self.base + from, to - from, value);
        Ok(())
    }

    // =========================================================================
    // Views and copies
    // =========================================================================

    /// Returns a handle sharing storage with independent position and limit.
    #[inline]
    #[must_use]
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Returns a view of `[position, limit)` re-based at 0.
    #[must_use]
    pub fn slice(&self) -> Self {
        let len = self.remaining();
        Self {
            block: Rc::clone(&self.block),
            base: self.base + self.position,
            capacity: len,
            position: 0,
            limit: len,
            order: self.order,
        }
    }

    /// Returns a view of the absolute range `[from, to)` re-based at 0.
    pub fn slice_range(&self, from: usize, to: usize) -> StrataResult<Self> {
        check_range(from, to, self.capacity)?;
        let len = to - from;
        Ok(Self {
            block: Rc::clone(&self.block),
            base: self.base + from,
            capacity: len,
            position: 0,
            limit: len,
            order: self.order,
        })
    }

    /// Copies the absolute range `[from, to)` into fresh storage of the same
    /// kind and byte order.
    pub fn copy_range(&self, from: usize, to: usize) -> StrataResult<Self> {
        check_range(from, to, self.capacity)?;
        let copy = self.allocate_like(to - from)?;
        copy.block.copy_from(0, &self.block, self.base + from, to - from);
        Ok(copy)
    }

    /// Deep copy of the whole buffer, keeping position and limit.
    pub fn copy(&self) -> StrataResult<Self> {
        let mut copy = self.copy_range(0, self.capacity)?;
        copy.limit = self.limit;
        copy.position = self.position;
        Ok(copy)
    }

    /// Moves the remaining bytes to the start, then sets position to the
    /// number moved and limit to capacity.
    pub fn compact(&mut self) {
        let n = self.remaining();
        self.block
            .copy_from(self.base, &self.block, self.base + self.position, n);
        self.position = n;
        self.limit = self.capacity;
    }

    /// Copies the remaining bytes into a vector without moving the position.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.remaining()];
        self.block.read(self.base + self.position, &mut out);
        out
    }

    // =========================================================================
    // Crate-internal raw access, bounded by capacity only
    // =========================================================================

    #[inline]
    pub(crate) fn read_raw(&self, index: usize, dst: &mut [u8]) {
        debug_assert!(index + dst.len() <= self.capacity);
        self.block.read(self.base + index, dst);
    }

    #[inline]
    pub(crate) fn write_raw(&mut self, index: usize, src: &[u8]) {
        debug_assert!(index + src.len() <= self.capacity);
        self.block.write(self.base + index, src);
    }

    #[inline]
    pub(crate) fn read_element_raw<T: Element>(&self, index: usize) -> T {
        self.read_element(index)
    }

    #[inline]
    pub(crate) fn write_element_raw<T: Element>(&mut self, index: usize, value: T) {
        self.write_element(index, value);
    }

    /// Copies `len` bytes from `src[src_index..]` to `self[dst_index..]`.
    pub(crate) fn copy_raw_from(&mut self, dst_index: usize, src: &Buffer, src_index: usize, len: usize) {
        debug_assert!(dst_index + len <= self.capacity && src_index + len <= src.capacity);
        self.block
            .copy_from(self.base + dst_index, &src.block, src.base + src_index, len);
    }

    /// Returns a view over the full capacity with position 0.
    pub(crate) fn full_view(&self) -> Self {
        Self {
            block: Rc::clone(&self.block),
            base: self.base,
            capacity: self.capacity,
            position: 0,
            limit: self.capacity,
            order: self.order,
        }
    }

    pub(crate) fn set_geometry_unchecked(&mut self, position: usize, limit: usize) {
        debug_assert!(position <= limit && limit <= self.capacity);
        self.position = position;
        self.limit = limit;
    }
}

impl ElementStore<u8> for Buffer {
    #[inline]
    fn element_capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn load(&self, index: usize) -> u8 {
        assert!(index < self.capacity, "index {index} out of bounds for capacity {}", self.capacity);
        self.block.get(self.base + index)
    }

    #[inline]
    fn store(&mut self, index: usize, value: u8) {
        assert!(index < self.capacity, "index {index} out of bounds for capacity {}", self.capacity);
        self.block.set(self.base + index, value);
    }
}

impl PartialEq for Buffer {
    /// Two buffers are equal when their remaining bytes are equal.
    fn eq(&self, other: &Self) -> bool {
        let n = self.remaining();
        if n != other.remaining() {
            return false;
        }
        let mut left = [0u8; 256];
        let mut right = [0u8; 256];
        let mut done = 0;
        while done < n {
            let step = (n - done).min(left.len());
            self.block.read(self.base + self.position + done, &mut left[..step]);
            other.block.read(other.base + other.position + done, &mut right[..step]);
            if left[..step] != right[..step] {
                return false;
            }
            done += step;
        }
        true
    }
}

impl Eq for Buffer {}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("position", &self.position)
            .field("limit", &self.limit)
            .field("capacity", &self.capacity)
            .field("order", &self.order)
            .field("kind", &self.block.kind())
            .finish()
    }
}
