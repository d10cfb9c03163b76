//! 64-bit addressable buffers.
//!
//! A [`BigBuffer`] has one of two layouts:
//!
//! - **single**: one native [`Buffer`] holding every byte.
//! - **compound**: an ordered list of native chunks. Every chunk except the
//!   first and the last holds exactly `2^chunk_bits` bytes; the first and
//!   last may be shorter. An absolute index resolves to a chunk by
//!   subtracting the first chunk's length, then shifting and masking.
//!
//! Chunk boundaries never move after construction. Duplicates and slices
//! share chunk storage; copies allocate chunks with the same partitioning.

mod small;

use std::fmt;

use strata_common::constants::{CHANNEL_STAGING_SIZE, MAX_CHUNK_BITS, MAX_NATIVE_CAPACITY, MIN_CHUNK_BITS};
use strata_common::memory::MemoryKind;
use strata_common::{StrataError, StrataResult};

use crate::allocator::Allocator;
use crate::buffer::Buffer;
use crate::element::{Element, ElementStore};
use crate::ops::check_big_range;
use crate::order::ByteOrder;

pub use small::SmallBuffer;

/// A byte buffer addressed with 64-bit positions.
///
/// # Example
///
/// ```rust
/// use strata_buffer::{Allocator, BigBuffer};
/// use strata_common::config::MemoryConfig;
///
/// // 16 byte chunks make the compound layout cheap to exercise
/// let allocator = Allocator::new(MemoryConfig::for_testing(4)).unwrap();
/// let mut big = BigBuffer::allocate(&allocator, 100).unwrap();
/// assert!(big.is_compound());
/// assert_eq!(big.chunk_count(), 7);
///
/// big.set_position(14).unwrap();
/// big.put_i64(-42).unwrap();
/// assert_eq!(big.get_i64_at(14).unwrap(), -42);
/// ```
#[derive(Clone)]
pub struct BigBuffer {
    layout: Layout,
    position: u64,
    limit: u64,
    order: ByteOrder,
}

#[derive(Clone)]
enum Layout {
    Single(Buffer),
    Compound(Chunks),
}

#[derive(Clone)]
struct Chunks {
    chunks: Vec<Buffer>,
    first_len: u64,
    chunk_bits: u32,
    capacity: u64,
}

impl Chunks {
    fn new(chunks: Vec<Buffer>, chunk_bits: u32) -> Self {
        let first_len = chunks.first().map_or(0, |c| c.capacity() as u64);
        let capacity = chunks.iter().map(|c| c.capacity() as u64).sum();
        Self {
            chunks,
            first_len,
            chunk_bits,
            capacity,
        }
    }

    #[inline]
    fn locate(&self, index: u64) -> (usize, usize) {
        if index < self.first_len {
            return (0, index as usize);
        }
        let rel = index - self.first_len;
        let mask = (1u64 << self.chunk_bits) - 1;
        (1 + (rel >> self.chunk_bits) as usize, (rel & mask) as usize)
    }
}

impl BigBuffer {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Allocates a zero-filled buffer of `capacity` bytes in native order.
    ///
    /// Capacities the allocator's chunk geometry can serve with one native
    /// buffer get the single layout; larger ones are split into full chunks
    /// followed by a shorter tail chunk.
    pub fn allocate(allocator: &Allocator, capacity: u64) -> StrataResult<Self> {
        Self::allocate_with_order(allocator, capacity, ByteOrder::native())
    }

    /// Allocates a zero-filled buffer in the given byte order.
    pub fn allocate_with_order(
        allocator: &Allocator,
        capacity: u64,
        order: ByteOrder,
    ) -> StrataResult<Self> {
        let config = allocator.config();
        if capacity <= config.max_single_capacity() as u64 {
            let buffer = allocator.allocate_with_order(capacity as usize, order)?;
            return Ok(Self::from_layout(Layout::Single(buffer), order));
        }

        let chunk_size = config.chunk_size() as u64;
        let full = capacity >> config.chunk_bits;
        let tail = capacity & (chunk_size - 1);
        let count = full as usize + usize::from(tail > 0);
        let mut chunks = Vec::with_capacity(count);
        for _ in 0..full {
            chunks.push(allocator.allocate_with_order(chunk_size as usize, order)?);
        }
        if tail > 0 {
            chunks.push(allocator.allocate_with_order(tail as usize, order)?);
        }
        tracing::debug!(capacity, chunks = count, chunk_size, "allocated compound buffer");
        Ok(Self::from_layout(
            Layout::Compound(Chunks::new(chunks, config.chunk_bits)),
            order,
        ))
    }

    /// Wraps a native buffer, keeping its position, limit and byte order.
    #[must_use]
    pub fn wrap(buffer: &Buffer) -> Self {
        let mut big = Self::from_layout(Layout::Single(buffer.full_view()), buffer.order());
        big.position = buffer.position() as u64;
        big.limit = buffer.limit() as u64;
        big
    }

    /// Builds a compound buffer from caller supplied chunks of
    /// `2^chunk_bits` bytes.
    ///
    /// Every chunk must have position 0, limit equal to capacity, a non-zero
    /// capacity and the byte order of the first chunk. Chunks strictly
    /// between the first and the last must be exactly `2^chunk_bits` bytes;
    /// the first and last may be shorter.
    pub fn from_chunks(chunks: Vec<Buffer>, chunk_bits: u32) -> StrataResult<Self> {
        if !(MIN_CHUNK_BITS..=MAX_CHUNK_BITS).contains(&chunk_bits) {
            return Err(StrataError::invalid_argument(format!(
                "chunk_bits must be in [{MIN_CHUNK_BITS}, {MAX_CHUNK_BITS}], got {chunk_bits}"
            )));
        }
        let Some(first) = chunks.first() else {
            return Ok(Self::empty());
        };
        let order = first.order();
        let chunk_size = 1usize << chunk_bits;
        let last = chunks.len() - 1;
        for (i, chunk) in chunks.iter().enumerate() {
            if chunk.position() != 0 || chunk.limit() != chunk.capacity() {
                return Err(StrataError::invalid_argument(format!(
                    "chunk {i} must have position 0 and limit == capacity"
                )));
            }
            if chunk.capacity() == 0 || chunk.capacity() > chunk_size {
                return Err(StrataError::invalid_argument(format!(
                    "chunk {i} has capacity {}, expected 1..={chunk_size}",
                    chunk.capacity()
                )));
            }
            if i != 0 && i != last && chunk.capacity() != chunk_size {
                return Err(StrataError::invalid_argument(format!(
                    "inner chunk {i} has capacity {}, expected {chunk_size}",
                    chunk.capacity()
                )));
            }
            if chunk.order() != order {
                return Err(StrataError::invalid_argument(format!(
                    "chunk {i} byte order differs from chunk 0"
                )));
            }
        }
        if chunks.len() == 1 {
            return Ok(Self::wrap(&chunks[0]));
        }
        Ok(Self::from_layout(Layout::Compound(Chunks::new(chunks, chunk_bits)), order))
    }

    /// Returns a zero-capacity buffer sharing the thread's empty storage.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_layout(Layout::Single(Buffer::empty()), ByteOrder::native())
    }

    fn from_layout(layout: Layout, order: ByteOrder) -> Self {
        let mut big = Self {
            layout,
            position: 0,
            limit: 0,
            order,
        };
        big.limit = big.capacity();
        big
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    /// Returns the capacity in bytes.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> u64 {
        match &self.layout {
            Layout::Single(buffer) => buffer.capacity() as u64,
            Layout::Compound(c) => c.capacity,
        }
    }

    /// Returns the position.
    #[inline]
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the limit.
    #[inline]
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Returns `limit - position`.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.limit - self.position
    }

    /// Returns true if `position < limit`.
    #[inline]
    #[must_use]
    pub fn has_remaining(&self) -> bool {
        self.position < self.limit
    }

    /// Sets the position.
    pub fn set_position(&mut self, position: u64) -> StrataResult<()> {
        if position > self.limit {
            return Err(StrataError::index(position, self.limit));
        }
        self.position = position;
        Ok(())
    }

    /// Sets the limit, pulling the position back if needed.
    pub fn set_limit(&mut self, limit: u64) -> StrataResult<()> {
        let capacity = self.capacity();
        if limit > capacity {
            return Err(StrataError::index(limit, capacity));
        }
        self.limit = limit;
        self.position = self.position.min(limit);
        Ok(())
    }

    /// Resets position to 0 and limit to capacity.
    pub fn clear(&mut self) {
        self.position = 0;
        self.limit = self.capacity();
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

    /// Changes the byte order of this handle and its chunk handles.
    pub fn set_order(&mut self, order: ByteOrder) {
        self.order = order;
        for chunk in self.chunks_mut() {
            chunk.set_order(order);
        }
    }

    /// Returns this handle with the given byte order.
    #[must_use]
    pub fn with_order(mut self, order: ByteOrder) -> Self {
        self.set_order(order);
        self
    }

    /// Returns true for the multi-chunk layout.
    #[must_use]
    pub fn is_compound(&self) -> bool {
        matches!(self.layout, Layout::Compound(_))
    }

    /// Returns the number of native chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks().len()
    }

    /// Returns the backing memory kind.
    #[must_use]
    pub fn memory_kind(&self) -> MemoryKind {
        self.chunks()[0].memory_kind()
    }

    /// Returns true if the chunks are backed by direct memory.
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.memory_kind() == MemoryKind::Direct
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
    pub fn slice(&self) -> StrataResult<Self> {
        self.slice_range(self.position, self.limit)
    }

    /// Returns a view of `[from, to)` re-based at 0 that shares storage and
    /// keeps the chunk partitioning.
    ///
    /// A range inside one chunk yields the single layout.
    pub fn slice_range(&self, from: u64, to: u64) -> StrataResult<Self> {
        check_big_range(from, to, self.capacity())?;
        let layout = match &self.layout {
            Layout::Single(buffer) => Layout::Single(buffer.slice_range(from as usize, to as usize)?),
            Layout::Compound(_) if from == to => {
                Layout::Single(self.chunks()[0].slice_range(0, 0)?)
            }
            Layout::Compound(c) => {
                let (first, first_off) = c.locate(from);
                let (last, last_off) = c.locate(to - 1);
                if first == last {
                    Layout::Single(c.chunks[first].slice_range(first_off, last_off + 1)?)
                } else {
                    let mut chunks = Vec::with_capacity(last - first + 1);
                    let head = &c.chunks[first];
                    chunks.push(head.slice_range(first_off, head.capacity())?);
                    chunks.extend(c.chunks[first + 1..last].iter().map(Buffer::full_view));
                    chunks.push(c.chunks[last].slice_range(0, last_off + 1)?);
                    Layout::Compound(Chunks::new(chunks, c.chunk_bits))
                }
            }
        };
        Ok(Self::from_layout(layout, self.order))
    }

    /// Copies `[from, to)` into fresh chunks with the same partitioning,
    /// backing kind and byte order.
    pub fn copy_range(&self, from: u64, to: u64) -> StrataResult<Self> {
        let view = self.slice_range(from, to)?;
        let layout = match view.layout {
            Layout::Single(buffer) => Layout::Single(buffer.copy_range(0, buffer.capacity())?),
            Layout::Compound(c) => {
                let chunks = c
                    .chunks
                    .iter()
                    .map(|chunk| chunk.copy_range(0, chunk.capacity()))
                    .collect::<StrataResult<Vec<_>>>()?;
                Layout::Compound(Chunks::new(chunks, c.chunk_bits))
            }
        };
        Ok(Self::from_layout(layout, self.order))
    }

    /// Deep copy of the whole buffer, keeping position and limit.
    pub fn copy(&self) -> StrataResult<Self> {
        let mut copy = self.copy_range(0, self.capacity())?;
        copy.position = self.position;
        copy.limit = self.limit;
        Ok(copy)
    }

    /// Returns duplicates of the chunks in order, each covering its full
    /// chunk with position 0.
    #[must_use]
    pub fn buffers(&self) -> Vec<Buffer> {
        self.chunks().iter().map(Buffer::full_view).collect()
    }

    /// Returns `[from, to)` as one native buffer.
    ///
    /// A range inside one chunk is returned as a shared view; a range
    /// spanning chunks is copied into a new buffer.
    pub fn small_slice(&self, from: u64, to: u64) -> StrataResult<Buffer> {
        check_big_range(from, to, self.capacity())?;
        let len = to - from;
        if len > MAX_NATIVE_CAPACITY as u64 {
            return Err(StrataError::capacity(len, MAX_NATIVE_CAPACITY as u64));
        }
        let view = self.slice_range(from, to)?;
        match view.layout {
            Layout::Single(buffer) => Ok(buffer),
            Layout::Compound(_) => {
                let mut copy = self.chunks()[0].allocate_like(len as usize)?;
                self.read_bytes_into(from, &mut copy, len as usize);
                Ok(copy)
            }
        }
    }

    /// Moves the remaining bytes to the start, then sets position to the
    /// number moved and limit to capacity.
    pub fn compact(&mut self) {
        let n = self.remaining();
        let mut scratch = vec![0u8; n.min(CHANNEL_STAGING_SIZE as u64) as usize];
        let mut done = 0u64;
        while done < n {
            let step = (n - done).min(scratch.len() as u64) as usize;
            self.read_bytes(self.position + done, &mut scratch[..step]);
            self.write_bytes(done, &scratch[..step]);
            done += step as u64;
        }
        self.position = n;
        self.limit = self.capacity();
    }

    // =========================================================================
    // Single byte access
    // =========================================================================

    /// Relative get of one byte.
    pub fn get(&mut self) -> StrataResult<u8> {
        if self.position >= self.limit {
            return Err(StrataError::underflow(1, 0));
        }
        let value = self.byte(self.position);
        self.position += 1;
        Ok(value)
    }

    /// Relative put of one byte.
    pub fn put(&mut self, value: u8) -> StrataResult<()> {
        if self.position >= self.limit {
            return Err(StrataError::overflow(1, 0));
        }
        self.set_byte(self.position, value);
        self.position += 1;
        Ok(())
    }

    /// Absolute get of one byte below the limit.
    pub fn get_at(&self, index: u64) -> StrataResult<u8> {
        if index >= self.limit {
            return Err(StrataError::index(index, self.limit));
        }
        Ok(self.byte(index))
    }

    /// Absolute put of one byte below the limit.
    pub fn put_at(&mut self, index: u64, value: u8) -> StrataResult<()> {
        if index >= self.limit {
            return Err(StrataError::index(index, self.limit));
        }
        self.set_byte(index, value);
        Ok(())
    }

    // =========================================================================
    // Multi-byte access
    // =========================================================================

    /// Relative get of one element.
    pub fn get_value<T: Element>(&mut self) -> StrataResult<T> {
        let remaining = self.remaining();
        if remaining < T::SIZE as u64 {
            return Err(StrataError::underflow(T::SIZE as u64, remaining));
        }
        let value = self.read_value(self.position);
        self.position += T::SIZE as u64;
        Ok(value)
    }

    /// Relative put of one element.
    pub fn put_value<T: Element>(&mut self, value: T) -> StrataResult<()> {
        let remaining = self.remaining();
        if remaining < T::SIZE as u64 {
            return Err(StrataError::overflow(T::SIZE as u64, remaining));
        }
        self.write_value(self.position, value);
        self.position += T::SIZE as u64;
        Ok(())
    }

    /// Absolute get of one element starting at byte `index`.
    pub fn get_value_at<T: Element>(&self, index: u64) -> StrataResult<T> {
        self.check_value_index::<T>(index)?;
        Ok(self.read_value(index))
    }

    /// Absolute put of one element starting at byte `index`.
    pub fn put_value_at<T: Element>(&mut self, index: u64, value: T) -> StrataResult<()> {
        self.check_value_index::<T>(index)?;
        self.write_value(index, value);
        Ok(())
    }

    value_accessors! {
        u64;
        i16 => get_i16, put_i16, get_i16_at, put_i16_at;
        i32 => get_i32, put_i32, get_i32_at, put_i32_at;
        i64 => get_i64, put_i64, get_i64_at, put_i64_at;
        f32 => get_f32, put_f32, get_f32_at, put_f32_at;
        f64 => get_f64, put_f64, get_f64_at, put_f64_at;
    }

    fn check_value_index<T: Element>(&self, index: u64) -> StrataResult<()> {
        if index > self.limit || self.limit - index < T::SIZE as u64 {
            return Err(StrataError::index(index, self.limit));
        }
        Ok(())
    }

    // =========================================================================
    // Bulk transfer
    // =========================================================================

    /// Fills `dst` from the position onward and advances the position.
    pub fn get_slice(&mut self, dst: &mut [u8]) -> StrataResult<()> {
        let remaining = self.remaining();
        if dst.len() as u64 > remaining {
            return Err(StrataError::underflow(dst.len() as u64, remaining));
        }
        self.read_bytes(self.position, dst);
        self.position += dst.len() as u64;
        Ok(())
    }

    /// Writes `src` at the position and advances the position.
    pub fn put_slice(&mut self, src: &[u8]) -> StrataResult<()> {
        let remaining = self.remaining();
        if src.len() as u64 > remaining {
            return Err(StrataError::overflow(src.len() as u64, remaining));
        }
        self.write_bytes(self.position, src);
        self.position += src.len() as u64;
        Ok(())
    }

    /// Writes every value in this buffer's byte order and advances the
    /// position.
    pub fn put_values<T: Element>(&mut self, values: &[T]) -> StrataResult<()> {
        let needed = (values.len() as u64).saturating_mul(T::SIZE as u64);
        let remaining = self.remaining();
        if needed > remaining {
            return Err(StrataError::overflow(needed, remaining));
        }
        for &value in values {
            self.write_value(self.position, value);
            self.position += T::SIZE as u64;
        }
        Ok(())
    }

    /// Transfers the remaining bytes of a native buffer, advancing both
    /// positions.
    pub fn put_buffer(&mut self, src: &mut Buffer) -> StrataResult<()> {
        let n = src.remaining();
        let remaining = self.remaining();
        if n as u64 > remaining {
            return Err(StrataError::overflow(n as u64, remaining));
        }
        if self.chunks().iter().any(|c| c.shares_storage_with(src)) {
            let staged = src.copy_range(src.position(), src.limit())?;
            self.copy_from_native(self.position, &staged, 0, n);
        } else {
            self.copy_from_native(self.position, src, src.position(), n);
        }
        self.position += n as u64;
        src.set_position(src.limit())?;
        Ok(())
    }

    /// Transfers the remaining bytes of another big buffer, advancing both
    /// positions.
    ///
    /// If the two buffers share any storage, the source range is staged
    /// into a private copy first so no byte is read after being overwritten.
    pub fn put_big(&mut self, src: &mut BigBuffer) -> StrataResult<()> {
        let n = src.remaining();
        let remaining = self.remaining();
        if n > remaining {
            return Err(StrataError::overflow(n, remaining));
        }
        let aliased = self
            .chunks()
            .iter()
            .any(|mine| src.chunks().iter().any(|theirs| mine.shares_storage_with(theirs)));
        let source = if aliased {
            src.copy_range(src.position, src.limit)?
        } else {
            src.slice()?
        };

        let mut dst_index = self.position;
        for chunk in source.chunks() {
            self.copy_from_native(dst_index, chunk, 0, chunk.capacity());
            dst_index += chunk.capacity() as u64;
        }
        self.position += n;
        src.position = src.limit;
        Ok(())
    }

    // =========================================================================
    // Typed views
    // =========================================================================

    /// Returns a typed view over the whole buffer with position and limit
    /// scaled down by the element width.
    ///
    /// Fails if the element count exceeds native addressing.
    pub fn as_typed<T: Element>(&self) -> StrataResult<SmallBuffer<T>> {
        SmallBuffer::new(self)
    }

    /// Signed byte view.
    pub fn as_byte_buffer(&self) -> StrataResult<SmallBuffer<i8>> {
        self.as_typed()
    }

    /// 16-bit integer view.
    pub fn as_short_buffer(&self) -> StrataResult<SmallBuffer<i16>> {
        self.as_typed()
    }

    /// 32-bit integer view.
    pub fn as_int_buffer(&self) -> StrataResult<SmallBuffer<i32>> {
        self.as_typed()
    }

    /// 64-bit integer view.
    pub fn as_long_buffer(&self) -> StrataResult<SmallBuffer<i64>> {
        self.as_typed()
    }

    /// 32-bit float view.
    pub fn as_float_buffer(&self) -> StrataResult<SmallBuffer<f32>> {
        self.as_typed()
    }

    /// 64-bit float view.
    pub fn as_double_buffer(&self) -> StrataResult<SmallBuffer<f64>> {
        self.as_typed()
    }

    // =========================================================================
    // Chunk level plumbing
    // =========================================================================

    fn chunks(&self) -> &[Buffer] {
        match &self.layout {
            Layout::Single(buffer) => std::slice::from_ref(buffer),
            Layout::Compound(c) => &c.chunks,
        }
    }

    fn chunks_mut(&mut self) -> &mut [Buffer] {
        match &mut self.layout {
            Layout::Single(buffer) => std::slice::from_mut(buffer),
            Layout::Compound(c) => &mut c.chunks,
        }
    }

    #[inline]
    fn locate(&self, index: u64) -> (usize, usize) {
        match &self.layout {
            Layout::Single(_) => (0, index as usize),
            Layout::Compound(c) => c.locate(index),
        }
    }

    #[inline]
    fn byte(&self, index: u64) -> u8 {
        let (chunk, offset) = self.locate(index);
        self.chunks()[chunk].load(offset)
    }

    #[inline]
    fn set_byte(&mut self, index: u64, value: u8) {
        let (chunk, offset) = self.locate(index);
        self.chunks_mut()[chunk].store(offset, value);
    }

    /// Reads one element at byte `index`; only the capacity is checked.
    pub(crate) fn read_value<T: Element>(&self, index: u64) -> T {
        let (chunk, offset) = self.locate(index);
        let chunk = &self.chunks()[chunk];
        let mut raw = [0u8; 8];
        if offset + T::SIZE <= chunk.capacity() {
            chunk.read_raw(offset, &mut raw[..T::SIZE]);
        } else {
            tracing::trace!(index, size = T::SIZE, "value straddles a chunk boundary");
            self.read_bytes(index, &mut raw[..T::SIZE]);
        }
        T::decode(&raw, self.order)
    }

    /// Writes one element at byte `index`; only the capacity is checked.
    pub(crate) fn write_value<T: Element>(&mut self, index: u64, value: T) {
        let mut raw = [0u8; 8];
        value.encode(self.order, &mut raw);
        let (chunk, offset) = self.locate(index);
        let chunk = &mut self.chunks_mut()[chunk];
        if offset + T::SIZE <= chunk.capacity() {
            chunk.write_raw(offset, &raw[..T::SIZE]);
        } else {
            tracing::trace!(index, size = T::SIZE, "value straddles a chunk boundary");
            self.write_bytes(index, &raw[..T::SIZE]);
        }
    }

    /// Visits the chunk segments covering `[index, index + len)` as
    /// `(chunk, offset, segment_len, done_so_far)`.
    fn for_each_segment(&self, index: u64, len: usize, mut visit: impl FnMut(usize, usize, usize, usize)) {
        let mut done = 0usize;
        while done < len {
            let (chunk, offset) = self.locate(index + done as u64);
            let step = (len - done).min(self.chunks()[chunk].capacity() - offset);
            visit(chunk, offset, step, done);
            done += step;
        }
    }

    fn read_bytes(&self, index: u64, dst: &mut [u8]) {
        let chunks = self.chunks();
        self.for_each_segment(index, dst.len(), |chunk, offset, step, done| {
            chunks[chunk].read_raw(offset, &mut dst[done..done + step]);
        });
    }

    fn write_bytes(&mut self, index: u64, src: &[u8]) {
        let mut done = 0usize;
        while done < src.len() {
            let (chunk, offset) = self.locate(index + done as u64);
            let chunk = &mut self.chunks_mut()[chunk];
            let step = (src.len() - done).min(chunk.capacity() - offset);
            chunk.write_raw(offset, &src[done..done + step]);
            done += step;
        }
    }

    /// Copies `[index, index + len)` into `dst[0..len)`.
    fn read_bytes_into(&self, index: u64, dst: &mut Buffer, len: usize) {
        let chunks = self.chunks();
        self.for_each_segment(index, len, |chunk, offset, step, done| {
            dst.copy_raw_from(done, &chunks[chunk], offset, step);
        });
    }

    /// Copies `src[src_index..src_index + len)` to `[index, index + len)`.
    fn copy_from_native(&mut self, index: u64, src: &Buffer, src_index: usize, len: usize) {
        let mut done = 0usize;
        while done < len {
            let (chunk, offset) = self.locate(index + done as u64);
            let chunk = &mut self.chunks_mut()[chunk];
            let step = (len - done).min(chunk.capacity() - offset);
            chunk.copy_raw_from(offset, src, src_index + done, step);
            done += step;
        }
    }

    /// Returns a buffer of exactly `size` bytes: chunks fully below `size`
    /// are shared and the chunk holding the last byte is copy-truncated.
    pub(crate) fn truncated(&self, size: u64) -> StrataResult<Self> {
        if size == 0 {
            return Ok(Self::empty().with_order(self.order));
        }
        check_big_range(0, size, self.capacity())?;
        let layout = match &self.layout {
            Layout::Single(buffer) if size == buffer.capacity() as u64 => Layout::Single(buffer.full_view()),
            Layout::Single(buffer) => Layout::Single(buffer.copy_range(0, size as usize)?),
            Layout::Compound(c) => {
                let (last, last_off) = c.locate(size - 1);
                let tail = &c.chunks[last];
                let mut chunks: Vec<Buffer> = c.chunks[..last].iter().map(Buffer::full_view).collect();
                if last_off + 1 == tail.capacity() {
                    chunks.push(tail.full_view());
                } else {
                    chunks.push(tail.copy_range(0, last_off + 1)?);
                }
                if chunks.len() == 1 {
                    Layout::Single(chunks.remove(0))
                } else {
                    Layout::Compound(Chunks::new(chunks, c.chunk_bits))
                }
            }
        };
        Ok(Self::from_layout(layout, self.order))
    }

    pub(crate) fn set_geometry_unchecked(&mut self, position: u64, limit: u64) {
        debug_assert!(position <= limit && limit <= self.capacity());
        self.position = position;
        self.limit = limit;
    }
}

impl PartialEq for BigBuffer {
    /// Equal when the remaining bytes are equal, regardless of chunking.
    fn eq(&self, other: &Self) -> bool {
        let n = self.remaining();
        if n != other.remaining() {
            return false;
        }
        let mut left = [0u8; 512];
        let mut right = [0u8; 512];
        let mut done = 0u64;
        while done < n {
            let step = (n - done).min(left.len() as u64) as usize;
            self.read_bytes(self.position + done, &mut left[..step]);
            other.read_bytes(other.position + done, &mut right[..step]);
            if left[..step] != right[..step] {
                return false;
            }
            done += step as u64;
        }
        true
    }
}

impl Eq for BigBuffer {}

impl fmt::Debug for BigBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigBuffer")
            .field("position", &self.position)
            .field("limit", &self.limit)
            .field("capacity", &self.capacity())
            .field("chunks", &self.chunk_count())
            .field("order", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::config::MemoryConfig;

    fn small_chunks() -> Allocator {
        Allocator::new(MemoryConfig::for_testing(4)).unwrap()
    }

    fn pattern(n: usize) -> Vec<u8> {
        (0..n).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[test]
    fn test_single_layout_below_threshold() {
        let allocator = small_chunks();
        let big = BigBuffer::allocate(&allocator, 31).unwrap();
        assert!(!big.is_compound());
        assert_eq!(big.capacity(), 31);
        assert_eq!(big.limit(), 31);
    }

    #[test]
    fn test_compound_geometry() {
        let big = BigBuffer::allocate(&small_chunks(), 40).unwrap();
        assert!(big.is_compound());
        let sizes: Vec<usize> = big.buffers().iter().map(Buffer::capacity).collect();
        assert_eq!(sizes, vec![16, 16, 8]);

        let exact = BigBuffer::allocate(&small_chunks(), 48).unwrap();
        assert_eq!(exact.chunk_count(), 3);
    }

    #[test]
    fn test_bytes_across_chunks() {
        let data = pattern(40);
        let mut big = BigBuffer::allocate(&small_chunks(), 40).unwrap();
        big.put_slice(&data).unwrap();
        big.flip();
        let mut out = vec![0u8; 40];
        big.get_slice(&mut out).unwrap();
        assert_eq!(out, data);
        assert_eq!(big.get_at(17).unwrap(), data[17]);
    }

    #[test]
    fn test_straddling_values() {
        let mut big = BigBuffer::allocate(&small_chunks(), 64)
            .unwrap()
            .with_order(ByteOrder::BigEndian);
        big.put_i64_at(12, 0x0102_0304_0506_0708).unwrap();
        assert_eq!(big.get_i64_at(12).unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(big.get_at(15).unwrap(), 0x04);
        assert_eq!(big.get_at(16).unwrap(), 0x05);

        big.put_f64_at(30, -1.25).unwrap();
        assert_eq!(big.get_f64_at(30).unwrap(), -1.25);
        big.put_i16_at(15, -2).unwrap();
        assert_eq!(big.get_i16_at(15).unwrap(), -2);
    }

    #[test]
    fn test_relative_errors() {
        let mut big = BigBuffer::allocate(&small_chunks(), 40).unwrap();
        big.set_position(38).unwrap();
        assert!(matches!(big.put_i32(1), Err(StrataError::Overflow { .. })));
        assert_eq!(big.position(), 38);
        big.set_limit(39).unwrap();
        assert!(matches!(big.get_i16(), Err(StrataError::Underflow { .. })));
        assert!(matches!(big.get_at(39), Err(StrataError::Index { .. })));
        assert!(big.get_i32_at(36).is_err());
    }

    #[test]
    fn test_slice_keeps_partitioning() {
        let data = pattern(64);
        let mut big = BigBuffer::allocate(&small_chunks(), 64).unwrap();
        big.put_slice(&data).unwrap();

        let slice = big.slice_range(10, 50).unwrap();
        let sizes: Vec<usize> = slice.buffers().iter().map(Buffer::capacity).collect();
        assert_eq!(sizes, vec![6, 16, 16, 2]);
        assert_eq!(slice.get_at(0).unwrap(), data[10]);
        assert_eq!(slice.get_at(39).unwrap(), data[49]);

        let inner = big.slice_range(17, 30).unwrap();
        assert!(!inner.is_compound());
        assert!(big.slice_range(5, 65).is_err());
        assert_eq!(big.slice_range(20, 20).unwrap().capacity(), 0);
    }

    #[test]
    fn test_slice_shares_copy_does_not() {
        let mut big = BigBuffer::allocate(&small_chunks(), 40).unwrap();
        let mut view = big.slice_range(8, 40).unwrap();
        view.put_at(10, 99).unwrap();
        assert_eq!(big.get_at(18).unwrap(), 99);

        let mut copy = big.copy_range(8, 40).unwrap();
        copy.put_at(10, 1).unwrap();
        assert_eq!(big.get_at(18).unwrap(), 99);
        big.put_at(0, 5).unwrap();
        assert_eq!(copy.capacity(), 32);
    }

    #[test]
    fn test_from_chunks_validation() {
        let chunk = |n| Buffer::allocate(n).unwrap();
        let ok = BigBuffer::from_chunks(vec![chunk(3), chunk(16), chunk(5)], 4).unwrap();
        assert_eq!(ok.capacity(), 24);
        assert_eq!(ok.get_at(3).unwrap(), 0);

        let err = BigBuffer::from_chunks(vec![chunk(3), chunk(15), chunk(5)], 4).unwrap_err();
        assert!(matches!(err, StrataError::InvalidArgument { .. }));
        assert!(BigBuffer::from_chunks(vec![chunk(17)], 4).is_err());

        let mut moved = chunk(16);
        moved.set_position(1).unwrap();
        assert!(BigBuffer::from_chunks(vec![chunk(16), moved], 4).is_err());

        let be = chunk(16).with_order(ByteOrder::BigEndian);
        let le = chunk(16).with_order(ByteOrder::LittleEndian);
        assert!(BigBuffer::from_chunks(vec![be, le], 4).is_err());
        assert!(BigBuffer::from_chunks(vec![chunk(4)], 2).is_err());
    }

    #[test]
    fn test_first_chunk_shorter() {
        let chunks = vec![
            Buffer::allocate(3).unwrap(),
            Buffer::allocate(16).unwrap(),
            Buffer::allocate(16).unwrap(),
        ];
        let mut big = BigBuffer::from_chunks(chunks, 4).unwrap();
        let data = pattern(35);
        big.put_slice(&data).unwrap();
        for (i, &b) in data.iter().enumerate() {
            assert_eq!(big.get_at(i as u64).unwrap(), b);
        }
    }

    #[test]
    fn test_equality_ignores_chunking() {
        let data = pattern(40);
        let mut single = BigBuffer::allocate(&Allocator::default(), 40).unwrap();
        let mut compound = BigBuffer::allocate(&small_chunks(), 40).unwrap();
        single.put_slice(&data).unwrap();
        compound.put_slice(&data).unwrap();
        single.flip();
        compound.flip();
        assert_eq!(single, compound);
        compound.put_at(39, 0).unwrap();
        assert_ne!(single, compound);
    }

    #[test]
    fn test_put_big_overlapping_duplicate() {
        let data = pattern(40);
        let mut big = BigBuffer::allocate(&small_chunks(), 40).unwrap();
        big.put_slice(&data).unwrap();

        let mut src = big.slice_range(0, 30).unwrap();
        big.set_position(5).unwrap();
        big.put_big(&mut src).unwrap();
        assert!(!src.has_remaining());
        assert_eq!(big.position(), 35);

        let mut out = vec![0u8; 30];
        big.set_position(5).unwrap();
        big.get_slice(&mut out).unwrap();
        assert_eq!(out, data[..30].to_vec());
    }

    #[test]
    fn test_put_buffer_and_overflow() {
        let mut big = BigBuffer::allocate(&small_chunks(), 40).unwrap();
        let mut src = Buffer::from_slice(&pattern(20)).unwrap();
        big.set_position(10).unwrap();
        big.put_buffer(&mut src).unwrap();
        assert_eq!(src.remaining(), 0);
        assert_eq!(big.get_at(29).unwrap(), pattern(20)[19]);

        let mut too_big = Buffer::from_slice(&pattern(11)).unwrap();
        assert!(matches!(big.put_buffer(&mut too_big), Err(StrataError::Overflow { .. })));
        assert_eq!(too_big.position(), 0);
    }

    #[test]
    fn test_put_values() {
        let mut big = BigBuffer::allocate(&small_chunks(), 40).unwrap();
        big.put_values(&[1i32, -2, 3, -4, 5]).unwrap();
        assert_eq!(big.position(), 20);
        assert_eq!(big.get_i32_at(16).unwrap(), 5);
        assert!(big.put_values(&[0i64; 3]).is_err());
    }

    #[test]
    fn test_small_slice() {
        let data = pattern(40);
        let mut big = BigBuffer::allocate(&small_chunks(), 40).unwrap();
        big.put_slice(&data).unwrap();

        let inside = big.small_slice(2, 10).unwrap();
        assert_eq!(inside.to_vec(), data[2..10].to_vec());

        let across = big.small_slice(10, 38).unwrap();
        assert_eq!(across.to_vec(), data[10..38].to_vec());
        assert!(big.small_slice(30, 50).is_err());
    }

    #[test]
    fn test_compact() {
        let data = pattern(40);
        let mut big = BigBuffer::allocate(&small_chunks(), 40).unwrap();
        big.put_slice(&data).unwrap();
        big.set_position(7).unwrap();
        big.compact();
        assert_eq!(big.position(), 33);
        assert_eq!(big.get_at(0).unwrap(), data[7]);
        assert_eq!(big.get_at(32).unwrap(), data[39]);
    }

    #[test]
    fn test_truncated_shares_full_chunks() {
        let mut big = BigBuffer::allocate(&small_chunks(), 64).unwrap();
        big.put_slice(&pattern(64)).unwrap();
        let trimmed = big.truncated(37).unwrap();
        let sizes: Vec<usize> = trimmed.buffers().iter().map(Buffer::capacity).collect();
        assert_eq!(sizes, vec![16, 16, 5]);
        assert!(trimmed.buffers()[0].shares_storage_with(&big.buffers()[0]));
        assert!(!trimmed.buffers()[2].shares_storage_with(&big.buffers()[2]));
        assert_eq!(big.truncated(0).unwrap().capacity(), 0);
    }

    #[test]
    fn test_wrap_keeps_geometry() {
        let mut buf = Buffer::allocate(8).unwrap().with_order(ByteOrder::BigEndian);
        buf.put_i16(7).unwrap();
        let big = BigBuffer::wrap(&buf);
        assert_eq!(big.position(), 2);
        assert_eq!(big.order(), ByteOrder::BigEndian);
        assert_eq!(big.get_i16_at(0).unwrap(), 7);
    }
}
