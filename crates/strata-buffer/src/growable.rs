//! Append buffer for data of unknown final size.

use strata_common::constants::GROWTH_PERCENT;
use strata_common::{StrataError, StrataResult};

use crate::allocator::Allocator;
use crate::big::BigBuffer;
use crate::buffer::Buffer;
use crate::element::Element;

/// An append-only buffer backed by a [`BigBuffer`] that reallocates as it
/// fills.
///
/// The size is the write position of the backing buffer. Growth always
/// allocates a new buffer of at least 1.5 times the old capacity plus one
/// and copies the written bytes across.
///
/// # Example
///
/// ```rust
/// use strata_buffer::{Allocator, GrowableBigBuffer};
///
/// let mut growable = GrowableBigBuffer::new(Allocator::default());
/// growable.put_slice(b"hello").unwrap();
/// growable.put_value(42i32).unwrap();
/// assert_eq!(growable.size(), 9);
///
/// let trimmed = growable.trim().unwrap();
/// assert_eq!(trimmed.capacity(), 9);
/// ```
#[derive(Debug)]
pub struct GrowableBigBuffer {
    allocator: Allocator,
    buffer: BigBuffer,
}

impl GrowableBigBuffer {
    /// Creates an empty growable buffer that allocates on first write.
    #[must_use]
    pub fn new(allocator: Allocator) -> Self {
        Self {
            allocator,
            buffer: BigBuffer::empty(),
        }
    }

    /// Creates a growable buffer with `capacity` bytes preallocated.
    pub fn with_capacity(allocator: Allocator, capacity: u64) -> StrataResult<Self> {
        let buffer = BigBuffer::allocate(&allocator, capacity)?;
        Ok(Self { allocator, buffer })
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub fn size(&self) -> u64 {
        self.buffer.position()
    }

    /// Returns the current capacity in bytes.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.buffer.capacity()
    }

    /// Returns true if nothing has been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Grows the backing buffer so that it holds at least `min_capacity`
    /// bytes.
    pub fn ensure_capacity(&mut self, min_capacity: u64) -> StrataResult<()> {
        let capacity = self.capacity();
        if min_capacity <= capacity {
            return Ok(());
        }
        let grown = capacity
            .checked_mul(GROWTH_PERCENT)
            .map(|c| c / 100 + 1)
            .ok_or_else(|| StrataError::capacity(capacity, u64::MAX / GROWTH_PERCENT))?;
        let new_capacity = grown.max(min_capacity);

        let size = self.size();
        let mut next = BigBuffer::allocate_with_order(&self.allocator, new_capacity, self.buffer.order())?;
        let mut written = self.buffer.slice_range(0, size)?;
        next.put_big(&mut written)?;
        tracing::debug!(from = capacity, to = new_capacity, size, "grew big buffer");
        self.buffer = next;
        Ok(())
    }

    fn reserve(&mut self, additional: u64) -> StrataResult<()> {
        let needed = self
            .size()
            .checked_add(additional)
            .ok_or_else(|| StrataError::capacity(u64::MAX, u64::MAX))?;
        self.ensure_capacity(needed)
    }

    /// Appends the remaining bytes of `src`, advancing its position.
    pub fn add_all(&mut self, src: &mut BigBuffer) -> StrataResult<()> {
        self.reserve(src.remaining())?;
        self.buffer.put_big(src)
    }

    /// Appends the remaining bytes of a native buffer, advancing its
    /// position.
    pub fn add_buffer(&mut self, src: &mut Buffer) -> StrataResult<()> {
        self.reserve(src.remaining() as u64)?;
        self.buffer.put_buffer(src)
    }

    /// Appends `bytes`.
    pub fn put_slice(&mut self, bytes: &[u8]) -> StrataResult<()> {
        self.reserve(bytes.len() as u64)?;
        self.buffer.put_slice(bytes)
    }

    /// Appends one element in the buffer's byte order.
    pub fn put_value<T: Element>(&mut self, value: T) -> StrataResult<()> {
        self.reserve(T::SIZE as u64)?;
        self.buffer.put_value(value)
    }

    /// Appends every element of `values`.
    pub fn put_values<T: Element>(&mut self, values: &[T]) -> StrataResult<()> {
        self.reserve((values.len() as u64).saturating_mul(T::SIZE as u64))?;
        self.buffer.put_values(values)
    }

    /// Appends the written bytes `[0, size)` of `other`. Does nothing if
    /// `other` is empty.
    pub fn append(&mut self, other: &GrowableBigBuffer) -> StrataResult<()> {
        if other.is_empty() {
            return Ok(());
        }
        let mut written = other.buffer.slice_range(0, other.size())?;
        self.add_all(&mut written)
    }

    /// Returns a read view of the written bytes with position 0 and limit
    /// `size`, sharing storage.
    #[must_use]
    pub fn as_big_buffer(&self) -> BigBuffer {
        let mut view = self.buffer.duplicate();
        view.flip();
        view
    }

    /// Forgets everything written while keeping the capacity.
    pub fn clear(&mut self) {
        self.buffer.rewind();
    }

    /// Consumes the growable buffer and returns a buffer of exactly `size`
    /// bytes with position 0.
    ///
    /// Full chunks are handed over as they are; only the chunk holding the
    /// last byte is copied to its used length. An empty growable buffer
    /// yields the shared empty buffer instead of a zero-length allocation.
    pub fn trim(self) -> StrataResult<BigBuffer> {
        let size = self.size();
        if size == 0 {
            return Ok(BigBuffer::empty());
        }
        self.buffer.truncated(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::config::MemoryConfig;

    fn small_chunks() -> Allocator {
        Allocator::new(MemoryConfig::for_testing(4)).unwrap()
    }

    #[test]
    fn test_growth_factor() {
        let mut growable = GrowableBigBuffer::with_capacity(Allocator::default(), 10).unwrap();
        growable.put_slice(&[1; 10]).unwrap();
        assert_eq!(growable.capacity(), 10);
        growable.put_slice(&[2]).unwrap();
        assert_eq!(growable.capacity(), 16);
        growable.ensure_capacity(100).unwrap();
        assert_eq!(growable.capacity(), 100);
        assert_eq!(growable.size(), 11);
    }

    #[test]
    fn test_starts_empty() {
        let mut growable = GrowableBigBuffer::new(Allocator::default());
        assert!(growable.is_empty());
        assert_eq!(growable.capacity(), 0);
        growable.put_value(7i64).unwrap();
        assert_eq!(growable.capacity(), 8);
        assert_eq!(growable.as_big_buffer().get_i64_at(0).unwrap(), 7);
    }

    #[test]
    fn test_content_survives_growth_into_chunks() {
        let mut growable = GrowableBigBuffer::new(small_chunks());
        let data: Vec<u8> = (0..=200).collect();
        for chunk in data.chunks(7) {
            growable.put_slice(chunk).unwrap();
        }
        let view = growable.as_big_buffer();
        assert!(view.is_compound());
        for (i, &b) in data.iter().enumerate() {
            assert_eq!(view.get_at(i as u64).unwrap(), b);
        }
    }

    #[test]
    fn test_append() {
        let mut a = GrowableBigBuffer::new(small_chunks());
        let mut b = GrowableBigBuffer::new(small_chunks());
        a.put_slice(&[1, 2, 3]).unwrap();
        b.put_values(&[4i16, 5, 6]).unwrap();
        a.append(&b).unwrap();
        assert_eq!(a.size(), 9);
        a.append(&GrowableBigBuffer::new(small_chunks())).unwrap();
        assert_eq!(a.size(), 9);
        assert_eq!(b.size(), 6);
    }

    #[test]
    fn test_add_all_advances_source() {
        let mut growable = GrowableBigBuffer::new(small_chunks());
        let mut src = BigBuffer::wrap(&Buffer::from_slice(&[9; 40]).unwrap());
        growable.add_all(&mut src).unwrap();
        assert!(!src.has_remaining());
        let mut native = Buffer::from_slice(&[8; 5]).unwrap();
        growable.add_buffer(&mut native).unwrap();
        assert_eq!(native.remaining(), 0);
        assert_eq!(growable.size(), 45);
    }

    #[test]
    fn test_trim() {
        let mut growable = GrowableBigBuffer::new(small_chunks());
        let data: Vec<u8> = (0..37).collect();
        growable.put_slice(&data).unwrap();
        let trimmed = growable.trim().unwrap();
        assert_eq!(trimmed.capacity(), 37);
        assert_eq!(trimmed.position(), 0);
        assert_eq!(trimmed.limit(), 37);
        assert_eq!(trimmed.get_at(36).unwrap(), 36);
    }

    #[test]
    fn test_trim_empty_is_sentinel() {
        let trimmed = GrowableBigBuffer::new(Allocator::default()).trim().unwrap();
        assert_eq!(trimmed.capacity(), 0);
        let mut growable = GrowableBigBuffer::with_capacity(Allocator::default(), 64).unwrap();
        growable.put_slice(&[1]).unwrap();
        growable.clear();
        assert_eq!(growable.trim().unwrap().capacity(), 0);
    }
}
