//! Fixed-width typed views over native buffers.

use std::fmt;
use std::marker::PhantomData;

use strata_common::{StrataError, StrataResult};

use crate::buffer::Buffer;
use crate::element::{Element, ElementStore};
use crate::ops::check_range;
use crate::order::ByteOrder;

/// A view of a native buffer as a sequence of `T`.
///
/// Position, limit and capacity are counted in elements. The view covers
/// the whole underlying byte buffer; a trailing partial element is not
/// addressable.
#[derive(Clone)]
pub struct TypedBuffer<T: Element> {
    bytes: Buffer,
    capacity: usize,
    position: usize,
    limit: usize,
    _marker: PhantomData<T>,
}

/// Signed byte view.
pub type ByteView = TypedBuffer<i8>;
/// 16-bit integer view.
pub type ShortBuffer = TypedBuffer<i16>;
/// 32-bit integer view.
pub type IntBuffer = TypedBuffer<i32>;
/// 64-bit integer view.
pub type LongBuffer = TypedBuffer<i64>;
/// 32-bit float view.
pub type FloatBuffer = TypedBuffer<f32>;
/// 64-bit float view.
pub type DoubleBuffer = TypedBuffer<f64>;

impl<T: Element> TypedBuffer<T> {
    /// Creates a view over `bytes`, scaling its position and limit down by
    /// the element width.
    #[must_use]
    pub fn new(bytes: &Buffer) -> Self {
        let capacity = bytes.capacity() >> T::SHIFT;
        Self {
            capacity,
            position: bytes.position() >> T::SHIFT,
            limit: (bytes.limit() >> T::SHIFT).min(capacity),
            bytes: bytes.full_view(),
            _marker: PhantomData,
        }
    }

    /// Allocates a zero-filled heap view of `len` elements.
    pub fn allocate(len: usize) -> StrataResult<Self> {
        let bytes = Buffer::allocate(byte_len::<T>(len)?)?;
        Ok(Self::new(&bytes))
    }

    /// Creates a heap view holding a copy of `values`, ready to be read.
    pub fn from_slice(values: &[T]) -> StrataResult<Self> {
        let mut view = Self::allocate(values.len())?;
        for (i, &v) in values.iter().enumerate() {
            view.store(i, v);
        }
        Ok(view)
    }

    /// Returns the capacity in elements.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the position in elements.
    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the limit in elements.
    #[inline]
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the number of elements between position and limit.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    /// Sets the position.
    pub fn set_position(&mut self, position: usize) -> StrataResult<()> {
        if position > self.limit {
            return Err(StrataError::index(position as u64, self.limit as u64));
        }
        self.position = position;
        Ok(())
    }

    /// Sets the limit, pulling the position back if needed.
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

    /// Returns the byte order elements are encoded in.
    #[must_use]
    pub fn order(&self) -> ByteOrder {
        self.bytes.order()
    }

    /// Relative get.
    pub fn get(&mut self) -> StrataResult<T> {
        if self.position >= self.limit {
            return Err(StrataError::underflow(1, 0));
        }
        let value = self.load(self.position);
        self.position += 1;
        Ok(value)
    }

    /// Relative put.
    pub fn put(&mut self, value: T) -> StrataResult<()> {
        if self.position >= self.limit {
            return Err(StrataError::overflow(1, 0));
        }
        self.store(self.position, value);
        self.position += 1;
        Ok(())
    }

    /// Absolute get; `index` must be below the limit.
    pub fn get_at(&self, index: usize) -> StrataResult<T> {
        if index >= self.limit {
            return Err(StrataError::index(index as u64, self.limit as u64));
        }
        Ok(self.load(index))
    }

    /// Absolute put; `index` must be below the limit.
    pub fn put_at(&mut self, index: usize, value: T) -> StrataResult<()> {
        if index >= self.limit {
            return Err(StrataError::index(index as u64, self.limit as u64));
        }
        self.store(index, value);
        Ok(())
    }

    /// Returns a view of elements `[from, to)` sharing storage.
    pub fn slice_range(&self, from: usize, to: usize) -> StrataResult<Self> {
        check_range(from, to, self.capacity)?;
        let bytes = self.bytes.slice_range(from << T::SHIFT, to << T::SHIFT)?;
        Ok(Self::new(&bytes))
    }

    /// Copies elements `[from, to)` into fresh storage.
    pub fn copy_range(&self, from: usize, to: usize) -> StrataResult<Self> {
        check_range(from, to, self.capacity)?;
        let bytes = self.bytes.copy_range(from << T::SHIFT, to << T::SHIFT)?;
        Ok(Self::new(&bytes))
    }

    /// Returns a handle sharing storage with independent position and limit.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Copies the remaining elements into a vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        (self.position..self.limit).map(|i| self.load(i)).collect()
    }

    /// Returns the underlying bytes as a buffer whose position and limit
    /// match this view's.
    #[must_use]
    pub fn as_bytes(&self) -> Buffer {
        let mut bytes = self.bytes.full_view();
        bytes.set_geometry_unchecked(self.position << T::SHIFT, self.limit << T::SHIFT);
        bytes
    }
}

fn byte_len<T: Element>(len: usize) -> StrataResult<usize> {
    len.checked_mul(T::SIZE)
        .ok_or_else(|| StrataError::capacity(len as u64, (usize::MAX >> T::SHIFT) as u64))
}

impl<T: Element> ElementStore<T> for TypedBuffer<T> {
    #[inline]
    fn element_capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn load(&self, index: usize) -> T {
        assert!(index < self.capacity, "index {index} out of bounds for capacity {}", self.capacity);
        self.bytes.read_element_raw(index << T::SHIFT)
    }

    #[inline]
    fn store(&mut self, index: usize, value: T) {
        assert!(index < self.capacity, "index {index} out of bounds for capacity {}", self.capacity);
        self.bytes.write_element_raw(index << T::SHIFT, value);
    }
}

impl<T: Element> PartialEq for TypedBuffer<T> {
    /// Compares remaining elements under the total order.
    fn eq(&self, other: &Self) -> bool {
        self.remaining() == other.remaining()
            && (0..self.remaining())
                .all(|i| self.load(self.position + i).total_eq(&other.load(other.position + i)))
    }
}

impl<T: Element> fmt::Debug for TypedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedBuffer")
            .field("element", &std::any::type_name::<T>())
            .field("position", &self.position)
            .field("limit", &self.limit)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Buffer {
    /// Returns a typed view over this buffer's storage.
    #[must_use]
    pub fn as_typed<T: Element>(&self) -> TypedBuffer<T> {
        TypedBuffer::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_geometry() {
        let mut bytes = Buffer::allocate(17).unwrap();
        bytes.set_position(8).unwrap();
        let longs = bytes.as_typed::<i64>();
        assert_eq!(longs.capacity(), 2);
        assert_eq!(longs.position(), 1);
        assert_eq!(longs.limit(), 2);
    }

    #[test]
    fn test_put_get() {
        let mut ints = IntBuffer::allocate(4).unwrap();
        ints.put(1).unwrap();
        ints.put(-2).unwrap();
        ints.flip();
        assert_eq!(ints.to_vec(), vec![1, -2]);
        assert_eq!(ints.get().unwrap(), 1);
        assert!(ints.get_at(2).is_err());
        assert!(ints.put_at(2, 5).is_err());
    }

    #[test]
    fn test_view_shares_bytes() {
        let bytes = Buffer::allocate(8).unwrap().with_order(ByteOrder::BigEndian);
        let mut shorts = bytes.as_typed::<i16>();
        shorts.put_at(1, 0x0102).unwrap();
        assert_eq!(bytes.get_at(2).unwrap(), 1);
        assert_eq!(bytes.get_at(3).unwrap(), 2);
    }

    #[test]
    fn test_slice_and_copy() {
        let doubles = DoubleBuffer::from_slice(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut mid = doubles.slice_range(1, 3).unwrap();
        assert_eq!(mid.to_vec(), vec![2.0, 3.0]);
        mid.put_at(0, 9.0).unwrap();
        assert_eq!(doubles.get_at(1).unwrap(), 9.0);

        let mut copy = doubles.copy_range(0, 2).unwrap();
        copy.put_at(0, -1.0).unwrap();
        assert_eq!(doubles.get_at(0).unwrap(), 1.0);
        assert!(doubles.slice_range(3, 5).is_err());
    }

    #[test]
    fn test_as_bytes_geometry() {
        let mut floats = FloatBuffer::allocate(4).unwrap();
        floats.put(1.5).unwrap();
        floats.flip();
        let bytes = floats.as_bytes();
        assert_eq!(bytes.limit(), 4);
        assert_eq!(bytes.position(), 0);
    }

    #[test]
    fn test_nan_equality() {
        let a = FloatBuffer::from_slice(&[f32::NAN, 1.0]).unwrap();
        let b = FloatBuffer::from_slice(&[-f32::NAN, 1.0]).unwrap();
        assert_eq!(a, b);
    }
}
