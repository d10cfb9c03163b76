//! Typed views over big buffers with native-sized element indices.

use std::fmt;
use std::marker::PhantomData;

use strata_common::constants::MAX_NATIVE_CAPACITY;
use strata_common::{StrataError, StrataResult};

use super::BigBuffer;
use crate::element::{Element, ElementStore};
use crate::ops::check_range;

/// A view of a [`BigBuffer`] as a sequence of `T`.
///
/// Position, limit and capacity are the big buffer's byte values shifted
/// right by `log2(T::SIZE)`. Element `i` occupies bytes
/// `[i * SIZE, (i + 1) * SIZE)` and may straddle a chunk boundary.
#[derive(Clone)]
pub struct SmallBuffer<T: Element> {
    bytes: BigBuffer,
    capacity: usize,
    position: usize,
    limit: usize,
    _marker: PhantomData<T>,
}

impl<T: Element> SmallBuffer<T> {
    pub(super) fn new(big: &BigBuffer) -> StrataResult<Self> {
        let capacity = big.capacity() >> T::SHIFT;
        if capacity > MAX_NATIVE_CAPACITY as u64 {
            return Err(StrataError::capacity(capacity, MAX_NATIVE_CAPACITY as u64));
        }
        let mut bytes = big.duplicate();
        bytes.clear();
        Ok(Self {
            bytes,
            capacity: capacity as usize,
            position: (big.position() >> T::SHIFT) as usize,
            limit: ((big.limit() >> T::SHIFT) as usize).min(capacity as usize),
            _marker: PhantomData,
        })
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

    /// Returns `limit - position`.
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

    /// Absolute get below the limit.
    pub fn get_at(&self, index: usize) -> StrataResult<T> {
        if index >= self.limit {
            return Err(StrataError::index(index as u64, self.limit as u64));
        }
        Ok(self.load(index))
    }

    /// Absolute put below the limit.
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
        let bytes = self
            .bytes
            .slice_range((from as u64) << T::SHIFT, (to as u64) << T::SHIFT)?;
        Self::new(&bytes)
    }

    /// Copies elements `[from, to)` into fresh storage.
    pub fn copy_range(&self, from: usize, to: usize) -> StrataResult<Self> {
        check_range(from, to, self.capacity)?;
        let bytes = self
            .bytes
            .copy_range((from as u64) << T::SHIFT, (to as u64) << T::SHIFT)?;
        Self::new(&bytes)
    }

    /// Copies the remaining elements into a vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        (self.position..self.limit).map(|i| self.load(i)).collect()
    }

    /// Returns the underlying big buffer with position and limit scaled back
    /// up to bytes.
    #[must_use]
    pub fn as_big_buffer(&self) -> BigBuffer {
        let mut bytes = self.bytes.duplicate();
        bytes.set_geometry_unchecked(
            (self.position as u64) << T::SHIFT,
            (self.limit as u64) << T::SHIFT,
        );
        bytes
    }
}

impl<T: Element> ElementStore<T> for SmallBuffer<T> {
    #[inline]
    fn element_capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn load(&self, index: usize) -> T {
        assert!(index < self.capacity, "index {index} out of bounds for capacity {}", self.capacity);
        self.bytes.read_value((index as u64) << T::SHIFT)
    }

    #[inline]
    fn store(&mut self, index: usize, value: T) {
        assert!(index < self.capacity, "index {index} out of bounds for capacity {}", self.capacity);
        self.bytes.write_value((index as u64) << T::SHIFT, value);
    }
}

impl<T: Element> fmt::Debug for SmallBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmallBuffer")
            .field("element", &std::any::type_name::<T>())
            .field("position", &self.position)
            .field("limit", &self.limit)
            .field("capacity", &self.capacity)
            .field("chunks", &self.bytes.chunk_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{search, sort, Allocator, BigBuffer, ByteOrder};
    use strata_common::config::MemoryConfig;

    fn compound(capacity: u64) -> BigBuffer {
        let allocator = Allocator::new(MemoryConfig::for_testing(4)).unwrap();
        BigBuffer::allocate(&allocator, capacity).unwrap()
    }

    #[test]
    fn test_scaled_geometry() {
        let mut big = compound(70);
        big.set_position(16).unwrap();
        big.set_limit(66).unwrap();
        let longs = big.as_long_buffer().unwrap();
        assert_eq!(longs.capacity(), 8);
        assert_eq!(longs.position(), 2);
        assert_eq!(longs.limit(), 8);
        let shorts = big.as_short_buffer().unwrap();
        assert_eq!(shorts.capacity(), 35);
        assert_eq!(shorts.limit(), 33);
    }

    #[test]
    fn test_values_straddle_chunks() {
        let big = compound(48).with_order(ByteOrder::LittleEndian);
        let mut ints = big.as_int_buffer().unwrap();
        for i in 0..12 {
            ints.put_at(i, i as i32 * 1000 - 5000).unwrap();
        }
        let mut doubles = compound(48).as_double_buffer().unwrap();
        doubles.put_at(1, 3.5).unwrap();
        assert_eq!(doubles.get_at(1).unwrap(), 3.5);
        assert_eq!(ints.get_at(11).unwrap(), 6000);
        assert_eq!(big.get_i32_at(44).unwrap(), 6000);
    }

    #[test]
    fn test_sort_and_search_over_chunks() {
        let big = compound(80);
        let mut longs = big.as_long_buffer().unwrap();
        let values = [9i64, -3, 7, 7, 0, i64::MIN, 42, 1, 7, 5];
        for (i, &v) in values.iter().enumerate() {
            longs.put_at(i, v).unwrap();
        }
        sort::sort(&mut longs, 0, 10).unwrap();
        let mut expected = values.to_vec();
        expected.sort_unstable();
        assert_eq!(longs.to_vec(), expected);

        let hit = search::binary_search(&longs, 0, 10, 7).unwrap();
        assert!(hit >= 0);
        let hit = hit as usize;
        assert_eq!(search::binary_find_first(&longs, 0, hit).unwrap(), 5);
        assert_eq!(search::binary_find_last(&longs, 10, hit).unwrap(), 7);
    }

    #[test]
    fn test_slice_and_copy() {
        let big = compound(64);
        let mut ints = big.as_int_buffer().unwrap();
        for i in 0..16 {
            ints.put_at(i, i as i32).unwrap();
        }
        let mut view = ints.slice_range(3, 10).unwrap();
        assert_eq!(view.to_vec(), (3..10).collect::<Vec<i32>>());
        view.put_at(0, -1).unwrap();
        assert_eq!(ints.get_at(3).unwrap(), -1);

        let mut copy = ints.copy_range(3, 10).unwrap();
        copy.put_at(0, 100).unwrap();
        assert_eq!(ints.get_at(3).unwrap(), -1);
        assert_eq!(copy.as_big_buffer().limit(), 28);
    }

    #[test]
    fn test_limit_checks() {
        let mut big = compound(40);
        big.set_limit(20).unwrap();
        let mut ints = big.as_int_buffer().unwrap();
        assert!(ints.put_at(5, 1).is_err());
        ints.clear();
        assert!(ints.put_at(5, 1).is_ok());
        assert!(ints.put_at(10, 1).is_err());
    }
}
