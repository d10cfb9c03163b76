//! Resizable bit-vector over a native byte buffer.
//!
//! Bit `i` lives in byte `i >> 3` at bit position `i & 7` (least significant
//! bit first). The backing buffer's position is the number of bytes in use:
//! the byte holding the highest set bit is always the last byte in use, and
//! every byte at or past the position is zero. The limit always equals the
//! capacity.

use std::fmt;
use std::hash::{Hash, Hasher};

use strata_buffer::{Allocator, Buffer, ElementStore};
use strata_common::constants::{MAX_BITSET_CAPACITY, MAX_BIT_INDEX};
use strata_common::{StrataError, StrataResult};

const MASK: u8 = 0xFF;

#[inline]
pub(crate) const fn byte_index(bit: usize) -> usize {
    bit >> 3
}

#[inline]
const fn bit_mask(bit: usize) -> u8 {
    1 << (bit & 7)
}

/// Mask of bits `bit & 7` and above within one byte.
#[inline]
pub(crate) const fn from_mask(bit: usize) -> u8 {
    MASK << (bit & 7)
}

/// Mask of bits `bit & 7` and below within one byte.
#[inline]
pub(crate) const fn through_mask(bit: usize) -> u8 {
    MASK >> (7 - (bit & 7))
}

#[derive(Clone, Copy)]
enum RangeOp {
    Set,
    Clear,
    Flip,
}

impl RangeOp {
    #[inline]
    fn apply(self, byte: u8, mask: u8) -> u8 {
        match self {
            Self::Set => byte | mask,
            Self::Clear => byte & !mask,
            Self::Flip => byte ^ mask,
        }
    }
}

/// A bit-vector that may grow on demand.
///
/// Not thread safe: like every buffer handle it is neither `Send` nor
/// `Sync`. Two bitsets never share storage, so the set algebra needs no
/// aliasing checks.
///
/// # Example
///
/// ```rust
/// use strata_bitset::DynamicBitSet;
///
/// let mut bits = DynamicBitSet::allocate_resizable(8).unwrap();
/// bits.set(1).unwrap();
/// bits.set(100).unwrap();
/// assert!(bits.get(100));
/// assert_eq!(bits.size(), 13);
/// assert_eq!(bits.to_string(), "[1, 100]");
/// ```
pub struct DynamicBitSet {
    buffer: Buffer,
    resizable: bool,
}

impl DynamicBitSet {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Allocates a fixed-capacity heap bitset able to hold `bits` bits.
    ///
    /// Use [`allocate_in`](Self::allocate_in) to honor a configured
    /// direct-memory allocator.
    pub fn allocate(bits: usize) -> StrataResult<Self> {
        Self::allocate_in(&Allocator::default(), bits, false)
    }

    /// Allocates a heap bitset that grows past `bits` bits when needed.
    pub fn allocate_resizable(bits: usize) -> StrataResult<Self> {
        Self::allocate_in(&Allocator::default(), bits, true)
    }

    /// Allocates from `allocator`. Growth and derived bitsets keep the
    /// backing kind of the first allocation.
    pub fn allocate_in(allocator: &Allocator, bits: usize, resizable: bool) -> StrataResult<Self> {
        if bits > MAX_BIT_INDEX + 1 {
            return Err(StrataError::capacity(bits as u64, MAX_BIT_INDEX as u64 + 1));
        }
        let buffer = allocator.allocate(bits.div_ceil(8))?;
        Ok(Self::over(buffer, resizable))
    }

    /// Returns an empty fixed-capacity bitset.
    ///
    /// Empty bitsets of one thread share a single zero-length storage block.
    #[must_use]
    pub fn empty() -> Self {
        Self::over(Buffer::empty(), false)
    }

    /// Builds a resizable bitset with the given bits set.
    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> StrataResult<Self> {
        let mut bits = Self::allocate_resizable(0)?;
        for index in indices {
            bits.set(index)?;
        }
        Ok(bits)
    }

    /// Builds a fixed-capacity heap bitset from raw bytes, least significant
    /// bit first.
    pub fn from_bytes(bytes: &[u8]) -> StrataResult<Self> {
        if bytes.len() > MAX_BITSET_CAPACITY {
            return Err(StrataError::capacity(bytes.len() as u64, MAX_BITSET_CAPACITY as u64));
        }
        let mut buffer = Buffer::from_slice(bytes)?;
        buffer.set_position(bytes.len())?;
        Self::from_filled(buffer, false)
    }

    /// Wraps a buffer whose `[0, position)` holds bit data and whose bytes
    /// past the position are zero, then trims trailing zero bytes.
    pub(crate) fn from_filled(buffer: Buffer, resizable: bool) -> StrataResult<Self> {
        let mut bits = Self { buffer, resizable };
        bits.trim()?;
        Ok(bits)
    }

    fn over(buffer: Buffer, resizable: bool) -> Self {
        Self { buffer, resizable }
    }

    /// Returns an exact-capacity copy with the given resizable flag.
    pub fn with_resizable(&self, resizable: bool) -> StrataResult<Self> {
        let mut copy = self.copy()?;
        copy.resizable = resizable;
        Ok(copy)
    }

    /// Returns an independent copy whose capacity equals the bytes in use.
    pub fn copy(&self) -> StrataResult<Self> {
        let size = self.size();
        let mut buffer = self.buffer.copy_range(0, size)?;
        buffer.set_position(size)?;
        Ok(Self::over(buffer, self.resizable))
    }

    /// Returns the bytes in use.
    pub fn to_bytes(&self) -> StrataResult<Vec<u8>> {
        Ok(self.buffer.slice_range(0, self.size())?.to_vec())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns true if the bitset may grow.
    #[inline]
    #[must_use]
    pub fn is_resizable(&self) -> bool {
        self.resizable
    }

    /// Returns the number of bits the current storage can hold.
    #[inline]
    #[must_use]
    pub fn capacity_bits(&self) -> usize {
        self.buffer.capacity() << 3
    }

    /// Returns the number of bytes in use.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.buffer.position()
    }

    /// Returns the index of the highest set bit plus one, or 0.
    #[must_use]
    pub fn length(&self) -> usize {
        self.last_set_bit().map_or(0, |bit| bit + 1)
    }

    /// Returns true if no bit is set.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns the highest set bit.
    #[must_use]
    pub fn last_set_bit(&self) -> Option<usize> {
        let size = self.size();
        if size == 0 {
            return None;
        }
        let top = self.byte(size - 1);
        debug_assert!(top != 0, "trailing byte in use must be non-zero");
        Some(((size - 1) << 3) + 7 - top.leading_zeros() as usize)
    }

    /// Returns the number of set bits.
    #[must_use]
    pub fn cardinality(&self) -> usize {
        (0..self.size())
            .map(|i| self.byte(i).count_ones() as usize)
            .sum()
    }

    /// Returns the value of bit `index`. Bits past the bytes in use are
    /// clear.
    #[must_use]
    pub fn get(&self, index: usize) -> bool {
        let byte = byte_index(index);
        byte < self.size() && self.byte(byte) & bit_mask(index) != 0
    }

    /// Returns true if any bit is set in both bitsets.
    #[must_use]
    pub fn intersects(&self, other: &DynamicBitSet) -> bool {
        (0..self.size().min(other.size())).any(|i| self.byte(i) & other.byte(i) != 0)
    }

    /// Returns an iterator over the set bits in ascending order.
    #[must_use]
    pub fn iter(&self) -> SetBits<'_> {
        SetBits {
            bits: self,
            next: self.next_set_bit(0),
        }
    }

    // =========================================================================
    // Single bit mutation
    // =========================================================================

    /// Sets bit `index`, growing if the bitset is resizable.
    pub fn set(&mut self, index: usize) -> StrataResult<()> {
        check_bit(index)?;
        let byte = byte_index(index);
        self.claim(byte)?;
        self.store(byte, self.byte(byte) | bit_mask(index));
        Ok(())
    }

    /// Sets bit `index` to `value`.
    pub fn set_value(&mut self, index: usize, value: bool) -> StrataResult<()> {
        if value {
            self.set(index)
        } else {
            self.clear(index)
        }
    }

    /// Clears bit `index`.
    pub fn clear(&mut self, index: usize) -> StrataResult<()> {
        check_bit(index)?;
        let byte = byte_index(index);
        if byte >= self.size() {
            return Ok(());
        }
        self.store(byte, self.byte(byte) & !bit_mask(index));
        if byte + 1 == self.size() {
            self.trim()?;
        }
        Ok(())
    }

    /// Inverts bit `index`.
    pub fn flip(&mut self, index: usize) -> StrataResult<()> {
        if self.get(index) {
            self.clear(index)
        } else {
            self.set(index)
        }
    }

    // =========================================================================
    // Range mutation
    // =========================================================================

    /// Sets every bit in `[from, to)`.
    pub fn set_range(&mut self, from: usize, to: usize) -> StrataResult<()> {
        check_bit_range(from, to)?;
        if from == to {
            return Ok(());
        }
        self.claim(byte_index(to - 1))?;
        self.apply_range(from, to, RangeOp::Set);
        Ok(())
    }

    /// Clears every bit in `[from, to)`.
    pub fn clear_range(&mut self, from: usize, to: usize) -> StrataResult<()> {
        check_bit_range(from, to)?;
        let to = to.min(self.length());
        if from >= to {
            return Ok(());
        }
        self.apply_range(from, to, RangeOp::Clear);
        self.trim()
    }

    /// Inverts every bit in `[from, to)`.
    pub fn flip_range(&mut self, from: usize, to: usize) -> StrataResult<()> {
        check_bit_range(from, to)?;
        if from == to {
            return Ok(());
        }
        self.claim(byte_index(to - 1))?;
        self.apply_range(from, to, RangeOp::Flip);
        self.trim()
    }

    fn apply_range(&mut self, from: usize, to: usize, op: RangeOp) {
        let first = byte_index(from);
        let last = byte_index(to - 1);
        if first == last {
            let mask = from_mask(from) & through_mask(to - 1);
            self.store(first, op.apply(self.byte(first), mask));
            return;
        }
        self.store(first, op.apply(self.byte(first), from_mask(from)));
        match op {
            RangeOp::Set => self.fill(first + 1, last, MASK),
            RangeOp::Clear => self.fill(first + 1, last, 0),
            RangeOp::Flip => {
                for i in first + 1..last {
                    self.store(i, !self.byte(i));
                }
            }
        }
        self.store(last, op.apply(self.byte(last), through_mask(to - 1)));
    }

    // =========================================================================
    // Capacity
    // =========================================================================

    /// Makes byte `byte` addressable without changing the bits in use.
    ///
    /// A fixed-capacity bitset fails with a capacity error; a resizable one
    /// doubles its storage (at least to `byte + 1` bytes, at most to the
    /// largest addressable bit index).
    pub fn expand_to(&mut self, byte: usize) -> StrataResult<()> {
        let capacity = self.buffer.capacity();
        if byte < capacity {
            return Ok(());
        }
        let requested = (byte as u64).saturating_add(1);
        if !self.resizable {
            return Err(StrataError::capacity(requested, capacity as u64));
        }
        if byte >= MAX_BITSET_CAPACITY {
            return Err(StrataError::capacity(requested, MAX_BITSET_CAPACITY as u64));
        }
        let new_capacity = capacity
            .saturating_mul(2)
            .max(byte + 1)
            .min(MAX_BITSET_CAPACITY);
        let size = self.size();
        let mut grown = self.buffer.allocate_like(new_capacity)?;
        grown.put_buffer(&mut self.buffer.slice_range(0, size)?)?;
        tracing::trace!(from = capacity, to = new_capacity, "expanded bitset");
        self.buffer = grown;
        Ok(())
    }

    /// Grows to cover byte `byte` and marks it in use. Callers write a
    /// non-zero byte there or trim afterwards.
    fn claim(&mut self, byte: usize) -> StrataResult<()> {
        self.expand_to(byte)?;
        if byte >= self.size() {
            self.buffer.set_position(byte + 1)?;
        }
        Ok(())
    }

    /// Drops trailing zero bytes from the bytes in use.
    fn trim(&mut self) -> StrataResult<()> {
        let mut size = self.size();
        while size > 0 && self.byte(size - 1) == 0 {
            size -= 1;
        }
        self.buffer.set_position(size)
    }

    // =========================================================================
    // Set algebra
    // =========================================================================

    /// Keeps only bits set in both bitsets.
    pub fn and(&mut self, other: &DynamicBitSet) -> StrataResult<()> {
        let size = self.size();
        let common = size.min(other.size());
        for i in 0..common {
            self.store(i, self.byte(i) & other.byte(i));
        }
        if common < size {
            self.fill(common, size, 0);
        }
        self.buffer.set_position(common)?;
        self.trim()
    }

    /// Adds every bit set in `other`, growing if needed.
    ///
    /// The result is never shorter than either operand, so no trim pass is
    /// needed.
    pub fn or(&mut self, other: &DynamicBitSet) -> StrataResult<()> {
        let other_size = other.size();
        if other_size > 0 {
            self.claim(other_size - 1)?;
        }
        for i in 0..other_size {
            self.store(i, self.byte(i) | other.byte(i));
        }
        Ok(())
    }

    /// Toggles every bit set in `other`, growing if needed.
    pub fn xor(&mut self, other: &DynamicBitSet) -> StrataResult<()> {
        let other_size = other.size();
        if other_size > 0 {
            self.claim(other_size - 1)?;
        }
        for i in 0..other_size {
            self.store(i, self.byte(i) ^ other.byte(i));
        }
        self.trim()
    }

    /// Clears every bit set in `other`.
    pub fn and_not(&mut self, other: &DynamicBitSet) -> StrataResult<()> {
        for i in 0..self.size().min(other.size()) {
            self.store(i, self.byte(i) & !other.byte(i));
        }
        self.trim()
    }

    // =========================================================================
    // Scans
    // =========================================================================

    /// Returns the first set bit at or after `from`.
    #[must_use]
    pub fn next_set_bit(&self, from: usize) -> Option<usize> {
        let size = self.size();
        let mut byte = byte_index(from);
        if byte >= size {
            return None;
        }
        let mut masked = self.byte(byte) & from_mask(from);
        loop {
            if masked != 0 {
                return Some((byte << 3) + masked.trailing_zeros() as usize);
            }
            byte += 1;
            if byte == size {
                return None;
            }
            masked = self.byte(byte);
        }
    }

    /// Returns the first clear bit at or after `from`; `size() * 8` when
    /// every bit from `from` up to the end of the bytes in use is set.
    #[must_use]
    pub fn next_clear_bit(&self, from: usize) -> usize {
        let size = self.size();
        let mut byte = byte_index(from);
        if byte >= size {
            return from;
        }
        let mut masked = !self.byte(byte) & from_mask(from);
        loop {
            if masked != 0 {
                return (byte << 3) + masked.trailing_zeros() as usize;
            }
            byte += 1;
            if byte == size {
                return size << 3;
            }
            masked = !self.byte(byte);
        }
    }

    /// Returns the last set bit at or before `from`.
    #[must_use]
    pub fn previous_set_bit(&self, from: usize) -> Option<usize> {
        let size = self.size();
        if size == 0 {
            return None;
        }
        let mut byte = byte_index(from);
        let mut masked = if byte >= size {
            byte = size - 1;
            self.byte(byte)
        } else {
            self.byte(byte) & through_mask(from)
        };
        loop {
            if masked != 0 {
                return Some((byte << 3) + 7 - masked.leading_zeros() as usize);
            }
            if byte == 0 {
                return None;
            }
            byte -= 1;
            masked = self.byte(byte);
        }
    }

    /// Returns the last clear bit at or before `from`.
    #[must_use]
    pub fn previous_clear_bit(&self, from: usize) -> Option<usize> {
        let mut byte = byte_index(from);
        if byte >= self.size() {
            return Some(from);
        }
        let mut masked = !self.byte(byte) & through_mask(from);
        loop {
            if masked != 0 {
                return Some((byte << 3) + 7 - masked.leading_zeros() as usize);
            }
            if byte == 0 {
                return None;
            }
            byte -= 1;
            masked = !self.byte(byte);
        }
    }

    // =========================================================================
    // Derived bitsets
    // =========================================================================

    /// Returns a new bitset with every set bit moved up by `offset`.
    pub fn shift_right(&self, offset: usize) -> StrataResult<Self> {
        let Some(last) = self.last_set_bit() else {
            return Ok(Self::over(self.buffer.allocate_like(0)?, self.resizable));
        };
        let top = last
            .checked_add(offset)
            .filter(|&top| top <= MAX_BIT_INDEX)
            .ok_or_else(|| {
                let requested = (last as u64).saturating_add(offset as u64).saturating_add(1);
                StrataError::capacity(requested, MAX_BIT_INDEX as u64 + 1)
            })?;

        let size = self.size();
        let new_size = byte_index(top) + 1;
        let byte_shift = byte_index(offset);
        let bit_shift = (offset & 7) as u32;
        let mut out = self.buffer.allocate_like(new_size)?;

        if bit_shift == 0 {
            out.set_position(byte_shift)?;
            out.put_buffer(&mut self.buffer.slice_range(0, size)?)?;
        } else {
            let mut carry = 0u8;
            for k in 0..size {
                let b = self.byte(k);
                out.store(byte_shift + k, (b << bit_shift) | carry);
                carry = b >> (8 - bit_shift);
            }
            if byte_shift + size < new_size {
                out.store(byte_shift + size, carry);
            }
            out.set_position(new_size)?;
        }
        Self::from_filled(out, self.resizable)
    }

    /// Returns bits `[from, to)` as a new bitset re-based at 0.
    pub fn get_range(&self, from: usize, to: usize) -> StrataResult<Self> {
        check_bit_range(from, to)?;
        let to = to.min(self.length());
        if from >= to {
            return Ok(Self::over(self.buffer.allocate_like(0)?, self.resizable));
        }
        let len = to - from;
        let out_size = len.div_ceil(8);
        let first = byte_index(from);
        let shift = (from & 7) as u32;
        let mut out = self.buffer.allocate_like(out_size)?;
        for k in 0..out_size {
            let low = self.byte_or_zero(first + k) >> shift;
            let high = if shift == 0 {
                0
            } else {
                self.byte_or_zero(first + k + 1) << (8 - shift)
            };
            out.store(k, low | high);
        }
        let last = out_size - 1;
        out.store(last, out.load(last) & through_mask(len - 1));
        out.set_position(out_size)?;
        Self::from_filled(out, self.resizable)
    }

    // =========================================================================
    // Byte plumbing
    // =========================================================================

    #[inline]
    fn byte(&self, index: usize) -> u8 {
        self.buffer.load(index)
    }

    #[inline]
    fn byte_or_zero(&self, index: usize) -> u8 {
        if index < self.size() {
            self.byte(index)
        } else {
            0
        }
    }

    #[inline]
    fn store(&mut self, index: usize, value: u8) {
        self.buffer.store(index, value);
    }

    #[inline]
    fn fill(&mut self, from: usize, to: usize, value: u8) {
        for i in from..to {
            self.buffer.store(i, value);
        }
    }

    pub(crate) fn buffer(&self) -> &Buffer {
        &self.buffer
    }
}

fn check_bit(index: usize) -> StrataResult<()> {
    if index > MAX_BIT_INDEX {
        return Err(StrataError::index(index as u64, MAX_BIT_INDEX as u64 + 1));
    }
    Ok(())
}

pub(crate) fn check_bit_range(from: usize, to: usize) -> StrataResult<()> {
    if from > to || to > MAX_BIT_INDEX + 1 {
        return Err(StrataError::range(from as u64, to as u64, MAX_BIT_INDEX as u64 + 1));
    }
    Ok(())
}

/// Iterator over set bits, returned by [`DynamicBitSet::iter`].
pub struct SetBits<'a> {
    bits: &'a DynamicBitSet,
    next: Option<usize>,
}

impl Iterator for SetBits<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        self.next = current.checked_add(1).and_then(|n| self.bits.next_set_bit(n));
        Some(current)
    }
}

impl<'a> IntoIterator for &'a DynamicBitSet {
    type Item = usize;
    type IntoIter = SetBits<'a>;

    fn into_iter(self) -> SetBits<'a> {
        self.iter()
    }
}

impl PartialEq for DynamicBitSet {
    /// Bitsets are equal when their bytes in use are equal; capacity and
    /// the resizable flag are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.size() == other.size() && (0..self.size()).all(|i| self.byte(i) == other.byte(i))
    }
}

impl Eq for DynamicBitSet {}

impl Hash for DynamicBitSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.size());
        for i in 0..self.size() {
            state.write_u8(self.byte(i));
        }
    }
}

impl fmt::Display for DynamicBitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (n, bit) in self.iter().enumerate() {
            if n > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{bit}")?;
        }
        f.write_str("]")
    }
}

impl fmt::Debug for DynamicBitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicBitSet")
            .field("size", &self.size())
            .field("capacity", &self.buffer.capacity())
            .field("resizable", &self.resizable)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits_of(indices: &[usize]) -> DynamicBitSet {
        DynamicBitSet::from_indices(indices.iter().copied()).unwrap()
    }

    #[test]
    fn test_empty() {
        let bits = DynamicBitSet::allocate(0).unwrap();
        assert!(bits.is_empty());
        assert_eq!(bits.to_string(), "[]");
        assert_eq!(bits.length(), 0);
        assert_eq!(bits.last_set_bit(), None);
        assert!(DynamicBitSet::empty().is_empty());
    }

    #[test]
    fn test_set_get_clear() {
        let mut bits = DynamicBitSet::allocate(64).unwrap();
        bits.set(3).unwrap();
        bits.set(17).unwrap();
        assert!(bits.get(3) && bits.get(17));
        assert!(!bits.get(4));
        assert_eq!(bits.size(), 3);
        assert_eq!(bits.cardinality(), 2);

        bits.clear(17).unwrap();
        assert_eq!(bits.size(), 1);
        bits.clear(3).unwrap();
        assert!(bits.is_empty());
        bits.clear(1000).unwrap();
    }

    #[test]
    fn test_fixed_capacity_rejects_growth() {
        let mut bits = DynamicBitSet::allocate(8).unwrap();
        bits.set(7).unwrap();
        let err = bits.set(8).unwrap_err();
        assert!(matches!(err, StrataError::Capacity { .. }));
        assert_eq!(bits.to_string(), "[7]");
    }

    #[test]
    fn test_resizable_doubles() {
        let mut bits = DynamicBitSet::allocate_resizable(64).unwrap();
        bits.set(64).unwrap();
        assert_eq!(bits.capacity_bits(), 128);
        bits.set(10_000).unwrap();
        assert_eq!(bits.capacity_bits(), (10_000 / 8 + 1) * 8);
        assert!(bits.get(64) && bits.get(10_000));
    }

    #[test]
    fn test_bit_index_limit() {
        let mut bits = DynamicBitSet::allocate_resizable(0).unwrap();
        assert!(matches!(bits.set(MAX_BIT_INDEX + 1), Err(StrataError::Index { .. })));
        assert!(matches!(bits.set_range(5, 4), Err(StrataError::Range { .. })));
    }

    #[test]
    fn test_flip() {
        let mut bits = DynamicBitSet::allocate_resizable(0).unwrap();
        bits.flip(9).unwrap();
        assert!(bits.get(9));
        bits.flip(9).unwrap();
        assert!(bits.is_empty());
    }

    #[test]
    fn test_ranges() {
        let mut bits = DynamicBitSet::allocate_resizable(0).unwrap();
        bits.set_range(3, 30).unwrap();
        assert_eq!(bits.cardinality(), 27);
        assert!(!bits.get(2) && bits.get(3) && bits.get(29) && !bits.get(30));

        bits.clear_range(5, 28).unwrap();
        assert_eq!(bits.to_string(), "[3, 4, 28, 29]");

        bits.flip_range(0, 6).unwrap();
        assert_eq!(bits.to_string(), "[0, 1, 2, 5, 28, 29]");

        bits.clear_range(20, 100).unwrap();
        assert_eq!(bits.size(), 1);
        bits.set_range(4, 4).unwrap();
        bits.clear_range(50, 60).unwrap();
        assert_eq!(bits.to_string(), "[0, 1, 2, 5]");
    }

    #[test]
    fn test_range_within_one_byte() {
        let mut bits = DynamicBitSet::allocate(16).unwrap();
        bits.set_range(9, 12).unwrap();
        assert_eq!(bits.to_string(), "[9, 10, 11]");
        bits.flip_range(10, 11).unwrap();
        assert_eq!(bits.to_string(), "[9, 11]");
    }

    #[test]
    fn test_and() {
        let mut a = bits_of(&[1, 5, 20, 40]);
        let b = bits_of(&[5, 40, 41]);
        a.and(&b).unwrap();
        assert_eq!(a.to_string(), "[5, 40]");

        let mut c = bits_of(&[1, 100]);
        c.and(&bits_of(&[1, 2])).unwrap();
        assert_eq!(c.to_string(), "[1]");
        assert_eq!(c.size(), 1);
        assert!(!c.get(100));
    }

    #[test]
    fn test_or_xor_and_not() {
        let mut a = bits_of(&[1, 5]);
        a.or(&bits_of(&[5, 90])).unwrap();
        assert_eq!(a.to_string(), "[1, 5, 90]");

        a.xor(&bits_of(&[5, 90, 91])).unwrap();
        assert_eq!(a.to_string(), "[1, 91]");

        a.and_not(&bits_of(&[91])).unwrap();
        assert_eq!(a.to_string(), "[1]");
        assert_eq!(a.size(), 1);
    }

    #[test]
    fn test_or_into_fixed_capacity() {
        let mut fixed = DynamicBitSet::allocate(8).unwrap();
        fixed.set(1).unwrap();
        let err = fixed.or(&bits_of(&[20])).unwrap_err();
        assert!(matches!(err, StrataError::Capacity { .. }));
        assert_eq!(fixed.to_string(), "[1]");
    }

    #[test]
    fn test_intersects() {
        assert!(bits_of(&[3, 70]).intersects(&bits_of(&[70])));
        assert!(!bits_of(&[3, 70]).intersects(&bits_of(&[4, 71])));
    }

    #[test]
    fn test_scans() {
        let bits = bits_of(&[2, 3, 4, 17]);
        assert_eq!(bits.next_set_bit(0), Some(2));
        assert_eq!(bits.next_set_bit(5), Some(17));
        assert_eq!(bits.next_set_bit(18), None);
        assert_eq!(bits.next_clear_bit(2), 5);
        assert_eq!(bits.next_clear_bit(100), 100);
        assert_eq!(bits.previous_set_bit(16), Some(4));
        assert_eq!(bits.previous_set_bit(1000), Some(17));
        assert_eq!(bits.previous_set_bit(1), None);
        assert_eq!(bits.previous_clear_bit(4), Some(1));
        assert_eq!(bits.previous_clear_bit(1000), Some(1000));

        let full = bits_of(&(0..16).collect::<Vec<_>>());
        assert_eq!(full.next_clear_bit(0), 16);
        assert_eq!(full.previous_clear_bit(15), None);
    }

    #[test]
    fn test_shift_right() {
        let bits = bits_of(&[0, 7, 8, 30]);
        assert_eq!(bits.shift_right(5).unwrap().to_string(), "[5, 12, 13, 35]");
        assert_eq!(bits.shift_right(16).unwrap().to_string(), "[16, 23, 24, 46]");
        assert_eq!(bits.shift_right(0).unwrap(), bits);
        assert!(DynamicBitSet::empty().shift_right(3).unwrap().is_empty());
    }

    #[test]
    fn test_get_range() {
        let bits = bits_of(&[1, 9, 10, 20, 33]);
        assert_eq!(bits.get_range(9, 21).unwrap().to_string(), "[0, 1, 11]");
        assert_eq!(bits.get_range(2, 9).unwrap().to_string(), "[]");
        assert_eq!(bits.get_range(0, 1000).unwrap(), bits);
        assert!(bits.get_range(4, 3).is_err());
    }

    #[test]
    fn test_shift_right_past_max_index() {
        let bits = bits_of(&[5]);
        let err = bits.shift_right(usize::MAX).unwrap_err();
        assert!(matches!(err, StrataError::Capacity { .. }));
        let err = bits.shift_right(MAX_BIT_INDEX - 5 + 1).unwrap_err();
        assert!(matches!(err, StrataError::Capacity { .. }));
    }

    #[test]
    fn test_expand_to_only_reserves() {
        let mut bits = DynamicBitSet::allocate_resizable(0).unwrap();
        bits.expand_to(10).unwrap();
        assert!(bits.capacity_bits() >= 88);
        assert!(bits.is_empty());
        assert_eq!(bits.length(), 0);
        assert_eq!(bits.last_set_bit(), None);
        assert_eq!(bits, DynamicBitSet::empty());
        assert_eq!(bits.to_string(), "[]");

        bits.set(3).unwrap();
        bits.expand_to(500).unwrap();
        assert_eq!(bits.size(), 1);
        assert_eq!(bits.to_string(), "[3]");

        let mut fixed = DynamicBitSet::allocate(8).unwrap();
        fixed.expand_to(0).unwrap();
        assert!(matches!(fixed.expand_to(1), Err(StrataError::Capacity { .. })));
        assert!(matches!(fixed.expand_to(usize::MAX), Err(StrataError::Capacity { .. })));
    }

    #[test]
    fn test_direct_backing_survives_growth() {
        let mut bits = DynamicBitSet::allocate_in(&Allocator::direct(), 8, true).unwrap();
        bits.set(1000).unwrap();
        assert!(bits.buffer().is_direct());
        assert!(bits.shift_right(3).unwrap().buffer().is_direct());
        assert!(!DynamicBitSet::allocate(8).unwrap().buffer().is_direct());
    }

    #[test]
    fn test_copy_is_exact_and_independent() {
        let mut bits = DynamicBitSet::allocate(1024).unwrap();
        bits.set(12).unwrap();
        let mut copy = bits.copy().unwrap();
        assert_eq!(copy.capacity_bits(), 16);
        assert_eq!(copy, bits);
        copy.clear(12).unwrap();
        assert!(bits.get(12));

        let grown = bits.with_resizable(true).unwrap();
        assert!(grown.is_resizable());
    }

    #[test]
    fn test_bytes_round_trip() {
        let bits = DynamicBitSet::from_bytes(&[0b1000_0001, 0, 0b10, 0, 0]).unwrap();
        assert_eq!(bits.size(), 3);
        assert_eq!(bits.to_string(), "[0, 7, 17]");
        assert_eq!(bits.to_bytes().unwrap(), vec![0b1000_0001, 0, 0b10]);
        assert!(!bits.is_resizable());
    }

    #[test]
    fn test_hash_ignores_capacity() {
        use std::collections::HashSet;
        let mut a = DynamicBitSet::allocate(4096).unwrap();
        a.set(40).unwrap();
        let mut set = HashSet::new();
        set.insert(bits_of(&[40]));
        assert!(set.contains(&a));
    }
}
