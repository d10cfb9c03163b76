//! Fixed-width element kinds and the accessor trait every algorithm uses.
//!
//! [`Element::total_cmp`] is the one ordering used by sorting, searching,
//! sortedness checks and deduplication. For floating point it places every
//! NaN above positive infinity, treats all NaNs as equal, and orders `-0.0`
//! before `+0.0`.

use std::cmp::Ordering;
use std::fmt;

use crate::order::ByteOrder;

mod sealed {
    pub trait Sealed {}
}

/// A fixed-width primitive that can be stored in a buffer.
pub trait Element: Copy + PartialEq + Default + fmt::Debug + sealed::Sealed + 'static {
    /// Width in bytes.
    const SIZE: usize;

    /// log2 of [`Element::SIZE`].
    const SHIFT: u32;

    /// Decodes a value from the first `SIZE` bytes of `bytes`.
    fn decode(bytes: &[u8], order: ByteOrder) -> Self;

    /// Encodes the value into the first `SIZE` bytes of `out`.
    fn encode(self, order: ByteOrder, out: &mut [u8]);

    /// Total order comparison.
    fn total_cmp(&self, other: &Self) -> Ordering;

    /// Equality under [`Element::total_cmp`].
    #[inline]
    fn total_eq(&self, other: &Self) -> bool {
        self.total_cmp(other) == Ordering::Equal
    }
}

macro_rules! float_cmp {
    ($a:expr, $b:expr) => {
        match ($a.is_nan(), $b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => $a.total_cmp($b),
        }
    };
}

macro_rules! impl_element {
    ($ty:ty, $size:expr, $shift:expr, |$a:ident, $b:ident| $cmp:expr) => {
        impl sealed::Sealed for $ty {}

        impl Element for $ty {
            const SIZE: usize = $size;
            const SHIFT: u32 = $shift;

            #[inline]
            fn decode(bytes: &[u8], order: ByteOrder) -> Self {
                let mut raw = [0u8; $size];
                raw.copy_from_slice(&bytes[..$size]);
                match order {
                    ByteOrder::BigEndian => <$ty>::from_be_bytes(raw),
                    ByteOrder::LittleEndian => <$ty>::from_le_bytes(raw),
                }
            }

            #[inline]
            fn encode(self, order: ByteOrder, out: &mut [u8]) {
                let raw = match order {
                    ByteOrder::BigEndian => self.to_be_bytes(),
                    ByteOrder::LittleEndian => self.to_le_bytes(),
                };
                out[..$size].copy_from_slice(&raw);
            }

            #[inline]
            fn total_cmp(&self, other: &Self) -> Ordering {
                let ($a, $b) = (self, other);
                $cmp
            }
        }
    };
}

impl_element!(u8, 1, 0, |a, b| a.cmp(b));
impl_element!(i8, 1, 0, |a, b| a.cmp(b));
impl_element!(i16, 2, 1, |a, b| a.cmp(b));
impl_element!(i32, 4, 2, |a, b| a.cmp(b));
impl_element!(i64, 8, 3, |a, b| a.cmp(b));
impl_element!(f32, 4, 2, |a, b| float_cmp!(a, b));
impl_element!(f64, 8, 3, |a, b| float_cmp!(a, b));

/// Indexed element access shared by native typed buffers and typed views
/// over big buffers.
///
/// Indices are absolute and checked against the capacity, not the limit.
/// Implementations panic on an out-of-capacity index; the public algorithms
/// validate their ranges up front and return a range error instead.
pub trait ElementStore<T: Element> {
    /// Number of addressable elements.
    fn element_capacity(&self) -> usize;

    /// Reads the element at `index`.
    fn load(&self, index: usize) -> T;

    /// Writes the element at `index`.
    fn store(&mut self, index: usize, value: T);

    /// Exchanges two elements.
    #[inline]
    fn swap(&mut self, a: usize, b: usize) {
        let va = self.load(a);
        let vb = self.load(b);
        self.store(a, vb);
        self.store(b, va);
    }
}
