//! Adaptive in-place sorting of typed buffer ranges.
//!
//! [`sort`] picks a strategy from the length of the range:
//!
//! | length                         | strategy                          |
//! |--------------------------------|-----------------------------------|
//! | `< 100`                        | insertion sort                    |
//! | `< large threshold`            | heap sort                         |
//! | `>= large threshold`           | radix (i32, i64) / counting (i8)  |
//!
//! The large threshold is 10,000,000 for 32 and 64 bit integers and 100,000
//! for bytes. 16-bit integers and floating point kinds always stay on heap
//! sort. All strategies order elements by [`Element::total_cmp`], so NaNs
//! collect at the end.
//!
//! No strategy allocates in proportion to the input; counting sort's bucket
//! table is sized by the element width.

use strata_common::constants::{
    BYTE_COUNTING_SORT_THRESHOLD, INSERTION_SORT_THRESHOLD, RADIX_SORT_THRESHOLD,
};
use strata_common::StrataResult;

use crate::element::{Element, ElementStore};
use crate::ops::check_range;

/// An element kind with a dispatch policy for long ranges.
pub trait Sortable: Element {
    /// Range length from which [`Sortable::sort_large`] replaces heap sort,
    /// or `None` if heap sort is used for every length.
    const LARGE_THRESHOLD: Option<usize>;

    /// Sorts a range at or above the large threshold.
    fn sort_large<S: ElementStore<Self> + ?Sized>(b: &mut S, from: usize, to: usize) {
        heap_sort_unchecked(b, from, to);
    }
}

impl Sortable for i8 {
    const LARGE_THRESHOLD: Option<usize> = Some(BYTE_COUNTING_SORT_THRESHOLD);

    fn sort_large<S: ElementStore<Self> + ?Sized>(b: &mut S, from: usize, to: usize) {
        counting_sort_unchecked(b, from, to);
    }
}

impl Sortable for i16 {
    const LARGE_THRESHOLD: Option<usize> = None;
}

impl Sortable for i32 {
    const LARGE_THRESHOLD: Option<usize> = Some(RADIX_SORT_THRESHOLD);

    fn sort_large<S: ElementStore<Self> + ?Sized>(b: &mut S, from: usize, to: usize) {
        radix_sort_unchecked(b, from, to);
    }
}

impl Sortable for i64 {
    const LARGE_THRESHOLD: Option<usize> = Some(RADIX_SORT_THRESHOLD);

    fn sort_large<S: ElementStore<Self> + ?Sized>(b: &mut S, from: usize, to: usize) {
        radix_sort_unchecked(b, from, to);
    }
}

impl Sortable for f32 {
    const LARGE_THRESHOLD: Option<usize> = None;
}

impl Sortable for f64 {
    const LARGE_THRESHOLD: Option<usize> = None;
}

/// Signed integers that radix sort can partition bit by bit.
pub trait RadixKey: Element {
    /// Bit width.
    const BITS: u32;

    /// Returns true if bit `bit` of the two's complement form is set.
    fn bit(self, bit: u32) -> bool;
}

impl RadixKey for i32 {
    const BITS: u32 = 32;

    #[inline]
    fn bit(self, bit: u32) -> bool {
        (self as u32 >> bit) & 1 == 1
    }
}

impl RadixKey for i64 {
    const BITS: u32 = 64;

    #[inline]
    fn bit(self, bit: u32) -> bool {
        (self as u64 >> bit) & 1 == 1
    }
}

/// Narrow signed integers that counting sort can bucket by value.
pub trait CountingKey: Element {
    /// Bit width; the bucket table has `2^BITS` entries.
    const BITS: u32;

    /// Two's complement bit pattern as a bucket index.
    fn bucket(self) -> usize;

    /// Inverse of [`CountingKey::bucket`].
    fn from_bucket(bucket: usize) -> Self;
}

impl CountingKey for i8 {
    const BITS: u32 = 8;

    #[inline]
    fn bucket(self) -> usize {
        self as u8 as usize
    }

    #[inline]
    fn from_bucket(bucket: usize) -> Self {
        bucket as u8 as i8
    }
}

impl CountingKey for i16 {
    const BITS: u32 = 16;

    #[inline]
    fn bucket(self) -> usize {
        self as u16 as usize
    }

    #[inline]
    fn from_bucket(bucket: usize) -> Self {
        bucket as u16 as i16
    }
}

/// Sorts `[from, to)` ascending, choosing the strategy by length.
pub fn sort<T, S>(b: &mut S, from: usize, to: usize) -> StrataResult<()>
where
    T: Sortable,
    S: ElementStore<T> + ?Sized,
{
    check_range(from, to, b.element_capacity())?;
    let len = to - from;
    if len < INSERTION_SORT_THRESHOLD {
        insertion_sort_unchecked(b, from, to);
    } else {
        match T::LARGE_THRESHOLD {
            Some(threshold) if len >= threshold => {
                tracing::trace!(len, element = std::any::type_name::<T>(), "large range sort");
                T::sort_large(b, from, to);
            }
            _ => heap_sort_unchecked(b, from, to),
        }
    }
    Ok(())
}

/// Insertion sort of `[from, to)`.
pub fn insertion_sort<T, S>(b: &mut S, from: usize, to: usize) -> StrataResult<()>
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
    check_range(from, to, b.element_capacity())?;
    insertion_sort_unchecked(b, from, to);
    Ok(())
}

/// Heap sort of `[from, to)`.
pub fn heap_sort<T, S>(b: &mut S, from: usize, to: usize) -> StrataResult<()>
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
    check_range(from, to, b.element_capacity())?;
    heap_sort_unchecked(b, from, to);
    Ok(())
}

/// Most significant bit first radix sort of `[from, to)`.
pub fn radix_sort<T, S>(b: &mut S, from: usize, to: usize) -> StrataResult<()>
where
    T: RadixKey,
    S: ElementStore<T> + ?Sized,
{
    check_range(from, to, b.element_capacity())?;
    radix_sort_unchecked(b, from, to);
    Ok(())
}

/// Counting sort of `[from, to)`.
pub fn counting_sort<T, S>(b: &mut S, from: usize, to: usize) -> StrataResult<()>
where
    T: CountingKey,
    S: ElementStore<T> + ?Sized,
{
    check_range(from, to, b.element_capacity())?;
    counting_sort_unchecked(b, from, to);
    Ok(())
}

fn insertion_sort_unchecked<T, S>(b: &mut S, from: usize, to: usize)
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
    for i in from.saturating_add(1)..to {
        let value = b.load(i);
        let mut j = i;
        while j > from {
            let prev = b.load(j - 1);
            if prev.total_cmp(&value).is_le() {
                break;
            }
            b.store(j, prev);
            j -= 1;
        }
        if j != i {
            b.store(j, value);
        }
    }
}

fn heap_sort_unchecked<T, S>(b: &mut S, from: usize, to: usize)
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
    let n = to - from;
    if n < 2 {
        return;
    }
    for root in (0..n / 2).rev() {
        sift_down(b, from, root, n);
    }
    for end in (1..n).rev() {
        b.swap(from, from + end);
        sift_down(b, from, 0, end);
    }
}

fn sift_down<T, S>(b: &mut S, base: usize, mut root: usize, n: usize)
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
    loop {
        let mut child = 2 * root + 1;
        if child >= n {
            return;
        }
        let mut child_value = b.load(base + child);
        if child + 1 < n {
            let right = b.load(base + child + 1);
            if child_value.total_cmp(&right).is_lt() {
                child += 1;
                child_value = right;
            }
        }
        let root_value = b.load(base + root);
        if root_value.total_cmp(&child_value).is_ge() {
            return;
        }
        b.store(base + root, child_value);
        b.store(base + child, root_value);
        root = child;
    }
}

fn radix_sort_unchecked<T, S>(b: &mut S, from: usize, to: usize)
where
    T: RadixKey,
    S: ElementStore<T> + ?Sized,
{
    radix_partition(b, from, to, T::BITS - 1);
}

/// Partitions `[from, to)` on `bit` and recurses into both halves. The sign
/// bit sends set values (negatives) left; every lower bit sends clear
/// values left.
fn radix_partition<T, S>(b: &mut S, from: usize, to: usize, bit: u32)
where
    T: RadixKey,
    S: ElementStore<T> + ?Sized,
{
    if to - from < INSERTION_SORT_THRESHOLD {
        insertion_sort_unchecked(b, from, to);
        return;
    }
    let left_when_set = bit == T::BITS - 1;
    let mut i = from;
    let mut j = to;
    while i < j {
        if b.load(i).bit(bit) == left_when_set {
            i += 1;
        } else {
            j -= 1;
            b.swap(i, j);
        }
    }
    if bit > 0 {
        radix_partition(b, from, i, bit - 1);
        radix_partition(b, i, to, bit - 1);
    }
}

fn counting_sort_unchecked<T, S>(b: &mut S, from: usize, to: usize)
where
    T: CountingKey,
    S: ElementStore<T> + ?Sized,
{
    let full = 1usize << T::BITS;
    let half = full >> 1;
    let mut counts = vec![0usize; full];
    for i in from..to {
        counts[b.load(i).bucket()] += 1;
    }
    let mut write = from;
    for bucket in (half..full).chain(0..half) {
        let value = T::from_bucket(bucket);
        for _ in 0..counts[bucket] {
            b.store(write, value);
            write += 1;
        }
    }
}
