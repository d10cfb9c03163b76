//! Primitive buffer operations: range validation, sortedness predicates,
//! deduplication, lazy range iteration and blocking channel transfer.
//!
//! Every operation validates its range before touching any element, so a
//! rejected call leaves the buffer unchanged.

use std::io::{self, Read, Write};
use std::iter::FusedIterator;
use std::marker::PhantomData;

use strata_common::constants::CHANNEL_STAGING_SIZE;
use strata_common::{StrataError, StrataResult};

use crate::big::BigBuffer;
use crate::buffer::Buffer;
use crate::element::{Element, ElementStore};

/// Validates `from <= to <= capacity`.
#[inline]
pub fn check_range(from: usize, to: usize, capacity: usize) -> StrataResult<()> {
    if from > to || to > capacity {
        return Err(StrataError::range(from as u64, to as u64, capacity as u64));
    }
    Ok(())
}

/// Validates `from <= to <= capacity` for 64-bit addresses.
#[inline]
pub fn check_big_range(from: u64, to: u64, capacity: u64) -> StrataResult<()> {
    if from > to || to > capacity {
        return Err(StrataError::range(from, to, capacity));
    }
    Ok(())
}

/// Returns true if `[from, to)` is ascending (ties allowed) under the total
/// order.
pub fn is_sorted<T, S>(b: &S, from: usize, to: usize) -> StrataResult<bool>
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
    check_range(from, to, b.element_capacity())?;
    Ok(ascending(b, from, to, |o| o.is_le()))
}

/// Returns true if `[from, to)` is strictly ascending under the total order.
pub fn is_sorted_and_distinct<T, S>(b: &S, from: usize, to: usize) -> StrataResult<bool>
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
    check_range(from, to, b.element_capacity())?;
    Ok(ascending(b, from, to, |o| o.is_lt()))
}

fn ascending<T, S>(b: &S, from: usize, to: usize, accept: impl Fn(std::cmp::Ordering) -> bool) -> bool
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
    if to - from < 2 {
        return true;
    }
    let mut prev = b.load(from);
    for i in from + 1..to {
        let cur = b.load(i);
        if !accept(prev.total_cmp(&cur)) {
            return false;
        }
        prev = cur;
    }
    true
}

/// Compacts the sorted range `[from, to)` in place so that its distinct
/// values occupy `[from, new_to)`, and returns `new_to`.
///
/// Elements in `[new_to, to)` are left with unspecified contents. The
/// result is meaningless if the range was not sorted.
pub fn deduplicate<T, S>(b: &mut S, from: usize, to: usize) -> StrataResult<usize>
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
    check_range(from, to, b.element_capacity())?;
    if to - from < 2 {
        return Ok(to);
    }
    let mut last = b.load(from);
    let mut write = from + 1;
    for read in from + 1..to {
        let value = b.load(read);
        if !value.total_eq(&last) {
            if write != read {
                b.store(write, value);
            }
            write += 1;
            last = value;
        }
    }
    Ok(write)
}

/// Sets every element of `[from, to)` to `value`.
pub fn fill_range<T, S>(b: &mut S, from: usize, to: usize, value: T) -> StrataResult<()>
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
    check_range(from, to, b.element_capacity())?;
    for i in from..to {
        b.store(i, value);
    }
    Ok(())
}

/// Returns a lazy iterator over the elements of `[from, to)`.
pub fn iter_range<T, S>(b: &S, from: usize, to: usize) -> StrataResult<RangeIter<'_, T, S>>
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
    check_range(from, to, b.element_capacity())?;
    Ok(RangeIter {
        store: b,
        front: from,
        back: to,
        _marker: PhantomData,
    })
}

/// Iterator returned by [`iter_range`].
pub struct RangeIter<'a, T, S: ?Sized> {
    store: &'a S,
    front: usize,
    back: usize,
    _marker: PhantomData<T>,
}

impl<T, S> Iterator for RangeIter<'_, T, S>
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.front == self.back {
            return None;
        }
        let value = self.store.load(self.front);
        self.front += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl<T, S> DoubleEndedIterator for RangeIter<'_, T, S>
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
    fn next_back(&mut self) -> Option<T> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        Some(self.store.load(self.back))
    }
}

impl<T, S> ExactSizeIterator for RangeIter<'_, T, S>
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
}

impl<T, S> FusedIterator for RangeIter<'_, T, S>
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
}

// =============================================================================
// Channel transfer
// =============================================================================

/// A buffer that can be filled from or drained to a byte channel.
pub trait ByteCursor {
    /// Bytes between position and limit.
    fn remaining_bytes(&self) -> u64;

    /// Writes `src` at the position and advances it.
    fn put_bytes(&mut self, src: &[u8]) -> StrataResult<()>;

    /// Fills `dst` from the position and advances it.
    fn get_bytes(&mut self, dst: &mut [u8]) -> StrataResult<()>;
}

impl ByteCursor for Buffer {
    fn remaining_bytes(&self) -> u64 {
        self.remaining() as u64
    }

    fn put_bytes(&mut self, src: &[u8]) -> StrataResult<()> {
        self.put_slice(src)
    }

    fn get_bytes(&mut self, dst: &mut [u8]) -> StrataResult<()> {
        self.get_slice(dst)
    }
}

impl ByteCursor for BigBuffer {
    fn remaining_bytes(&self) -> u64 {
        self.remaining()
    }

    fn put_bytes(&mut self, src: &[u8]) -> StrataResult<()> {
        self.put_slice(src)
    }

    fn get_bytes(&mut self, dst: &mut [u8]) -> StrataResult<()> {
        self.get_slice(dst)
    }
}

fn staging_len(remaining: u64) -> usize {
    remaining.min(CHANNEL_STAGING_SIZE as u64) as usize
}

/// Reads from `channel` until `buf` has no remaining space, returning the
/// number of bytes read.
///
/// Blocks for as long as the channel does. End of stream before the buffer
/// is full is an [`io::ErrorKind::UnexpectedEof`] error; bytes read up to
/// that point stay in the buffer.
pub fn read_fully<R, B>(channel: &mut R, buf: &mut B) -> StrataResult<u64>
where
    R: Read + ?Sized,
    B: ByteCursor + ?Sized,
{
    let mut staging = vec![0u8; staging_len(buf.remaining_bytes())];
    let mut total = 0u64;
    while buf.remaining_bytes() > 0 {
        let want = staging_len(buf.remaining_bytes());
        let n = match channel.read(&mut staging[..want]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("channel closed with {} bytes left to read", buf.remaining_bytes()),
                )
                .into())
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        buf.put_bytes(&staging[..n])?;
        total += n as u64;
    }
    Ok(total)
}

/// Writes the remaining bytes of `buf` to `channel`, returning the number of
/// bytes written.
pub fn write_fully<W, B>(channel: &mut W, buf: &mut B) -> StrataResult<u64>
where
    W: Write + ?Sized,
    B: ByteCursor + ?Sized,
{
    let mut staging = vec![0u8; staging_len(buf.remaining_bytes())];
    let mut total = 0u64;
    while buf.remaining_bytes() > 0 {
        let n = staging_len(buf.remaining_bytes());
        buf.get_bytes(&mut staging[..n])?;
        channel.write_all(&staging[..n])?;
        total += n as u64;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::{DoubleBuffer, IntBuffer};

    #[test]
    fn test_check_range() {
        assert!(check_range(0, 0, 0).is_ok());
        assert!(check_range(2, 5, 5).is_ok());
        assert!(matches!(
            check_range(3, 2, 5),
            Err(StrataError::Range { from: 3, to: 2, capacity: 5 })
        ));
        assert!(check_range(0, 6, 5).is_err());
        assert!(check_big_range(1 << 33, 1 << 34, 1 << 34).is_ok());
    }

    #[test]
    fn test_is_sorted() {
        let ints = IntBuffer::from_slice(&[1, 2, 2, 3]).unwrap();
        assert!(is_sorted(&ints, 0, 4).unwrap());
        assert!(!is_sorted_and_distinct(&ints, 0, 4).unwrap());
        assert!(is_sorted_and_distinct(&ints, 2, 4).unwrap());
        assert!(is_sorted(&ints, 1, 1).unwrap());
        assert!(is_sorted(&ints, 0, 5).is_err());
    }

    #[test]
    fn test_is_sorted_nan_last() {
        let doubles = DoubleBuffer::from_slice(&[-0.0, 0.0, f64::INFINITY, f64::NAN]).unwrap();
        assert!(is_sorted_and_distinct(&doubles, 0, 4).unwrap());
        let nans = DoubleBuffer::from_slice(&[f64::NAN, f64::NAN]).unwrap();
        assert!(is_sorted(&nans, 0, 2).unwrap());
        assert!(!is_sorted_and_distinct(&nans, 0, 2).unwrap());
    }

    #[test]
    fn test_deduplicate() {
        let mut ints = IntBuffer::from_slice(&[9, 1, 1, 2, 3, 3, 3, 4, 9]).unwrap();
        let end = deduplicate(&mut ints, 1, 8).unwrap();
        assert_eq!(end, 5);
        assert_eq!(iter_range(&ints, 1, end).unwrap().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(ints.get_at(0).unwrap(), 9);
        assert_eq!(deduplicate(&mut ints, 3, 3).unwrap(), 3);
    }

    #[test]
    fn test_deduplicate_nans() {
        let mut doubles = DoubleBuffer::from_slice(&[1.0, f64::NAN, -f64::NAN]).unwrap();
        assert_eq!(deduplicate(&mut doubles, 0, 3).unwrap(), 2);
    }

    #[test]
    fn test_iter_range() {
        let ints = IntBuffer::from_slice(&[1, 2, 3, 4]).unwrap();
        let it = iter_range(&ints, 1, 3).unwrap();
        assert_eq!(it.len(), 2);
        assert_eq!(iter_range(&ints, 0, 4).unwrap().rev().collect::<Vec<_>>(), vec![4, 3, 2, 1]);
        assert!(iter_range(&ints, 2, 1).is_err());
    }

    #[test]
    fn test_fill_range() {
        let mut ints = IntBuffer::allocate(4).unwrap();
        fill_range(&mut ints, 1, 3, 7).unwrap();
        assert_eq!(ints.to_vec(), vec![0, 7, 7, 0]);
    }

    struct Trickle<'a> {
        data: &'a [u8],
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            let n = out.len().min(self.data.len()).min(3);
            out[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_read_fully_short_reads() {
        let data: Vec<u8> = (0..10).collect();
        let mut buf = Buffer::allocate(10).unwrap();
        let n = read_fully(&mut Trickle { data: &data }, &mut buf).unwrap();
        assert_eq!(n, 10);
        buf.flip();
        assert_eq!(buf.to_vec(), data);
    }

    #[test]
    fn test_read_fully_eof() {
        let mut buf = Buffer::allocate(10).unwrap();
        let err = read_fully(&mut Trickle { data: &[1, 2, 3, 4] }, &mut buf).unwrap_err();
        assert!(matches!(err, StrataError::Io { .. }));
        assert_eq!(buf.position(), 4);
    }

    /// Fails every other read with `Interrupted`.
    struct Flaky<'a> {
        inner: Trickle<'a>,
        interrupt: bool,
    }

    impl Read for Flaky<'_> {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
            }
            self.inner.read(out)
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    #[test]
    fn test_read_fully_retries_interrupted() {
        let data: Vec<u8> = (0..10).collect();
        let mut buf = Buffer::allocate(10).unwrap();
        let mut channel = Flaky {
            inner: Trickle { data: &data },
            interrupt: false,
        };
        assert_eq!(read_fully(&mut channel, &mut buf).unwrap(), 10);
        buf.flip();
        assert_eq!(buf.to_vec(), data);

        let mut buf = Buffer::allocate(4).unwrap();
        match read_fully(&mut Broken, &mut buf).unwrap_err() {
            StrataError::Io { source } => assert_eq!(source.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(buf.position(), 0);
    }

    #[test]
    fn test_write_fully() {
        let mut buf = Buffer::from_slice(&[5, 6, 7]).unwrap();
        let mut out = Vec::new();
        assert_eq!(write_fully(&mut out, &mut buf).unwrap(), 3);
        assert_eq!(out, vec![5, 6, 7]);
        assert!(!buf.has_remaining());
    }
}
