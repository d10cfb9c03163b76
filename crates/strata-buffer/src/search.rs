//! Binary search and run-boundary search over sorted typed ranges.
//!
//! Comparisons use [`Element::total_cmp`]: `-0.0` and `+0.0` are distinct
//! keys and every NaN matches every other NaN.

use strata_common::{StrataError, StrataResult};

use crate::element::{Element, ElementStore};
use crate::ops::check_range;

/// Searches the sorted range `[from, to)` for `key`.
///
/// Returns the index of a matching element, or `-(insertion_point) - 1`
/// where `insertion_point` is the absolute index at which `key` would be
/// inserted to keep the range sorted.
///
/// # Example
///
/// ```rust
/// use strata_buffer::{search, IntBuffer};
///
/// let ints = IntBuffer::from_slice(&[1, 2, 3, 4, 5]).unwrap();
/// assert_eq!(search::binary_search(&ints, 0, 5, 3).unwrap(), 2);
/// assert_eq!(search::binary_search(&ints, 0, 5, 0).unwrap(), -1);
/// assert_eq!(search::binary_search(&ints, 0, 5, 6).unwrap(), -6);
/// ```
pub fn binary_search<T, S>(b: &S, from: usize, to: usize, key: T) -> StrataResult<isize>
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
    Ok(match binary_search_range(b, from, to, key)? {
        Ok(found) => found as isize,
        Err(insertion) => -(insertion as isize) - 1,
    })
}

/// Like [`binary_search`], but returns `Ok(index)` or `Err(insertion_point)`
/// in the manner of [`slice::binary_search`].
pub fn binary_search_range<T, S>(
    b: &S,
    from: usize,
    to: usize,
    key: T,
) -> StrataResult<Result<usize, usize>>
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
    check_range(from, to, b.element_capacity())?;
    let mut lo = from;
    let mut hi = to;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match b.load(mid).total_cmp(&key) {
            std::cmp::Ordering::Less => lo = mid + 1,
            std::cmp::Ordering::Greater => hi = mid,
            std::cmp::Ordering::Equal => return Ok(Ok(mid)),
        }
    }
    Ok(Err(lo))
}

/// Returns the first index of the run of values equal to `b[key_index]`,
/// looking no further back than `min_index`.
///
/// Probes backward with doubling steps, then narrows with a binary search,
/// so the cost grows with the logarithm of the run length.
///
/// Requires `min_index <= key_index < capacity`.
pub fn binary_find_first<T, S>(b: &S, min_index: usize, key_index: usize) -> StrataResult<usize>
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
    let capacity = b.element_capacity();
    if min_index > key_index || key_index >= capacity {
        return Err(StrataError::range(min_index as u64, key_index as u64, capacity as u64));
    }
    let key = b.load(key_index);

    // `equal` always indexes a matching element
    let mut equal = key_index;
    let mut step = 1usize;
    let mut below = loop {
        if equal == min_index {
            return Ok(equal);
        }
        let probe = equal.saturating_sub(step).max(min_index);
        if b.load(probe).total_eq(&key) {
            equal = probe;
            step = step.saturating_mul(2);
        } else {
            break probe;
        }
    };

    while equal - below > 1 {
        let mid = below + (equal - below) / 2;
        if b.load(mid).total_eq(&key) {
            equal = mid;
        } else {
            below = mid;
        }
    }
    Ok(equal)
}

/// Returns the last index of the run of values equal to `b[key_index]`,
/// looking no further than `max_index` (exclusive).
///
/// Requires `key_index < max_index <= capacity`.
pub fn binary_find_last<T, S>(b: &S, max_index: usize, key_index: usize) -> StrataResult<usize>
where
    T: Element,
    S: ElementStore<T> + ?Sized,
{
    let capacity = b.element_capacity();
    if key_index >= max_index || max_index > capacity {
        return Err(StrataError::range(key_index as u64, max_index as u64, capacity as u64));
    }
    let key = b.load(key_index);
    let last = max_index - 1;

    let mut equal = key_index;
    let mut step = 1usize;
    let mut above = loop {
        if equal == last {
            return Ok(equal);
        }
        let probe = equal.saturating_add(step).min(last);
        if b.load(probe).total_eq(&key) {
            equal = probe;
            step = step.saturating_mul(2);
        } else {
            break probe;
        }
    };

    while above - equal > 1 {
        let mid = equal + (above - equal) / 2;
        if b.load(mid).total_eq(&key) {
            equal = mid;
        } else {
            above = mid;
        }
    }
    Ok(equal)
}
