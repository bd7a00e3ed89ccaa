//! `VastBitmap` struct and core implementation.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Sub, SubAssign};

use crate::art::Art;
use crate::container::Container;
use crate::error::{Error, Result};
use crate::iter::{Iter, RevIter};
use crate::key;
use crate::key::HighKey;
use crate::visit::{GapTracker, RangeVisitor};

/// A compressed bitmap over the full unsigned 64-bit value space.
///
/// # Overview
///
/// `VastBitmap` stores a set of `u64` values by splitting each one into a
/// 48-bit high part and a 16-bit low part. The high parts key an adaptive
/// radix tree whose leaves hold *containers*: compact sets of 16-bit values
/// that switch between a sorted array, a fixed bitmap, and a run-length
/// form as their contents change. Clustered values compress well; isolated
/// values cost a few bytes each.
///
/// All ordering is unsigned: `0, 1, …, 2⁶³ − 1, 2⁶³, …, 2⁶⁴ − 1`.
///
/// # Examples
///
/// ```
/// use vast_bitmap::VastBitmap;
///
/// let mut bitmap = VastBitmap::new();
/// bitmap.insert(10);
/// bitmap.insert(1 << 40);
///
/// assert!(bitmap.contains(10));
/// assert!(!bitmap.contains(11));
/// assert_eq!(bitmap.len(), 2);
///
/// let values: Vec<u64> = bitmap.iter().collect();
/// assert_eq!(values, vec![10, 1 << 40]);
/// ```
#[derive(Clone, Default)]
pub struct VastBitmap {
    pub(crate) index: Art<Container>,
}

impl VastBitmap {
    /// Creates an empty bitmap.
    ///
    /// # Examples
    ///
    /// ```
    /// # use vast_bitmap::VastBitmap;
    /// let bitmap = VastBitmap::new();
    /// assert!(bitmap.is_empty());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self { index: Art::new() }
    }

    /// Creates a bitmap holding the given values.
    ///
    /// # Examples
    ///
    /// ```
    /// # use vast_bitmap::VastBitmap;
    /// let bitmap = VastBitmap::of(&[3, 1, 2, 2]);
    /// assert_eq!(bitmap.len(), 3);
    /// ```
    #[must_use]
    pub fn of(values: &[u64]) -> Self {
        values.iter().copied().collect()
    }

    /// Adds a value to the set. Returns whether it was newly inserted.
    pub fn insert(&mut self, value: u64) -> bool {
        let high = key::high_key(value);
        let low = key::low(value);
        match self.index.get_mut(&high) {
            Some(container) => container.insert(low),
            None => {
                self.index.insert(high, Container::singleton(low));
                true
            }
        }
    }

    /// Removes a value from the set. Returns whether it was present.
    pub fn remove(&mut self, value: u64) -> bool {
        let high = key::high_key(value);
        let Some(container) = self.index.get_mut(&high) else {
            return false;
        };
        let removed = container.remove(key::low(value));
        let now_empty = container.is_empty();
        if now_empty {
            // Empty containers never stay installed.
            self.index.remove(&high);
        }
        removed
    }

    /// Adds the value if absent, removes it otherwise.
    pub fn toggle(&mut self, value: u64) {
        if !self.insert(value) {
            self.remove(value);
        }
    }

    /// Returns whether the set contains `value`.
    #[must_use]
    pub fn contains(&self, value: u64) -> bool {
        self.index
            .get(&key::high_key(value))
            .map_or(false, |container| container.contains(key::low(value)))
    }

    /// Number of values in the set.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.index
            .iter()
            .map(|(_, container)| container.cardinality() as u64)
            .sum()
    }

    /// Returns whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The smallest value in the set, or `None` when empty.
    #[must_use]
    pub fn min(&self) -> Option<u64> {
        let (high, container) = self.index.iter().next()?;
        container.min().map(|low| key::combine(high, low))
    }

    /// The largest value in the set, or `None` when empty.
    #[must_use]
    pub fn max(&self) -> Option<u64> {
        let (high, container) = self.index.rev_iter().next()?;
        container.max().map(|low| key::combine(high, low))
    }

    /// The smallest value in the set.
    ///
    /// # Errors
    ///
    /// [`Error::Empty`] when the bitmap holds nothing; see
    /// [`min`](VastBitmap::min) for the `Option` flavor.
    pub fn first(&self) -> Result<u64> {
        self.min().ok_or(Error::Empty)
    }

    /// The largest value in the set.
    ///
    /// # Errors
    ///
    /// [`Error::Empty`] when the bitmap holds nothing; see
    /// [`max`](VastBitmap::max) for the `Option` flavor.
    pub fn last(&self) -> Result<u64> {
        self.max().ok_or(Error::Empty)
    }

    /// Number of values less than or equal to `value`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use vast_bitmap::VastBitmap;
    /// let bitmap = VastBitmap::of(&[(1 << 63) - 1, 1 << 63, (1 << 63) + 1]);
    /// assert_eq!(bitmap.rank(1 << 63), 2);
    /// ```
    #[must_use]
    pub fn rank(&self, value: u64) -> u64 {
        let target = key::high_key(value);
        let low = key::low(value);
        let mut rank = 0;
        for (high, container) in self.index.iter() {
            match high.cmp(&target) {
                Ordering::Less => rank += container.cardinality() as u64,
                Ordering::Equal => {
                    rank += container.rank(low) as u64;
                    break;
                }
                Ordering::Greater => break,
            }
        }
        rank
    }

    /// The `index`-th value in ascending order, 0-indexed.
    ///
    /// # Errors
    ///
    /// [`Error::SelectOutOfBounds`] when `index` is at or past the
    /// cardinality.
    pub fn select(&self, index: u64) -> Result<u64> {
        let mut remaining = index;
        for (high, container) in self.index.iter() {
            let cardinality = container.cardinality() as u64;
            if remaining < cardinality {
                if let Some(low) = container.select(remaining as u32) {
                    return Ok(key::combine(high, low));
                }
                break;
            }
            remaining -= cardinality;
        }
        Err(Error::SelectOutOfBounds {
            index,
            cardinality: self.len(),
        })
    }

    /// Adds every value in `[start, end)`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRange`] when the range is empty or wraps around the
    /// unsigned 64-bit space (`end == 0` or `start >= end`).
    ///
    /// # Examples
    ///
    /// ```
    /// # use vast_bitmap::VastBitmap;
    /// let mut bitmap = VastBitmap::new();
    /// bitmap.insert_range(10, 1 << 20).unwrap();
    /// assert_eq!(bitmap.len(), (1 << 20) - 10);
    /// assert!(bitmap.insert_range(5, 5).is_err());
    /// ```
    pub fn insert_range(&mut self, start: u64, end: u64) -> Result<()> {
        if end == 0 || start >= end {
            return Err(Error::InvalidRange { start, end });
        }
        let high_start = key::high_bits(start);
        let high_end = key::high_bits(end - 1);
        debug_assert!(high_end <= key::MAX_HIGH_BITS);
        for high in high_start..=high_end {
            let lo = if high == high_start { key::low(start) } else { 0 };
            let hi = if high == high_end {
                key::low(end - 1) as u32 + 1
            } else {
                1 << 16
            };
            let high_key = key::key_from_bits(high);
            if let Some(container) = self.index.get_mut(&high_key) {
                container.insert_range(lo, hi);
            } else {
                self.index.insert(high_key, Container::from_range(lo, hi));
            }
        }
        Ok(())
    }

    /// Complements membership of every value in `[start, end)`.
    ///
    /// A container absent over a flipped span materializes as a range of
    /// ones; containers flipped down to nothing are removed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRange`] when the range wraps (`start > end`, or
    /// `end == 0` with a non-zero `start`). `start == end` is a no-op.
    pub fn flip_range(&mut self, start: u64, end: u64) -> Result<()> {
        if start == end {
            return Ok(());
        }
        if end == 0 || start > end {
            return Err(Error::InvalidRange { start, end });
        }
        let high_start = key::high_bits(start);
        let high_end = key::high_bits(end - 1);
        for high in high_start..=high_end {
            let lo = if high == high_start { key::low(start) } else { 0 };
            let hi = if high == high_end {
                key::low(end - 1) as u32 + 1
            } else {
                1 << 16
            };
            let high_key = key::key_from_bits(high);
            if let Some(container) = self.index.get_mut(&high_key) {
                container.flip_range(lo, hi);
                let now_empty = container.is_empty();
                if now_empty {
                    self.index.remove(&high_key);
                }
            } else {
                self.index.insert(high_key, Container::from_range(lo, hi));
            }
        }
        Ok(())
    }

    /// In-place union: adds every value of `other` to `self`.
    ///
    /// Containers imported from `other` are deep-cloned; `other` is never
    /// modified.
    pub fn union_with(&mut self, other: &VastBitmap) {
        for (high, theirs) in other.index.iter() {
            if let Some(mine) = self.index.get_mut(high) {
                mine.union_with(theirs);
            } else {
                self.index.insert(*high, theirs.clone());
            }
        }
    }

    /// In-place intersection: keeps only values present in both sets.
    pub fn intersection_with(&mut self, other: &VastBitmap) {
        for high in self.high_keys() {
            match other.index.get(&high) {
                None => {
                    self.index.remove(&high);
                }
                Some(theirs) => {
                    if let Some(mine) = self.index.get_mut(&high) {
                        mine.intersect_with(theirs);
                        let now_empty = mine.is_empty();
                        if now_empty {
                            self.index.remove(&high);
                        }
                    }
                }
            }
        }
    }

    /// In-place difference: removes every value of `other` from `self`.
    pub fn difference_with(&mut self, other: &VastBitmap) {
        for high in self.high_keys() {
            let Some(theirs) = other.index.get(&high) else {
                continue;
            };
            if let Some(mine) = self.index.get_mut(&high) {
                mine.difference_with(theirs);
                let now_empty = mine.is_empty();
                if now_empty {
                    self.index.remove(&high);
                }
            }
        }
    }

    /// In-place symmetric difference: keeps values present in exactly one
    /// of the two sets.
    pub fn symmetric_difference_with(&mut self, other: &VastBitmap) {
        for (high, theirs) in other.index.iter() {
            if let Some(mine) = self.index.get_mut(high) {
                mine.xor_with(theirs);
                let now_empty = mine.is_empty();
                if now_empty {
                    self.index.remove(high);
                }
            } else {
                self.index.insert(*high, theirs.clone());
            }
        }
    }

    /// Creates a new set that is the union of this set and another.
    ///
    /// The copying variants accept `self` as the argument, so self-algebra
    /// needs no special cases:
    ///
    /// ```
    /// # use vast_bitmap::VastBitmap;
    /// let bitmap = VastBitmap::of(&[1, 2, 3]);
    /// assert_eq!(bitmap.union(&bitmap), bitmap);
    /// assert!(bitmap.symmetric_difference(&bitmap).is_empty());
    /// assert_eq!(bitmap.intersection(&bitmap), bitmap);
    /// assert!(bitmap.difference(&bitmap).is_empty());
    /// ```
    #[must_use]
    pub fn union(&self, other: &VastBitmap) -> Self {
        let mut result = self.clone();
        result.union_with(other);
        result
    }

    /// Creates a new set that is the intersection of this set and another.
    #[must_use]
    pub fn intersection(&self, other: &VastBitmap) -> Self {
        let mut result = self.clone();
        result.intersection_with(other);
        result
    }

    /// Creates a new set that is the difference of this set and another.
    #[must_use]
    pub fn difference(&self, other: &VastBitmap) -> Self {
        let mut result = self.clone();
        result.difference_with(other);
        result
    }

    /// Creates a new set that is the symmetric difference of this set and
    /// another.
    #[must_use]
    pub fn symmetric_difference(&self, other: &VastBitmap) -> Self {
        let mut result = self.clone();
        result.symmetric_difference_with(other);
        result
    }

    /// Returns whether every value of `self` is contained in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &VastBitmap) -> bool {
        for (high, mine) in self.index.iter() {
            let Some(theirs) = other.index.get(high) else {
                return false;
            };
            if mine.cardinality() > theirs.cardinality() {
                return false;
            }
            let mut cursor = mine.cursor();
            while let Some(low) = cursor.next() {
                if !theirs.contains(low) {
                    return false;
                }
            }
        }
        true
    }

    /// Returns whether every value of `other` is contained in `self`.
    #[must_use]
    pub fn is_superset(&self, other: &VastBitmap) -> bool {
        other.is_subset(self)
    }

    /// Returns whether the two sets share no values.
    #[must_use]
    pub fn is_disjoint(&self, other: &VastBitmap) -> bool {
        for (high, mine) in self.index.iter() {
            let Some(theirs) = other.index.get(high) else {
                continue;
            };
            let (small, large) = if mine.cardinality() <= theirs.cardinality() {
                (mine, theirs)
            } else {
                (theirs, mine)
            };
            let mut cursor = small.cursor();
            while let Some(low) = cursor.next() {
                if large.contains(low) {
                    return false;
                }
            }
        }
        true
    }

    /// Converts containers to the run form wherever that is estimated
    /// smaller. Returns whether any container changed form.
    ///
    /// # Examples
    ///
    /// ```
    /// # use vast_bitmap::VastBitmap;
    /// let mut bitmap = VastBitmap::new();
    /// bitmap.insert_range(1000, 2000).unwrap();
    /// assert!(bitmap.run_optimize());
    /// assert!(!bitmap.run_optimize());
    /// ```
    pub fn run_optimize(&mut self) -> bool {
        let mut changed = false;
        self.index.for_each_mut(&mut |_, container| {
            changed |= container.run_optimize();
        });
        changed
    }

    /// Releases over-allocated backing capacity and sweeps out any
    /// inadvertently empty containers.
    pub fn trim(&mut self) {
        let mut empties: Vec<HighKey> = Vec::new();
        self.index.for_each_mut(&mut |high, container| {
            if container.is_empty() {
                empties.push(*high);
            } else {
                container.trim();
            }
        });
        for high in empties {
            self.index.remove(&high);
        }
    }

    /// Removes every value, releasing all container storage.
    pub fn clear(&mut self) {
        self.index.clear();
    }

    /// The set contents as an ascending vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u64> {
        self.iter().collect()
    }

    /// An ascending iterator over the set.
    ///
    /// The iterator supports [`peek`](Iter::peek) and [`seek`](Iter::seek)
    /// in addition to the standard protocol.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self)
    }

    /// An ascending iterator positioned at the first value ≥ `min`.
    #[must_use]
    pub fn iter_from(&self, min: u64) -> Iter<'_> {
        Iter::new_from(self, min)
    }

    /// A descending iterator over the set.
    #[must_use]
    pub fn rev_iter(&self) -> RevIter<'_> {
        RevIter::new(self)
    }

    /// A descending iterator positioned at the last value ≤ `max`.
    #[must_use]
    pub fn rev_iter_from(&self, max: u64) -> RevIter<'_> {
        RevIter::new_from(self, max)
    }

    /// Calls `f` for every present value in `[start, start + len)`, in
    /// ascending order.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRange`] when `start + len` overflows.
    pub fn for_each_in_range(&self, start: u64, len: u64, mut f: impl FnMut(u64)) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let end = start.checked_add(len).ok_or(Error::InvalidRange {
            start,
            end: start.wrapping_add(len),
        })?;
        for value in self.iter_from(start) {
            if value >= end {
                break;
            }
            f(value);
        }
        Ok(())
    }

    /// Reports presence information for every index in `[0, len)` relative
    /// to `start`: each present value individually, and each maximal absent
    /// span as one coalesced callback.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRange`] when `start + len` overflows.
    ///
    /// # Examples
    ///
    /// ```
    /// # use vast_bitmap::{RangeVisitor, VastBitmap};
    /// struct Log(Vec<String>);
    /// impl RangeVisitor for Log {
    ///     fn present(&mut self, offset: u64, value: u64) {
    ///         self.0.push(format!("present({offset}, {value})"));
    ///     }
    ///     fn absent(&mut self, from: u64, to: u64) {
    ///         self.0.push(format!("absent({from}, {to})"));
    ///     }
    /// }
    ///
    /// let bitmap = VastBitmap::of(&[5, 6, 100]);
    /// let mut log = Log(Vec::new());
    /// bitmap.for_all_in_range(0, 200, &mut log).unwrap();
    /// assert_eq!(log.0, vec![
    ///     "absent(0, 5)",
    ///     "present(5, 5)",
    ///     "present(6, 6)",
    ///     "absent(7, 100)",
    ///     "present(100, 100)",
    ///     "absent(101, 200)",
    /// ]);
    /// ```
    pub fn for_all_in_range<V: RangeVisitor + ?Sized>(
        &self,
        start: u64,
        len: u64,
        visitor: &mut V,
    ) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let end = start.checked_add(len).ok_or(Error::InvalidRange {
            start,
            end: start.wrapping_add(len),
        })?;
        let mut gaps = GapTracker::new(start, visitor);
        for (high, container) in self.index.iter_from(&key::high_key(start)) {
            let base = key::bits_from_key(high) << 16;
            if base >= end {
                break;
            }
            let window_lo = if base < start { key::low(start) } else { 0 };
            let span = end - base;
            let window_hi: u32 = if span >= 1 << 16 { 1 << 16 } else { span as u32 };
            let mut cursor = container.cursor();
            cursor.seek(window_lo);
            while let Some(low) = cursor.next() {
                if (low as u32) >= window_hi {
                    break;
                }
                gaps.value(base | low as u64);
            }
        }
        gaps.finish(end);
        Ok(())
    }

    /// Collects the installed high keys; used by the in-place set
    /// operations that mutate the tree while walking `self`.
    fn high_keys(&self) -> Vec<HighKey> {
        self.index.iter().map(|(high, _)| *high).collect()
    }
}

impl fmt::Debug for VastBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Value-set equality, independent of container forms.
impl PartialEq for VastBitmap {
    fn eq(&self, other: &Self) -> bool {
        if self.index.len() != other.index.len() {
            return false;
        }
        let mut a = self.index.iter();
        let mut b = other.index.iter();
        loop {
            match (a.next(), b.next()) {
                (None, None) => return true,
                (Some((ka, ca)), Some((kb, cb))) => {
                    if ka != kb || ca != cb {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }
}

impl Eq for VastBitmap {}

impl BitOr for &VastBitmap {
    type Output = VastBitmap;

    fn bitor(self, rhs: Self) -> VastBitmap {
        self.union(rhs)
    }
}

impl BitOrAssign<&VastBitmap> for VastBitmap {
    fn bitor_assign(&mut self, rhs: &VastBitmap) {
        self.union_with(rhs);
    }
}

impl BitAnd for &VastBitmap {
    type Output = VastBitmap;

    fn bitand(self, rhs: Self) -> VastBitmap {
        self.intersection(rhs)
    }
}

impl BitAndAssign<&VastBitmap> for VastBitmap {
    fn bitand_assign(&mut self, rhs: &VastBitmap) {
        self.intersection_with(rhs);
    }
}

impl BitXor for &VastBitmap {
    type Output = VastBitmap;

    fn bitxor(self, rhs: Self) -> VastBitmap {
        self.symmetric_difference(rhs)
    }
}

impl BitXorAssign<&VastBitmap> for VastBitmap {
    fn bitxor_assign(&mut self, rhs: &VastBitmap) {
        self.symmetric_difference_with(rhs);
    }
}

impl Sub for &VastBitmap {
    type Output = VastBitmap;

    fn sub(self, rhs: Self) -> VastBitmap {
        self.difference(rhs)
    }
}

impl SubAssign<&VastBitmap> for VastBitmap {
    fn sub_assign(&mut self, rhs: &VastBitmap) {
        self.difference_with(rhs);
    }
}
