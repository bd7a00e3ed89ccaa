//! The polymorphic container layer.
//!
//! Every container holds a set of 16-bit values in one of three forms:
//!
//! - [`ArrayContainer`] — sorted array, cardinality ≤ 4096;
//! - [`BitmapContainer`] — fixed 8192-byte bit array, cardinality > 4096;
//! - [`RunContainer`] — run-length encoding, kept while it is no larger
//!   (serialized) than the cheaper of the other two.
//!
//! Set-algebraic operations dispatch across the 3×3 matrix of form pairs and
//! pick the result form from the arithmetic cost of each representation, not
//! from the input forms alone. [`Container::normalize`] re-establishes form
//! optimality after every mutation.

pub(crate) mod array;
pub(crate) mod bitmap;
pub(crate) mod run;

pub(crate) use array::{ArrayContainer, ARRAY_MAX_SIZE};
pub(crate) use bitmap::{BitmapContainer, BITMAP_WORDS};
pub(crate) use run::{Interval, RunContainer};

/// Largest run count for which a run container is preferred over a bitmap
/// by the set-algebra dispatcher.
pub(crate) const RUN_MAX_RUNS: usize = 2047;

/// A set of 16-bit values in one of three self-converting forms.
#[derive(Clone, Debug)]
pub(crate) enum Container {
    Array(ArrayContainer),
    Bitmap(BitmapContainer),
    Run(RunContainer),
}

impl Container {
    /// A fresh container holding a single value.
    pub(crate) fn singleton(value: u16) -> Self {
        Container::Array(ArrayContainer::from_sorted(vec![value]))
    }

    /// A fresh container holding every value in `[lo, hi)`.
    ///
    /// Materializes as an array or bitmap by size; the run form is reserved
    /// for explicit `run_optimize` calls and run-run unions.
    pub(crate) fn from_range(lo: u16, hi: u32) -> Self {
        debug_assert!((lo as u32) < hi && hi <= 1 << 16);
        if (hi - lo as u32) as usize <= ARRAY_MAX_SIZE {
            Container::Array(ArrayContainer::from_range(lo, hi))
        } else {
            Container::Bitmap(BitmapContainer::from_range(lo, hi))
        }
    }

    /// Builds the cheapest plain form for sorted values.
    fn from_sorted(values: Vec<u16>) -> Self {
        if values.len() <= ARRAY_MAX_SIZE {
            Container::Array(ArrayContainer::from_sorted(values))
        } else {
            let mut bitmap = BitmapContainer::new();
            bitmap.insert_sorted_slice(&values);
            Container::Bitmap(bitmap)
        }
    }

    /// Picks array or bitmap for a run list, by cardinality.
    fn plain_from_intervals(runs: &[Interval]) -> Self {
        let holder = RunContainer::from_intervals(runs.to_vec());
        if holder.cardinality() as usize <= ARRAY_MAX_SIZE {
            Container::Array(holder.to_array())
        } else {
            Container::Bitmap(holder.to_bitmap())
        }
    }

    /// Keeps a run result while it is within the dispatcher's run budget,
    /// otherwise falls back to a plain form.
    fn from_interval_result(runs: Vec<Interval>) -> Self {
        if runs.len() <= RUN_MAX_RUNS {
            Container::Run(RunContainer::from_intervals(runs))
        } else {
            Container::plain_from_intervals(&runs)
        }
    }

    pub(crate) fn cardinality(&self) -> u32 {
        match self {
            Container::Array(a) => a.len() as u32,
            Container::Bitmap(b) => b.cardinality(),
            Container::Run(r) => r.cardinality(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Container::Array(a) => a.is_empty(),
            Container::Bitmap(b) => b.is_empty(),
            Container::Run(r) => r.is_empty(),
        }
    }

    pub(crate) fn contains(&self, value: u16) -> bool {
        match self {
            Container::Array(a) => a.contains(value),
            Container::Bitmap(b) => b.contains(value),
            Container::Run(r) => r.contains(value),
        }
    }

    /// Inserts a value, converting an array at capacity into a bitmap.
    pub(crate) fn insert(&mut self, value: u16) -> bool {
        let added = match self {
            Container::Array(a) => {
                if a.len() == ARRAY_MAX_SIZE && !a.contains(value) {
                    let mut bitmap = a.to_bitmap();
                    bitmap.insert(value);
                    *self = Container::Bitmap(bitmap);
                    true
                } else {
                    a.insert(value)
                }
            }
            Container::Bitmap(b) => b.insert(value),
            Container::Run(r) => r.insert(value),
        };
        if added {
            self.normalize();
        }
        added
    }

    /// Removes a value, downgrading a bitmap that shrinks to array range.
    pub(crate) fn remove(&mut self, value: u16) -> bool {
        let removed = match self {
            Container::Array(a) => a.remove(value),
            Container::Bitmap(b) => b.remove(value),
            Container::Run(r) => r.remove(value),
        };
        if removed {
            self.normalize();
        }
        removed
    }

    /// Number of values less than or equal to `value`.
    pub(crate) fn rank(&self, value: u16) -> u32 {
        match self {
            Container::Array(a) => a.rank(value),
            Container::Bitmap(b) => b.rank(value),
            Container::Run(r) => r.rank(value),
        }
    }

    /// The `k`-th value in ascending order, 0-indexed.
    pub(crate) fn select(&self, k: u32) -> Option<u16> {
        match self {
            Container::Array(a) => a.select(k),
            Container::Bitmap(b) => b.select(k),
            Container::Run(r) => r.select(k),
        }
    }

    pub(crate) fn min(&self) -> Option<u16> {
        match self {
            Container::Array(a) => a.min(),
            Container::Bitmap(b) => b.min(),
            Container::Run(r) => r.min(),
        }
    }

    pub(crate) fn max(&self) -> Option<u16> {
        match self {
            Container::Array(a) => a.max(),
            Container::Bitmap(b) => b.max(),
            Container::Run(r) => r.max(),
        }
    }

    /// Adds every value in `[lo, hi)`. `hi` is a `u32` so the full span
    /// (`hi == 65536`) is representable.
    pub(crate) fn insert_range(&mut self, lo: u16, hi: u32) {
        debug_assert!((lo as u32) < hi && hi <= 1 << 16);
        match self {
            Container::Array(a) => {
                if a.len_after_insert_range(lo, hi) > ARRAY_MAX_SIZE {
                    let mut bitmap = a.to_bitmap();
                    bitmap.insert_range(lo as u32, hi);
                    *self = Container::Bitmap(bitmap);
                } else {
                    a.insert_range(lo, hi);
                }
            }
            Container::Bitmap(b) => b.insert_range(lo as u32, hi),
            Container::Run(r) => r.insert_range(lo, (hi - 1) as u16),
        }
        self.normalize();
    }

    /// Removes every value in `[lo, hi)`.
    pub(crate) fn remove_range(&mut self, lo: u16, hi: u32) {
        debug_assert!((lo as u32) < hi && hi <= 1 << 16);
        match self {
            Container::Array(a) => a.remove_range(lo, hi),
            Container::Bitmap(b) => b.remove_range(lo as u32, hi),
            Container::Run(r) => r.remove_range(lo, (hi - 1) as u16),
        }
        self.normalize();
    }

    /// Complements membership of every value in `[lo, hi)`.
    pub(crate) fn flip_range(&mut self, lo: u16, hi: u32) {
        debug_assert!((lo as u32) < hi && hi <= 1 << 16);
        match self {
            Container::Array(a) => {
                if a.len_after_flip_range(lo, hi) > ARRAY_MAX_SIZE {
                    let mut bitmap = a.to_bitmap();
                    bitmap.flip_range(lo as u32, hi);
                    *self = Container::Bitmap(bitmap);
                } else {
                    a.flip_range(lo, hi);
                }
            }
            Container::Bitmap(b) => b.flip_range(lo as u32, hi),
            Container::Run(r) => r.flip_range(lo, (hi - 1) as u16),
        }
        self.normalize();
    }

    /// In-place union across the full form matrix.
    pub(crate) fn union_with(&mut self, other: &Container) {
        let replacement = match (&mut *self, other) {
            (Container::Array(a), Container::Array(b)) => Some(Container::from_sorted(
                array::union_values(a.as_slice(), b.as_slice()),
            )),
            (Container::Array(a), Container::Bitmap(b)) => {
                let mut bitmap = b.clone();
                bitmap.insert_sorted_slice(a.as_slice());
                Some(Container::Bitmap(bitmap))
            }
            (Container::Array(a), Container::Run(r)) => {
                let mut runs = r.clone();
                for &v in a.as_slice() {
                    runs.insert(v);
                }
                Some(Container::Run(runs))
            }
            (Container::Bitmap(b), Container::Array(a)) => {
                b.insert_sorted_slice(a.as_slice());
                None
            }
            (Container::Bitmap(a), Container::Bitmap(b)) => {
                a.or_with(b);
                None
            }
            (Container::Bitmap(b), Container::Run(r)) => {
                for iv in r.intervals() {
                    b.insert_range(iv.start as u32, iv.end as u32 + 1);
                }
                None
            }
            (Container::Run(r), Container::Array(a)) => {
                for &v in a.as_slice() {
                    r.insert(v);
                }
                None
            }
            (Container::Run(r), Container::Bitmap(b)) => {
                let mut bitmap = b.clone();
                for iv in r.intervals() {
                    bitmap.insert_range(iv.start as u32, iv.end as u32 + 1);
                }
                Some(Container::Bitmap(bitmap))
            }
            (Container::Run(a), Container::Run(b)) => {
                let merged = run::union(a.intervals(), b.intervals());
                if merged.len() <= RUN_MAX_RUNS {
                    *a = RunContainer::from_intervals(merged);
                    None
                } else {
                    Some(Container::plain_from_intervals(&merged))
                }
            }
        };
        if let Some(container) = replacement {
            *self = container;
        }
        self.normalize();
    }

    /// In-place intersection across the full form matrix.
    pub(crate) fn intersect_with(&mut self, other: &Container) {
        let replacement = match (&mut *self, other) {
            (Container::Array(a), Container::Array(b)) => {
                let out = array::intersect_values(a.as_slice(), b.as_slice());
                *a = ArrayContainer::from_sorted(out);
                None
            }
            (Container::Array(a), Container::Bitmap(b)) => {
                a.retain(|v| b.contains(v));
                None
            }
            (Container::Array(a), Container::Run(r)) => {
                a.retain(|v| r.contains(v));
                None
            }
            (Container::Bitmap(b), Container::Array(a)) => {
                // The result fits in an array by construction.
                let kept: Vec<u16> = a.as_slice().iter().copied().filter(|&v| b.contains(v)).collect();
                Some(Container::Array(ArrayContainer::from_sorted(kept)))
            }
            (Container::Bitmap(a), Container::Bitmap(b)) => {
                a.and_with(b);
                None
            }
            (Container::Bitmap(b), Container::Run(r)) => {
                mask_outside_runs(b, r.intervals());
                None
            }
            (Container::Run(r), Container::Array(a)) => {
                let kept: Vec<u16> = a.as_slice().iter().copied().filter(|&v| r.contains(v)).collect();
                Some(Container::Array(ArrayContainer::from_sorted(kept)))
            }
            (Container::Run(r), Container::Bitmap(b)) => {
                let mut bitmap = b.clone();
                mask_outside_runs(&mut bitmap, r.intervals());
                Some(Container::Bitmap(bitmap))
            }
            (Container::Run(a), Container::Run(b)) => {
                *a = RunContainer::from_intervals(run::intersect(a.intervals(), b.intervals()));
                None
            }
        };
        if let Some(container) = replacement {
            *self = container;
        }
        self.normalize();
    }

    /// In-place symmetric difference across the full form matrix.
    pub(crate) fn xor_with(&mut self, other: &Container) {
        let replacement = match (&mut *self, other) {
            (Container::Array(a), Container::Array(b)) => Some(Container::from_sorted(
                array::xor_values(a.as_slice(), b.as_slice()),
            )),
            (Container::Array(a), Container::Bitmap(b)) => {
                let mut bitmap = b.clone();
                for &v in a.as_slice() {
                    bitmap.toggle(v);
                }
                Some(Container::Bitmap(bitmap))
            }
            (Container::Array(a), Container::Run(r)) => {
                let mut runs = r.clone();
                for &v in a.as_slice() {
                    runs.toggle(v);
                }
                Some(Container::Run(runs))
            }
            (Container::Bitmap(b), Container::Array(a)) => {
                for &v in a.as_slice() {
                    b.toggle(v);
                }
                None
            }
            (Container::Bitmap(a), Container::Bitmap(b)) => {
                a.xor_with(b);
                None
            }
            (Container::Bitmap(b), Container::Run(r)) => {
                for iv in r.intervals() {
                    b.flip_range(iv.start as u32, iv.end as u32 + 1);
                }
                None
            }
            (Container::Run(r), Container::Array(a)) => {
                for &v in a.as_slice() {
                    r.toggle(v);
                }
                None
            }
            (Container::Run(r), Container::Bitmap(b)) => {
                let mut bitmap = b.clone();
                for iv in r.intervals() {
                    bitmap.flip_range(iv.start as u32, iv.end as u32 + 1);
                }
                Some(Container::Bitmap(bitmap))
            }
            (Container::Run(a), Container::Run(b)) => {
                Some(Container::from_interval_result(run::xor(
                    a.intervals(),
                    b.intervals(),
                )))
            }
        };
        if let Some(container) = replacement {
            *self = container;
        }
        self.normalize();
    }

    /// In-place difference across the full form matrix.
    pub(crate) fn difference_with(&mut self, other: &Container) {
        let replacement = match (&mut *self, other) {
            (Container::Array(a), Container::Array(b)) => {
                let out = array::difference_values(a.as_slice(), b.as_slice());
                *a = ArrayContainer::from_sorted(out);
                None
            }
            (Container::Array(a), Container::Bitmap(b)) => {
                a.retain(|v| !b.contains(v));
                None
            }
            (Container::Array(a), Container::Run(r)) => {
                a.retain(|v| !r.contains(v));
                None
            }
            (Container::Bitmap(b), Container::Array(a)) => {
                for &v in a.as_slice() {
                    b.remove(v);
                }
                None
            }
            (Container::Bitmap(a), Container::Bitmap(b)) => {
                a.andnot_with(b);
                None
            }
            (Container::Bitmap(b), Container::Run(r)) => {
                for iv in r.intervals() {
                    b.remove_range(iv.start as u32, iv.end as u32 + 1);
                }
                None
            }
            (Container::Run(r), Container::Array(a)) => {
                for &v in a.as_slice() {
                    r.remove(v);
                }
                None
            }
            (Container::Run(r), Container::Bitmap(b)) => {
                let mut bitmap = r.to_bitmap();
                bitmap.andnot_with(b);
                Some(Container::Bitmap(bitmap))
            }
            (Container::Run(a), Container::Run(b)) => {
                *a = RunContainer::from_intervals(run::difference(a.intervals(), b.intervals()));
                None
            }
        };
        if let Some(container) = replacement {
            *self = container;
        }
        self.normalize();
    }

    /// Number of maximal contiguous value runs in the current contents.
    pub(crate) fn num_runs(&self) -> usize {
        match self {
            Container::Array(a) => a.num_runs(),
            Container::Bitmap(b) => b.num_runs(),
            Container::Run(r) => r.num_runs(),
        }
    }

    /// Converts to the run form when that is strictly smaller serialized.
    /// Returns whether a conversion happened.
    pub(crate) fn run_optimize(&mut self) -> bool {
        let current_size = match self {
            Container::Run(_) => return false,
            Container::Array(a) => a.serialized_size(),
            Container::Bitmap(b) => b.serialized_size(),
        };
        let runs = self.num_runs();
        if 2 + 4 * runs >= current_size {
            return false;
        }
        let mut intervals = Vec::with_capacity(runs);
        let mut cursor = self.cursor();
        while let Some(v) = cursor.next() {
            match intervals.last_mut() {
                Some(Interval { end, .. }) if *end as u32 + 1 == v as u32 => *end = v,
                _ => intervals.push(Interval::new(v, v)),
            }
        }
        *self = Container::Run(RunContainer::from_intervals(intervals));
        true
    }

    /// Re-establishes form optimality: arrays never exceed 4096 values,
    /// bitmaps never hold 4096 or fewer, runs never cost strictly more
    /// (serialized) than the cheaper plain form.
    pub(crate) fn normalize(&mut self) {
        match self {
            Container::Array(a) if a.len() > ARRAY_MAX_SIZE => {
                *self = Container::Bitmap(a.to_bitmap());
            }
            Container::Bitmap(b) if (b.cardinality() as usize) <= ARRAY_MAX_SIZE => {
                *self = Container::Array(b.to_array());
            }
            Container::Run(r) => {
                let cardinality = r.cardinality() as usize;
                let plain = if cardinality <= ARRAY_MAX_SIZE {
                    2 + 2 * cardinality
                } else {
                    2 + BITMAP_WORDS * 8
                };
                if r.serialized_size() > plain {
                    *self = if cardinality <= ARRAY_MAX_SIZE {
                        Container::Array(r.to_array())
                    } else {
                        Container::Bitmap(r.to_bitmap())
                    };
                }
            }
            _ => {}
        }
    }

    pub(crate) fn trim(&mut self) {
        match self {
            Container::Array(a) => a.trim(),
            Container::Bitmap(_) => {}
            Container::Run(r) => r.trim(),
        }
    }

    /// Serialized body size in bytes (kind tag excluded).
    pub(crate) fn serialized_size(&self) -> usize {
        match self {
            Container::Array(a) => a.serialized_size(),
            Container::Bitmap(b) => b.serialized_size(),
            Container::Run(r) => r.serialized_size(),
        }
    }

    /// Ascending cursor over the contained values.
    pub(crate) fn cursor(&self) -> Cursor<'_> {
        match self {
            Container::Array(a) => Cursor::Array {
                values: a.as_slice(),
                pos: 0,
            },
            Container::Bitmap(b) => Cursor::Bitmap {
                bitmap: b,
                next: b.next_set_bit(0),
            },
            Container::Run(r) => Cursor::Run {
                runs: r.intervals(),
                idx: 0,
                cur: r.intervals().first().map_or(0, |iv| iv.start as u32),
            },
        }
    }

    /// Descending cursor over the contained values.
    pub(crate) fn rev_cursor(&self) -> RevCursor<'_> {
        match self {
            Container::Array(a) => RevCursor::Array {
                values: a.as_slice(),
                pos: a.len(),
            },
            Container::Bitmap(b) => RevCursor::Bitmap {
                bitmap: b,
                next: b.prev_set_bit((1 << 16) - 1),
            },
            Container::Run(r) => {
                let runs = r.intervals();
                RevCursor::Run {
                    runs,
                    idx: runs.len(),
                    cur: runs.last().map_or(0, |iv| iv.end as u32),
                }
            }
        }
    }
}

/// Clears every bit of `bitmap` outside the given runs.
fn mask_outside_runs(bitmap: &mut BitmapContainer, runs: &[Interval]) {
    let mut covered_until: u32 = 0;
    for iv in runs {
        if covered_until < iv.start as u32 {
            bitmap.remove_range(covered_until, iv.start as u32);
        }
        covered_until = iv.end as u32 + 1;
    }
    if covered_until < 1 << 16 {
        bitmap.remove_range(covered_until, 1 << 16);
    }
}

/// Set equality across forms.
impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        if self.cardinality() != other.cardinality() {
            return false;
        }
        let mut a = self.cursor();
        let mut b = other.cursor();
        loop {
            match (a.next(), b.next()) {
                (None, None) => return true,
                (x, y) if x == y => {}
                _ => return false,
            }
        }
    }
}

impl Eq for Container {}

/// An explicit ascending cursor with `peek` and `seek`.
#[derive(Clone)]
pub(crate) enum Cursor<'a> {
    Array {
        values: &'a [u16],
        pos: usize,
    },
    Bitmap {
        bitmap: &'a BitmapContainer,
        next: Option<u32>,
    },
    Run {
        runs: &'a [Interval],
        idx: usize,
        cur: u32,
    },
}

impl Cursor<'_> {
    /// The next value without advancing.
    pub(crate) fn peek(&self) -> Option<u16> {
        match self {
            Cursor::Array { values, pos } => values.get(*pos).copied(),
            Cursor::Bitmap { next, .. } => next.map(|v| v as u16),
            Cursor::Run { runs, idx, cur } => (*idx < runs.len()).then(|| *cur as u16),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub(crate) fn next(&mut self) -> Option<u16> {
        let out = self.peek()?;
        match self {
            Cursor::Array { pos, .. } => *pos += 1,
            Cursor::Bitmap { bitmap, next } => {
                *next = bitmap.next_set_bit(out as u32 + 1);
            }
            Cursor::Run { runs, idx, cur } => {
                if *cur < runs[*idx].end as u32 {
                    *cur += 1;
                } else {
                    *idx += 1;
                    if *idx < runs.len() {
                        *cur = runs[*idx].start as u32;
                    }
                }
            }
        }
        Some(out)
    }

    /// Advances to the first value at or above `min`. Never moves backward.
    pub(crate) fn seek(&mut self, min: u16) {
        if self.peek().map_or(true, |v| v >= min) {
            return;
        }
        match self {
            Cursor::Array { values, pos } => {
                *pos = values.partition_point(|&v| v < min);
            }
            Cursor::Bitmap { bitmap, next } => {
                *next = bitmap.next_set_bit(min as u32);
            }
            Cursor::Run { runs, idx, cur } => {
                let i = runs.partition_point(|r| r.start <= min);
                if i > 0 && runs[i - 1].end >= min {
                    *idx = i - 1;
                    *cur = min as u32;
                } else {
                    *idx = i;
                    if i < runs.len() {
                        *cur = runs[i].start as u32;
                    }
                }
            }
        }
    }
}

/// An explicit descending cursor with `peek` and `seek`.
#[derive(Clone)]
pub(crate) enum RevCursor<'a> {
    Array {
        values: &'a [u16],
        pos: usize,
    },
    Bitmap {
        bitmap: &'a BitmapContainer,
        next: Option<u32>,
    },
    Run {
        runs: &'a [Interval],
        idx: usize,
        cur: u32,
    },
}

impl RevCursor<'_> {
    pub(crate) fn peek(&self) -> Option<u16> {
        match self {
            RevCursor::Array { values, pos } => pos.checked_sub(1).map(|p| values[p]),
            RevCursor::Bitmap { next, .. } => next.map(|v| v as u16),
            RevCursor::Run { idx, cur, runs } => (*idx <= runs.len() && *idx > 0).then(|| *cur as u16),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub(crate) fn next(&mut self) -> Option<u16> {
        let out = self.peek()?;
        match self {
            RevCursor::Array { pos, .. } => *pos -= 1,
            RevCursor::Bitmap { bitmap, next } => {
                *next = (out > 0)
                    .then(|| bitmap.prev_set_bit(out as u32 - 1))
                    .flatten();
            }
            RevCursor::Run { runs, idx, cur } => {
                if *cur > runs[*idx - 1].start as u32 {
                    *cur -= 1;
                } else {
                    *idx -= 1;
                    if *idx > 0 {
                        *cur = runs[*idx - 1].end as u32;
                    }
                }
            }
        }
        Some(out)
    }

    /// Retreats to the last value at or below `max`. Never moves forward.
    pub(crate) fn seek(&mut self, max: u16) {
        if self.peek().map_or(true, |v| v <= max) {
            return;
        }
        match self {
            RevCursor::Array { values, pos } => {
                *pos = values.partition_point(|&v| v <= max);
            }
            RevCursor::Bitmap { bitmap, next } => {
                *next = bitmap.prev_set_bit(max as u32);
            }
            RevCursor::Run { runs, idx, cur } => {
                let i = runs.partition_point(|r| r.start <= max);
                *idx = i;
                if i > 0 {
                    *cur = (runs[i - 1].end).min(max) as u32;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn container_of(values: &[u16]) -> Container {
        let mut sorted: Vec<u16> = values.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        Container::from_sorted(sorted)
    }

    fn as_set(c: &Container) -> BTreeSet<u16> {
        let mut out = BTreeSet::new();
        let mut cur = c.cursor();
        while let Some(v) = cur.next() {
            out.insert(v);
        }
        out
    }

    fn forms() -> Vec<(&'static str, Container)> {
        // One container of each form over the same kind of clustered data.
        let mut array = container_of(&[1, 2, 3, 1000, 40000]);
        array.insert(5);

        let mut bitmap = Container::from_range(0, 5000);
        bitmap.insert(60000);

        let mut run = Container::from_range(100, 300);
        assert!(run.run_optimize());
        vec![("array", array), ("bitmap", bitmap), ("run", run)]
    }

    #[test]
    fn insert_converts_array_past_capacity() {
        let mut c = Container::from_range(0, 4096);
        assert!(matches!(c, Container::Array(_)));
        assert!(c.insert(5000));
        assert!(matches!(c, Container::Bitmap(_)));
        assert_eq!(c.cardinality(), 4097);
        assert!(!c.insert(5000));
    }

    #[test]
    fn remove_downgrades_bitmap() {
        let mut c = Container::from_range(0, 4097);
        assert!(matches!(c, Container::Bitmap(_)));
        assert!(c.remove(0));
        assert!(matches!(c, Container::Array(_)));
        assert_eq!(c.cardinality(), 4096);
    }

    #[test]
    fn set_ops_cover_the_form_matrix() {
        for (left_name, left) in forms() {
            for (right_name, right) in forms() {
                let sa = as_set(&left);
                let sb = as_set(&right);
                let label = format!("{left_name} vs {right_name}");

                let mut c = left.clone();
                c.union_with(&right);
                assert_eq!(as_set(&c), sa.union(&sb).copied().collect(), "or {label}");

                let mut c = left.clone();
                c.intersect_with(&right);
                assert_eq!(
                    as_set(&c),
                    sa.intersection(&sb).copied().collect(),
                    "and {label}"
                );

                let mut c = left.clone();
                c.xor_with(&right);
                assert_eq!(
                    as_set(&c),
                    sa.symmetric_difference(&sb).copied().collect(),
                    "xor {label}"
                );

                let mut c = left.clone();
                c.difference_with(&right);
                assert_eq!(
                    as_set(&c),
                    sa.difference(&sb).copied().collect(),
                    "andnot {label}"
                );
            }
        }
    }

    #[test]
    fn normalize_enforces_form_rules() {
        for (_, c) in forms() {
            for (_, other) in forms() {
                let mut x = c.clone();
                x.union_with(&other);
                match &x {
                    Container::Array(a) => assert!(a.len() <= ARRAY_MAX_SIZE),
                    Container::Bitmap(b) => assert!(b.cardinality() as usize > ARRAY_MAX_SIZE),
                    Container::Run(r) => {
                        let n = r.cardinality() as usize;
                        let plain = if n <= ARRAY_MAX_SIZE { 2 + 2 * n } else { 8194 };
                        assert!(r.serialized_size() <= plain);
                    }
                }
            }
        }
    }

    #[test]
    fn run_optimize_requires_strict_win() {
        let mut dense = Container::from_range(1000, 2000);
        assert!(matches!(dense, Container::Array(_)));
        assert!(dense.run_optimize());
        assert!(matches!(dense, Container::Run(_)));
        assert!(!dense.run_optimize());

        // Scattered values never benefit from run encoding.
        let mut sparse = container_of(&[1, 5, 9, 1000]);
        assert!(!sparse.run_optimize());
        assert!(matches!(sparse, Container::Array(_)));
    }

    #[test]
    fn cursors_agree_both_directions() {
        for (name, c) in forms() {
            let forward: Vec<u16> = {
                let mut out = Vec::new();
                let mut cur = c.cursor();
                while let Some(v) = cur.next() {
                    out.push(v);
                }
                out
            };
            assert_eq!(forward.len() as u32, c.cardinality(), "{name}");
            assert!(forward.windows(2).all(|w| w[0] < w[1]), "{name}");

            let mut backward: Vec<u16> = {
                let mut out = Vec::new();
                let mut cur = c.rev_cursor();
                while let Some(v) = cur.next() {
                    out.push(v);
                }
                out
            };
            backward.reverse();
            assert_eq!(forward, backward, "{name}");
        }
    }

    #[test]
    fn cursor_seek_lands_on_first_at_or_above() {
        for (name, c) in forms() {
            let all: BTreeSet<u16> = as_set(&c);
            for probe in [0u16, 1, 2, 99, 100, 299, 300, 4999, 5000, 59999, 65535] {
                let mut cur = c.cursor();
                cur.seek(probe);
                let expected = all.range(probe..).next().copied();
                assert_eq!(cur.peek(), expected, "{name} seek {probe}");

                let mut rev = c.rev_cursor();
                rev.seek(probe);
                let expected_rev = all.range(..=probe).next_back().copied();
                assert_eq!(rev.peek(), expected_rev, "{name} rev seek {probe}");
            }
        }
    }

    #[test]
    fn equality_ignores_form() {
        let mut as_run = Container::from_range(10, 50);
        let plain = as_run.clone();
        assert!(as_run.run_optimize());
        assert_eq!(as_run, plain);
        assert_ne!(as_run, Container::singleton(10));
    }
}
