//! Run-length-encoded container for heavily clustered key sets.

use super::array::ArrayContainer;
use super::bitmap::BitmapContainer;

/// A maximal block of consecutive values, inclusive on both ends.
///
/// Inclusive bounds keep the arithmetic inside `u16`: the full container is
/// the single run `[0, 65535]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Interval {
    pub(crate) start: u16,
    pub(crate) end: u16,
}

impl Interval {
    #[inline]
    pub(crate) fn new(start: u16, end: u16) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    #[inline]
    pub(crate) fn len(&self) -> u32 {
        (self.end - self.start) as u32 + 1
    }
}

/// A container storing its values as disjoint, ascending, non-adjacent runs.
#[derive(Clone, Debug, Default)]
pub(crate) struct RunContainer {
    runs: Vec<Interval>,
}

impl RunContainer {
    pub(crate) fn new() -> Self {
        Self { runs: Vec::new() }
    }

    /// Builds a container from runs already satisfying the invariants:
    /// sorted, disjoint, with a gap between consecutive runs.
    pub(crate) fn from_intervals(runs: Vec<Interval>) -> Self {
        debug_assert!(runs
            .windows(2)
            .all(|w| (w[0].end as u32) + 1 < w[1].start as u32));
        Self { runs }
    }

    #[inline]
    pub(crate) fn intervals(&self) -> &[Interval] {
        &self.runs
    }

    #[inline]
    pub(crate) fn num_runs(&self) -> usize {
        self.runs.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub(crate) fn cardinality(&self) -> u32 {
        self.runs.iter().map(Interval::len).sum()
    }

    /// Index of the run containing `value`, if any.
    fn find(&self, value: u16) -> Option<usize> {
        let idx = self.runs.partition_point(|r| r.start <= value);
        (idx > 0 && self.runs[idx - 1].end >= value).then(|| idx - 1)
    }

    pub(crate) fn contains(&self, value: u16) -> bool {
        self.find(value).is_some()
    }

    pub(crate) fn insert(&mut self, value: u16) -> bool {
        let idx = self.runs.partition_point(|r| r.start <= value);
        if idx > 0 && self.runs[idx - 1].end >= value {
            return false;
        }
        let touches_prev = idx > 0 && self.runs[idx - 1].end as u32 + 1 == value as u32;
        let touches_next =
            idx < self.runs.len() && value as u32 + 1 == self.runs[idx].start as u32;
        match (touches_prev, touches_next) {
            (true, true) => {
                self.runs[idx - 1].end = self.runs[idx].end;
                self.runs.remove(idx);
            }
            (true, false) => self.runs[idx - 1].end = value,
            (false, true) => self.runs[idx].start = value,
            (false, false) => self.runs.insert(idx, Interval::new(value, value)),
        }
        true
    }

    pub(crate) fn remove(&mut self, value: u16) -> bool {
        let Some(idx) = self.find(value) else {
            return false;
        };
        let run = self.runs[idx];
        if run.start == value && run.end == value {
            self.runs.remove(idx);
        } else if run.start == value {
            self.runs[idx].start = value + 1;
        } else if run.end == value {
            self.runs[idx].end = value - 1;
        } else {
            // Interior removal splits the run.
            self.runs[idx].end = value - 1;
            self.runs.insert(idx + 1, Interval::new(value + 1, run.end));
        }
        true
    }

    pub(crate) fn toggle(&mut self, value: u16) {
        if !self.insert(value) {
            self.remove(value);
        }
    }

    /// Number of values less than or equal to `value`.
    pub(crate) fn rank(&self, value: u16) -> u32 {
        let mut rank = 0;
        for run in &self.runs {
            if run.end <= value {
                rank += run.len();
            } else {
                if run.start <= value {
                    rank += (value - run.start) as u32 + 1;
                }
                break;
            }
        }
        rank
    }

    /// The `k`-th value in ascending order, 0-indexed.
    pub(crate) fn select(&self, k: u32) -> Option<u16> {
        let mut remaining = k;
        for run in &self.runs {
            if remaining < run.len() {
                return Some((run.start as u32 + remaining) as u16);
            }
            remaining -= run.len();
        }
        None
    }

    pub(crate) fn min(&self) -> Option<u16> {
        self.runs.first().map(|r| r.start)
    }

    pub(crate) fn max(&self) -> Option<u16> {
        self.runs.last().map(|r| r.end)
    }

    pub(crate) fn insert_range(&mut self, lo: u16, last: u16) {
        let lo32 = lo as u32;
        let last32 = last as u32;
        // Runs touching or overlapping [lo, last] fuse into one.
        let i = self.runs.partition_point(|r| (r.end as u32) + 1 < lo32);
        let j = self.runs.partition_point(|r| (r.start as u32) <= last32 + 1);
        if i == j {
            self.runs.insert(i, Interval::new(lo, last));
            return;
        }
        let start = self.runs[i].start.min(lo);
        let end = self.runs[j - 1].end.max(last);
        self.runs.splice(i..j, [Interval::new(start, end)]);
    }

    pub(crate) fn remove_range(&mut self, lo: u16, last: u16) {
        let lo32 = lo as u32;
        let last32 = last as u32;
        let i = self.runs.partition_point(|r| (r.end as u32) < lo32);
        let j = self.runs.partition_point(|r| (r.start as u32) <= last32);
        if i == j {
            return;
        }
        let mut keep = Vec::with_capacity(2);
        if self.runs[i].start < lo {
            keep.push(Interval::new(self.runs[i].start, lo - 1));
        }
        if self.runs[j - 1].end > last {
            keep.push(Interval::new(last + 1, self.runs[j - 1].end));
        }
        self.runs.splice(i..j, keep);
    }

    /// Complements membership of every value in `[lo, last]`, then restores
    /// the non-adjacency invariant around the splice.
    pub(crate) fn flip_range(&mut self, lo: u16, last: u16) {
        let lo32 = lo as u32;
        let last32 = last as u32;
        let i = self.runs.partition_point(|r| (r.end as u32) < lo32);
        let j = self.runs.partition_point(|r| (r.start as u32) <= last32);

        let mut out = Vec::with_capacity(self.runs.len() + 2);
        out.extend_from_slice(&self.runs[..i]);
        let mut cursor = lo32;
        let mut right_clip = None;
        for run in &self.runs[i..j] {
            if (run.start as u32) < lo32 {
                out.push(Interval::new(run.start, lo - 1));
            }
            let covered_from = (run.start as u32).max(lo32);
            if cursor < covered_from {
                out.push(Interval::new(cursor as u16, (covered_from - 1) as u16));
            }
            cursor = (run.end as u32).min(last32) + 1;
            if (run.end as u32) > last32 {
                right_clip = Some(Interval::new(last + 1, run.end));
            }
        }
        if cursor <= last32 {
            out.push(Interval::new(cursor as u16, last));
        }
        if let Some(clip) = right_clip {
            out.push(clip);
        }
        out.extend_from_slice(&self.runs[j..]);
        coalesce(&mut out);
        self.runs = out;
    }

    pub(crate) fn to_array(&self) -> ArrayContainer {
        let mut values = Vec::with_capacity(self.cardinality() as usize);
        for run in &self.runs {
            values.extend((run.start as u32..=run.end as u32).map(|v| v as u16));
        }
        ArrayContainer::from_sorted(values)
    }

    pub(crate) fn to_bitmap(&self) -> BitmapContainer {
        let mut bitmap = BitmapContainer::new();
        for run in &self.runs {
            bitmap.insert_range(run.start as u32, run.end as u32 + 1);
        }
        bitmap
    }

    pub(crate) fn trim(&mut self) {
        self.runs.shrink_to_fit();
    }

    /// Serialized body size: a `u16` count plus two `u16`s per run.
    pub(crate) fn serialized_size(&self) -> usize {
        2 + 4 * self.runs.len()
    }
}

/// Merges adjacent or overlapping neighbors in place.
fn coalesce(runs: &mut Vec<Interval>) {
    if runs.is_empty() {
        return;
    }
    let mut kept = 0;
    for i in 1..runs.len() {
        let run = runs[i];
        if (runs[kept].end as u32) + 1 >= run.start as u32 {
            if run.end > runs[kept].end {
                runs[kept].end = run.end;
            }
        } else {
            kept += 1;
            runs[kept] = run;
        }
    }
    runs.truncate(kept + 1);
}

/// Union of two run lists.
pub(crate) fn union(a: &[Interval], b: &[Interval]) -> Vec<Interval> {
    let mut out: Vec<Interval> = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        let next = if j >= b.len() || (i < a.len() && a[i].start <= b[j].start) {
            i += 1;
            a[i - 1]
        } else {
            j += 1;
            b[j - 1]
        };
        match out.last_mut() {
            Some(last) if (last.end as u32) + 1 >= next.start as u32 => {
                if next.end > last.end {
                    last.end = next.end;
                }
            }
            _ => out.push(next),
        }
    }
    out
}

/// Intersection of two run lists.
pub(crate) fn intersect(a: &[Interval], b: &[Interval]) -> Vec<Interval> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let start = a[i].start.max(b[j].start);
        let end = a[i].end.min(b[j].end);
        if start <= end {
            out.push(Interval::new(start, end));
        }
        if a[i].end <= b[j].end {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// Difference (`a` minus `b`) of two run lists.
pub(crate) fn difference(a: &[Interval], b: &[Interval]) -> Vec<Interval> {
    let mut out = Vec::new();
    let mut j = 0;
    for &run in a {
        let mut cur = run.start as u32;
        let run_end = run.end as u32;
        // b runs ending before this a run can never matter again.
        while j < b.len() && (b[j].end as u32) < run.start as u32 {
            j += 1;
        }
        let mut k = j;
        loop {
            if k >= b.len() || (b[k].start as u32) > run_end {
                if cur <= run_end {
                    out.push(Interval::new(cur as u16, run.end));
                }
                break;
            }
            let b_start = b[k].start as u32;
            let b_end = b[k].end as u32;
            if b_start > cur {
                out.push(Interval::new(cur as u16, (b_start - 1) as u16));
            }
            if b_end >= run_end {
                break;
            }
            cur = cur.max(b_end + 1);
            k += 1;
        }
    }
    out
}

/// Symmetric difference of two run lists.
pub(crate) fn xor(a: &[Interval], b: &[Interval]) -> Vec<Interval> {
    let both = intersect(a, b);
    difference(&union(a, b), &both)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(pairs: &[(u16, u16)]) -> Vec<Interval> {
        pairs.iter().map(|&(s, e)| Interval::new(s, e)).collect()
    }

    #[test]
    fn insert_merges_adjacent_runs() {
        let mut r = RunContainer::new();
        assert!(r.insert(5));
        assert!(r.insert(7));
        assert_eq!(r.intervals(), runs(&[(5, 5), (7, 7)]).as_slice());
        assert!(r.insert(6));
        assert_eq!(r.intervals(), runs(&[(5, 7)]).as_slice());
        assert!(!r.insert(6));
    }

    #[test]
    fn remove_splits_interior() {
        let mut r = RunContainer::from_intervals(runs(&[(10, 20)]));
        assert!(r.remove(15));
        assert_eq!(r.intervals(), runs(&[(10, 14), (16, 20)]).as_slice());
        assert!(r.remove(10));
        assert!(r.remove(20));
        assert_eq!(r.intervals(), runs(&[(11, 14), (16, 19)]).as_slice());
        assert!(!r.remove(15));
    }

    #[test]
    fn rank_select_walk_runs() {
        let r = RunContainer::from_intervals(runs(&[(2, 4), (10, 11)]));
        assert_eq!(r.cardinality(), 5);
        assert_eq!(r.rank(1), 0);
        assert_eq!(r.rank(3), 2);
        assert_eq!(r.rank(10), 4);
        assert_eq!(r.select(0), Some(2));
        assert_eq!(r.select(3), Some(10));
        assert_eq!(r.select(5), None);
    }

    #[test]
    fn insert_range_fuses_neighbors() {
        let mut r = RunContainer::from_intervals(runs(&[(1, 2), (8, 9), (40, 50)]));
        r.insert_range(3, 7);
        assert_eq!(r.intervals(), runs(&[(1, 9), (40, 50)]).as_slice());
        r.insert_range(60, 61);
        assert_eq!(r.intervals(), runs(&[(1, 9), (40, 50), (60, 61)]).as_slice());
    }

    #[test]
    fn remove_range_clips_edges() {
        let mut r = RunContainer::from_intervals(runs(&[(0, 10), (20, 30)]));
        r.remove_range(5, 25);
        assert_eq!(r.intervals(), runs(&[(0, 4), (26, 30)]).as_slice());
        r.remove_range(0, 65535);
        assert!(r.is_empty());
    }

    #[test]
    fn flip_range_complements_window() {
        let mut r = RunContainer::from_intervals(runs(&[(5, 9)]));
        r.flip_range(7, 11);
        assert_eq!(r.intervals(), runs(&[(5, 6), (10, 11)]).as_slice());

        // Flipping next to an existing run must fuse with it.
        let mut r = RunContainer::from_intervals(runs(&[(4, 4)]));
        r.flip_range(5, 9);
        assert_eq!(r.intervals(), runs(&[(4, 9)]).as_slice());

        // Flipping a fully-covered window punches a hole.
        let mut r = RunContainer::from_intervals(runs(&[(0, 20)]));
        r.flip_range(5, 9);
        assert_eq!(r.intervals(), runs(&[(0, 4), (10, 20)]).as_slice());
    }

    #[test]
    fn kernels_agree_with_bit_sets() {
        use std::collections::BTreeSet;
        let a = runs(&[(0, 5), (9, 9), (20, 30)]);
        let b = runs(&[(4, 10), (29, 40)]);
        let expand = |rs: &[Interval]| -> BTreeSet<u32> {
            rs.iter()
                .flat_map(|r| r.start as u32..=r.end as u32)
                .collect()
        };
        let sa = expand(&a);
        let sb = expand(&b);

        assert_eq!(expand(&union(&a, &b)), sa.union(&sb).copied().collect());
        assert_eq!(
            expand(&intersect(&a, &b)),
            sa.intersection(&sb).copied().collect()
        );
        assert_eq!(
            expand(&difference(&a, &b)),
            sa.difference(&sb).copied().collect()
        );
        assert_eq!(
            expand(&xor(&a, &b)),
            sa.symmetric_difference(&sb).copied().collect()
        );
        // Results must also satisfy the run invariants.
        for rs in [union(&a, &b), intersect(&a, &b), difference(&a, &b), xor(&a, &b)] {
            assert!(rs
                .windows(2)
                .all(|w| (w[0].end as u32) + 1 < w[1].start as u32));
        }
    }

    #[test]
    fn full_span_run() {
        let mut r = RunContainer::new();
        r.insert_range(0, 65535);
        assert_eq!(r.cardinality(), 65536);
        assert!(r.contains(0) && r.contains(65535));
        r.flip_range(0, 65535);
        assert!(r.is_empty());
    }
}
