//! Iterator implementations for `VastBitmap`.
//!
//! Both directions are explicit cursors: a tree-traversal position plus a
//! cursor into the current container. On top of the standard iterator
//! protocol they support `peek` and `seek`, the latter repositioning in
//! logarithmic time instead of stepping value by value.

use std::iter::FusedIterator;

use crate::art::{self, Art};
use crate::container::{Container, Cursor, RevCursor};
use crate::key;
use crate::VastBitmap;

/// An ascending iterator over the values of a [`VastBitmap`].
///
/// Created by [`VastBitmap::iter`] and [`VastBitmap::iter_from`].
///
/// # Examples
///
/// ```
/// use vast_bitmap::VastBitmap;
///
/// let bitmap = VastBitmap::of(&[1, 5, 1 << 50]);
/// let mut iter = bitmap.iter();
/// assert_eq!(iter.peek(), Some(1));
/// iter.seek(4);
/// assert_eq!(iter.collect::<Vec<_>>(), vec![5, 1 << 50]);
/// ```
#[derive(Clone)]
pub struct Iter<'a> {
    tree: &'a Art<Container>,
    leaves: art::Iter<'a, Container>,
    cur: Option<(u64, Cursor<'a>)>,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(bitmap: &'a VastBitmap) -> Self {
        let mut iter = Self {
            tree: &bitmap.index,
            leaves: bitmap.index.iter(),
            cur: None,
        };
        iter.roll();
        iter
    }

    pub(crate) fn new_from(bitmap: &'a VastBitmap, min: u64) -> Self {
        let mut iter = Self {
            tree: &bitmap.index,
            leaves: bitmap.index.iter_from(&key::high_key(min)),
            cur: None,
        };
        iter.roll();
        iter.seek(min);
        iter
    }

    /// Makes `cur` hold a non-exhausted cursor, or `None` at the end.
    fn roll(&mut self) {
        loop {
            if let Some((_, cursor)) = &self.cur {
                if cursor.peek().is_some() {
                    return;
                }
            }
            match self.leaves.next() {
                Some((high, container)) => {
                    self.cur = Some((key::bits_from_key(high) << 16, container.cursor()));
                }
                None => {
                    self.cur = None;
                    return;
                }
            }
        }
    }

    /// The next value without advancing the iterator.
    pub fn peek(&mut self) -> Option<u64> {
        self.roll();
        let (base, cursor) = self.cur.as_ref()?;
        cursor.peek().map(|low| base | low as u64)
    }

    /// Advances to the first value ≥ `min`. Never moves backward.
    pub fn seek(&mut self, min: u64) {
        match self.peek() {
            None => return,
            Some(value) if value >= min => return,
            Some(_) => {}
        }
        let target_base = min & !0xFFFF;
        if let Some((base, cursor)) = self.cur.as_mut() {
            if *base == target_base {
                cursor.seek(key::low(min));
                self.roll();
                return;
            }
        }
        // The target lies past the current container: re-anchor the tree
        // traversal instead of stepping container by container.
        self.leaves = self.tree.iter_from(&key::high_key(min));
        self.cur = None;
        self.roll();
        if let Some((base, cursor)) = self.cur.as_mut() {
            if *base == target_base {
                cursor.seek(key::low(min));
            }
        }
        self.roll();
    }
}

impl Iterator for Iter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        self.roll();
        let (base, cursor) = self.cur.as_mut()?;
        cursor.next().map(|low| *base | low as u64)
    }
}

impl FusedIterator for Iter<'_> {}

/// A descending iterator over the values of a [`VastBitmap`].
///
/// Created by [`VastBitmap::rev_iter`] and [`VastBitmap::rev_iter_from`].
#[derive(Clone)]
pub struct RevIter<'a> {
    tree: &'a Art<Container>,
    leaves: art::RevIter<'a, Container>,
    cur: Option<(u64, RevCursor<'a>)>,
}

impl<'a> RevIter<'a> {
    pub(crate) fn new(bitmap: &'a VastBitmap) -> Self {
        let mut iter = Self {
            tree: &bitmap.index,
            leaves: bitmap.index.rev_iter(),
            cur: None,
        };
        iter.roll();
        iter
    }

    pub(crate) fn new_from(bitmap: &'a VastBitmap, max: u64) -> Self {
        let mut iter = Self {
            tree: &bitmap.index,
            leaves: bitmap.index.rev_iter_from(&key::high_key(max)),
            cur: None,
        };
        iter.roll();
        iter.seek(max);
        iter
    }

    fn roll(&mut self) {
        loop {
            if let Some((_, cursor)) = &self.cur {
                if cursor.peek().is_some() {
                    return;
                }
            }
            match self.leaves.next() {
                Some((high, container)) => {
                    self.cur = Some((key::bits_from_key(high) << 16, container.rev_cursor()));
                }
                None => {
                    self.cur = None;
                    return;
                }
            }
        }
    }

    /// The next (largest remaining) value without advancing the iterator.
    pub fn peek(&mut self) -> Option<u64> {
        self.roll();
        let (base, cursor) = self.cur.as_ref()?;
        cursor.peek().map(|low| base | low as u64)
    }

    /// Retreats to the last value ≤ `max`. Never moves forward.
    pub fn seek(&mut self, max: u64) {
        match self.peek() {
            None => return,
            Some(value) if value <= max => return,
            Some(_) => {}
        }
        let target_base = max & !0xFFFF;
        if let Some((base, cursor)) = self.cur.as_mut() {
            if *base == target_base {
                cursor.seek(key::low(max));
                self.roll();
                return;
            }
        }
        self.leaves = self.tree.rev_iter_from(&key::high_key(max));
        self.cur = None;
        self.roll();
        if let Some((base, cursor)) = self.cur.as_mut() {
            if *base == target_base {
                cursor.seek(key::low(max));
            }
        }
        self.roll();
    }
}

impl Iterator for RevIter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        self.roll();
        let (base, cursor) = self.cur.as_mut()?;
        cursor.next().map(|low| *base | low as u64)
    }
}

impl FusedIterator for RevIter<'_> {}

impl<'a> IntoIterator for &'a VastBitmap {
    type IntoIter = Iter<'a>;
    type Item = u64;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<u64> for VastBitmap {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        let mut bitmap = Self::new();
        bitmap.extend(iter);
        bitmap
    }
}

impl Extend<u64> for VastBitmap {
    fn extend<I: IntoIterator<Item = u64>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}
