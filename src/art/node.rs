//! Node shapes for the adaptive radix tree.
//!
//! Four inner-node layouts trade fan-out for footprint:
//!
//! - `Node4`: sorted keys, up to 4 children;
//! - `Node16`: sorted keys, binary search, up to 16 children;
//! - `Node48`: a 256-entry byte→slot table plus a dense child vector;
//! - `Node256`: children addressed directly by byte.
//!
//! Nodes grow when a 5th/17th/49th child arrives and shrink back at
//! 3/12/37 children, the gap providing hysteresis against oscillation.
//! Leaves carry the full key, which makes prefix splits and collapses
//! cheap to verify.

use crate::key::{HighKey, KEY_BYTES};

/// Slot marker for absent entries in a `Node48` child index.
const EMPTY: u8 = 0xFF;

/// A compressed path segment stored inline in an inner node.
#[derive(Clone, Copy, Default, Debug)]
pub(crate) struct Prefix {
    len: u8,
    bytes: [u8; KEY_BYTES],
}

impl Prefix {
    pub(crate) fn from_slice(slice: &[u8]) -> Self {
        debug_assert!(slice.len() <= KEY_BYTES);
        let mut bytes = [0; KEY_BYTES];
        bytes[..slice.len()].copy_from_slice(slice);
        Self {
            len: slice.len() as u8,
            bytes,
        }
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len as usize
    }
}

/// A node in the adaptive radix tree.
#[derive(Clone)]
pub(crate) enum Node<V> {
    /// A terminal entry carrying its full key.
    Leaf { key: HighKey, value: V },

    /// Up to 4 children behind sorted key bytes.
    Node4 {
        prefix: Prefix,
        keys: [u8; 4],
        children: Vec<Box<Node<V>>>,
    },

    /// 5 to 16 children behind sorted key bytes.
    Node16 {
        prefix: Prefix,
        keys: [u8; 16],
        children: Vec<Box<Node<V>>>,
    },

    /// 17 to 48 children; a byte-indexed table maps to dense slots.
    Node48 {
        prefix: Prefix,
        child_index: Box<[u8; 256]>,
        children: Vec<Box<Node<V>>>,
    },

    /// 49 to 256 children, addressed directly.
    Node256 {
        prefix: Prefix,
        children: Box<[Option<Box<Node<V>>>; 256]>,
        len: u16,
    },
}

/// Child lookup in a sorted-key node.
fn find_sorted<'a, V>(keys: &[u8], children: &'a [Box<Node<V>>], byte: u8) -> Option<&'a Node<V>> {
    keys.binary_search(&byte).ok().map(|i| &*children[i])
}

fn find_sorted_mut<'a, V>(
    keys: &[u8],
    children: &'a mut [Box<Node<V>>],
    byte: u8,
) -> Option<&'a mut Box<Node<V>>> {
    keys.binary_search(&byte).ok().map(move |i| &mut children[i])
}

/// Sorted insertion of a new key byte and its child.
fn insert_sorted<V>(
    keys: &mut [u8],
    children: &mut Vec<Box<Node<V>>>,
    byte: u8,
    child: Box<Node<V>>,
) {
    let len = children.len();
    let at = keys[..len].partition_point(|&k| k < byte);
    for j in (at..len).rev() {
        keys[j + 1] = keys[j];
    }
    keys[at] = byte;
    children.insert(at, child);
}

fn remove_sorted<V>(keys: &mut [u8], children: &mut Vec<Box<Node<V>>>, byte: u8) -> Box<Node<V>> {
    let len = children.len();
    let at = keys[..len]
        .binary_search(&byte)
        .expect("removing an absent child");
    keys.copy_within(at + 1..len, at);
    children.remove(at)
}

/// Forward seek in a sorted-key node: position past `byte`, plus the exact
/// child when present.
fn seek_sorted<'a, V>(
    keys: &[u8],
    children: &'a [Box<Node<V>>],
    byte: u8,
) -> (i32, Option<&'a Node<V>>) {
    match keys.binary_search(&byte) {
        Ok(i) => (i as i32 + 1, Some(&*children[i])),
        Err(i) => (i as i32, None),
    }
}

/// Reverse seek in a sorted-key node: position before `byte`, plus the
/// exact child when present.
fn seek_sorted_rev<'a, V>(
    keys: &[u8],
    children: &'a [Box<Node<V>>],
    byte: u8,
) -> (i32, Option<&'a Node<V>>) {
    match keys.binary_search(&byte) {
        Ok(i) => (i as i32 - 1, Some(&*children[i])),
        Err(i) => (i as i32 - 1, None),
    }
}

impl<V> Node<V> {
    pub(crate) fn new_leaf(key: HighKey, value: V) -> Box<Self> {
        Box::new(Node::Leaf { key, value })
    }

    pub(crate) fn new_node4(prefix: Prefix) -> Self {
        Node::Node4 {
            prefix,
            keys: [0; 4],
            children: Vec::with_capacity(4),
        }
    }

    fn new_node16(prefix: Prefix) -> Self {
        Node::Node16 {
            prefix,
            keys: [0; 16],
            children: Vec::with_capacity(16),
        }
    }

    fn new_node48(prefix: Prefix) -> Self {
        Node::Node48 {
            prefix,
            child_index: Box::new([EMPTY; 256]),
            children: Vec::with_capacity(48),
        }
    }

    fn new_node256(prefix: Prefix) -> Self {
        Node::Node256 {
            prefix,
            children: Box::new(std::array::from_fn(|_| None)),
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    pub(crate) fn prefix(&self) -> &[u8] {
        match self {
            Node::Leaf { .. } => &[],
            Node::Node4 { prefix, .. }
            | Node::Node16 { prefix, .. }
            | Node::Node48 { prefix, .. }
            | Node::Node256 { prefix, .. } => prefix.as_slice(),
        }
    }

    #[inline]
    pub(crate) fn prefix_len(&self) -> usize {
        self.prefix().len()
    }

    pub(crate) fn set_prefix(&mut self, new: Prefix) {
        match self {
            Node::Leaf { .. } => {}
            Node::Node4 { prefix, .. }
            | Node::Node16 { prefix, .. }
            | Node::Node48 { prefix, .. }
            | Node::Node256 { prefix, .. } => *prefix = new,
        }
    }

    /// Replaces the prefix with `lead ++ [byte] ++ current`, used when a
    /// single-child node collapses into its child.
    pub(crate) fn prepend_prefix(&mut self, lead: &[u8], byte: u8) {
        let mut merged = Vec::with_capacity(lead.len() + 1 + self.prefix_len());
        merged.extend_from_slice(lead);
        merged.push(byte);
        merged.extend_from_slice(self.prefix());
        self.set_prefix(Prefix::from_slice(&merged));
    }

    pub(crate) fn child_count(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Node4 { children, .. }
            | Node::Node16 { children, .. }
            | Node::Node48 { children, .. } => children.len(),
            Node::Node256 { len, .. } => *len as usize,
        }
    }

    fn is_full(&self) -> bool {
        match self {
            Node::Leaf { .. } => true,
            Node::Node4 { children, .. } => children.len() == 4,
            Node::Node16 { children, .. } => children.len() == 16,
            Node::Node48 { children, .. } => children.len() == 48,
            Node::Node256 { .. } => false,
        }
    }

    pub(crate) fn find_child(&self, byte: u8) -> Option<&Node<V>> {
        match self {
            Node::Leaf { .. } => None,
            Node::Node4 { keys, children, .. } => {
                find_sorted(&keys[..children.len()], children, byte)
            }
            Node::Node16 { keys, children, .. } => {
                find_sorted(&keys[..children.len()], children, byte)
            }
            Node::Node48 {
                child_index,
                children,
                ..
            } => {
                let slot = child_index[byte as usize];
                (slot != EMPTY).then(|| &*children[slot as usize])
            }
            Node::Node256 { children, .. } => children[byte as usize].as_deref(),
        }
    }

    pub(crate) fn find_child_mut(&mut self, byte: u8) -> Option<&mut Box<Node<V>>> {
        match self {
            Node::Leaf { .. } => None,
            Node::Node4 { keys, children, .. } => {
                let len = children.len();
                find_sorted_mut(&keys[..len], children, byte)
            }
            Node::Node16 { keys, children, .. } => {
                let len = children.len();
                find_sorted_mut(&keys[..len], children, byte)
            }
            Node::Node48 {
                child_index,
                children,
                ..
            } => {
                let slot = child_index[byte as usize];
                if slot == EMPTY {
                    None
                } else {
                    Some(&mut children[slot as usize])
                }
            }
            Node::Node256 { children, .. } => children[byte as usize].as_mut(),
        }
    }

    /// Adds a child under a byte not already present; the node must not be
    /// full. `Node4`/`Node16` keep their key bytes sorted.
    pub(crate) fn add_child(&mut self, byte: u8, child: Box<Node<V>>) {
        debug_assert!(!self.is_full());
        debug_assert!(self.find_child(byte).is_none());
        match self {
            Node::Leaf { .. } => unreachable!("leaves have no children"),
            Node::Node4 { keys, children, .. } => insert_sorted(keys, children, byte, child),
            Node::Node16 { keys, children, .. } => insert_sorted(keys, children, byte, child),
            Node::Node48 {
                child_index,
                children,
                ..
            } => {
                child_index[byte as usize] = children.len() as u8;
                children.push(child);
            }
            Node::Node256 { children, len, .. } => {
                children[byte as usize] = Some(child);
                *len += 1;
            }
        }
    }

    /// Adds a child, growing to the next shape first when full.
    pub(crate) fn add_child_grow(&mut self, byte: u8, child: Box<Node<V>>) {
        if self.is_full() {
            self.grow();
        }
        self.add_child(byte, child);
    }

    fn grow(&mut self) {
        let old = std::mem::replace(self, Node::new_node4(Prefix::default()));
        *self = match old {
            Node::Node4 {
                prefix,
                keys,
                children,
            } => {
                let mut grown = Node::new_node16(prefix);
                if let Node::Node16 {
                    keys: new_keys,
                    children: new_children,
                    ..
                } = &mut grown
                {
                    new_keys[..children.len()].copy_from_slice(&keys[..children.len()]);
                    new_children.extend(children);
                }
                grown
            }
            Node::Node16 {
                prefix,
                keys,
                children,
            } => {
                let mut grown = Node::new_node48(prefix);
                if let Node::Node48 {
                    child_index,
                    children: new_children,
                    ..
                } = &mut grown
                {
                    for (slot, &key) in keys[..children.len()].iter().enumerate() {
                        child_index[key as usize] = slot as u8;
                    }
                    new_children.extend(children);
                }
                grown
            }
            Node::Node48 {
                prefix,
                child_index,
                mut children,
            } => {
                let mut grown = Node::new_node256(prefix);
                if let Node::Node256 {
                    children: new_children,
                    len,
                    ..
                } = &mut grown
                {
                    let count = children.len();
                    let mut slots: Vec<Option<Box<Node<V>>>> =
                        children.drain(..).map(Some).collect();
                    for (byte, &slot) in child_index.iter().enumerate() {
                        if slot != EMPTY {
                            new_children[byte] = slots[slot as usize].take();
                        }
                    }
                    *len = count as u16;
                }
                grown
            }
            other => other,
        };
    }

    /// Removes and returns the child under `byte`, which must exist.
    pub(crate) fn remove_child(&mut self, byte: u8) -> Box<Node<V>> {
        match self {
            Node::Node4 { keys, children, .. } => remove_sorted(keys, children, byte),
            Node::Node16 { keys, children, .. } => remove_sorted(keys, children, byte),
            Node::Node48 {
                child_index,
                children,
                ..
            } => {
                let slot = child_index[byte as usize];
                debug_assert!(slot != EMPTY);
                child_index[byte as usize] = EMPTY;
                let removed = children.swap_remove(slot as usize);
                // The former last slot moved into the vacated position.
                let moved_from = children.len() as u8;
                if slot != moved_from {
                    for entry in child_index.iter_mut() {
                        if *entry == moved_from {
                            *entry = slot;
                            break;
                        }
                    }
                }
                removed
            }
            Node::Node256 { children, len, .. } => {
                *len -= 1;
                children[byte as usize]
                    .take()
                    .expect("removing an absent child")
            }
            Node::Leaf { .. } => unreachable!("leaves have no children"),
        }
    }

    /// Applies the downward shape transitions after a removal.
    pub(crate) fn maybe_shrink(&mut self) {
        let count = self.child_count();
        let shrink = match self {
            Node::Node16 { .. } => count <= 3,
            Node::Node48 { .. } => count <= 12,
            Node::Node256 { .. } => count <= 37,
            _ => false,
        };
        if !shrink {
            return;
        }
        let old = std::mem::replace(self, Node::new_node4(Prefix::default()));
        *self = match old {
            Node::Node16 {
                prefix,
                keys,
                children,
            } => {
                let mut shrunk = Node::new_node4(prefix);
                for (key, child) in keys.into_iter().zip(children) {
                    shrunk.add_child(key, child);
                }
                shrunk
            }
            Node::Node48 {
                prefix,
                child_index,
                mut children,
            } => {
                let mut shrunk = Node::new_node16(prefix);
                let mut slots: Vec<Option<Box<Node<V>>>> = children.drain(..).map(Some).collect();
                for (byte, &slot) in child_index.iter().enumerate() {
                    if slot != EMPTY {
                        let child = slots[slot as usize].take().expect("occupied slot");
                        shrunk.add_child(byte as u8, child);
                    }
                }
                shrunk
            }
            Node::Node256 {
                prefix,
                mut children,
                ..
            } => {
                let mut shrunk = Node::new_node48(prefix);
                for (byte, slot) in children.iter_mut().enumerate() {
                    if let Some(child) = slot.take() {
                        shrunk.add_child(byte as u8, child);
                    }
                }
                shrunk
            }
            other => other,
        };
    }

    /// Removes and returns the only child; the node must have exactly one.
    pub(crate) fn take_single_child(&mut self) -> (u8, Box<Node<V>>) {
        debug_assert_eq!(self.child_count(), 1);
        let byte = match self {
            Node::Node4 { keys, .. } => keys[0],
            Node::Node16 { keys, .. } => keys[0],
            Node::Node48 { child_index, .. } => child_index
                .iter()
                .position(|&s| s != EMPTY)
                .expect("single child present") as u8,
            Node::Node256 { children, .. } => children
                .iter()
                .position(Option::is_some)
                .expect("single child present") as u8,
            Node::Leaf { .. } => unreachable!("leaves have no children"),
        };
        (byte, self.remove_child(byte))
    }

    /// First child at a position ≥ `pos`, with its position. Positions are
    /// child indices for `Node4`/`Node16` and byte values for the rest.
    pub(crate) fn child_from(&self, pos: i32) -> Option<(i32, &Node<V>)> {
        match self {
            Node::Leaf { .. } => None,
            Node::Node4 { children, .. } | Node::Node16 { children, .. } => {
                let at = pos.max(0);
                children.get(at as usize).map(|c| (at, &**c))
            }
            Node::Node48 {
                child_index,
                children,
                ..
            } => (pos.max(0)..256).find_map(|b| {
                let slot = child_index[b as usize];
                (slot != EMPTY).then(|| (b, &*children[slot as usize]))
            }),
            Node::Node256 { children, .. } => {
                (pos.max(0)..256).find_map(|b| children[b as usize].as_deref().map(|c| (b, c)))
            }
        }
    }

    /// Mutable variant of [`Node::child_from`].
    pub(crate) fn child_from_mut(&mut self, pos: i32) -> Option<(i32, &mut Node<V>)> {
        match self {
            Node::Leaf { .. } => None,
            Node::Node4 { children, .. } | Node::Node16 { children, .. } => {
                let at = pos.max(0);
                children.get_mut(at as usize).map(|c| (at, &mut **c))
            }
            Node::Node48 {
                child_index,
                children,
                ..
            } => {
                for b in pos.max(0)..256 {
                    let slot = child_index[b as usize];
                    if slot != EMPTY {
                        return Some((b, &mut *children[slot as usize]));
                    }
                }
                None
            }
            Node::Node256 { children, .. } => {
                for b in pos.max(0)..256 {
                    if children[b as usize].is_some() {
                        return children[b as usize].as_deref_mut().map(|c| (b, c));
                    }
                }
                None
            }
        }
    }

    /// Last child at a position ≤ `pos`, with its position.
    pub(crate) fn child_till(&self, pos: i32) -> Option<(i32, &Node<V>)> {
        if pos < 0 {
            return None;
        }
        match self {
            Node::Leaf { .. } => None,
            Node::Node4 { children, .. } | Node::Node16 { children, .. } => {
                let last = (pos as usize).min(children.len().wrapping_sub(1));
                children.get(last).map(|c| (last as i32, &**c))
            }
            Node::Node48 {
                child_index,
                children,
                ..
            } => (0..=pos.min(255)).rev().find_map(|b| {
                let slot = child_index[b as usize];
                (slot != EMPTY).then(|| (b, &*children[slot as usize]))
            }),
            Node::Node256 { children, .. } => (0..=pos.min(255))
                .rev()
                .find_map(|b| children[b as usize].as_deref().map(|c| (b, c))),
        }
    }

    /// Position just past `byte` plus the exact child under it, for forward
    /// seeks: traversal resumed at the returned position skips everything
    /// at or below `byte`.
    pub(crate) fn seek_child(&self, byte: u8) -> (i32, Option<&Node<V>>) {
        match self {
            Node::Leaf { .. } => (0, None),
            Node::Node4 { keys, children, .. } => {
                seek_sorted(&keys[..children.len()], children, byte)
            }
            Node::Node16 { keys, children, .. } => {
                seek_sorted(&keys[..children.len()], children, byte)
            }
            Node::Node48 { .. } | Node::Node256 { .. } => {
                (byte as i32 + 1, self.find_child(byte))
            }
        }
    }

    /// Position just before `byte` plus the exact child under it, for
    /// reverse seeks.
    pub(crate) fn seek_child_rev(&self, byte: u8) -> (i32, Option<&Node<V>>) {
        match self {
            Node::Leaf { .. } => (-1, None),
            Node::Node4 { keys, children, .. } => {
                seek_sorted_rev(&keys[..children.len()], children, byte)
            }
            Node::Node16 { keys, children, .. } => {
                seek_sorted_rev(&keys[..children.len()], children, byte)
            }
            Node::Node48 { .. } | Node::Node256 { .. } => {
                (byte as i32 - 1, self.find_child(byte))
            }
        }
    }

    /// Starting position for a full reverse sweep of this node.
    pub(crate) fn last_pos(&self) -> i32 {
        match self {
            Node::Leaf { .. } => -1,
            Node::Node4 { children, .. } | Node::Node16 { children, .. } => {
                children.len() as i32 - 1
            }
            Node::Node48 { .. } | Node::Node256 { .. } => 255,
        }
    }
}
