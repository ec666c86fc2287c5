//! Ordered Map Engine - a left-leaning red-black tree of `i32 -> i32`.
//!
//! Each B-tree page keeps its entries in one [`OrderedMap`]. For a leaf page
//! the value is an offset into the value log; for an internal page it is the
//! offset of a child page.
//!
//! The map also defines its own byte format (see [`codec`]), which is what
//! ends up inside a page on disk.
//!
//! # Example
//! ```
//! use batchtree::index::ordered_map::OrderedMap;
//!
//! let mut map = OrderedMap::new();
//! map.put(10, 100);
//! map.put(20, 200);
//!
//! assert_eq!(map.get(10), Some(100));
//! assert_eq!(map.predecessor_or_self(15), Some(100));
//! assert_eq!(map.predecessor_or_self(5), None);
//! ```

pub mod codec;
mod entry;

use std::cmp::Ordering;
use std::collections::VecDeque;

pub use entry::{Color, OrderedEntry};

use entry::{
    balance, is_red, move_red_left, move_red_right, needs_move_red_left, needs_move_red_right,
    rotate_right, size, Link,
};

/// Balanced in-memory ordered map.
///
/// Two maps compare equal only if they have the same shape, colors and
/// subtree sizes, not merely the same content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedMap {
    root: Link,
}

impl OrderedMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Number of entries (the root's subtree size).
    #[inline]
    pub fn len(&self) -> usize {
        size(&self.root) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// The root entry, if any.
    pub fn root(&self) -> Option<&OrderedEntry> {
        self.root.as_deref()
    }

    /// Insert or update `key`.
    pub fn put(&mut self, key: i32, value: i32) {
        let mut root = put_at(self.root.take(), key, value);
        root.color = Color::Black;
        self.root = Some(root);
    }

    /// Look up `key`.
    pub fn get(&self, key: i32) -> Option<i32> {
        let mut current = self.root.as_deref();
        while let Some(entry) = current {
            match key.cmp(&entry.key) {
                Ordering::Less => current = entry.left.as_deref(),
                Ordering::Greater => current = entry.right.as_deref(),
                Ordering::Equal => return Some(entry.value),
            }
        }
        None
    }

    pub fn contains_key(&self, key: i32) -> bool {
        self.get(key).is_some()
    }

    /// Value of the entry with the greatest key `<= key`.
    ///
    /// This is how an internal page routes a key to a child.
    pub fn predecessor_or_self(&self, key: i32) -> Option<i32> {
        floor_at(&self.root, key).map(|entry| entry.value)
    }

    /// Remove `key`. Returns `true` if it was present.
    pub fn delete(&mut self, key: i32) -> bool {
        if !self.contains_key(key) {
            return false;
        }
        let Some(mut root) = self.root.take() else {
            return false;
        };

        if !is_red(&root.left) && !is_red(&root.right) {
            root.color = Color::Red;
        }
        self.root = delete_at(root, key);
        if let Some(root) = self.root.as_mut() {
            root.color = Color::Black;
        }
        true
    }

    /// Entry with the smallest key.
    pub fn min(&self) -> Option<(i32, i32)> {
        let mut entry = self.root.as_deref()?;
        while let Some(left) = entry.left.as_deref() {
            entry = left;
        }
        Some((entry.key, entry.value))
    }

    /// Entry with the largest key.
    pub fn max(&self) -> Option<(i32, i32)> {
        let mut entry = self.root.as_deref()?;
        while let Some(right) = entry.right.as_deref() {
            entry = right;
        }
        Some((entry.key, entry.value))
    }

    /// Lazy in-order iterator over `(key, value)` pairs.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self.root.as_deref())
    }

    /// Append every entry with `low <= key <= high` to `queue`, in key order.
    pub fn range_into(&self, low: i32, high: i32, queue: &mut VecDeque<(i32, i32)>) {
        range_at(&self.root, low, high, queue);
    }

    /// Entries with `low <= key <= high`, in key order.
    pub fn range(&self, low: i32, high: i32) -> VecDeque<(i32, i32)> {
        let mut queue = VecDeque::new();
        self.range_into(low, high, &mut queue);
        queue
    }
}

impl FromIterator<(i32, i32)> for OrderedMap {
    fn from_iter<I: IntoIterator<Item = (i32, i32)>>(iter: I) -> Self {
        let mut map = OrderedMap::new();
        for (key, value) in iter {
            map.put(key, value);
        }
        map
    }
}

impl<'a> IntoIterator for &'a OrderedMap {
    type Item = (i32, i32);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

// ============================================================================
// Recursive helpers
// ============================================================================

fn put_at(link: Link, key: i32, value: i32) -> Box<OrderedEntry> {
    let Some(mut h) = link else {
        return Box::new(OrderedEntry::new(key, value));
    };

    match key.cmp(&h.key) {
        Ordering::Less => h.left = Some(put_at(h.left.take(), key, value)),
        Ordering::Greater => h.right = Some(put_at(h.right.take(), key, value)),
        Ordering::Equal => h.value = value,
    }

    balance(h)
}

fn floor_at(link: &Link, key: i32) -> Option<&OrderedEntry> {
    let entry = link.as_deref()?;
    match key.cmp(&entry.key) {
        Ordering::Equal => Some(entry),
        Ordering::Less => floor_at(&entry.left, key),
        Ordering::Greater => floor_at(&entry.right, key).or(Some(entry)),
    }
}

fn range_at(link: &Link, low: i32, high: i32, queue: &mut VecDeque<(i32, i32)>) {
    let Some(entry) = link.as_deref() else {
        return;
    };
    if entry.key > low {
        range_at(&entry.left, low, high, queue);
    }
    if low <= entry.key && entry.key <= high {
        queue.push_back((entry.key, entry.value));
    }
    if entry.key < high {
        range_at(&entry.right, low, high, queue);
    }
}

fn delete_at(mut h: Box<OrderedEntry>, key: i32) -> Link {
    if key < h.key {
        if needs_move_red_left(&h) {
            h = move_red_left(h);
        }
        h.left = h.left.take().and_then(|left| delete_at(left, key));
    } else {
        if is_red(&h.left) {
            h = rotate_right(h);
        }
        if key == h.key && h.right.is_none() {
            return None;
        }
        if needs_move_red_right(&h) {
            h = move_red_right(h);
        }
        if key == h.key {
            if let Some(right) = h.right.take() {
                let (min_key, min_value) = min_of(&right);
                h.key = min_key;
                h.value = min_value;
                h.right = delete_min_at(right);
            }
        } else {
            h.right = h.right.take().and_then(|right| delete_at(right, key));
        }
    }
    Some(balance(h))
}

fn delete_min_at(mut h: Box<OrderedEntry>) -> Link {
    if h.left.is_none() {
        return None;
    }
    if needs_move_red_left(&h) {
        h = move_red_left(h);
    }
    h.left = h.left.take().and_then(delete_min_at);
    Some(balance(h))
}

fn min_of(entry: &OrderedEntry) -> (i32, i32) {
    let mut entry = entry;
    while let Some(left) = entry.left.as_deref() {
        entry = left;
    }
    (entry.key, entry.value)
}

// ============================================================================
// Iterator
// ============================================================================

/// In-order iterator over an [`OrderedMap`].
///
/// Holds at most one stack entry per tree level.
pub struct Iter<'a> {
    stack: Vec<&'a OrderedEntry>,
    remaining: usize,
}

impl<'a> Iter<'a> {
    fn new(root: Option<&'a OrderedEntry>) -> Self {
        let mut iter = Self {
            stack: Vec::new(),
            remaining: root.map_or(0, |r| r.size as usize),
        };
        iter.push_left(root);
        iter
    }

    fn push_left(&mut self, mut current: Option<&'a OrderedEntry>) {
        while let Some(entry) = current {
            self.stack.push(entry);
            current = entry.left.as_deref();
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<(i32, i32)> {
        let entry = self.stack.pop()?;
        self.push_left(entry.right.as_deref());
        self.remaining = self.remaining.saturating_sub(1);
        Some((entry.key, entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

// ============================================================================
// TESTS
// ============================================================================
