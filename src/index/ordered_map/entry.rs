//! Tree entries and the local transformations that rebalance them.

/// An owned, possibly empty child link.
pub(crate) type Link = Option<Box<OrderedEntry>>;

/// Color of the link from an entry's parent to the entry.
///
/// Uses `#[repr(u8)]` so the discriminant is the on-disk color byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black = 0,
    Red = 1,
}

impl Color {
    /// Convert from the on-disk byte, returning `None` for unknown values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Color::Black),
            1 => Some(Color::Red),
            _ => None,
        }
    }

    #[inline]
    fn flip(self) -> Self {
        match self {
            Color::Black => Color::Red,
            Color::Red => Color::Black,
        }
    }
}

/// One key-value pair of an [`OrderedMap`](super::OrderedMap).
///
/// Children are exclusively owned; there are no parent links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedEntry {
    pub(crate) key: i32,
    pub(crate) value: i32,
    /// Entries in the subtree rooted here, including this one.
    pub(crate) size: i32,
    pub(crate) color: Color,
    pub(crate) left: Link,
    pub(crate) right: Link,
}

impl OrderedEntry {
    /// A fresh red leaf entry.
    pub(crate) fn new(key: i32, value: i32) -> Self {
        Self {
            key,
            value,
            size: 1,
            color: Color::Red,
            left: None,
            right: None,
        }
    }

    #[inline]
    pub fn key(&self) -> i32 {
        self.key
    }

    #[inline]
    pub fn value(&self) -> i32 {
        self.value
    }

    #[inline]
    pub fn size(&self) -> i32 {
        self.size
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    pub fn left(&self) -> Option<&OrderedEntry> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&OrderedEntry> {
        self.right.as_deref()
    }
}

#[inline]
pub(crate) fn is_red(link: &Link) -> bool {
    matches!(link, Some(entry) if entry.color == Color::Red)
}

#[inline]
pub(crate) fn size(link: &Link) -> i32 {
    link.as_ref().map_or(0, |entry| entry.size)
}

#[inline]
fn is_red_left_left(h: &OrderedEntry) -> bool {
    h.left.as_ref().is_some_and(|l| is_red(&l.left))
}

#[inline]
fn is_red_right_left(h: &OrderedEntry) -> bool {
    h.right.as_ref().is_some_and(|r| is_red(&r.left))
}

#[inline]
fn resize(h: &mut OrderedEntry) {
    h.size = 1 + size(&h.left) + size(&h.right);
}

pub(crate) fn rotate_left(mut h: Box<OrderedEntry>) -> Box<OrderedEntry> {
    let Some(mut x) = h.right.take() else {
        return h;
    };
    h.right = x.left.take();
    x.color = h.color;
    h.color = Color::Red;
    x.size = h.size;
    resize(&mut h);
    x.left = Some(h);
    x
}

pub(crate) fn rotate_right(mut h: Box<OrderedEntry>) -> Box<OrderedEntry> {
    let Some(mut x) = h.left.take() else {
        return h;
    };
    h.left = x.right.take();
    x.color = h.color;
    h.color = Color::Red;
    x.size = h.size;
    resize(&mut h);
    x.right = Some(h);
    x
}

/// Invert the colors of `h` and both of its children, each independently.
pub(crate) fn flip_colors(h: &mut OrderedEntry) {
    h.color = h.color.flip();
    if let Some(left) = h.left.as_mut() {
        left.color = left.color.flip();
    }
    if let Some(right) = h.right.as_mut() {
        right.color = right.color.flip();
    }
}

/// Restore the left-leaning invariants at `h` and recompute its size.
///
/// Applied in this order at every entry on the way back up from an insert
/// or delete.
pub(crate) fn balance(mut h: Box<OrderedEntry>) -> Box<OrderedEntry> {
    if is_red(&h.right) && !is_red(&h.left) {
        h = rotate_left(h);
    }
    if is_red(&h.left) && is_red_left_left(&h) {
        h = rotate_right(h);
    }
    if is_red(&h.left) && is_red(&h.right) {
        flip_colors(&mut h);
    }
    resize(&mut h);
    h
}

/// Assuming `h` is red and both `h.left` and `h.left.left` are black, make
/// `h.left` or one of its children red.
pub(crate) fn move_red_left(mut h: Box<OrderedEntry>) -> Box<OrderedEntry> {
    flip_colors(&mut h);
    if is_red_right_left(&h) {
        h.right = h.right.take().map(rotate_right);
        h = rotate_left(h);
        flip_colors(&mut h);
    }
    h
}

/// Assuming `h` is red and both `h.right` and `h.right.left` are black, make
/// `h.right` or one of its children red.
pub(crate) fn move_red_right(mut h: Box<OrderedEntry>) -> Box<OrderedEntry> {
    flip_colors(&mut h);
    if is_red_left_left(&h) {
        h = rotate_right(h);
        flip_colors(&mut h);
    }
    h
}

pub(crate) fn needs_move_red_left(h: &OrderedEntry) -> bool {
    !is_red(&h.left) && !is_red_left_left(h)
}

pub(crate) fn needs_move_red_right(h: &OrderedEntry) -> bool {
    !is_red(&h.right) && !is_red_right_left(h)
}
