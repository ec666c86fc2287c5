//! Range Scanner - ordered iteration across the leaf chain.

use std::iter::FusedIterator;
use std::vec;

use crate::common::{Error, Offset, Result};
use crate::storage::{BatchStore, ValueLog};

use super::node::BTreeNode;

/// Lazy, forward-only iterator over `(key, value)` for `low <= key <= high`.
///
/// Entries of the current leaf are taken in order; when they run out the
/// scan follows `next_leaf` to the next page. It stops at the first key
/// above `high` or at the end of the chain.
///
/// Each item is a `Result`: a page or value that fails to decode is yielded
/// as an error, after which the scan ends.
///
/// # Example
/// ```no_run
/// use batchtree::BTree;
///
/// let tree = BTree::open("range.idx", 5).unwrap();
/// for item in tree.get_in_range(5, 12).unwrap() {
///     let (key, value) = item.unwrap();
///     println!("{} => {:?}", key, value);
/// }
/// ```
pub struct RangeScan<'a> {
    index: &'a BatchStore,
    values: &'a ValueLog,
    entries: vec::IntoIter<(i32, i32)>,
    next_leaf: Offset,
    high: i32,
    done: bool,
}

impl<'a> RangeScan<'a> {
    /// Start a scan at `leaf`, skipping its entries below `low`.
    pub(crate) fn new(
        leaf: &BTreeNode,
        low: i32,
        high: i32,
        index: &'a BatchStore,
        values: &'a ValueLog,
    ) -> Self {
        let entries: Vec<(i32, i32)> = leaf.map.iter().skip_while(|&(k, _)| k < low).collect();
        Self {
            index,
            values,
            entries: entries.into_iter(),
            next_leaf: leaf.next_leaf,
            high,
            done: low > high,
        }
    }

    fn fail(&mut self, err: Error) -> Option<Result<(i32, Vec<u8>)>> {
        self.done = true;
        Some(Err(err))
    }
}

impl Iterator for RangeScan<'_> {
    type Item = Result<(i32, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if let Some((key, value)) = self.entries.next() {
                if key > self.high {
                    self.done = true;
                    return None;
                }
                return match self.values.resolve(value) {
                    Ok(bytes) => Some(Ok((key, bytes))),
                    Err(e) => self.fail(e),
                };
            }

            if !self.next_leaf.is_valid() {
                self.done = true;
                return None;
            }

            let leaf = match BTreeNode::read_from(self.index, self.next_leaf) {
                Ok(leaf) if leaf.is_leaf => leaf,
                Ok(page) => {
                    return self.fail(Error::format(format!(
                        "leaf chain reaches internal page at {}",
                        page.self_position
                    )))
                }
                Err(e) => return self.fail(e),
            };

            self.entries = leaf.map.iter().collect::<Vec<_>>().into_iter();
            self.next_leaf = leaf.next_leaf;
        }
    }
}

impl FusedIterator for RangeScan<'_> {}
