//! B-Tree Engine - descent, insertion, splitting and root growth.

use std::borrow::Cow;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::common::config::{
    self, FIRST_PAGE_OFFSET, MAX_NODE_CAPACITY, ROOT_CELL_SIZE, VALUE_FILE_SUFFIX,
};
use crate::common::{Error, Offset, Result};
use crate::storage::{BatchStore, ValueLog};

use super::node::{BTreeNode, MidKey, Split};
use super::range::RangeScan;
use super::stats::TreeStats;

/// A disk-resident B-tree mapping `i32` keys to byte strings.
///
/// # Files
/// ```text
/// <name>          index file: root cell (4 bytes) + fixed-size pages
/// <name>_values   value file: append-only (length, payload) records
/// ```
///
/// Pages are never freed. A split rewrites the lower half in place and
/// appends the upper half; superseded bytes simply stay in the file.
///
/// # Thread Safety
/// Single writer, single thread. Use [`SharedBTree`](super::SharedBTree)
/// to share a tree between threads.
///
/// # Example
/// ```no_run
/// use batchtree::BTree;
///
/// let mut tree = BTree::open("fruit.idx", 5).unwrap();
/// tree.put(1, b"apple").unwrap();
/// tree.put(2, b"ball").unwrap();
///
/// assert_eq!(tree.get(1).unwrap(), Some(b"apple".to_vec()));
/// assert_eq!(tree.get(3).unwrap(), None);
/// ```
pub struct BTree {
    /// Index file holding the root cell and all pages.
    index: BatchStore,
    /// Value file holding the payloads.
    values: ValueLog,
    /// In-memory copy of the current root page.
    root: BTreeNode,
    node_capacity: usize,
}

impl BTree {
    /// Open or create the tree stored at `path` (plus `path` + `"_values"`).
    ///
    /// A new tree gets an empty root leaf at offset 4, and the root cell is
    /// written immediately.
    ///
    /// # Errors
    /// - `Error::InvalidNodeCapacity` if `node_capacity` is 0 or too large
    /// - `Error::Format` if the existing index file does not match
    ///   `node_capacity` or is corrupt
    /// - I/O errors from opening or mapping either file
    pub fn open<P: AsRef<Path>>(path: P, node_capacity: usize) -> Result<Self> {
        if node_capacity == 0 || node_capacity > MAX_NODE_CAPACITY {
            return Err(Error::InvalidNodeCapacity(node_capacity));
        }

        let path = path.as_ref();
        let batch_size = config::batch_size(node_capacity);
        let mut index = BatchStore::open(path, batch_size)?;
        let values = ValueLog::open(value_path(path), batch_size)?;

        let root_cell = read_root_cell(&index);
        let fresh = root_cell.0 == 0;
        let root = if fresh {
            let root = BTreeNode::new_leaf(Offset::from_file_pos(FIRST_PAGE_OFFSET)?);
            index.write_batch_at(&root.encode(), FIRST_PAGE_OFFSET)?;
            write_root_cell(&mut index, root.self_position)?;
            root
        } else {
            if !root_cell.is_valid() {
                return Err(Error::format(format!("root cell holds {}", root_cell.0)));
            }
            let pages_len = index.len().saturating_sub(FIRST_PAGE_OFFSET);
            if pages_len % batch_size as u64 != 0 {
                return Err(Error::format(format!(
                    "index file of {} bytes is not a whole number of {}-byte batches",
                    index.len(),
                    batch_size
                )));
            }
            BTreeNode::read_from(&index, root_cell)?
        };

        tracing::info!(
            path = %path.display(),
            node_capacity,
            batch_size,
            root = %root.self_position,
            fresh,
            "opened btree"
        );

        Ok(Self {
            index,
            values,
            root,
            node_capacity,
        })
    }

    /// Open with [`DEFAULT_NODE_CAPACITY`](config::DEFAULT_NODE_CAPACITY).
    pub fn open_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(path, config::DEFAULT_NODE_CAPACITY)
    }

    // ========================================================================
    // Public API
    // ========================================================================

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// The value is appended to the value log first; the old record, if any,
    /// stays in the log unreferenced.
    pub fn put(&mut self, key: i32, value: &[u8]) -> Result<()> {
        let value_pos = self.values.append(value)?;
        let value_pos = i32::try_from(value_pos).map_err(|_| Error::OffsetOverflow(value_pos))?;

        // Descend to the leaf, keeping the internal pages passed on the way.
        let mut path = Vec::new();
        let mut node = self.root.clone();
        while !node.is_leaf {
            let child = node.route(key)?;
            path.push(node);
            self.check_depth(path.len() + 1)?;
            node = self.load(child)?;
        }

        // Insert at the leaf and carry each split up one level at a time.
        let (mut updated, mut mid) = self.insert_entry(node, key, value_pos)?;
        while let Some(split_key) = mid {
            match path.pop() {
                Some(parent) => {
                    (updated, mid) = self.insert_entry(parent, split_key.key, split_key.child.0)?;
                }
                None => return self.grow_root(updated, split_key),
            }
        }

        // Only a change that stopped at the root itself replaces the cached root.
        if path.is_empty() {
            self.root = updated;
        }
        Ok(())
    }

    /// Look up the value stored under `key`.
    pub fn get(&self, key: i32) -> Result<Option<Vec<u8>>> {
        let leaf = self.find_leaf(key)?;
        match leaf.map.get(key) {
            Some(value_pos) => Ok(Some(self.values.resolve(value_pos)?)),
            None => Ok(None),
        }
    }

    /// Check whether `key` is stored, without reading its value.
    pub fn contains_key(&self, key: i32) -> Result<bool> {
        Ok(self.find_leaf(key)?.map.contains_key(key))
    }

    /// Lazily iterate over all entries with `low <= key <= high`.
    ///
    /// An empty or inverted interval yields nothing.
    pub fn get_in_range(&self, low: i32, high: i32) -> Result<RangeScan<'_>> {
        let leaf = self.find_leaf(low)?;
        Ok(RangeScan::new(&leaf, low, high, &self.index, &self.values))
    }

    /// Force both mapped files to disk.
    pub fn flush(&self) -> Result<()> {
        self.index.flush()?;
        self.values.flush()
    }

    /// Flush and close the tree.
    pub fn close(self) -> Result<()> {
        self.flush()
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Position of the current root page.
    #[inline]
    pub fn root_position(&self) -> Offset {
        self.root.self_position
    }

    /// Maximum entries per page.
    #[inline]
    pub fn node_capacity(&self) -> usize {
        self.node_capacity
    }

    /// Width of one page in the index file.
    #[inline]
    pub fn batch_size(&self) -> usize {
        self.index.batch_size()
    }

    /// Number of levels from the root down to the leaves.
    pub fn height(&self) -> Result<usize> {
        let mut node = Cow::Borrowed(&self.root);
        let mut height = 1;
        while !node.is_leaf {
            let child = node.children().first().copied().ok_or_else(|| {
                Error::format(format!("internal page at {} has no children", node.self_position))
            })?;
            height += 1;
            self.check_depth(height)?;
            node = Cow::Owned(self.load(child)?);
        }
        Ok(height)
    }

    /// Walk every reachable page and summarize the tree's shape.
    pub fn stats(&self) -> Result<TreeStats> {
        let mut stats = TreeStats::default();
        let mut seen = HashSet::new();
        let mut stack = vec![(self.root.clone(), 1usize)];

        while let Some((node, depth)) = stack.pop() {
            if !seen.insert(node.self_position) {
                return Err(Error::format(format!(
                    "page at {} is reachable twice",
                    node.self_position
                )));
            }

            stats.height = stats.height.max(depth);
            stats.max_page_entries = stats.max_page_entries.max(node.map.len());
            if node.is_leaf {
                stats.leaf_pages += 1;
                stats.entries += node.map.len();
            } else {
                stats.internal_pages += 1;
                for child in node.children() {
                    stack.push((self.load(child)?, depth + 1));
                }
            }
        }

        Ok(stats)
    }

    // ========================================================================
    // Internal: insertion
    // ========================================================================

    /// Put one entry into `node`, splitting it if it overflows.
    fn insert_entry(
        &mut self,
        mut node: BTreeNode,
        key: i32,
        value: i32,
    ) -> Result<(BTreeNode, Option<MidKey>)> {
        node.map.put(key, value);
        if node.map.len() <= self.node_capacity {
            self.write_node(&node)?;
            return Ok((node, None));
        }

        // The sibling goes at the end of the file. If this page is the root,
        // its new parent will be the batch appended right after the sibling.
        let end = self.index.len();
        let sibling_position = Offset::from_file_pos(end)?;
        let parent_position = Offset::from_file_pos(end + self.index.batch_size() as u64)?;

        let Split { lower, upper, mid } = node.split(sibling_position, parent_position)?;

        self.index.write_batch(&upper.encode())?;
        self.write_node(&lower)?;

        tracing::debug!(
            page = %lower.self_position,
            sibling = %upper.self_position,
            mid_key = mid.key,
            leaf = lower.is_leaf,
            "split page"
        );

        Ok((lower, Some(mid)))
    }

    /// Put a new root above `old_root` and point the root cell at it.
    fn grow_root(&mut self, old_root: BTreeNode, mid: MidKey) -> Result<()> {
        let position = Offset::from_file_pos(self.index.len())?;
        let new_root = BTreeNode::new_root(old_root.self_position, position, mid);

        self.index.write_batch(&new_root.encode())?;
        write_root_cell(&mut self.index, position)?;

        tracing::debug!(
            old_root = %old_root.self_position,
            new_root = %position,
            mid_key = mid.key,
            "root grew"
        );

        self.root = new_root;
        Ok(())
    }

    // ========================================================================
    // Internal: page I/O
    // ========================================================================

    fn find_leaf(&self, key: i32) -> Result<Cow<'_, BTreeNode>> {
        let mut node = Cow::Borrowed(&self.root);
        let mut depth = 1;
        while !node.is_leaf {
            let child = node.route(key)?;
            depth += 1;
            self.check_depth(depth)?;
            node = Cow::Owned(self.load(child)?);
        }
        Ok(node)
    }

    /// Number of pages in the index file.
    fn page_count(&self) -> u64 {
        self.index.len().saturating_sub(FIRST_PAGE_OFFSET) / self.index.batch_size() as u64
    }

    /// A descent visits each page at most once, so going deeper than the
    /// file has pages means the pages link in a cycle.
    fn check_depth(&self, depth: usize) -> Result<()> {
        let pages = self.page_count();
        if depth as u64 > pages {
            return Err(Error::format(format!(
                "descent reached depth {} in a file of {} pages; pages form a cycle",
                depth, pages
            )));
        }
        Ok(())
    }

    fn load(&self, offset: Offset) -> Result<BTreeNode> {
        BTreeNode::read_from(&self.index, offset)
    }

    fn write_node(&mut self, node: &BTreeNode) -> Result<()> {
        let pos = node
            .self_position
            .file_pos()
            .ok_or_else(|| Error::format("page has no position"))?;
        self.index.write_batch_at(&node.encode(), pos)?;
        Ok(())
    }
}

/// Path of the value file belonging to the index file at `path`.
pub fn value_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(VALUE_FILE_SUFFIX);
    PathBuf::from(name)
}

fn read_root_cell(index: &BatchStore) -> Offset {
    let cell = index.read(ROOT_CELL_SIZE, 0);
    Offset::new(i32::from_be_bytes([cell[0], cell[1], cell[2], cell[3]]))
}

fn write_root_cell(index: &mut BatchStore, root: Offset) -> Result<()> {
    index.write(&root.0.to_be_bytes(), ROOT_CELL_SIZE, 0)?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
