//! Configuration constants for batchtree.
//!
//! The only runtime knob is the node capacity passed to
//! [`BTree::open`](crate::BTree::open). Everything else about the on-disk
//! layout is fixed here.

/// Width of one serialized ordered-map entry in bytes.
///
/// # Layout
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     key (i32, big-endian)
/// 4       4     value (i32, big-endian)
/// 8       4     subtree size (i32, big-endian)
/// 12      1     color (0 = black, 1 = red)
/// ```
pub const ENTRY_RECORD_SIZE: usize = 13;

/// Width of the fixed metadata prefix of every B-tree page.
///
/// # Layout
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     leaf flag (+1 leaf, -1 internal)
/// 1       4     entry count
/// 5       4     parent offset
/// 9       4     phi offset
/// 13      4     self offset
/// 17      4     next leaf offset
/// ```
pub const NODE_METADATA_SIZE: usize = 21;

/// Width of the root cell at the start of the index file.
pub const ROOT_CELL_SIZE: usize = 4;

/// Offset of the first page. Bytes `[0, 4)` hold the root cell.
pub const FIRST_PAGE_OFFSET: u64 = ROOT_CELL_SIZE as u64;

/// Width of the length prefix in front of every value-log record.
pub const VALUE_LENGTH_PREFIX: usize = 4;

/// Node capacity used by [`BTree::open_default`](crate::BTree::open_default).
pub const DEFAULT_NODE_CAPACITY: usize = 5;

/// Largest node capacity whose batch still fits the `i32` entry count and
/// offsets.
pub const MAX_NODE_CAPACITY: usize = (i32::MAX as usize - NODE_METADATA_SIZE) / ENTRY_RECORD_SIZE;

/// Suffix appended to the index file name to form the value file name.
pub const VALUE_FILE_SUFFIX: &str = "_values";

/// Size of one batch (page) for a given node capacity.
pub const fn batch_size(node_capacity: usize) -> usize {
    node_capacity * ENTRY_RECORD_SIZE + NODE_METADATA_SIZE
}
