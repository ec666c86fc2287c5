//! batchtree - a disk-resident B-tree with an in-memory red-black page body.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           batchtree                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │        Shared Handle (index/btree/shared.rs)            │   │
//! │  │              SharedBTree = Mutex<BTree>                 │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │             B-Tree Engine (index/btree/)                │   │
//! │  │     BTree + BTreeNode + RangeScan + TreeStats           │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │          Page Body (index/ordered_map/)                 │   │
//! │  │     left-leaning red-black map + preorder codec         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Storage Layer (storage/)                   │   │
//! │  │      BatchStore (mmap) + ValueLog (length-prefixed)     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (Offset, Error, config)
//! - [`storage`] - Memory-mapped file access and the value log
//! - [`index`] - The ordered map and the B-tree
//!
//! # Quick Start
//! ```no_run
//! use batchtree::BTree;
//!
//! let mut tree = BTree::open("my_index.data", 5).unwrap();
//! for key in 1..=20 {
//!     tree.put(key, format!("value-{}", key).as_bytes()).unwrap();
//! }
//!
//! assert_eq!(tree.get(7).unwrap(), Some(b"value-7".to_vec()));
//!
//! let keys: Vec<i32> = tree
//!     .get_in_range(5, 12)
//!     .unwrap()
//!     .map(|item| item.unwrap().0)
//!     .collect();
//! assert_eq!(keys, (5..=12).collect::<Vec<_>>());
//!
//! tree.close().unwrap();
//! ```

pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{batch_size, DEFAULT_NODE_CAPACITY};
pub use common::{Error, Offset, Result};

pub use index::btree::{BTree, BTreeNode, RangeScan, SharedBTree, TreeStats};
pub use index::ordered_map::OrderedMap;
pub use storage::{BatchStore, ValueLog};
