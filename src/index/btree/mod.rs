//! Disk-resident B-tree over fixed-size batches.
//!
//! # Components
//! - [`BTree`] - open, put, get, range scan; owns both files
//! - [`BTreeNode`] - one page and its batch encoding
//! - [`RangeScan`] - lazy iteration along the leaf chain
//! - [`SharedBTree`] - mutex-wrapped handle for multi-threaded use
//! - [`TreeStats`] - shape summary from a full page walk
//!
//! # Page Graph
//! ```text
//!                  ┌──────────────┐
//!   root cell ───→ │ root (phi,k) │
//!                  └──────────────┘
//!                   ↙            ↘
//!          ┌──────────┐  next  ┌──────────┐  next
//!          │ leaf < k │ ─────→ │ leaf ≥ k │ ─────→ NONE
//!          └──────────┘        └──────────┘
//! ```

mod node;
mod range;
mod shared;
mod stats;
mod tree;

pub use node::{BTreeNode, MidKey, Split};
pub use range::RangeScan;
pub use shared::SharedBTree;
pub use stats::TreeStats;
pub use tree::{value_path, BTree};
