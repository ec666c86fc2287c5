//! Thread-safe handle around a [`BTree`].

use std::path::Path;

use parking_lot::Mutex;

use crate::common::Result;

use super::stats::TreeStats;
use super::tree::BTree;

/// A [`BTree`] behind a mutex, so `&self` methods can be called from many
/// threads.
///
/// # Concurrency Model
/// ```text
/// ┌───────────────────────────────┐
/// │          SharedBTree          │
/// │  ┌─────────────────────────┐  │
/// │  │   Mutex<BTree>          │  │  every call takes the lock once
/// │  │   index + values + root │  │
/// │  └─────────────────────────┘  │
/// └───────────────────────────────┘
/// ```
///
/// Operations are serialized. A range query collects its results while the
/// lock is held, since a lazy scan cannot outlive the guard.
pub struct SharedBTree {
    inner: Mutex<BTree>,
}

impl SharedBTree {
    /// Wrap an already opened tree.
    pub fn new(tree: BTree) -> Self {
        Self {
            inner: Mutex::new(tree),
        }
    }

    /// Open or create a tree and wrap it.
    pub fn open<P: AsRef<Path>>(path: P, node_capacity: usize) -> Result<Self> {
        Ok(Self::new(BTree::open(path, node_capacity)?))
    }

    pub fn put(&self, key: i32, value: &[u8]) -> Result<()> {
        self.inner.lock().put(key, value)
    }

    pub fn get(&self, key: i32) -> Result<Option<Vec<u8>>> {
        self.inner.lock().get(key)
    }

    pub fn contains_key(&self, key: i32) -> Result<bool> {
        self.inner.lock().contains_key(key)
    }

    /// Collect every entry with `low <= key <= high`, in key order.
    pub fn get_in_range(&self, low: i32, high: i32) -> Result<Vec<(i32, Vec<u8>)>> {
        let tree = self.inner.lock();
        let scan = tree.get_in_range(low, high)?;
        scan.collect()
    }

    pub fn stats(&self) -> Result<TreeStats> {
        self.inner.lock().stats()
    }

    pub fn flush(&self) -> Result<()> {
        self.inner.lock().flush()
    }

    /// Unwrap the tree, e.g. to close it.
    pub fn into_inner(self) -> BTree {
        self.inner.into_inner()
    }
}
