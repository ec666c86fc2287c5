//! Tree shape statistics.

use std::fmt;

/// A point-in-time snapshot of the reachable pages of a [`BTree`](super::BTree).
///
/// Computed by walking every page reachable from the root, so it costs one
/// page read per page.
///
/// # Example
/// ```no_run
/// use batchtree::BTree;
///
/// let mut tree = BTree::open("stats.idx", 5).unwrap();
/// tree.put(1, b"a").unwrap();
///
/// let stats = tree.stats().unwrap();
/// println!("{}", stats);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Number of levels, counting the root (a lone leaf has height 1).
    pub height: usize,
    pub internal_pages: usize,
    pub leaf_pages: usize,
    /// Entries across all leaves, i.e. distinct keys stored.
    pub entries: usize,
    /// Largest entry count found on any page.
    pub max_page_entries: usize,
}

impl TreeStats {
    /// Total reachable pages.
    pub fn pages(&self) -> usize {
        self.internal_pages + self.leaf_pages
    }

    /// Average leaf fill relative to `node_capacity` (0.0 to 1.0).
    pub fn leaf_fill(&self, node_capacity: usize) -> f64 {
        if self.leaf_pages == 0 || node_capacity == 0 {
            0.0
        } else {
            self.entries as f64 / (self.leaf_pages * node_capacity) as f64
        }
    }
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TreeStats {{ height: {}, pages: {} ({} internal, {} leaf), entries: {}, max fill: {} }}",
            self.height,
            self.pages(),
            self.internal_pages,
            self.leaf_pages,
            self.entries,
            self.max_page_entries
        )
    }
}
