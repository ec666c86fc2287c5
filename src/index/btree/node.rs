//! B-tree pages and their fixed-width batch encoding.

use crate::common::config::{ENTRY_RECORD_SIZE, NODE_METADATA_SIZE};
use crate::common::{Error, Offset, Result};
use crate::index::ordered_map::OrderedMap;
use crate::storage::BatchStore;

const LEAF_FLAG: i8 = 1;
const INTERNAL_FLAG: i8 = -1;

/// One persisted B-tree page.
///
/// # Routing
/// In an internal page, entry `(k, v)` sends keys `>= k` (and below the next
/// entry's key) to the child page at offset `v`. Keys below every entry go
/// to `phi`.
///
/// # Encoding
/// ```text
/// ┌──────┬───────┬────────┬─────┬──────┬───────────┬──────────────────┐
/// │ leaf │ count │ parent │ phi │ self │ next leaf │ map (count × 13) │
/// │  1   │   4   │   4    │  4  │  4   │     4     │                  │
/// └──────┴───────┴────────┴─────┴──────┴───────────┴──────────────────┘
/// ```
/// The leaf flag is `+1` for leaves and `-1` for internal pages. The encoded
/// page is written left-justified into one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BTreeNode {
    pub is_leaf: bool,
    pub map: OrderedMap,
    pub parent: Offset,
    pub phi: Offset,
    pub self_position: Offset,
    pub next_leaf: Offset,
}

/// Key/offset pair handed to the parent when a page splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidKey {
    /// Smallest key of the new upper page.
    pub key: i32,
    /// Position of the new upper page.
    pub child: Offset,
}

/// The two halves of a split page plus the key to push upward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub lower: BTreeNode,
    pub upper: BTreeNode,
    pub mid: MidKey,
}

impl BTreeNode {
    /// An empty leaf page at `self_position`.
    pub fn new_leaf(self_position: Offset) -> Self {
        Self {
            is_leaf: true,
            map: OrderedMap::new(),
            parent: Offset::NONE,
            phi: Offset::NONE,
            self_position,
            next_leaf: Offset::NONE,
        }
    }

    /// A new root above a page that just split.
    pub fn new_root(old_root: Offset, self_position: Offset, mid: MidKey) -> Self {
        let mut map = OrderedMap::new();
        map.put(mid.key, mid.child.0);
        Self {
            is_leaf: false,
            map,
            parent: Offset::NONE,
            phi: old_root,
            self_position,
            next_leaf: Offset::NONE,
        }
    }

    /// Pick the child page responsible for `key`.
    ///
    /// # Errors
    /// Returns `Error::Format` if no entry covers `key` and `phi` is unset.
    pub fn route(&self, key: i32) -> Result<Offset> {
        let child = self
            .map
            .predecessor_or_self(key)
            .map(Offset::new)
            .unwrap_or(self.phi);

        if child.is_valid() {
            Ok(child)
        } else {
            Err(Error::format(format!(
                "page at {} has no child for key {}",
                self.self_position, key
            )))
        }
    }

    /// All child pages of an internal page, in key order.
    pub fn children(&self) -> Vec<Offset> {
        if self.is_leaf {
            return Vec::new();
        }
        let mut children = Vec::with_capacity(self.map.len() + 1);
        if self.phi.is_valid() {
            children.push(self.phi);
        }
        children.extend(self.map.iter().map(|(_, v)| Offset::new(v)));
        children
    }

    /// Split an overfull page in two.
    ///
    /// The first half of the entries (in key order) stays in the lower page;
    /// the rest move to an upper page at `sibling_position`, whose first key
    /// becomes the mid key. A page with no parent yet (the root) gets
    /// `new_parent` on both halves. Splitting a leaf threads the upper page
    /// into the leaf chain right after the lower one.
    ///
    /// # Errors
    /// Returns `Error::Format` if the page holds fewer than two entries.
    pub fn split(self, sibling_position: Offset, new_parent: Offset) -> Result<Split> {
        let entries: Vec<(i32, i32)> = self.map.iter().collect();
        if entries.len() < 2 {
            return Err(Error::format(format!(
                "cannot split page at {} holding {} entries",
                self.self_position,
                entries.len()
            )));
        }

        let half = entries.len() / 2;
        let (lower_entries, upper_entries) = entries.split_at(half);
        let mid = MidKey {
            key: upper_entries[0].0,
            child: sibling_position,
        };

        let parent = if self.parent.is_valid() {
            self.parent
        } else {
            new_parent
        };

        let upper = BTreeNode {
            is_leaf: self.is_leaf,
            map: upper_entries.iter().copied().collect(),
            parent,
            phi: Offset::NONE,
            self_position: sibling_position,
            next_leaf: if self.is_leaf {
                self.next_leaf
            } else {
                Offset::NONE
            },
        };

        let lower = BTreeNode {
            map: lower_entries.iter().copied().collect(),
            parent,
            next_leaf: if self.is_leaf {
                sibling_position
            } else {
                self.next_leaf
            },
            ..self
        };

        Ok(Split { lower, upper, mid })
    }

    // ========================================================================
    // Codec
    // ========================================================================

    /// Encode this page (metadata followed by the serialized map).
    pub fn encode(&self) -> Vec<u8> {
        let count = self.map.len();
        let mut out = Vec::with_capacity(NODE_METADATA_SIZE + count * ENTRY_RECORD_SIZE);

        let flag = if self.is_leaf { LEAF_FLAG } else { INTERNAL_FLAG };
        out.push(flag as u8);
        out.extend_from_slice(&(count as i32).to_be_bytes());
        out.extend_from_slice(&self.parent.0.to_be_bytes());
        out.extend_from_slice(&self.phi.0.to_be_bytes());
        out.extend_from_slice(&self.self_position.0.to_be_bytes());
        out.extend_from_slice(&self.next_leaf.0.to_be_bytes());
        self.map.encode_into(&mut out);

        out
    }

    /// Decode a page from `bytes`.
    ///
    /// `bytes` must be either exactly an encoded page or a whole batch of
    /// `expected_batch_len` bytes (trailing zero padding is ignored).
    ///
    /// # Errors
    /// Returns `Error::Format` on a length mismatch, an unknown leaf flag
    /// (a zeroed, never-written page included) or a malformed map.
    pub fn decode(bytes: &[u8], expected_batch_len: usize) -> Result<Self> {
        if bytes.len() < NODE_METADATA_SIZE {
            return Err(Error::format(format!(
                "page of {} bytes is shorter than its {}-byte metadata",
                bytes.len(),
                NODE_METADATA_SIZE
            )));
        }
        let exact = (bytes.len() - NODE_METADATA_SIZE) % ENTRY_RECORD_SIZE == 0;
        if !exact && bytes.len() != expected_batch_len {
            return Err(Error::format(format!(
                "page of {} bytes matches neither the record width nor the batch size {}",
                bytes.len(),
                expected_batch_len
            )));
        }

        let is_leaf = match bytes[0] as i8 {
            LEAF_FLAG => true,
            INTERNAL_FLAG => false,
            0 => return Err(Error::format("page was never written")),
            other => return Err(Error::format(format!("unknown leaf flag {}", other))),
        };

        let field = |at: usize| {
            i32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        let count = field(1);
        let parent = Offset::new(field(5));
        let phi = Offset::new(field(9));
        let self_position = Offset::new(field(13));
        let next_leaf = Offset::new(field(17));

        let map_len = usize::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(ENTRY_RECORD_SIZE))
            .filter(|&len| NODE_METADATA_SIZE + len <= bytes.len())
            .ok_or_else(|| {
                Error::format(format!(
                    "page claims {} entries but holds at most {}",
                    count,
                    (bytes.len() - NODE_METADATA_SIZE) / ENTRY_RECORD_SIZE
                ))
            })?;

        let map = OrderedMap::decode(&bytes[NODE_METADATA_SIZE..NODE_METADATA_SIZE + map_len])?;

        Ok(Self {
            is_leaf,
            map,
            parent,
            phi,
            self_position,
            next_leaf,
        })
    }

    /// Load the page stored at `offset`.
    ///
    /// # Errors
    /// Returns `Error::Format` if `offset` is unset, the batch does not
    /// decode, or the page records a different position than `offset`.
    pub fn read_from(store: &BatchStore, offset: Offset) -> Result<Self> {
        let pos = offset
            .file_pos()
            .ok_or_else(|| Error::format(format!("no page at {}", offset)))?;

        let node = Self::decode(&store.read_batch(pos), store.batch_size())?;
        if node.self_position != offset {
            return Err(Error::format(format!(
                "page read at {} records its position as {}",
                offset, node.self_position
            )));
        }

        tracing::trace!(
            page = %offset,
            leaf = node.is_leaf,
            entries = node.map.len(),
            "loaded page"
        );
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::batch_size;

    fn leaf_with(keys: impl IntoIterator<Item = i32>, at: i32) -> BTreeNode {
        let mut node = BTreeNode::new_leaf(Offset::new(at));
        for key in keys {
            node.map.put(key, key * 10);
        }
        node
    }

    #[test]
    fn test_encode_layout() {
        let node = leaf_with([1, 2], 4);
        let bytes = node.encode();

        assert_eq!(bytes.len(), NODE_METADATA_SIZE + 2 * ENTRY_RECORD_SIZE);
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..5], &2i32.to_be_bytes());
        assert_eq!(&bytes[5..9], &(-1i32).to_be_bytes());
        assert_eq!(&bytes[9..13], &(-1i32).to_be_bytes());
        assert_eq!(&bytes[13..17], &4i32.to_be_bytes());
        assert_eq!(&bytes[17..21], &(-1i32).to_be_bytes());
        assert_eq!(&bytes[21..], node.map.encode().as_slice());
    }

    #[test]
    fn test_internal_flag_is_negative() {
        let root = BTreeNode::new_root(
            Offset::new(4),
            Offset::new(176),
            MidKey {
                key: 3,
                child: Offset::new(90),
            },
        );
        assert_eq!(root.encode()[0] as i8, -1);
    }

    #[test]
    fn test_decode_exact_and_padded() {
        let node = leaf_with([5, 1, 9], 90);
        let bytes = node.encode();
        let batch = batch_size(5);

        assert_eq!(BTreeNode::decode(&bytes, batch).unwrap(), node);

        let mut padded = bytes.clone();
        padded.resize(batch, 0);
        assert_eq!(BTreeNode::decode(&padded, batch).unwrap(), node);
    }

    #[test]
    fn test_decode_length_mismatch() {
        let mut bytes = leaf_with([1], 4).encode();
        bytes.push(0);
        assert!(matches!(
            BTreeNode::decode(&bytes, batch_size(5)),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            BTreeNode::decode(&[1u8; 10], batch_size(5)),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_decode_zeroed_page() {
        let batch = batch_size(5);
        assert!(matches!(
            BTreeNode::decode(&vec![0u8; batch], batch),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_decode_count_exceeds_batch() {
        let batch = batch_size(2);
        let mut bytes = leaf_with([1, 2], 4).encode();
        bytes.resize(batch, 0);
        bytes[1..5].copy_from_slice(&3i32.to_be_bytes());
        assert!(matches!(BTreeNode::decode(&bytes, batch), Err(Error::Format(_))));
    }

    #[test]
    fn test_route() {
        let mut root = BTreeNode::new_root(
            Offset::new(4),
            Offset::new(262),
            MidKey {
                key: 10,
                child: Offset::new(90),
            },
        );
        root.map.put(20, 176);

        assert_eq!(root.route(i32::MIN).unwrap(), Offset::new(4));
        assert_eq!(root.route(9).unwrap(), Offset::new(4));
        assert_eq!(root.route(10).unwrap(), Offset::new(90));
        assert_eq!(root.route(19).unwrap(), Offset::new(90));
        assert_eq!(root.route(25).unwrap(), Offset::new(176));
        assert_eq!(
            root.children(),
            vec![Offset::new(4), Offset::new(90), Offset::new(176)]
        );
    }

    #[test]
    fn test_route_without_phi() {
        let mut node = BTreeNode::new_leaf(Offset::new(4));
        node.is_leaf = false;
        node.map.put(10, 90);
        assert!(node.route(5).is_err());
        assert_eq!(node.route(10).unwrap(), Offset::new(90));
    }

    #[test]
    fn test_split_leaf() {
        let mut node = leaf_with(1..=6, 4);
        node.next_leaf = Offset::new(500);

        let Split { lower, upper, mid } = node.split(Offset::new(90), Offset::new(176)).unwrap();

        assert_eq!(lower.map.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(upper.map.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec![4, 5, 6]);
        assert_eq!(
            mid,
            MidKey {
                key: 4,
                child: Offset::new(90)
            }
        );

        // Root split: both halves point at the parent to be written next.
        assert_eq!(lower.parent, Offset::new(176));
        assert_eq!(upper.parent, Offset::new(176));

        assert_eq!(lower.self_position, Offset::new(4));
        assert_eq!(upper.self_position, Offset::new(90));
        assert!(upper.is_leaf);

        // Leaf chain: lower -> upper -> old successor
        assert_eq!(lower.next_leaf, Offset::new(90));
        assert_eq!(upper.next_leaf, Offset::new(500));
    }

    #[test]
    fn test_split_keeps_existing_parent() {
        let mut node = leaf_with(1..=3, 90);
        node.parent = Offset::new(176);
        let split = node.split(Offset::new(262), Offset::new(348)).unwrap();

        assert_eq!(split.lower.parent, Offset::new(176));
        assert_eq!(split.upper.parent, Offset::new(176));
        assert_eq!(split.lower.map.len(), 1);
        assert_eq!(split.upper.map.len(), 2);
        assert_eq!(split.mid.key, 2);
    }

    #[test]
    fn test_split_internal_does_not_touch_leaf_chain() {
        let mut node = leaf_with(1..=4, 4);
        node.is_leaf = false;
        node.phi = Offset::new(1000);

        let split = node.split(Offset::new(90), Offset::new(176)).unwrap();
        assert!(!split.upper.is_leaf);
        assert_eq!(split.lower.phi, Offset::new(1000));
        assert_eq!(split.upper.phi, Offset::NONE);
        assert_eq!(split.lower.next_leaf, Offset::NONE);
        assert_eq!(split.upper.next_leaf, Offset::NONE);
    }

    #[test]
    fn test_split_too_small() {
        let node = leaf_with([1], 4);
        assert!(node.split(Offset::new(90), Offset::new(176)).is_err());
    }
}
