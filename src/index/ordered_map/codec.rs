//! Binary format of an [`OrderedMap`].
//!
//! A map serializes by **preorder** traversal. Every entry becomes one
//! 13-byte record followed by its left subtree, then its right subtree:
//! ```text
//! ┌───────────┬─────────────┬────────────┬───────────┐
//! │ key (i32) │ value (i32) │ size (i32) │ color (u8)│   big-endian
//! └───────────┴─────────────┴────────────┴───────────┘
//! ```
//! An empty map serializes to zero bytes.
//!
//! There are no child markers. Decoding threads an open key interval through
//! the recursion: a record whose key falls outside the interval belongs to
//! some ancestor's right subtree, so the cursor is rewound by one record and
//! the current subtree ends there.

use crate::common::config::ENTRY_RECORD_SIZE;
use crate::common::{Error, Result};

use super::entry::{size, Link};
use super::{Color, OrderedEntry, OrderedMap};

impl OrderedMap {
    /// Serialize the map to `len() * 13` bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * ENTRY_RECORD_SIZE);
        self.encode_into(&mut out);
        out
    }

    /// Append the serialized map to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        if let Some(root) = self.root() {
            encode_entry(root, out);
        }
    }

    /// Rebuild a map from bytes produced by [`encode`](Self::encode).
    ///
    /// # Errors
    /// Returns `Error::Format` if the length is not a multiple of the record
    /// width, a color byte is unknown, a stored subtree size is inconsistent,
    /// or some records fit nowhere in the tree.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % ENTRY_RECORD_SIZE != 0 {
            return Err(Error::format(format!(
                "map of {} bytes is not a multiple of {}",
                bytes.len(),
                ENTRY_RECORD_SIZE
            )));
        }

        let mut cursor = Cursor { bytes, pos: 0 };
        let root = decode_at(&mut cursor, i64::MIN, i64::MAX)?;

        if cursor.pos != bytes.len() {
            return Err(Error::format(format!(
                "{} trailing bytes after map at position {}",
                bytes.len() - cursor.pos,
                cursor.pos
            )));
        }

        Ok(OrderedMap { root })
    }
}

fn encode_entry(entry: &OrderedEntry, out: &mut Vec<u8>) {
    out.extend_from_slice(&entry.key.to_be_bytes());
    out.extend_from_slice(&entry.value.to_be_bytes());
    out.extend_from_slice(&entry.size.to_be_bytes());
    out.push(entry.color as u8);

    if let Some(left) = entry.left.as_deref() {
        encode_entry(left, out);
    }
    if let Some(right) = entry.right.as_deref() {
        encode_entry(right, out);
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn read_i32(&mut self) -> i32 {
        let b = &self.bytes[self.pos..self.pos + 4];
        self.pos += 4;
        i32::from_be_bytes([b[0], b[1], b[2], b[3]])
    }

    fn read_u8(&mut self) -> u8 {
        let b = self.bytes[self.pos];
        self.pos += 1;
        b
    }

    fn has_record(&self) -> bool {
        self.pos + ENTRY_RECORD_SIZE <= self.bytes.len()
    }
}

/// Decode the subtree whose keys lie strictly inside `(min, max)`.
fn decode_at(cursor: &mut Cursor<'_>, min: i64, max: i64) -> Result<Link> {
    if !cursor.has_record() {
        return Ok(None);
    }

    let key = cursor.read_i32();
    let value = cursor.read_i32();
    let stored_size = cursor.read_i32();
    let color_byte = cursor.read_u8();

    let wide = key as i64;
    if wide <= min || wide >= max {
        cursor.pos -= ENTRY_RECORD_SIZE;
        return Ok(None);
    }

    let color = Color::from_u8(color_byte).ok_or_else(|| {
        Error::format(format!("unknown color byte {} for key {}", color_byte, key))
    })?;

    let left = decode_at(cursor, min, wide)?;
    let right = decode_at(cursor, wide, max)?;

    let actual = 1 + size(&left) + size(&right);
    if stored_size != actual {
        return Err(Error::format(format!(
            "key {} records subtree size {} but has {}",
            key, stored_size, actual
        )));
    }

    Ok(Some(Box::new(OrderedEntry {
        key,
        value,
        size: stored_size,
        color,
        left,
        right,
    })))
}
