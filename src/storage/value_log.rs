//! Value log - append-only, length-prefixed value records.

use std::path::Path;

use crate::common::config::VALUE_LENGTH_PREFIX;
use crate::common::{Error, Result};
use crate::storage::BatchStore;

/// Append-only log of value payloads.
///
/// # Record Layout
/// ```text
/// ┌──────────────────┬──────────────────────┐
/// │ length (i32, BE) │ payload (length B)   │
/// └──────────────────┴──────────────────────┘
/// ```
///
/// A leaf entry's value is the offset of one of these records. Records are
/// never rewritten; a second `put` of the same key appends a new record.
pub struct ValueLog {
    store: BatchStore,
}

impl ValueLog {
    /// Open (or create) the value log at `path`.
    pub fn open<P: AsRef<Path>>(path: P, batch_size: usize) -> Result<Self> {
        Ok(Self {
            store: BatchStore::open(path, batch_size)?,
        })
    }

    /// Append a value and return the offset of its record.
    ///
    /// # Errors
    /// - `Error::Capacity` if the value is longer than `i32::MAX` bytes
    /// - I/O errors from growing the file
    pub fn append(&mut self, value: &[u8]) -> Result<u64> {
        let len = i32::try_from(value.len()).map_err(|_| Error::Capacity {
            len: value.len(),
            capacity: i32::MAX as usize,
        })?;

        let mut record = Vec::with_capacity(VALUE_LENGTH_PREFIX + value.len());
        record.extend_from_slice(&len.to_be_bytes());
        record.extend_from_slice(value);

        self.store.append(&record)
    }

    /// Read the value whose record starts at `offset`.
    ///
    /// # Errors
    /// Returns `Error::Format` if the length prefix is negative or the record
    /// runs past the end of the log.
    pub fn read(&self, offset: u64) -> Result<Vec<u8>> {
        let prefix = self.store.read(VALUE_LENGTH_PREFIX, offset);
        let len = i32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
        if len < 0 {
            return Err(Error::format(format!(
                "negative value length {} at offset {}",
                len, offset
            )));
        }

        let start = offset + VALUE_LENGTH_PREFIX as u64;
        if start + len as u64 > self.store.len() {
            return Err(Error::format(format!(
                "value record at offset {} runs past end of log ({} bytes)",
                offset,
                self.store.len()
            )));
        }

        Ok(self.store.read(len as usize, start))
    }

    /// Read the value a leaf entry points at.
    pub(crate) fn resolve(&self, entry_value: i32) -> Result<Vec<u8>> {
        let offset = u64::try_from(entry_value).map_err(|_| {
            Error::format(format!("negative value offset {}", entry_value))
        })?;
        self.read(offset)
    }

    /// Flush the log to disk.
    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }

    /// Length of the log in bytes.
    #[inline]
    pub fn len(&self) -> u64 {
        self.store.len()
    }

    /// Check if the log holds no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_and_read() {
        let dir = tempdir().unwrap();
        let mut log = ValueLog::open(dir.path().join("t_values"), 86).unwrap();

        let a = log.append(b"apple").unwrap();
        let b = log.append(b"").unwrap();
        let c = log.append(b"cat").unwrap();

        assert_eq!(a, 0);
        assert_eq!(b, 9);
        assert_eq!(c, 13);
        assert_eq!(log.len(), 20);

        assert_eq!(log.read(a).unwrap(), b"apple");
        assert_eq!(log.read(b).unwrap(), b"");
        assert_eq!(log.read(c).unwrap(), b"cat");
    }

    #[test]
    fn test_length_prefix_is_big_endian() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t_values");
        {
            let mut log = ValueLog::open(&path, 86).unwrap();
            log.append(b"dog").unwrap();
            log.flush().unwrap();
        }

        let raw = std::fs::read(&path).unwrap();
        assert_eq!(raw, vec![0, 0, 0, 3, b'd', b'o', b'g']);
    }

    #[test]
    fn test_truncated_record_is_format_error() {
        let dir = tempdir().unwrap();
        let mut log = ValueLog::open(dir.path().join("t_values"), 86).unwrap();
        log.append(b"elephant").unwrap();

        // Offset 4 lands inside the payload; its "length" is garbage.
        assert!(matches!(log.read(4), Err(Error::Format(_))));
    }
}
