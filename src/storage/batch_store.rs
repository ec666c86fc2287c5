//! Batch Store - memory-mapped, fixed-batch file access.
//!
//! The [`BatchStore`] handles all direct file operations:
//! - Reading and writing fixed-size batches (one B-tree page each)
//! - Raw reads and writes of arbitrary length
//! - Appending records at the end of the file
//!
//! The whole file is mapped read-write. Any write that would extend the file
//! past the mapped length grows the file first and remaps it.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::common::{Error, Result};

/// Memory-mapped accessor for a single file.
///
/// # File Layout
/// The store itself imposes no layout beyond the batch width. The index file
/// uses it like this:
/// ```text
/// ┌──────────┬──────────┬──────────┬─────────┬──────────┐
/// │ root (4) │ Batch 0  │ Batch 1  │  ...    │ Batch N  │
/// └──────────┴──────────┴──────────┴─────────┴──────────┘
/// Offset: 0  4        4+B        4+2B             4+N×B
/// ```
///
/// # Remapping
/// Growing the file replaces the mapping. Every accessor copies bytes in or
/// out, so no view into the old mapping can outlive a write: reads take
/// `&self`, writes take `&mut self`.
///
/// # Thread Safety
/// `BatchStore` is **single-threaded**. Wrap the owning tree in
/// [`SharedBTree`](crate::SharedBTree) to serialize access.
pub struct BatchStore {
    path: PathBuf,
    file: File,
    /// `None` while the file is empty; zero-length files cannot be mapped.
    mmap: Option<MmapMut>,
    /// Current file length in bytes.
    len: u64,
    batch_size: usize,
}

impl BatchStore {
    /// Open a file for batch access, creating it if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or mapped.
    pub fn open<P: AsRef<Path>>(path: P, batch_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let len = file.metadata()?.len();
        let mmap = Self::map(&file, len)?;

        Ok(Self {
            path,
            file,
            mmap,
            len,
            batch_size,
        })
    }

    fn map(file: &File, len: u64) -> Result<Option<MmapMut>> {
        if len == 0 {
            return Ok(None);
        }

        // SAFETY: MmapMut::map_mut is unsafe because the file could be modified
        // by another process while mapped. This is safe because:
        // 1. The file is owned by this store for its whole lifetime
        // 2. Concurrent or multi-writer access is not supported
        // 3. All access copies through read()/write(), which bounds-check
        let mmap = unsafe { MmapMut::map_mut(file)? };
        Ok(Some(mmap))
    }

    /// Extend the file to `new_len` bytes and remap it.
    fn grow(&mut self, new_len: u64) -> Result<()> {
        if new_len <= self.len {
            return Ok(());
        }

        // Unmap before resizing. Writes through a shared mapping already sit
        // in the page cache, so the new mapping sees them without a sync.
        drop(self.mmap.take());

        self.file.set_len(new_len)?;
        self.mmap = Self::map(&self.file, new_len)?;

        tracing::debug!(
            path = %self.path.display(),
            old_len = self.len,
            new_len,
            "remapped file"
        );
        self.len = new_len;

        Ok(())
    }

    // ========================================================================
    // Batch access
    // ========================================================================

    /// Read exactly one batch starting at `offset`.
    ///
    /// Bytes past the end of the file read as zero.
    pub fn read_batch(&self, offset: u64) -> Vec<u8> {
        self.read(self.batch_size, offset)
    }

    /// Write `bytes` left-justified into the batch at `offset`.
    ///
    /// The rest of the batch is zero-filled. Returns `offset`.
    ///
    /// # Errors
    /// Returns `Error::Capacity` if `bytes` is wider than a batch.
    pub fn write_batch_at(&mut self, bytes: &[u8], offset: u64) -> Result<u64> {
        if bytes.len() > self.batch_size {
            return Err(Error::Capacity {
                len: bytes.len(),
                capacity: self.batch_size,
            });
        }
        self.write(bytes, self.batch_size, offset)
    }

    /// Write `bytes` as a new batch at the end of the file.
    ///
    /// Returns the offset the batch was written at; this is how a new page
    /// gets its address.
    pub fn write_batch(&mut self, bytes: &[u8]) -> Result<u64> {
        let offset = self.len;
        self.write_batch_at(bytes, offset)
    }

    // ========================================================================
    // Raw access
    // ========================================================================

    /// Read `length` bytes starting at `offset`, zero-padding past the end.
    pub fn read(&self, length: usize, offset: u64) -> Vec<u8> {
        let mut bytes = vec![0u8; length];

        if let Some(mmap) = &self.mmap {
            let mapped = mmap.len() as u64;
            if offset < mapped {
                let start = offset as usize;
                let end = offset.saturating_add(length as u64).min(mapped) as usize;
                bytes[..end - start].copy_from_slice(&mmap[start..end]);
            }
        }

        bytes
    }

    /// Write `bytes` into a `length`-wide window at `offset`.
    ///
    /// The window is zero-filled past `bytes`. The file grows first if the
    /// window ends past the current length. Returns `offset`.
    ///
    /// # Errors
    /// - `Error::Capacity` if `bytes` is wider than `length`
    /// - I/O errors from growing or remapping the file
    pub fn write(&mut self, bytes: &[u8], length: usize, offset: u64) -> Result<u64> {
        if bytes.len() > length {
            return Err(Error::Capacity {
                len: bytes.len(),
                capacity: length,
            });
        }
        if length == 0 {
            return Ok(offset);
        }

        let end = offset
            .checked_add(length as u64)
            .ok_or(Error::OffsetOverflow(offset))?;
        self.grow(end)?;

        let mmap = self
            .mmap
            .as_mut()
            .ok_or_else(|| Error::format("write to an unmapped file"))?;
        let start = offset as usize;
        mmap[start..start + bytes.len()].copy_from_slice(bytes);
        mmap[start + bytes.len()..start + length].fill(0);

        Ok(offset)
    }

    /// Grow the file by exactly `bytes.len()` and write `bytes` there.
    ///
    /// Returns the previous end of the file, i.e. the record's offset.
    pub fn append(&mut self, bytes: &[u8]) -> Result<u64> {
        let offset = self.len;
        self.write(bytes, bytes.len(), offset)
    }

    // ========================================================================
    // Info and durability
    // ========================================================================

    /// Flush the mapped region to disk.
    pub fn flush(&self) -> Result<()> {
        if let Some(mmap) = &self.mmap {
            mmap.flush()?;
        }
        Ok(())
    }

    /// Current length of the file in bytes.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Check if the file is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Width of one batch.
    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BatchStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(path = %self.path.display(), error = %e, "flush on drop failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const BATCH: usize = 8;

    #[test]
    fn test_open_creates_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        let store = BatchStore::open(&path, BATCH).unwrap();
        assert!(path.exists());
        assert!(store.is_empty());
        assert_eq!(store.batch_size(), BATCH);
    }

    #[test]
    fn test_read_past_end_is_zero_padded() {
        let dir = tempdir().unwrap();
        let mut store = BatchStore::open(dir.path().join("test.idx"), BATCH).unwrap();

        // Empty file
        assert_eq!(store.read_batch(0), vec![0u8; BATCH]);

        store.append(&[1, 2, 3]).unwrap();

        // Straddles the end of the file
        assert_eq!(store.read(5, 1), vec![2, 3, 0, 0, 0]);
        // Entirely past the end
        assert_eq!(store.read(4, 100), vec![0u8; 4]);
    }

    #[test]
    fn test_write_batch_at_zero_fills_and_grows() {
        let dir = tempdir().unwrap();
        let mut store = BatchStore::open(dir.path().join("test.idx"), BATCH).unwrap();

        let offset = store.write_batch_at(&[0xAB, 0xCD], 4).unwrap();
        assert_eq!(offset, 4);
        assert_eq!(store.len(), 4 + BATCH as u64);

        let batch = store.read_batch(4);
        assert_eq!(&batch[..2], &[0xAB, 0xCD]);
        assert!(batch[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_overwrite_clears_previous_tail() {
        let dir = tempdir().unwrap();
        let mut store = BatchStore::open(dir.path().join("test.idx"), BATCH).unwrap();

        store.write_batch_at(&[9; BATCH], 0).unwrap();
        store.write_batch_at(&[1], 0).unwrap();

        let mut expected = vec![0u8; BATCH];
        expected[0] = 1;
        assert_eq!(store.read_batch(0), expected);
        assert_eq!(store.len(), BATCH as u64);
    }

    #[test]
    fn test_write_batch_too_large() {
        let dir = tempdir().unwrap();
        let mut store = BatchStore::open(dir.path().join("test.idx"), BATCH).unwrap();

        let result = store.write_batch(&[0u8; BATCH + 1]);
        match result {
            Err(Error::Capacity { len, capacity }) => {
                assert_eq!(len, BATCH + 1);
                assert_eq!(capacity, BATCH);
            }
            other => panic!("expected Capacity error, got {:?}", other),
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_write_batch_appends() {
        let dir = tempdir().unwrap();
        let mut store = BatchStore::open(dir.path().join("test.idx"), BATCH).unwrap();

        store.write(&[0, 0, 0, 4], 4, 0).unwrap();
        assert_eq!(store.write_batch(b"first").unwrap(), 4);
        assert_eq!(store.write_batch(b"second").unwrap(), 4 + BATCH as u64);
        assert_eq!(store.len(), 4 + 2 * BATCH as u64);

        assert_eq!(&store.read_batch(4)[..5], b"first");
        assert_eq!(&store.read_batch(4 + BATCH as u64)[..6], b"second");
    }

    #[test]
    fn test_append_returns_prior_end() {
        let dir = tempdir().unwrap();
        let mut store = BatchStore::open(dir.path().join("test.log"), BATCH).unwrap();

        assert_eq!(store.append(b"abc").unwrap(), 0);
        assert_eq!(store.append(b"defgh").unwrap(), 3);
        assert_eq!(store.append(b"").unwrap(), 8);
        assert_eq!(store.len(), 8);
        assert_eq!(store.read(8, 0), b"abcdefgh".to_vec());
    }

    #[test]
    fn test_remap_preserves_existing_data() {
        let dir = tempdir().unwrap();
        let mut store = BatchStore::open(dir.path().join("test.idx"), BATCH).unwrap();

        for i in 0..64u8 {
            store.write_batch(&[i; BATCH]).unwrap();
        }

        for i in 0..64u8 {
            assert_eq!(store.read_batch(i as u64 * BATCH as u64), vec![i; BATCH]);
        }
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        // Create and write
        {
            let mut store = BatchStore::open(&path, BATCH).unwrap();
            store.write_batch(b"persist").unwrap();
            store.flush().unwrap();
        }

        // Reopen and verify
        {
            let store = BatchStore::open(&path, BATCH).unwrap();
            assert_eq!(store.len(), BATCH as u64);
            assert_eq!(&store.read_batch(0)[..7], b"persist");
        }
    }
}
