//! Error types for batchtree.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in batchtree.
///
/// None of these are retried internally. `Format` and `Capacity` point at a
/// corrupt file or a bug; `Io` is whatever the file system reported.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while opening, growing, mapping or flushing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A byte buffer does not decode as a page, map or value record.
    ///
    /// Usually means the index file is corrupt or was created with a
    /// different node capacity.
    #[error("format error: {0}")]
    Format(String),

    /// A write does not fit the fixed window it targets.
    #[error("write of {len} bytes exceeds capacity of {capacity} bytes")]
    Capacity { len: usize, capacity: usize },

    /// Node capacity is zero or too large to address.
    #[error("invalid node capacity: {0}")]
    InvalidNodeCapacity(usize),

    /// A file position does not fit the signed 32-bit on-disk offsets.
    #[error("file position {0} exceeds the addressable range")]
    OffsetOverflow(u64),
}

impl Error {
    /// Shorthand for building a [`Error::Format`].
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }
}
