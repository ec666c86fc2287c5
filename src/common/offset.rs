//! Page offset type.

use std::fmt;

use crate::common::{Error, Result};

/// Byte position of a page in the index file.
///
/// Stored on disk as a big-endian `i32`. Bytes `[0, 4)` of the index file
/// hold the root cell, so no page ever lives at a position below 1 and any
/// value `<= 0` means "unset".
///
/// # Example
/// ```
/// use batchtree::Offset;
///
/// let offset = Offset::new(4);
/// assert!(offset.is_valid());
/// assert!(!Offset::NONE.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Offset(pub i32);

impl Offset {
    /// Sentinel for "no page" (unset parent, phi or leaf link).
    pub const NONE: Offset = Offset(-1);

    /// Create a new Offset.
    #[inline]
    pub fn new(pos: i32) -> Self {
        Offset(pos)
    }

    /// Check if this offset points at a page.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }

    /// Convert a file position into an offset.
    ///
    /// # Errors
    /// Returns `Error::OffsetOverflow` if `pos` does not fit in an `i32`.
    pub fn from_file_pos(pos: u64) -> Result<Self> {
        i32::try_from(pos)
            .map(Offset)
            .map_err(|_| Error::OffsetOverflow(pos))
    }

    /// The file position of this offset, or `None` if unset.
    #[inline]
    pub fn file_pos(&self) -> Option<u64> {
        if self.is_valid() {
            Some(self.0 as u64)
        } else {
            None
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Offset({})", self.0)
        } else {
            write!(f, "Offset(NONE)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_validity() {
        assert!(Offset::new(4).is_valid());
        assert!(!Offset::NONE.is_valid());
        assert!(!Offset::new(0).is_valid());
    }

    #[test]
    fn test_offset_file_pos() {
        assert_eq!(Offset::new(90).file_pos(), Some(90));
        assert_eq!(Offset::NONE.file_pos(), None);
        assert_eq!(Offset::from_file_pos(176).unwrap(), Offset::new(176));
    }

    #[test]
    fn test_offset_overflow() {
        let pos = i32::MAX as u64 + 1;
        match Offset::from_file_pos(pos) {
            Err(Error::OffsetOverflow(p)) => assert_eq!(p, pos),
            other => panic!("expected OffsetOverflow, got {:?}", other),
        }
    }

    #[test]
    fn test_offset_display() {
        assert_eq!(format!("{}", Offset::new(42)), "Offset(42)");
        assert_eq!(format!("{}", Offset::NONE), "Offset(NONE)");
    }
}
