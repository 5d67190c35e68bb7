//! Error types for hive decoding.
//!
//! Every error that refers to a location in the hive carries the absolute
//! offset (already biased by the hive bin base) at which it occurred.

use thiserror::Error;

/// Result type alias for hive operations.
pub type Result<T> = std::result::Result<T, HiveError>;

/// Errors that can occur while decoding a hive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HiveError {
    /// An expected signature is absent at a header, key, list, value or block-list boundary.
    #[error("Bad magic at offset {offset:#x}: expected {expected:?}, found {:?}", String::from_utf8_lossy(.found))]
    BadMagic {
        /// Absolute offset of the signature.
        offset: usize,
        /// Accepted signature(s).
        expected: &'static str,
        /// Bytes found instead.
        found: Vec<u8>,
    },

    /// A read would go past the end of the buffer.
    #[error("Offset {offset:#x} (+{length} bytes) is out of range (hive size: {hive_size:#x})")]
    OutOfRange {
        /// Absolute offset of the read.
        offset: usize,
        /// Number of bytes requested.
        length: usize,
        /// Total size of the buffer.
        hive_size: usize,
    },

    /// A record is too short for what it claims to contain.
    #[error("Truncated data at offset {offset:#x}: expected {expected} bytes, got {actual} bytes")]
    TruncatedData {
        /// Absolute offset of the record.
        offset: usize,
        /// Bytes required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// Cell length is too small to hold its own header.
    #[error("Invalid cell size: {size} at offset {offset:#x}")]
    InvalidCellSize {
        /// Raw signed length field.
        size: i32,
        /// Absolute offset of the cell.
        offset: usize,
    },

    /// A subkey list entry names neither a nested list nor a key.
    #[error("Unreachable subkey list entry {index} in list at offset {offset:#x}")]
    Unreachable {
        /// Absolute offset of the list record.
        offset: usize,
        /// Index of the offending entry.
        index: usize,
    },

    /// Computed header checksum differs from the stored one.
    #[error("Checksum mismatch: stored {stored:#x}, computed {computed:#x}")]
    ChecksumMismatch {
        /// Checksum stored in the header.
        stored: u32,
        /// Checksum computed over the header.
        computed: u32,
    },

    /// Invalid UTF-16 string data.
    #[error("Invalid UTF-16 string at offset {offset:#x}")]
    InvalidUtf16 {
        /// Absolute offset of the string.
        offset: usize,
    },

    /// Subkey list indirection loops back onto a list already visited.
    #[error("Subkey list at offset {offset:#x} was already visited")]
    CycleDetected {
        /// Absolute offset of the revisited list.
        offset: usize,
    },
}

impl HiveError {
    /// Creates a bad magic error.
    ///
    /// # Arguments
    ///
    /// * `offset` - Absolute offset of the signature
    /// * `expected` - Accepted signature(s), e.g. `"nk"` or `"li|lf|lh|ri"`
    /// * `found` - Actual bytes found
    pub fn bad_magic(offset: usize, expected: &'static str, found: &[u8]) -> Self {
        Self::BadMagic {
            offset,
            expected,
            found: found.to_vec(),
        }
    }

    /// Creates an out of range error.
    pub fn out_of_range(offset: usize, length: usize, hive_size: usize) -> Self {
        Self::OutOfRange {
            offset,
            length,
            hive_size,
        }
    }

    /// Creates a truncated data error.
    pub fn truncated(offset: usize, expected: usize, actual: usize) -> Self {
        Self::TruncatedData {
            offset,
            expected,
            actual,
        }
    }

    /// Returns the absolute offset the error refers to, if any.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use winkey::error::HiveError;
    /// let err = HiveError::bad_magic(0x1020, "nk", b"XX");
    /// assert_eq!(err.offset(), Some(0x1020));
    /// ```
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::BadMagic { offset, .. }
            | Self::OutOfRange { offset, .. }
            | Self::TruncatedData { offset, .. }
            | Self::InvalidCellSize { offset, .. }
            | Self::Unreachable { offset, .. }
            | Self::InvalidUtf16 { offset }
            | Self::CycleDetected { offset } => Some(*offset),
            Self::ChecksumMismatch { .. } => None,
        }
    }
}
