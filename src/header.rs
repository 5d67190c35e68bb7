//! Hive file header (base block) parsing.
//!
//! The header occupies the start of the file. Only its first 512 bytes carry
//! data this crate reads: the signature, sequence numbers, version, root key
//! offset, the embedded file name and the XOR checksum.

use crate::error::{HiveError, Result};
use crate::utils::{
    calculate_checksum, cell_offset_to_absolute, filetime_to_datetime, read_utf16_string, ByteView,
};
use std::fmt;
use tracing::warn;

/// Size of the checksummed header region in bytes.
pub const HEADER_SIZE: usize = 512;

/// Expected signature for a valid registry hive.
pub const REGF_SIGNATURE: &[u8; 4] = b"regf";

const FILE_NAME_OFFSET: usize = 0x30;
const FILE_NAME_LENGTH: usize = 64;
const CHECKSUM_OFFSET: usize = 0x1FC;

/// Kind of file described by the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum HiveType {
    /// Primary registry file.
    Registry,
    /// Transaction log.
    Log,
    /// Any other type tag.
    Other(u32),
}

impl HiveType {
    fn from_u32(value: u32) -> Self {
        match value {
            0 => HiveType::Registry,
            1 => HiveType::Log,
            other => HiveType::Other(other),
        }
    }
}

/// Parsed hive header.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HiveHeader {
    /// Primary sequence number.
    pub primary_sequence: u32,

    /// Secondary sequence number.
    pub secondary_sequence: u32,

    /// Last written timestamp (Windows FILETIME).
    pub timestamp: u64,

    /// Major version of the hive format.
    pub major_version: u32,

    /// Minor version of the hive format.
    pub minor_version: u32,

    /// File type.
    pub hive_type: HiveType,

    /// File format, always 1.
    pub file_format: u32,

    /// Offset to the root key, relative to the first hive bin.
    pub root_key_offset: u32,

    /// Total length of all hive bins.
    pub total_hbin_length: u32,

    /// Clustering factor, always 1.
    pub clustering_factor: u32,

    /// Embedded file name.
    pub embedded_filename: String,

    /// Checksum stored in the header.
    pub checksum: u32,

    /// Checksum computed over the header.
    pub computed_checksum: u32,
}

impl HiveHeader {
    /// Parses the header at the start of `data`.
    ///
    /// A checksum mismatch is not an error here; compare
    /// [`HiveHeader::has_valid_checksum`] to decide what to do with it.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if `data` is shorter than [`HEADER_SIZE`] and
    /// `BadMagic` if the signature is not `"regf"`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(HiveError::out_of_range(0, HEADER_SIZE, data.len()));
        }

        let view = ByteView::new(data, 0);
        view.expect_magic(0, REGF_SIGNATURE, "regf")?;

        let file_format = view.u32(0x20)?;
        let clustering_factor = view.u32(0x2C)?;
        if file_format != 1 || clustering_factor != 1 {
            warn!(file_format, clustering_factor, "Unexpected header constants");
        }

        let major_version = view.u32(0x14)?;
        if major_version != 1 {
            warn!(major_version, "Unsupported hive major version");
        }

        let embedded_filename =
            read_utf16_string(view.bytes(FILE_NAME_OFFSET, FILE_NAME_LENGTH)?, FILE_NAME_OFFSET)
                .unwrap_or_default();

        Ok(HiveHeader {
            primary_sequence: view.u32(0x04)?,
            secondary_sequence: view.u32(0x08)?,
            timestamp: view.u64(0x0C)?,
            major_version,
            minor_version: view.u32(0x18)?,
            hive_type: HiveType::from_u32(view.u32(0x1C)?),
            file_format,
            root_key_offset: view.u32(0x24)?,
            total_hbin_length: view.u32(0x28)?,
            clustering_factor,
            embedded_filename,
            checksum: view.u32(CHECKSUM_OFFSET)?,
            computed_checksum: calculate_checksum(&data[..HEADER_SIZE]),
        })
    }

    /// Returns true if the stored checksum matches the computed one.
    pub fn has_valid_checksum(&self) -> bool {
        self.checksum == self.computed_checksum
    }

    /// Returns true if the hive was cleanly written.
    ///
    /// The hive is consistent when primary and secondary sequence numbers match.
    pub fn is_consistent(&self) -> bool {
        self.primary_sequence == self.secondary_sequence
    }

    /// Absolute offset of the root key record.
    pub fn root_key_absolute_offset(&self) -> Result<usize> {
        cell_offset_to_absolute(self.root_key_offset)
    }

    /// Converts the last written timestamp to a date.
    pub fn last_written_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        filetime_to_datetime(self.timestamp)
    }
}

impl fmt::Display for HiveHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "regf {}.{} {:?} root={:#x} bins={:#x} seq={}/{} checksum={}",
            self.major_version,
            self.minor_version,
            self.embedded_filename,
            self.root_key_offset,
            self.total_hbin_length,
            self.primary_sequence,
            self.secondary_sequence,
            if self.has_valid_checksum() { "ok" } else { "mismatch" }
        )
    }
}
