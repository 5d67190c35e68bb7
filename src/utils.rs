//! Utility functions for binary parsing and string conversion.

use crate::error::{HiveError, Result};
use byteorder::{ByteOrder, LittleEndian};
use encoding_rs::{Encoding, UTF_16LE};

/// Offset where hive bins start (after the base block).
///
/// Every offset stored inside the hive is relative to this position.
pub const HBIN_START_OFFSET: usize = 0x1000;

/// Offset value used by the format to mean "no cell".
pub const NIL_OFFSET: u32 = 0xFFFF_FFFF;

/// Read-only view of a record at a fixed absolute offset in the hive buffer.
///
/// Reads are addressed relative to the start of the record but are bounds
/// checked against the whole buffer, so errors report absolute offsets.
#[derive(Debug, Clone, Copy)]
pub struct ByteView<'a> {
    data: &'a [u8],
    base: usize,
}

impl<'a> ByteView<'a> {
    /// Creates a view of `data` starting at absolute offset `base`.
    pub fn new(data: &'a [u8], base: usize) -> Self {
        Self { data, base }
    }

    /// Absolute offset of the start of this view.
    pub fn base(&self) -> usize {
        self.base
    }

    /// Returns a view shifted `delta` bytes further into the buffer.
    pub fn at(&self, delta: usize) -> Self {
        Self {
            data: self.data,
            base: self.base.saturating_add(delta),
        }
    }

    /// Returns `len` bytes at relative position `pos`.
    pub fn bytes(&self, pos: usize, len: usize) -> Result<&'a [u8]> {
        let start = self.base.saturating_add(pos);
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| HiveError::out_of_range(start, len, self.data.len()))?;
        Ok(&self.data[start..end])
    }

    /// Reads a little-endian u16 at relative position `pos`.
    pub fn u16(&self, pos: usize) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.bytes(pos, 2)?))
    }

    /// Reads a little-endian u32 at relative position `pos`.
    pub fn u32(&self, pos: usize) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.bytes(pos, 4)?))
    }

    /// Reads a little-endian i32 at relative position `pos`.
    pub fn i32(&self, pos: usize) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.bytes(pos, 4)?))
    }

    /// Reads a little-endian u64 at relative position `pos`.
    pub fn u64(&self, pos: usize) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.bytes(pos, 8)?))
    }

    /// Checks the signature at relative position `pos`.
    ///
    /// A mismatch is reported at the start of the view, which is the offset
    /// the record was resolved from.
    pub fn expect_magic(&self, pos: usize, magic: &[u8], expected: &'static str) -> Result<()> {
        let found = self.bytes(pos, magic.len())?;
        if found != magic {
            return Err(HiveError::bad_magic(self.base, expected, found));
        }
        Ok(())
    }
}

/// Reads a string in a single-byte code page, trimming null terminators.
///
/// Names flagged as "compressed" are stored this way; the code page is
/// configurable and defaults to windows-1252.
pub fn read_ansi_string(data: &[u8], encoding: &'static Encoding) -> String {
    let (decoded, _had_errors) = encoding.decode_without_bom_handling(data);
    decoded.trim_end_matches('\0').to_string()
}

/// Reads a UTF-16LE string from a byte slice, trimming null terminators.
///
/// # Errors
///
/// Returns an error if the data length is odd or the UTF-16 decoding fails.
pub fn read_utf16_string(data: &[u8], offset: usize) -> Result<String> {
    if data.is_empty() {
        return Ok(String::new());
    }

    if data.len() % 2 != 0 {
        return Err(HiveError::InvalidUtf16 { offset });
    }

    // A leading U+FEFF is part of the name, not a byte-order mark
    let decoded = UTF_16LE
        .decode_without_bom_handling_and_without_replacement(data)
        .ok_or(HiveError::InvalidUtf16 { offset })?;

    Ok(decoded.trim_end_matches('\0').to_string())
}

/// Reads a name whose width is chosen by a flag bit.
pub fn read_name(
    data: &[u8],
    offset: usize,
    compressed: bool,
    encoding: &'static Encoding,
) -> Result<String> {
    if compressed {
        Ok(read_ansi_string(data, encoding))
    } else {
        read_utf16_string(data, offset)
    }
}

/// Calculates the XOR checksum of the first 127 little-endian dwords.
///
/// The 128th dword of the 512-byte header region is the stored checksum
/// itself and is excluded.
pub fn calculate_checksum(data: &[u8]) -> u32 {
    data.chunks_exact(4)
        .take(127)
        .fold(0u32, |checksum, dword| checksum ^ LittleEndian::read_u32(dword))
}

/// Converts a relative cell offset to an absolute hive offset.
///
/// # Errors
///
/// Returns `HiveError::OutOfRange` if the addition would overflow.
#[inline]
pub fn cell_offset_to_absolute(cell_offset: u32) -> Result<usize> {
    (cell_offset as usize)
        .checked_add(HBIN_START_OFFSET)
        .ok_or_else(|| HiveError::out_of_range(cell_offset as usize, 0, 0))
}

/// Converts a Windows FILETIME to a UTC date.
pub fn filetime_to_datetime(filetime: u64) -> Option<chrono::DateTime<chrono::Utc>> {
    // FILETIME counts 100-nanosecond intervals since 1601-01-01
    const FILETIME_UNIX_DIFF: i64 = 11_644_473_600;

    let seconds = (filetime / 10_000_000) as i64 - FILETIME_UNIX_DIFF;
    let nanos = ((filetime % 10_000_000) * 100) as u32;

    chrono::DateTime::from_timestamp(seconds, nanos)
}
