//! Key record (nk) parsing.

use crate::cell::{CellHeader, KeyFlags, CELL_HEADER_SIZE};
use crate::error::Result;
use crate::utils::{filetime_to_datetime, read_name, ByteView, NIL_OFFSET};
use encoding_rs::Encoding;

/// Expected signature for key records.
pub const KEY_SIGNATURE: &[u8; 2] = b"nk";

/// Offset of the key name, relative to the signature.
const KEY_NAME_OFFSET: usize = 0x4C;

/// Key record (nk).
///
/// All offsets are relative to the first hive bin, as stored.
#[derive(Debug, Clone)]
pub struct KeyCell {
    /// Length/allocation header.
    pub header: CellHeader,

    /// Flags for this key.
    pub flags: KeyFlags,

    /// Last written timestamp (Windows FILETIME).
    pub timestamp: u64,

    /// Offset to the parent key.
    pub parent_offset: u32,

    /// Number of subkeys.
    pub number_of_subkeys: u32,

    /// Offset to the subkey list.
    pub subkey_list_offset: u32,

    /// Number of values.
    pub number_of_values: u32,

    /// Offset to the value list.
    pub value_list_offset: u32,

    /// Offset to the security descriptor.
    pub security_offset: u32,

    /// Offset to the class name.
    pub class_name_offset: u32,

    /// Longest subkey name, in bytes.
    pub max_subkey_name_length: u32,

    /// Longest subkey class name, in bytes.
    pub max_class_name_length: u32,

    /// Longest value name, in bytes.
    pub max_value_name_length: u32,

    /// Largest value payload, in bytes.
    pub max_value_data_length: u32,

    /// Byte length of the key name.
    pub key_name_length: u16,

    /// Byte length of the class name.
    pub class_name_length: u16,

    /// Key name.
    pub name: String,
}

impl KeyCell {
    /// Parses a key record.
    ///
    /// `view` must start at the record's length field. The record length is
    /// not checked against the name length; only the buffer bounds are.
    ///
    /// # Errors
    ///
    /// Returns `BadMagic` if the signature is not `"nk"` and `OutOfRange` if
    /// the record runs past the end of the buffer.
    pub fn parse(view: &ByteView<'_>, ansi: &'static Encoding) -> Result<Self> {
        let header = CellHeader::parse(view)?;
        view.expect_magic(CELL_HEADER_SIZE, KEY_SIGNATURE, "nk")?;
        let body = view.at(CELL_HEADER_SIZE);

        let flags = KeyFlags(body.u16(0x02)?);
        let key_name_length = body.u16(0x48)?;
        let name = read_name(
            body.bytes(KEY_NAME_OFFSET, key_name_length as usize)?,
            body.base() + KEY_NAME_OFFSET,
            flags.is_compressed(),
            ansi,
        )?;

        Ok(KeyCell {
            header,
            flags,
            timestamp: body.u64(0x04)?,
            parent_offset: body.u32(0x10)?,
            number_of_subkeys: body.u32(0x14)?,
            subkey_list_offset: body.u32(0x1C)?,
            number_of_values: body.u32(0x24)?,
            value_list_offset: body.u32(0x28)?,
            security_offset: body.u32(0x2C)?,
            class_name_offset: body.u32(0x30)?,
            max_subkey_name_length: body.u32(0x34)?,
            max_class_name_length: body.u32(0x38)?,
            max_value_name_length: body.u32(0x3C)?,
            max_value_data_length: body.u32(0x40)?,
            key_name_length,
            class_name_length: body.u16(0x4A)?,
            name,
        })
    }

    /// Returns true if this key lists any subkeys.
    pub fn has_subkeys(&self) -> bool {
        self.number_of_subkeys > 0 && self.subkey_list_offset != NIL_OFFSET
    }

    /// Returns true if this key has a class name.
    pub fn has_class_name(&self) -> bool {
        self.class_name_offset != NIL_OFFSET && self.class_name_length > 0
    }

    /// Converts the last written timestamp to a date.
    pub fn last_written_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        filetime_to_datetime(self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HiveError;
    use encoding_rs::WINDOWS_1252;

    fn key_record(name: &[u8], flags: u16) -> Vec<u8> {
        let mut data = vec![0u8; CELL_HEADER_SIZE + KEY_NAME_OFFSET];
        data[0..4].copy_from_slice(&(-0x60i32).to_le_bytes());
        data[4..6].copy_from_slice(KEY_SIGNATURE);
        data[6..8].copy_from_slice(&flags.to_le_bytes());
        data[4 + 0x14..4 + 0x18].copy_from_slice(&3u32.to_le_bytes());
        data[4 + 0x48..4 + 0x4A].copy_from_slice(&(name.len() as u16).to_le_bytes());
        data.extend_from_slice(name);
        data
    }

    #[test]
    fn test_parse_compressed_name() {
        let data = key_record(b"Microsoft", KeyFlags::COMP_NAME);
        let key = KeyCell::parse(&ByteView::new(&data, 0), WINDOWS_1252).unwrap();
        assert_eq!(key.name, "Microsoft");
        assert_eq!(key.number_of_subkeys, 3);
        assert!(key.header.is_allocated());
        assert_eq!(key.header.length(), 0x60);
    }

    #[test]
    fn test_parse_utf16_name() {
        let name: Vec<u8> = "Windows NT".encode_utf16().flat_map(u16::to_le_bytes).collect();
        let data = key_record(&name, 0);
        let key = KeyCell::parse(&ByteView::new(&data, 0), WINDOWS_1252).unwrap();
        assert_eq!(key.name, "Windows NT");
    }

    #[test]
    fn test_key_invalid_signature() {
        let mut data = key_record(b"X", KeyFlags::COMP_NAME);
        data[4..6].copy_from_slice(b"XX");
        let err = KeyCell::parse(&ByteView::new(&data, 0), WINDOWS_1252).unwrap_err();
        assert!(matches!(err, HiveError::BadMagic { offset: 0, .. }));
    }

    #[test]
    fn test_key_name_past_end_of_buffer() {
        let mut data = key_record(b"Microsoft", KeyFlags::COMP_NAME);
        data.truncate(data.len() - 2);
        let err = KeyCell::parse(&ByteView::new(&data, 0), WINDOWS_1252).unwrap_err();
        assert!(matches!(err, HiveError::OutOfRange { .. }));
    }
}
