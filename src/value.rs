//! Value record (vk) and value list parsing.

use crate::cell::{CellHeader, ValueType, CELL_HEADER_SIZE};
use crate::error::{HiveError, Result};
use crate::utils::{read_name, ByteView};
use encoding_rs::Encoding;

/// Expected signature for value records.
pub const VALUE_SIGNATURE: &[u8; 2] = b"vk";

/// Top bit of the data length: payload lives inside the value record.
pub const DATA_INLINE_FLAG: u32 = 0x8000_0000;

/// Value name flag: name is stored in a single-byte code page.
pub const VALUE_COMP_NAME: u16 = 0x0001;

const DATA_OFFSET_FIELD: usize = 0x08;
const VALUE_NAME_OFFSET: usize = 0x14;

/// Value record (vk).
#[derive(Debug, Clone)]
pub struct ValueCell {
    /// Length/allocation header.
    pub header: CellHeader,

    /// Byte length of the value name.
    pub name_length: u16,

    /// Raw data length; the top bit marks inline storage.
    pub raw_data_length: u32,

    /// Offset to the payload, relative to the first hive bin.
    pub offset_to_data: u32,

    /// Absolute offset where an inline payload starts.
    pub inline_data_offset: usize,

    /// Declared value type.
    pub value_type: ValueType,

    /// Flags (0x0001 = name is stored in a single-byte code page).
    pub flags: u16,

    /// Value name. Empty for the default value.
    pub name: String,
}

impl ValueCell {
    /// Parses a value record.
    ///
    /// `view` must start at the record's length field.
    ///
    /// # Errors
    ///
    /// Returns `BadMagic` if the signature is not `"vk"`.
    pub fn parse(view: &ByteView<'_>, ansi: &'static Encoding) -> Result<Self> {
        let header = CellHeader::parse(view)?;
        view.expect_magic(CELL_HEADER_SIZE, VALUE_SIGNATURE, "vk")?;
        let body = view.at(CELL_HEADER_SIZE);

        let name_length = body.u16(0x02)?;
        let flags = body.u16(0x10)?;
        let name = read_name(
            body.bytes(VALUE_NAME_OFFSET, name_length as usize)?,
            body.base() + VALUE_NAME_OFFSET,
            flags & VALUE_COMP_NAME != 0,
            ansi,
        )?;

        Ok(ValueCell {
            header,
            name_length,
            raw_data_length: body.u32(0x04)?,
            offset_to_data: body.u32(DATA_OFFSET_FIELD)?,
            inline_data_offset: body.base() + DATA_OFFSET_FIELD,
            value_type: ValueType::from_u32(body.u32(0x0C)?),
            flags,
            name,
        })
    }

    /// Returns true if the payload is stored in the record itself.
    pub fn is_inline(&self) -> bool {
        self.raw_data_length & DATA_INLINE_FLAG != 0
    }

    /// Payload length in bytes, without the inline flag.
    pub fn data_length(&self) -> u32 {
        self.raw_data_length & !DATA_INLINE_FLAG
    }
}

/// List of value record offsets belonging to one key.
#[derive(Debug, Clone)]
pub struct ValueOffsetsList {
    /// Length/allocation header.
    pub header: CellHeader,

    /// Offsets to value records, in stored order.
    pub offsets: Vec<u32>,
}

impl ValueOffsetsList {
    /// Parses a value list holding `count` offsets.
    ///
    /// # Errors
    ///
    /// Returns `TruncatedData` if the record is too small for `count` offsets.
    pub fn parse(view: &ByteView<'_>, count: u32) -> Result<Self> {
        let header = CellHeader::parse(view)?;

        let needed = CELL_HEADER_SIZE + count as usize * 4;
        if (header.length() as usize) < needed {
            return Err(HiveError::truncated(
                view.base(),
                needed,
                header.length() as usize,
            ));
        }

        let offsets = (0..count as usize)
            .map(|i| view.u32(CELL_HEADER_SIZE + i * 4))
            .collect::<Result<Vec<_>>>()?;

        Ok(ValueOffsetsList { header, offsets })
    }
}
