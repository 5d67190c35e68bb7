//! Hive navigation over an in-memory buffer.
//!
//! [`Hive`] borrows the raw file image and never copies it. Keys and values
//! are resolved on demand from offsets stored in the buffer; each [`Key`]
//! and [`Value`] is a small view that borrows the hive it came from.

use crate::bigdata::BlockListHeader;
use crate::cell::{CellHeader, KeyFlags, ValueType, CELL_HEADER_SIZE};
use crate::error::{HiveError, Result};
use crate::header::HiveHeader;
use crate::key::KeyCell;
use crate::options::HiveOptions;
use crate::product_key::find_windows_key;
use crate::subkey_list::{EntryTarget, SubkeyList};
use crate::utils::{cell_offset_to_absolute, read_utf16_string, ByteView, NIL_OFFSET};
use crate::value::{ValueCell, ValueOffsetsList};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// Size of a block's length field plus the trailing slack excluded from its payload.
const BLOCK_OVERHEAD: usize = 8;

/// A registry hive decoded from a byte buffer.
pub struct Hive<'a> {
    data: &'a [u8],
    header: HiveHeader,
    options: HiveOptions,
}

impl<'a> Hive<'a> {
    /// Parses the header of a hive image with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is too short for a header or the
    /// signature is not `"regf"`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use winkey::Hive;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let data = std::fs::read("SOFTWARE")?;
    /// let hive = Hive::from_bytes(&data)?;
    /// for key in hive.root_key()?.subkeys()? {
    ///     println!("{}", key.name());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_bytes(data: &'a [u8]) -> Result<Self> {
        Self::with_options(data, HiveOptions::default())
    }

    /// Parses the header of a hive image.
    ///
    /// A checksum mismatch is logged and parsing continues, unless
    /// `options.strict_checksum` is set.
    #[instrument(skip(data, options), fields(size = data.len()))]
    pub fn with_options(data: &'a [u8], options: HiveOptions) -> Result<Self> {
        info!("Parsing registry hive");
        let header = HiveHeader::parse(data)?;
        debug!(%header, "Parsed header");

        if !header.has_valid_checksum() {
            if options.strict_checksum {
                return Err(HiveError::ChecksumMismatch {
                    stored: header.checksum,
                    computed: header.computed_checksum,
                });
            }
            warn!(
                stored = %format!("{:#x}", header.checksum),
                computed = %format!("{:#x}", header.computed_checksum),
                "Header checksum mismatch"
            );
        }

        Ok(Self {
            data,
            header,
            options,
        })
    }

    /// Returns the parsed header.
    pub fn header(&self) -> &HiveHeader {
        &self.header
    }

    /// Returns true if the stored header checksum is correct.
    pub fn has_valid_checksum(&self) -> bool {
        self.header.has_valid_checksum()
    }

    /// Returns the options this hive was opened with.
    pub fn options(&self) -> &HiveOptions {
        &self.options
    }

    /// Returns the underlying buffer.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the root key of the hive.
    #[instrument(skip(self))]
    pub fn root_key(&self) -> Result<Key<'_>> {
        let offset = self.header.root_key_absolute_offset()?;
        debug!(offset = %format!("{:#x}", offset), "Accessing root key");
        self.read_key(offset)
    }

    /// Reads the key record at an absolute offset.
    pub fn read_key(&self, absolute_offset: usize) -> Result<Key<'_>> {
        debug!(offset = %format!("{:#x}", absolute_offset), "Reading key");
        let cell = KeyCell::parse(&self.view(absolute_offset), self.options.ansi_encoding)?;
        Ok(Key {
            hive: self,
            offset: absolute_offset,
            cell,
        })
    }

    /// Reads the value record at an absolute offset.
    pub fn read_value(&self, absolute_offset: usize) -> Result<Value<'_>> {
        debug!(offset = %format!("{:#x}", absolute_offset), "Reading value");
        let cell = ValueCell::parse(&self.view(absolute_offset), self.options.ansi_encoding)?;
        Ok(Value {
            hive: self,
            offset: absolute_offset,
            cell,
        })
    }

    /// Walks a backslash-separated path of key names from the root.
    ///
    /// Matching is case-insensitive. Returns `None` as soon as a segment is
    /// missing.
    pub fn open_key(&self, path: &str) -> Result<Option<Key<'_>>> {
        let mut key = self.root_key()?;
        for segment in path.split('\\').filter(|s| !s.is_empty()) {
            match key.subkey(segment)? {
                Some(subkey) => key = subkey,
                None => return Ok(None),
            }
        }
        Ok(Some(key))
    }

    /// Looks up and decodes the Windows product key stored in this hive.
    pub fn windows_product_key(&self) -> Result<Option<String>> {
        find_windows_key(&self.root_key()?)
    }

    /// Lists the subkeys of a key record, flattening `ri` indirections.
    ///
    /// Keys come back in the order met by a depth-first walk of the lists.
    /// A key without subkeys never has its list offset dereferenced.
    ///
    /// # Errors
    ///
    /// Returns `Unreachable` for an entry holding the nil offset and
    /// `CycleDetected` if a list is reached twice.
    pub fn enumerate_subkeys(&self, key: &KeyCell) -> Result<Vec<Key<'_>>> {
        if !key.has_subkeys() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut visited = HashSet::new();
        let mut pending = vec![key.subkey_list_offset];

        while let Some(list_offset) = pending.pop() {
            let view = self.resolve(list_offset)?;
            if !visited.insert(view.base()) {
                return Err(HiveError::CycleDetected {
                    offset: view.base(),
                });
            }

            let list = SubkeyList::parse(&view)?;
            debug!(
                offset = %format!("{:#x}", list.offset),
                list_type = ?list.list_type,
                entries = list.len(),
                "Read subkey list"
            );

            let mut nested = Vec::new();
            for (index, entry) in list.entries.iter().enumerate() {
                match entry.target() {
                    Some(EntryTarget::List(offset)) => nested.push(offset),
                    Some(EntryTarget::Key(offset)) => {
                        keys.push(self.read_key(cell_offset_to_absolute(offset)?)?)
                    }
                    None => {
                        return Err(HiveError::Unreachable {
                            offset: list.offset,
                            index,
                        })
                    }
                }
            }

            // Popped in stored order
            pending.extend(nested.into_iter().rev());
        }

        Ok(keys)
    }

    /// Lists the values of a key record, in stored order.
    ///
    /// A key with no values never has its value list offset dereferenced.
    pub fn enumerate_values(&self, key: &KeyCell) -> Result<Vec<Value<'_>>> {
        if key.number_of_values == 0 {
            return Ok(Vec::new());
        }

        let list = ValueOffsetsList::parse(
            &self.resolve(key.value_list_offset)?,
            key.number_of_values,
        )?;

        list.offsets
            .iter()
            .map(|&offset| self.read_value(cell_offset_to_absolute(offset)?))
            .collect()
    }

    /// Resolves the payload of a value record.
    ///
    /// Handles inline payloads, payloads stored in a single cell, and
    /// payloads split across a block list.
    pub fn resolve_data(&self, value: &ValueCell) -> Result<Vec<u8>> {
        let length = value.data_length() as usize;

        if value.is_inline() {
            return Ok(self.view(value.inline_data_offset).bytes(0, length)?.to_vec());
        }

        if length == 0 {
            return Ok(Vec::new());
        }

        let view = self.resolve(value.offset_to_data)?;
        let header = CellHeader::parse(&view)?;

        if length > header.length() as usize {
            return self.read_big_data(&view, length);
        }

        Ok(view.bytes(CELL_HEADER_SIZE, length)?.to_vec())
    }

    /// Assembles a payload from the blocks named by a "db" header.
    fn read_big_data(&self, view: &ByteView<'a>, length: usize) -> Result<Vec<u8>> {
        let db = BlockListHeader::parse(&view.at(CELL_HEADER_SIZE))?;
        debug!(
            offset = %format!("{:#x}", view.base()),
            blocks = db.num_data_blocks,
            length,
            "Reading block list"
        );

        let list = self.resolve(db.block_list_offset)?;
        let mut data = Vec::with_capacity(length.min(self.data.len()));

        for i in 0..db.num_data_blocks as usize {
            let block = self.resolve(list.u32(CELL_HEADER_SIZE + i * 4)?)?;
            let header = CellHeader::parse(&block)?;
            let block_length = (header.length() as usize)
                .checked_sub(BLOCK_OVERHEAD)
                .ok_or(HiveError::InvalidCellSize {
                    size: header.raw_length,
                    offset: block.base(),
                })?;
            data.extend_from_slice(block.bytes(CELL_HEADER_SIZE, block_length)?);
        }

        if data.len() < length {
            return Err(HiveError::truncated(view.base(), length, data.len()));
        }
        data.truncate(length);

        Ok(data)
    }

    fn view(&self, absolute_offset: usize) -> ByteView<'a> {
        ByteView::new(self.data, absolute_offset)
    }

    fn resolve(&self, cell_offset: u32) -> Result<ByteView<'a>> {
        Ok(self.view(cell_offset_to_absolute(cell_offset)?))
    }
}

impl fmt::Debug for Hive<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hive")
            .field("size", &self.data.len())
            .field("header", &self.header)
            .field("options", &self.options)
            .finish()
    }
}

/// A key resolved from a hive.
pub struct Key<'h> {
    hive: &'h Hive<'h>,
    offset: usize,
    cell: KeyCell,
}

impl<'h> Key<'h> {
    /// Absolute offset of the key record.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the raw key record.
    pub fn cell(&self) -> &KeyCell {
        &self.cell
    }

    /// Returns the key name.
    pub fn name(&self) -> &str {
        &self.cell.name
    }

    /// Returns the key flags.
    pub fn flags(&self) -> KeyFlags {
        self.cell.flags
    }

    /// Last written timestamp (Windows FILETIME).
    pub fn timestamp(&self) -> u64 {
        self.cell.timestamp
    }

    /// Last written timestamp as a date.
    pub fn last_written_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.cell.last_written_datetime()
    }

    /// Returns the number of subkeys.
    pub fn subkey_count(&self) -> u32 {
        self.cell.number_of_subkeys
    }

    /// Returns the number of values.
    pub fn value_count(&self) -> u32 {
        self.cell.number_of_values
    }

    /// Returns the subkeys of this key.
    pub fn subkeys(&self) -> Result<Vec<Key<'h>>> {
        self.hive.enumerate_subkeys(&self.cell)
    }

    /// Returns the values of this key.
    pub fn values(&self) -> Result<Vec<Value<'h>>> {
        self.hive.enumerate_values(&self.cell)
    }

    /// Finds a subkey by name, ignoring case.
    pub fn subkey(&self, name: &str) -> Result<Option<Key<'h>>> {
        Ok(self
            .subkeys()?
            .into_iter()
            .find(|key| names_match(key.name(), name)))
    }

    /// Finds a value by name, ignoring case.
    pub fn value(&self, name: &str) -> Result<Option<Value<'h>>> {
        Ok(self
            .values()?
            .into_iter()
            .find(|value| names_match(value.name(), name)))
    }

    /// Returns the class name of this key, if it has one.
    pub fn class_name(&self) -> Result<Option<String>> {
        if !self.cell.has_class_name() {
            return Ok(None);
        }

        let view = self.hive.resolve(self.cell.class_name_offset)?;
        let bytes = view.bytes(CELL_HEADER_SIZE, self.cell.class_name_length as usize)?;
        read_utf16_string(bytes, view.base() + CELL_HEADER_SIZE).map(Some)
    }

    /// Returns the parent key, or `None` for the hive root.
    pub fn parent(&self) -> Result<Option<Key<'h>>> {
        if self.cell.flags.is_root() || self.cell.parent_offset == NIL_OFFSET {
            return Ok(None);
        }

        self.hive
            .read_key(cell_offset_to_absolute(self.cell.parent_offset)?)
            .map(Some)
    }
}

impl fmt::Debug for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("offset", &format_args!("{:#x}", self.offset))
            .field("cell", &self.cell)
            .finish()
    }
}

/// A value resolved from a hive.
pub struct Value<'h> {
    hive: &'h Hive<'h>,
    offset: usize,
    cell: ValueCell,
}

impl<'h> Value<'h> {
    /// Absolute offset of the value record.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the raw value record.
    pub fn cell(&self) -> &ValueCell {
        &self.cell
    }

    /// Returns the value name.
    pub fn name(&self) -> &str {
        &self.cell.name
    }

    /// Returns the declared value type.
    pub fn value_type(&self) -> ValueType {
        self.cell.value_type
    }

    /// Payload length in bytes.
    pub fn data_length(&self) -> u32 {
        self.cell.data_length()
    }

    /// Resolves the payload bytes.
    pub fn data(&self) -> Result<Vec<u8>> {
        self.hive.resolve_data(&self.cell)
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("offset", &format_args!("{:#x}", self.offset))
            .field("cell", &self.cell)
            .finish()
    }
}

fn names_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_match() {
        assert!(names_match("CurrentVersion", "currentversion"));
        assert!(names_match("\u{c4}rger", "\u{e4}RGER"));
        assert!(!names_match("Windows", "Windows NT"));
    }
}
