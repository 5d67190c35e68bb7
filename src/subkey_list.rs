//! Subkey list parsing (li, lf, lh, ri).
//!
//! A key's subkeys are reached through one of four list records. Three of
//! them point straight at key records; `ri` points at further lists.

use crate::cell::{CellHeader, CELL_HEADER_SIZE};
use crate::error::{HiveError, Result};
use crate::utils::{ByteView, NIL_OFFSET};

/// Signatures accepted for a subkey list.
const LIST_SIGNATURES: &str = "li|lf|lh|ri";

/// Size of the signature and entry count preceding the entries.
const LIST_HEADER_SIZE: usize = 4;

/// Subkey list types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubkeyListType {
    /// Index leaf (li) - plain key offsets.
    IndexLeaf,

    /// Fast leaf (lf) - key offsets with 4-byte name hints.
    FastLeaf,

    /// Hash leaf (lh) - key offsets with name hashes.
    HashLeaf,

    /// Index root (ri) - offsets of further subkey lists.
    IndexRoot,
}

impl SubkeyListType {
    /// Parses a subkey list type from a 2-byte signature.
    pub fn from_signature(sig: &[u8]) -> Option<Self> {
        match sig {
            b"li" => Some(SubkeyListType::IndexLeaf),
            b"lf" => Some(SubkeyListType::FastLeaf),
            b"lh" => Some(SubkeyListType::HashLeaf),
            b"ri" => Some(SubkeyListType::IndexRoot),
            _ => None,
        }
    }

    /// Size in bytes of one entry in a list of this type.
    pub fn entry_size(&self) -> usize {
        match self {
            SubkeyListType::IndexLeaf | SubkeyListType::IndexRoot => 4,
            SubkeyListType::FastLeaf | SubkeyListType::HashLeaf => 8,
        }
    }
}

/// One entry of a subkey list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubkeyListEntry {
    /// `li`: offset to a key.
    Leaf {
        /// Offset to the key record.
        key_offset: u32,
    },

    /// `lf`: offset to a key plus the first four bytes of its name.
    FastLeaf {
        /// Offset to the key record.
        key_offset: u32,
        /// Name prefix hint; not verified.
        name_hint: [u8; 4],
    },

    /// `lh`: offset to a key plus a hash of its name.
    HashLeaf {
        /// Offset to the key record.
        key_offset: u32,
        /// Name hash; not verified.
        name_hash: u32,
    },

    /// `ri`: offset to another subkey list.
    IndexRoot {
        /// Offset to the nested list record.
        list_offset: u32,
    },
}

/// What an entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryTarget {
    /// A key record.
    Key(u32),
    /// A nested subkey list.
    List(u32),
}

impl SubkeyListEntry {
    /// Resolves what this entry points at.
    ///
    /// An entry holding the nil offset points at nothing and yields `None`.
    pub fn target(&self) -> Option<EntryTarget> {
        let target = match *self {
            SubkeyListEntry::Leaf { key_offset }
            | SubkeyListEntry::FastLeaf { key_offset, .. }
            | SubkeyListEntry::HashLeaf { key_offset, .. } => EntryTarget::Key(key_offset),
            SubkeyListEntry::IndexRoot { list_offset } => EntryTarget::List(list_offset),
        };

        match target {
            EntryTarget::Key(NIL_OFFSET) | EntryTarget::List(NIL_OFFSET) => None,
            target => Some(target),
        }
    }
}

/// Parsed subkey list record.
#[derive(Debug, Clone)]
pub struct SubkeyList {
    /// Absolute offset of the record.
    pub offset: usize,

    /// Length/allocation header.
    pub header: CellHeader,

    /// List type, from the signature.
    pub list_type: SubkeyListType,

    /// Entries in stored order.
    pub entries: Vec<SubkeyListEntry>,
}

impl SubkeyList {
    /// Parses a subkey list record.
    ///
    /// `view` must start at the record's length field.
    ///
    /// # Errors
    ///
    /// Returns `BadMagic` if the signature is not one of `li`, `lf`, `lh`, `ri`.
    pub fn parse(view: &ByteView<'_>) -> Result<Self> {
        let header = CellHeader::parse(view)?;
        let body = view.at(CELL_HEADER_SIZE);

        let sig = body.bytes(0, 2)?;
        let list_type = SubkeyListType::from_signature(sig)
            .ok_or_else(|| HiveError::bad_magic(view.base(), LIST_SIGNATURES, sig))?;

        let count = body.u16(2)? as usize;
        let entry_size = list_type.entry_size();

        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let pos = LIST_HEADER_SIZE + i * entry_size;
            let offset = body.u32(pos)?;

            let entry = match list_type {
                SubkeyListType::IndexLeaf => SubkeyListEntry::Leaf { key_offset: offset },
                SubkeyListType::FastLeaf => {
                    let mut name_hint = [0u8; 4];
                    name_hint.copy_from_slice(body.bytes(pos + 4, 4)?);
                    SubkeyListEntry::FastLeaf {
                        key_offset: offset,
                        name_hint,
                    }
                }
                SubkeyListType::HashLeaf => SubkeyListEntry::HashLeaf {
                    key_offset: offset,
                    name_hash: body.u32(pos + 4)?,
                },
                SubkeyListType::IndexRoot => SubkeyListEntry::IndexRoot {
                    list_offset: offset,
                },
            };
            entries.push(entry);
        }

        Ok(SubkeyList {
            offset: view.base(),
            header,
            list_type,
            entries,
        })
    }

    /// Returns the number of entries in this list.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if this list is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if this is an index root (contains sublists).
    pub fn is_index_root(&self) -> bool {
        self.list_type == SubkeyListType::IndexRoot
    }
}
