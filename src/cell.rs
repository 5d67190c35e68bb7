//! Cell headers, key flags and value types.
//!
//! Every variable-length record in a hive starts with a signed 32-bit length.
//! A negative length marks the cell as allocated; its magnitude is the size
//! of the cell in bytes, including the length field itself.

use crate::error::Result;
use crate::utils::ByteView;
use std::fmt;

/// Size of the signed length field preceding every cell.
pub const CELL_HEADER_SIZE: usize = 4;

/// Length/allocation header shared by all cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellHeader {
    /// Raw signed length.
    pub raw_length: i32,
}

impl CellHeader {
    /// Reads the header at the start of `view`.
    pub fn parse(view: &ByteView<'_>) -> Result<Self> {
        Ok(Self {
            raw_length: view.i32(0)?,
        })
    }

    /// Byte length of the cell (magnitude of the raw length).
    pub fn length(&self) -> u32 {
        self.raw_length.unsigned_abs()
    }

    /// Returns true if the cell is in use.
    pub fn is_allocated(&self) -> bool {
        self.raw_length < 0
    }
}

/// Flag bits of a key record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyFlags(pub u16);

impl KeyFlags {
    /// Not persisted to disk.
    pub const VOLATILE: u16 = 0x0001;
    /// Mount point of another hive.
    pub const HIVE_EXIT: u16 = 0x0002;
    /// Root of this hive.
    pub const HIVE_ENTRY: u16 = 0x0004;
    /// Undeletable.
    pub const NO_DELETE: u16 = 0x0008;
    /// Symbolic link; the target lives in a value.
    pub const SYM_LINK: u16 = 0x0010;
    /// Name stored one byte per character.
    pub const COMP_NAME: u16 = 0x0020;
    /// Predefined handle.
    pub const PREDEF_HANDLE: u16 = 0x0040;

    /// Tests a single flag bit.
    pub fn has_flag(&self, flag: u16) -> bool {
        self.0 & flag == flag
    }

    /// True when the name is stored one byte per character.
    pub fn is_compressed(&self) -> bool {
        self.has_flag(Self::COMP_NAME)
    }

    /// True for the hive's root key.
    pub fn is_root(&self) -> bool {
        self.has_flag(Self::HIVE_ENTRY)
    }
}

/// `REG_*` names of the predefined type tags, indexed by tag.
const TYPE_NAMES: [&str; 12] = [
    "REG_NONE",
    "REG_SZ",
    "REG_EXPAND_SZ",
    "REG_BINARY",
    "REG_DWORD",
    "REG_DWORD_BIG_ENDIAN",
    "REG_LINK",
    "REG_MULTI_SZ",
    "REG_RESOURCE_LIST",
    "REG_FULL_RESOURCE_DESCRIPTOR",
    "REG_RESOURCE_REQUIREMENTS_LIST",
    "REG_QWORD",
];

/// Declared type of a value's payload.
///
/// The decoder never interprets payloads; the type is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ValueType {
    /// No declared type.
    None,
    /// Null-terminated UTF-16 string.
    String,
    /// UTF-16 string with unexpanded environment references.
    ExpandString,
    /// Opaque bytes.
    Binary,
    /// Little-endian u32.
    Dword,
    /// Big-endian u32.
    DwordBigEndian,
    /// UTF-16 symbolic link target.
    Link,
    /// Sequence of null-terminated UTF-16 strings.
    MultiString,
    /// Hardware resource list.
    ResourceList,
    /// Hardware resource descriptor.
    FullResourceDescriptor,
    /// Hardware resource requirements.
    ResourceRequirementsList,
    /// Little-endian u64.
    Qword,
    /// Any other tag, kept as stored.
    Unknown(u32),
}

impl ValueType {
    /// Maps a raw type tag to a value type.
    pub fn from_u32(tag: u32) -> Self {
        use ValueType::*;
        match tag {
            0 => None,
            1 => String,
            2 => ExpandString,
            3 => Binary,
            4 => Dword,
            5 => DwordBigEndian,
            6 => Link,
            7 => MultiString,
            8 => ResourceList,
            9 => FullResourceDescriptor,
            10 => ResourceRequirementsList,
            11 => Qword,
            other => Unknown(other),
        }
    }

    /// Returns the raw type tag.
    pub fn tag(&self) -> u32 {
        use ValueType::*;
        match *self {
            None => 0,
            String => 1,
            ExpandString => 2,
            Binary => 3,
            Dword => 4,
            DwordBigEndian => 5,
            Link => 6,
            MultiString => 7,
            ResourceList => 8,
            FullResourceDescriptor => 9,
            ResourceRequirementsList => 10,
            Qword => 11,
            Unknown(tag) => tag,
        }
    }

    /// Returns the `REG_*` name, if the tag is a predefined one.
    pub fn name(&self) -> Option<&'static str> {
        TYPE_NAMES.get(self.tag() as usize).copied()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "type {:#x}", self.tag()),
        }
    }
}
