//! Block list (db) parsing.
//!
//! A value payload too large for one cell is split across several blocks.
//! The value's data offset then points at a cell holding a "db" header.

use crate::error::Result;
use crate::utils::ByteView;

/// Expected signature for block list headers.
pub const BLOCK_LIST_SIGNATURE: &[u8; 2] = b"db";

/// Block list header.
///
/// Format:
/// ```text
/// Offset  Size  Description
/// 0x00    2     Signature ("db")
/// 0x02    2     Number of data blocks
/// 0x04    4     Offset to the list of block offsets
/// ```
#[derive(Debug, Clone)]
pub struct BlockListHeader {
    /// Number of data blocks.
    pub num_data_blocks: u16,

    /// Offset to the cell holding the block offsets.
    pub block_list_offset: u32,
}

impl BlockListHeader {
    /// Parses a block list header.
    ///
    /// `view` must start at the signature, right after the cell length field.
    pub fn parse(view: &ByteView<'_>) -> Result<Self> {
        view.expect_magic(0, BLOCK_LIST_SIGNATURE, "db")?;

        Ok(BlockListHeader {
            num_data_blocks: view.u16(0x02)?,
            block_list_offset: view.u32(0x04)?,
        })
    }
}
