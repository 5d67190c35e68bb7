//! # Windows Registry Hive Decoder
//!
//! Decodes Windows NT registry hive images held in memory and recovers the
//! Windows product key stored in a SOFTWARE hive.
//!
//! The crate never performs I/O: every operation works on a byte buffer the
//! caller has already loaded, and every key or value is a view that borrows
//! that buffer.
//!
//! ## Binary Layout
//!
//! ```text
//! [Header]
//!   - Signature: "regf"
//!   - Sequence numbers, timestamp, version
//!   - Root key offset (relative to 0x1000)
//!   - XOR checksum of the first 127 dwords
//!
//! [Hive Bins - starting at 0x1000]
//!   [Cells - variable size]
//!     [Length - 4 bytes, negative if allocated]
//!     [Record]
//!       - Keys (nk)
//!       - Values (vk)
//!       - Subkey lists (li/lf/lh/ri)
//!       - Block lists (db)
//! ```
//!
//! ## Examples
//!
//! ```no_run
//! use winkey::Hive;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("SOFTWARE")?;
//! let hive = Hive::from_bytes(&data)?;
//!
//! match hive.windows_product_key()? {
//!     Some(key) => println!("Windows key: {}", key),
//!     None => println!("Key not found"),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bigdata;
pub mod cell;
pub mod error;
pub mod header;
pub mod hive;
pub mod key;
pub mod options;
pub mod product_key;
pub mod subkey_list;
pub mod utils;
pub mod value;

pub use cell::{CellHeader, KeyFlags, ValueType};
pub use error::{HiveError, Result};
pub use header::{HiveHeader, HiveType};
pub use hive::{Hive, Key, Value};
pub use key::KeyCell;
pub use options::HiveOptions;
pub use product_key::{decode_product_id, find_windows_key};
pub use subkey_list::{SubkeyList, SubkeyListEntry, SubkeyListType};
pub use value::{ValueCell, ValueOffsetsList};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
