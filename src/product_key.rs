//! Windows product key recovery.
//!
//! The `DigitalProductId` value under
//! `Microsoft\Windows NT\CurrentVersion` embeds the product key as a
//! 15-byte little-endian integer. Written out in base 24 over a reduced
//! alphabet, it gives the familiar `XXXXX-XXXXX-XXXXX-XXXXX-XXXXX` form.

use crate::error::{HiveError, Result};
use crate::hive::Key;
use std::ops::Range;
use tracing::{debug, instrument};

/// Symbols of the base-24 product key alphabet.
pub const PRODUCT_KEY_DIGITS: &[u8; 24] = b"BCDFGHJKMPQRTVWXY2346789";

/// Length of the encoded product key in bytes.
pub const ENCODED_KEY_LENGTH: usize = 15;

/// Location of the encoded key inside a `DigitalProductId` payload.
pub const PRODUCT_ID_KEY_RANGE: Range<usize> = 52..67;

/// Key path, from the root of a SOFTWARE hive, holding the product id.
pub const WINDOWS_KEY_PATH: [&str; 3] = ["Microsoft", "Windows NT", "CurrentVersion"];

/// Name of the value holding the product id.
pub const DIGITAL_PRODUCT_ID: &str = "DigitalProductId";

const SYMBOLS: usize = 25;
const GROUP_SIZE: usize = 5;

/// Decodes an encoded product key into its `XXXXX-XXXXX-XXXXX-XXXXX-XXXXX` form.
///
/// The input is left untouched; the division works on a private copy.
///
/// # Examples
///
/// ```rust
/// use winkey::decode_product_id;
///
/// assert_eq!(decode_product_id(&[0; 15]), "BBBBB-BBBBB-BBBBB-BBBBB-BBBBB");
/// ```
pub fn decode_product_id(encoded: &[u8; ENCODED_KEY_LENGTH]) -> String {
    let mut scratch = *encoded;
    let mut symbols = [0u8; SYMBOLS];

    for i in (0..SYMBOLS).rev() {
        // Long division by 24, most significant byte first
        let mut remainder = 0u32;
        for byte in scratch.iter_mut().rev() {
            let dividend = (remainder << 8) | u32::from(*byte);
            *byte = (dividend / 24) as u8;
            remainder = dividend % 24;
        }
        symbols[i] = PRODUCT_KEY_DIGITS[remainder as usize];
    }

    let mut key = String::with_capacity(SYMBOLS + SYMBOLS / GROUP_SIZE - 1);
    for (i, &symbol) in symbols.iter().enumerate() {
        if i != 0 && i % GROUP_SIZE == 0 {
            key.push('-');
        }
        key.push(char::from(symbol));
    }
    key
}

/// Finds and decodes the Windows product key below `root`.
///
/// Walks [`WINDOWS_KEY_PATH`] case-insensitively and decodes the
/// [`DIGITAL_PRODUCT_ID`] value found there. A missing key or value is
/// `Ok(None)`; only a malformed hive is an error.
///
/// # Errors
///
/// Returns `TruncatedData` if the product id is too short to hold a key.
#[instrument(skip(root), fields(root = root.name()))]
pub fn find_windows_key(root: &Key<'_>) -> Result<Option<String>> {
    let mut key = None;
    for segment in WINDOWS_KEY_PATH {
        let parent = key.as_ref().unwrap_or(root);
        match parent.subkey(segment)? {
            Some(subkey) => key = Some(subkey),
            None => {
                debug!(segment, "Key path segment not found");
                return Ok(None);
            }
        }
    }

    let Some(key) = key else {
        return Ok(None);
    };

    let Some(value) = key.value(DIGITAL_PRODUCT_ID)? else {
        debug!("No DigitalProductId value");
        return Ok(None);
    };

    let data = value.data()?;
    let encoded: &[u8; ENCODED_KEY_LENGTH] = data
        .get(PRODUCT_ID_KEY_RANGE)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| {
            HiveError::truncated(value.offset(), PRODUCT_ID_KEY_RANGE.end, data.len())
        })?;

    Ok(Some(decode_product_id(encoded)))
}
