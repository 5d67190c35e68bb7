//! Decoding options.

use encoding_rs::{Encoding, WINDOWS_1252};

/// Options controlling how a hive is decoded.
///
/// # Examples
///
/// ```rust
/// use winkey::HiveOptions;
///
/// let options = HiveOptions::default()
///     .with_ansi_encoding(encoding_rs::WINDOWS_1251)
///     .with_strict_checksum(true);
/// assert!(options.strict_checksum);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HiveOptions {
    /// Code page for key and value names flagged as single-byte.
    pub ansi_encoding: &'static Encoding,

    /// Fail on a header checksum mismatch instead of logging it.
    pub strict_checksum: bool,
}

impl Default for HiveOptions {
    fn default() -> Self {
        Self {
            ansi_encoding: WINDOWS_1252,
            strict_checksum: false,
        }
    }
}

impl HiveOptions {
    /// Sets the code page used for single-byte names.
    pub fn with_ansi_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.ansi_encoding = encoding;
        self
    }

    /// Makes a checksum mismatch fatal.
    pub fn with_strict_checksum(mut self, strict: bool) -> Self {
        self.strict_checksum = strict;
        self
    }
}
