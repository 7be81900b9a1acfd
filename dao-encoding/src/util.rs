//! Hex string helpers.
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HexError {
    #[error("invalid hex string")]
    InvalidHex,

    #[error("the hex string has an odd length")]
    OddLength,
}

/// Ensures that a hex string has the `0x` prefix.
pub fn ensure_0x(value: &str) -> String {
    if value.starts_with("0x") {
        value.to_owned()
    } else {
        format!("0x{}", value)
    }
}

/// Strips the `0x` prefix from a hex string, if any.
pub fn strip_0x(value: &str) -> &str {
    value.strip_prefix("0x").unwrap_or(value)
}

/// Decodes a hex string, with or without `0x`, into bytes.
///
/// An empty string (or a lone `0x`) decodes to an empty buffer.
pub fn hex_to_bytes(hex_string: &str) -> Result<Vec<u8>, HexError> {
    let digits = strip_0x(hex_string);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(HexError::InvalidHex);
    }
    if digits.len() % 2 != 0 {
        return Err(HexError::OddLength);
    }
    hex::decode(digits).map_err(|_| HexError::InvalidHex)
}

/// Encodes bytes as a lowercase hex string, prefixed with `0x` unless
/// `skip_0x` is set.
pub fn bytes_to_hex(bytes: &[u8], skip_0x: bool) -> String {
    let digits = hex::encode(bytes);
    if skip_0x {
        digits
    } else {
        ensure_0x(&digits)
    }
}

pub(crate) fn is_hex_of_len(s: &str, len: usize) -> bool {
    s.len() == len && s.chars().all(|c| c.is_ascii_hexdigit())
}
