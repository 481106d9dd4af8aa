//! NMEA 0183 checksum validation.
//!
//! The checksum is the XOR of every byte between the `$` start marker and the
//! `*` delimiter, written as two hex digits after the `*`. The suffix is
//! optional on the wire: a sentence with no `*` carries no checksum and is
//! not rejected. A `*` that is not followed by exactly two hex digits is.

use crate::types::{hex_digit, NmeaError, Result, START_MARKER};

/// Checksum delimiter.
pub const DELIMITER: u8 = b'*';

// ---------------------------------------------------------------------------
// Core checksum functions
// ---------------------------------------------------------------------------

/// XOR of all bytes in `data`.
pub fn xor(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// Split a sentence into its checksummed payload and its checksum suffix.
///
/// The leading `$` is dropped from the payload. The suffix is `None` when the
/// sentence has no `*`.
pub fn split(sentence: &str) -> (&str, Option<&str>) {
    let bytes = sentence.as_bytes();
    let start = usize::from(bytes.first() == Some(&START_MARKER));
    match sentence.find(DELIMITER as char) {
        Some(star) if star >= start => (&sentence[start..star], Some(&sentence[star + 1..])),
        _ => (&sentence[start..], None),
    }
}

/// Parse a two-digit hex checksum suffix. Trailing whitespace is ignored.
pub fn parse_suffix(suffix: &str) -> Option<u8> {
    let suffix = suffix.trim_end();
    match suffix.as_bytes() {
        [high, low] => Some((hex_digit(*high)? << 4) | hex_digit(*low)?),
        _ => None,
    }
}

/// Checksum computed over the payload of `sentence`.
pub fn compute(sentence: &str) -> u8 {
    xor(split(sentence).0.as_bytes())
}

/// Validate the checksum of a sentence.
///
/// `Ok(())` when the suffix matches or is absent.
pub fn validate(sentence: &str) -> Result<()> {
    let (payload, suffix) = split(sentence);
    let Some(suffix) = suffix else {
        return Ok(());
    };
    let expected =
        parse_suffix(suffix).ok_or_else(|| NmeaError::MalformedChecksum(suffix.to_string()))?;
    let actual = xor(payload.as_bytes());
    if expected != actual {
        return Err(NmeaError::InvalidChecksum { expected, actual });
    }
    Ok(())
}

/// True if the sentence's checksum suffix matches (or is absent).
pub fn verify_checksum(sentence: &str) -> bool {
    validate(sentence).is_ok()
}

/// Append a `*HH` suffix computed over `payload` (with or without `$`).
pub fn with_checksum(payload: &str) -> String {
    format!("{payload}*{:02X}", compute(payload))
}

/// Drop the leading `$` and everything from `*` onward.
pub fn strip_checksum(sentence: &str) -> &str {
    split(sentence).0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
