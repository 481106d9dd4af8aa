//! Decode NMEA sentences into typed records.
//!
//! Only GGA (position fix) has a structured decoder. Every other recognized
//! formatter decodes to `Decoded::Unsupported`, and anything else to
//! `Decoded::Unrecognized`; neither is an error.
//!
//! GGA field layout (index 0 is the address):
//!
//! | Idx | Field                 | Idx | Field                  |
//! |-----|-----------------------|-----|------------------------|
//! | 1   | UTC time `hhmmss.ss`  | 8   | horizontal dilution    |
//! | 2   | latitude `ddmm.mmmm`  | 9   | altitude               |
//! | 3   | N/S                   | 10  | altitude unit          |
//! | 4   | longitude `dddmm.mmm` | 11  | geoid separation       |
//! | 5   | E/W                   | 12  | geoid separation unit  |
//! | 6   | fix quality           | 13  | age of DGPS correction |
//! | 7   | satellites in use     | 14  | DGPS station id        |

use std::str::FromStr;

use serde_json::{Map, Value};

use crate::checksum;
use crate::types::*;

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Text field at `index`, empty when absent.
fn text_field(fields: &[&str], index: usize) -> String {
    fields.get(index).map(|f| f.to_string()).unwrap_or_default()
}

/// Numeric field at `index`, zero when absent or empty.
fn numeric_field<T>(fields: &[&str], index: usize, field: &'static str) -> Result<T>
where
    T: FromStr + Default,
{
    let raw = match fields.get(index) {
        Some(raw) if !raw.trim().is_empty() => raw.trim(),
        _ => return Ok(T::default()),
    };
    raw.parse().map_err(|_| NmeaError::MalformedField {
        field,
        index,
        raw: raw.to_string(),
    })
}

/// Floating-point field at `index`, zero when absent or empty. `NaN` and
/// infinities are malformed.
fn float_field(fields: &[&str], index: usize, field: &'static str) -> Result<f64> {
    let value: f64 = numeric_field(fields, index, field)?;
    if value.is_finite() {
        return Ok(value);
    }
    Err(NmeaError::MalformedField {
        field,
        index,
        raw: fields.get(index).map(|f| f.trim().to_string()).unwrap_or_default(),
    })
}

// ---------------------------------------------------------------------------
// Main decode functions
// ---------------------------------------------------------------------------

/// Decode the comma-separated GGA body (checksum already stripped).
pub fn decode_gga(body: &str) -> Result<FixRecord> {
    let fields: Vec<&str> = body.split(',').collect();

    Ok(FixRecord {
        time: text_field(&fields, 1),
        latitude: text_field(&fields, 2),
        latitude_direction: text_field(&fields, 3),
        longitude: text_field(&fields, 4),
        longitude_direction: text_field(&fields, 5),
        fix_quality: text_field(&fields, 6),
        num_satellites: numeric_field(&fields, 7, "satellite count")?,
        horizontal_dilution: float_field(&fields, 8, "horizontal dilution")?,
        altitude: float_field(&fields, 9, "altitude")?,
        altitude_unit: text_field(&fields, 10),
        geoid_separation: float_field(&fields, 11, "geoid separation")?,
        geoid_separation_unit: text_field(&fields, 12),
        age_of_dgps_data: float_field(&fields, 13, "age of correction")?,
        dgps_station_id: text_field(&fields, 14),
    })
}

/// Decode any sentence (with or without `$` and checksum).
///
/// The checksum is verified first; a mismatch is `InvalidChecksum` and
/// nothing is decoded.
pub fn decode(sentence: &str) -> Result<Decoded> {
    checksum::validate(sentence)?;
    let body = checksum::strip_checksum(sentence);
    let address = address_of(body);

    match classify(address) {
        Some(SentenceKind::Gga) => decode_gga(body).map(Decoded::Fix),
        Some(kind) => Ok(Decoded::Unsupported(kind)),
        None => Ok(Decoded::Unrecognized(address.to_string())),
    }
}

/// Decode entrypoint for external transports.
///
/// Returns the record as a key/value document, or an empty document for
/// well-formed sentences without a structured decoder.
pub fn decode_document(sentence: &str) -> Result<Value> {
    match decode(sentence.trim())? {
        Decoded::Fix(record) => Ok(serde_json::to_value(record)?),
        Decoded::Unsupported(_) | Decoded::Unrecognized(_) => Ok(Value::Object(Map::new())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
