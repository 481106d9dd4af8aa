//! Shared types, error enum, and decoded record types for nmea-core.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// All errors produced by nmea-core.
#[derive(Debug, Error)]
pub enum NmeaError {
    #[error("invalid NMEA sentence checksum: expected {expected:02X}, got {actual:02X}")]
    InvalidChecksum { expected: u8, actual: u8 },
    #[error("malformed checksum suffix: {0:?}")]
    MalformedChecksum(String),
    #[error("malformed {field} at field {index}: {raw:?}")]
    MalformedField {
        field: &'static str,
        index: usize,
        raw: String,
    },
    #[error("unparsable {field}: {raw:?}")]
    TimeParse { field: &'static str, raw: String },
    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(String),
    #[error("document encoding failed: {0}")]
    Document(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NmeaError>;

// ---------------------------------------------------------------------------
// Sentence
// ---------------------------------------------------------------------------

/// Start marker of every NMEA sentence.
pub const START_MARKER: u8 = b'$';

/// Line terminator ending every NMEA sentence.
pub const TERMINATOR: &[u8; 2] = b"\r\n";

/// One framed sentence: the text from `$` up to, not including, `\r\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    text: String,
}

impl Sentence {
    /// Wrap framed sentence text. A missing `$` is prepended.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.as_bytes().first() == Some(&START_MARKER) {
            Sentence { text }
        } else {
            Sentence {
                text: format!("${text}"),
            }
        }
    }

    /// Wire text including the start marker. This is what gets relayed.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Text between the start marker and the terminator.
    pub fn body(&self) -> &str {
        &self.text[1..]
    }

    /// Address field, e.g. `GPGGA`.
    pub fn address(&self) -> &str {
        address_of(self.body())
    }

    pub fn kind(&self) -> Option<SentenceKind> {
        classify(self.address())
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for Sentence {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// First comma-separated field of a sentence body, minus any `$` and checksum.
pub fn address_of(sentence: &str) -> &str {
    let body = sentence.strip_prefix('$').unwrap_or(sentence);
    let end = body.find([',', '*']).unwrap_or(body.len());
    &body[..end]
}

// ---------------------------------------------------------------------------
// Sentence formatter metadata
// ---------------------------------------------------------------------------

/// Recognized NMEA 0183 sentence formatters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SentenceKind {
    Gga,
    Rmc,
    Zda,
    Gsa,
    Gsv,
    Gll,
    Vtg,
    Txt,
    Gns,
    Gst,
}

/// Metadata for a sentence formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindInfo {
    pub formatter: &'static str,
    pub name: &'static str,
    /// Carries a UTC time-of-day field.
    pub time_bearing: bool,
    /// Decoded into a structured record.
    pub decoded: bool,
}

/// Known formatter table, in `SentenceKind` declaration order.
pub const KIND_TABLE: &[(SentenceKind, KindInfo)] = &[
    (
        SentenceKind::Gga,
        KindInfo {
            formatter: "GGA",
            name: "Global positioning system fix data",
            time_bearing: true,
            decoded: true,
        },
    ),
    (
        SentenceKind::Rmc,
        KindInfo {
            formatter: "RMC",
            name: "Recommended minimum specific GNSS data",
            time_bearing: true,
            decoded: false,
        },
    ),
    (
        SentenceKind::Zda,
        KindInfo {
            formatter: "ZDA",
            name: "Time and date",
            time_bearing: true,
            decoded: false,
        },
    ),
    (
        SentenceKind::Gsa,
        KindInfo {
            formatter: "GSA",
            name: "GNSS DOP and active satellites",
            time_bearing: false,
            decoded: false,
        },
    ),
    (
        SentenceKind::Gsv,
        KindInfo {
            formatter: "GSV",
            name: "GNSS satellites in view",
            time_bearing: false,
            decoded: false,
        },
    ),
    (
        SentenceKind::Gll,
        KindInfo {
            formatter: "GLL",
            name: "Geographic position",
            time_bearing: false,
            decoded: false,
        },
    ),
    (
        SentenceKind::Vtg,
        KindInfo {
            formatter: "VTG",
            name: "Course over ground and ground speed",
            time_bearing: false,
            decoded: false,
        },
    ),
    (
        SentenceKind::Txt,
        KindInfo {
            formatter: "TXT",
            name: "Text transmission",
            time_bearing: false,
            decoded: false,
        },
    ),
    (
        SentenceKind::Gns,
        KindInfo {
            formatter: "GNS",
            name: "GNSS fix data",
            time_bearing: false,
            decoded: false,
        },
    ),
    (
        SentenceKind::Gst,
        KindInfo {
            formatter: "GST",
            name: "GNSS pseudorange error statistics",
            time_bearing: false,
            decoded: false,
        },
    ),
];

impl SentenceKind {
    /// Table entries are ordered by discriminant.
    pub fn info(self) -> &'static KindInfo {
        &KIND_TABLE[self as usize].1
    }

    pub fn formatter(self) -> &'static str {
        self.info().formatter
    }
}

/// Classify an address field (`GPGGA`, `GNRMC`, ...) by its formatter.
///
/// The two-character talker id is not significant. Proprietary sentences
/// (`$P...`) and anything not shaped like `TTFFF` are unrecognized.
pub fn classify(address: &str) -> Option<SentenceKind> {
    if address.len() != 5 || address.starts_with('P') {
        return None;
    }
    if !address
        .bytes()
        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    {
        return None;
    }
    let formatter = &address[2..];
    KIND_TABLE
        .iter()
        .find(|(_, info)| info.formatter == formatter)
        .map(|(kind, _)| *kind)
}

// ---------------------------------------------------------------------------
// Hex utilities
// ---------------------------------------------------------------------------

/// Value of one ASCII hex digit, case-insensitive.
pub fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Decoded record types
// ---------------------------------------------------------------------------

/// GGA: position fix snapshot.
///
/// Text fields are kept verbatim. Numeric fields that are absent or empty
/// are zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FixRecord {
    pub time: String,
    pub latitude: String,
    pub latitude_direction: String,
    pub longitude: String,
    pub longitude_direction: String,
    pub fix_quality: String,
    pub num_satellites: i32,
    pub horizontal_dilution: f64,
    pub altitude: f64,
    pub altitude_unit: String,
    pub geoid_separation: f64,
    pub geoid_separation_unit: String,
    pub age_of_dgps_data: f64,
    pub dgps_station_id: String,
}

/// Outcome of decoding one sentence.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Position fix, fully decoded.
    Fix(FixRecord),
    /// Recognized formatter without a structured decoder.
    Unsupported(SentenceKind),
    /// Not a known NMEA formatter. Relayed, never decoded.
    Unrecognized(String),
}

impl Decoded {
    pub fn fix(&self) -> Option<&FixRecord> {
        match self {
            Decoded::Fix(record) => Some(record),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
