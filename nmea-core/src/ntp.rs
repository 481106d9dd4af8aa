//! Minimal NTP response encoding.
//!
//! Only two things are written into the 48-byte packet: the header byte
//! (`0x1C`: LI 0, version 3, mode 4 server) and the transmit timestamp as a
//! big-endian 64-bit count of seconds since 1900-01-01T00:00:00Z at byte 40.
//! Stratum, precision, reference id, and the reference/originate/receive
//! timestamps stay zero. Clients that check those fields will reject it.
//!
//! ```text
//!  0        1        2        3       ...  40                       47
//! ┌────────┬────────┬────────┬────────┬────┬─────────────────────────┐
//! │ 0x1C   │ 0      │ 0      │ 0      │ 0  │ seconds since 1900 (BE) │
//! └────────┴────────┴────────┴────────┴────┴─────────────────────────┘
//! ```

use chrono::{DateTime, Utc};

/// Fixed NTP packet size.
pub const PACKET_LEN: usize = 48;

/// LI = 0, VN = 3, Mode = 4.
pub const HEADER: u8 = 0x1C;

/// Byte offset of the transmit timestamp.
pub const TRANSMIT_OFFSET: usize = 40;

/// Seconds from 1900-01-01 to 1970-01-01.
pub const NTP_UNIX_OFFSET: i64 = 2_208_988_800;

/// Seconds since the NTP epoch. Instants before 1900 clamp to zero.
pub fn ntp_seconds(instant: DateTime<Utc>) -> u64 {
    let seconds = instant.timestamp() + NTP_UNIX_OFFSET;
    seconds.max(0) as u64
}

/// Build the response for a request.
///
/// With no GPS time yet, the transmit timestamp is the NTP epoch itself
/// (all zero), so the reply is still structurally valid.
pub fn build_response(now: Option<DateTime<Utc>>) -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = HEADER;

    let seconds = now.map(ntp_seconds).unwrap_or(0);
    packet[TRANSMIT_OFFSET..TRANSMIT_OFFSET + 8].copy_from_slice(&seconds.to_be_bytes());
    packet
}

/// Read the transmit seconds back out of a response.
pub fn transmit_seconds(packet: &[u8]) -> Option<u64> {
    let bytes = packet.get(TRANSMIT_OFFSET..TRANSMIT_OFFSET + 8)?;
    Some(u64::from_be_bytes(bytes.try_into().ok()?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
