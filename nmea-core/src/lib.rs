//! nmea-core: Pure framing + decode + time library for NMEA 0183 streams.
//!
//! No async and no sockets, only algorithms. This crate is the shared core
//! used by `nmea-relay` (serial-to-UDP relay and time responder).

pub mod checksum;
pub mod clock;
pub mod config;
pub mod decode;
pub mod frame;
pub mod netaddr;
pub mod ntp;
pub mod types;

// Re-export commonly used types at crate root
pub use checksum::verify_checksum;
pub use clock::{SharedClock, TimeTracker};
pub use decode::{decode, decode_document};
pub use frame::{FramerStats, SentenceFramer};
pub use types::*;
