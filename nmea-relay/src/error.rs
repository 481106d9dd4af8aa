//! Error types for nmea-relay.

use std::io;
use std::net::SocketAddr;

use nmea_core::NmeaError;

/// Result type alias
pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors that stop a relay subsystem from starting or running.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Missing or unusable setting, unknown device, or non-subnet broadcast address
    #[error(transparent)]
    Config(#[from] NmeaError),

    /// Serial device missing at startup or failing mid-run
    #[error("serial device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Socket could not be bound (typically: port already in use)
    #[error("{what} socket unavailable on {addr}: {source}")]
    SocketUnavailable {
        what: &'static str,
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Serial port error
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RelayError {
    pub fn config(msg: impl Into<String>) -> Self {
        RelayError::Config(NmeaError::ConfigurationInvalid(msg.into()))
    }
}
