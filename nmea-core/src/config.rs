//! Relay settings: file parsing, layering, and validation.
//!
//! Settings come from an optional `key: value` file (e.g.
//! `/etc/nmea-relay/config.yaml`) overlaid by command-line / environment
//! values. Every serial and network setting is required; a missing or
//! unparsable one is `ConfigurationInvalid`.
//!
//! ```text
//! # nmea-relay configuration
//! device: "/dev/ttyUSB0"
//! baud_rate: 4800
//! parity: none
//! broadcast_address: 192.168.1.255
//! broadcast_port: 10110
//! time_port: 123
//! http: 127.0.0.1:8080
//! ```
//!
//! The appsettings names `ComPort`, `BaudRate`, `Parity`, `BroadcastIP`,
//! `BroadcastPort`, and `NtpPort` are accepted as aliases.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;

use crate::types::{NmeaError, Result};

/// Serial parity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    Mark,
    Space,
}

impl FromStr for Parity {
    type Err = NmeaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Parity::None),
            "odd" => Ok(Parity::Odd),
            "even" => Ok(Parity::Even),
            "mark" => Ok(Parity::Mark),
            "space" => Ok(Parity::Space),
            other => Err(NmeaError::ConfigurationInvalid(format!(
                "unknown parity {other:?} (expected none, odd, even, mark, or space)"
            ))),
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parity::None => write!(f, "none"),
            Parity::Odd => write!(f, "odd"),
            Parity::Even => write!(f, "even"),
            Parity::Mark => write!(f, "mark"),
            Parity::Space => write!(f, "space"),
        }
    }
}

/// Partially specified settings from one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub device: Option<String>,
    pub baud_rate: Option<u32>,
    pub parity: Option<Parity>,
    pub broadcast_address: Option<Ipv4Addr>,
    pub broadcast_port: Option<u16>,
    pub time_port: Option<u16>,
    pub http: Option<SocketAddr>,
}

/// Fully resolved relay configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub device: String,
    pub baud_rate: u32,
    pub parity: Parity,
    pub broadcast_address: Ipv4Addr,
    pub broadcast_port: u16,
    pub time_port: u16,
    pub http: Option<SocketAddr>,
}

impl Settings {
    /// Overlay `other` on top of `self`; values set in `other` win.
    pub fn merge(self, other: Settings) -> Settings {
        Settings {
            device: other.device.or(self.device),
            baud_rate: other.baud_rate.or(self.baud_rate),
            parity: other.parity.or(self.parity),
            broadcast_address: other.broadcast_address.or(self.broadcast_address),
            broadcast_port: other.broadcast_port.or(self.broadcast_port),
            time_port: other.time_port.or(self.time_port),
            http: other.http.or(self.http),
        }
    }

    /// Check that every required setting is present and usable.
    pub fn resolve(self) -> Result<RelayConfig> {
        let device = required(self.device.filter(|d| !d.trim().is_empty()), "device")?;
        let baud_rate = required(self.baud_rate, "baud_rate")?;
        if baud_rate == 0 {
            return Err(invalid("baud_rate", "0"));
        }
        let parity = required(self.parity, "parity")?;
        let broadcast_address = required(self.broadcast_address, "broadcast_address")?;
        let broadcast_port = nonzero_port(required(self.broadcast_port, "broadcast_port")?, "broadcast_port")?;
        let time_port = nonzero_port(required(self.time_port, "time_port")?, "time_port")?;

        Ok(RelayConfig {
            device,
            baud_rate,
            parity,
            broadcast_address,
            broadcast_port,
            time_port,
            http: self.http,
        })
    }
}

fn required<T>(value: Option<T>, key: &str) -> Result<T> {
    value.ok_or_else(|| NmeaError::ConfigurationInvalid(format!("missing required setting {key}")))
}

fn invalid(key: &str, val: &str) -> NmeaError {
    NmeaError::ConfigurationInvalid(format!("invalid value for {key}: {val:?}"))
}

fn nonzero_port(port: u16, key: &str) -> Result<u16> {
    if port == 0 {
        return Err(invalid(key, "0"));
    }
    Ok(port)
}

/// Load settings from a file.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        NmeaError::ConfigurationInvalid(format!("cannot read {}: {e}", path.display()))
    })?;
    parse_settings(&text)
}

/// Parse `key: value` settings text.
///
/// Blank lines and `#` comments are skipped; unknown keys are ignored.
pub fn parse_settings(text: &str) -> Result<Settings> {
    let mut settings = Settings::default();

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let Some(val) = parse_string_value(val.trim()) else {
            continue;
        };

        match key {
            "device" | "ComPort" => settings.device = Some(val),
            "baud_rate" | "BaudRate" => settings.baud_rate = Some(parse_value(key, &val)?),
            "parity" | "Parity" => settings.parity = Some(val.parse()?),
            "broadcast_address" | "BroadcastIP" => {
                settings.broadcast_address = Some(parse_value(key, &val)?)
            }
            "broadcast_port" | "BroadcastPort" => {
                settings.broadcast_port = Some(parse_value(key, &val)?)
            }
            "time_port" | "NtpPort" => settings.time_port = Some(parse_value(key, &val)?),
            "http" => settings.http = Some(parse_value(key, &val)?),
            _ => {}
        }
    }

    Ok(settings)
}

fn parse_value<T: FromStr>(key: &str, val: &str) -> Result<T> {
    val.parse().map_err(|_| invalid(key, val))
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
