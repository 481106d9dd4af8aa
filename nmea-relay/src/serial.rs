//! Serial transport for the GPS receiver.
//!
//! The port is read on a dedicated blocking thread. Each read returns
//! whatever bytes are available (up to `CHUNK_SIZE`) and forwards them as one
//! chunk over a bounded channel to the ingestion loop. The read timeout is
//! also the cancellation poll interval.

use std::io::{self, Read};
use std::time::Duration;

use serialport::{DataBits, FlowControl, SerialPort, StopBits};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use nmea_core::config::{Parity, RelayConfig};

use crate::error::{RelayError, Result};

/// Max bytes per chunk handed to the framer.
pub const CHUNK_SIZE: usize = 1024;

/// Blocking read timeout, and how often the reader checks for shutdown.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Chunks buffered between the reader thread and the ingestion loop.
pub const CHANNEL_DEPTH: usize = 64;

/// True if `device` is among the enumerated serial ports.
pub fn device_exists(device: &str) -> Result<bool> {
    let ports = serialport::available_ports()?;
    Ok(ports.iter().any(|p| p.port_name == device))
}

fn map_parity(parity: Parity) -> Result<serialport::Parity> {
    match parity {
        Parity::None => Ok(serialport::Parity::None),
        Parity::Odd => Ok(serialport::Parity::Odd),
        Parity::Even => Ok(serialport::Parity::Even),
        Parity::Mark | Parity::Space => Err(RelayError::config(format!(
            "parity {parity} is not supported by the serial backend"
        ))),
    }
}

/// Open the configured port as 8 data bits, 1 stop bit, no flow control.
pub fn open(config: &RelayConfig) -> Result<Box<dyn SerialPort>> {
    let parity = map_parity(config.parity)?;
    let port = serialport::new(&config.device, config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(parity)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|e| RelayError::DeviceUnavailable(format!("{}: {e}", config.device)))?;

    log::info!(
        "Opened serial port: {} at {} baud, parity {}",
        config.device,
        config.baud_rate,
        config.parity
    );
    Ok(port)
}

/// Spawn the blocking reader. It stops on cancellation, when the receiving
/// side is dropped, at end of stream, or on a read error (returned as
/// `DeviceUnavailable`; the device is not reopened).
pub fn spawn_reader<R>(
    mut reader: R,
    tx: mpsc::Sender<Vec<u8>>,
    cancel: CancellationToken,
) -> JoinHandle<Result<()>>
where
    R: Read + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut buf = [0u8; CHUNK_SIZE];
        while !cancel.is_cancelled() {
            match reader.read(&mut buf) {
                Ok(0) => {
                    log::info!("Serial stream ended");
                    return Ok(());
                }
                Ok(n) => {
                    if tx.blocking_send(buf[..n].to_vec()).is_err() {
                        return Ok(());
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Err(RelayError::DeviceUnavailable(e.to_string())),
            }
        }
        log::debug!("Serial reader observed cancellation");
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
