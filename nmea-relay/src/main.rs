//! nmea-relay: serial GPS to UDP broadcast relay with a time responder.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use nmea_core::config::{self, Parity, RelayConfig, Settings};
use nmea_core::SharedClock;

mod broadcast;
mod error;
mod health;
mod ingest;
mod netif;
mod responder;
mod serial;
mod service;
mod web;

use health::Health;
use service::Relay;

#[derive(Parser)]
#[command(
    name = "nmea-relay",
    version,
    about = "Relay NMEA sentences from a serial GPS to UDP broadcast and serve GPS time"
)]
struct Cli {
    /// Settings file (`key: value` lines); flags and env vars override it
    #[arg(short, long, env = "NMEA_CONFIG")]
    config: Option<PathBuf>,

    /// Serial device, e.g. /dev/ttyUSB0 or COM3
    #[arg(short, long, env = "NMEA_DEVICE")]
    device: Option<String>,

    /// Serial baud rate
    #[arg(short, long, env = "NMEA_BAUD_RATE")]
    baud_rate: Option<u32>,

    /// Serial parity: none, odd, even, mark, or space
    #[arg(long, env = "NMEA_PARITY")]
    parity: Option<Parity>,

    /// Subnet broadcast address to relay sentences to
    #[arg(long, env = "NMEA_BROADCAST_ADDR")]
    broadcast_address: Option<Ipv4Addr>,

    /// UDP port sentences are broadcast to
    #[arg(long, env = "NMEA_BROADCAST_PORT")]
    broadcast_port: Option<u16>,

    /// UDP port the time responder listens on
    #[arg(long, env = "NMEA_TIME_PORT")]
    time_port: Option<u16>,

    /// Serve the decode and health API on this address
    #[arg(long, env = "NMEA_HTTP_ADDR")]
    http: Option<SocketAddr>,

    /// Seconds to wait for tasks on shutdown
    #[arg(long, default_value = "5")]
    shutdown_grace_secs: u64,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            device: self.device.clone(),
            baud_rate: self.baud_rate,
            parity: self.parity,
            broadcast_address: self.broadcast_address,
            broadcast_port: self.broadcast_port,
            time_port: self.time_port,
            http: self.http,
        }
    }

    /// File settings overlaid by flags and environment.
    fn resolve(&self) -> nmea_core::Result<RelayConfig> {
        let base = match &self.config {
            Some(path) => config::load_settings(path)?,
            None => Settings::default(),
        };
        base.merge(self.settings()).resolve()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    log::info!(
        "Relaying {} ({} baud) to {}:{}, time on port {}",
        config.device,
        config.baud_rate,
        config.broadcast_address,
        config.broadcast_port,
        config.time_port
    );

    let clock = SharedClock::new();
    let health = Arc::new(Health::new());
    let cancel = CancellationToken::new();

    let relay = Relay::start(&config, clock.clone(), health.clone(), cancel.clone()).await;
    if !health.relay_up() {
        log::warn!("Relay is down; waiting for shutdown");
    }

    let http = config.http.map(|addr| {
        let state = Arc::new(web::AppState {
            clock: clock.clone(),
            health: health.clone(),
        });
        tokio::spawn(web::serve(addr, state, cancel.clone()))
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Cannot listen for shutdown signal: {e}");
    }
    log::info!("Shutting down");

    let grace = Duration::from_secs(cli.shutdown_grace_secs);
    relay.shutdown(grace).await;
    if let Some(http) = http {
        if tokio::time::timeout(grace, http).await.is_err() {
            log::warn!("HTTP API did not stop within {grace:?}");
        }
    }

    let report = health.report(&clock);
    log::info!(
        "{} sentences relayed, {} checksum errors, {} broadcast errors, {} time requests",
        report.sentences,
        report.checksum_errors,
        report.broadcast_errors,
        report.time_requests
    );
    ExitCode::SUCCESS
}
