//! Relay lifecycle: validate, bind, spawn, and shut down.
//!
//! Startup order:
//!
//! 1. validate the device name and the broadcast address
//! 2. open the serial port
//! 3. bind the broadcaster (failure disables broadcast only)
//! 4. bind the time responder (failure disables the responder only)
//! 5. spawn the reader thread, the ingestion task, and the responder task
//!
//! A failure in steps 1-2 leaves the whole relay down; the HTTP surface keeps
//! reporting it through `/api/health`.

use std::io::Read;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use nmea_core::config::RelayConfig;
use nmea_core::SharedClock;

use crate::broadcast::Broadcaster;
use crate::error::{RelayError, Result};
use crate::health::Health;
use crate::ingest::Ingest;
use crate::responder::Responder;
use crate::{netif, serial};

/// Check the device and broadcast address before anything is opened.
pub fn validate(config: &RelayConfig) -> Result<()> {
    if !serial::device_exists(&config.device)? {
        return Err(RelayError::config(format!(
            "serial device {} not found",
            config.device
        )));
    }
    netif::validate_broadcast(config.broadcast_address)
}

/// Running relay tasks and the token that stops them.
pub struct Relay {
    cancel: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Relay {
    /// Relay with nothing running, for when startup validation failed.
    pub fn idle(cancel: CancellationToken) -> Self {
        Relay {
            cancel,
            tasks: Vec::new(),
        }
    }

    /// Validate, open, bind, and spawn everything described by `config`.
    ///
    /// Never fails: every error is logged and reflected in `health`.
    pub async fn start(
        config: &RelayConfig,
        clock: SharedClock,
        health: Arc<Health>,
        cancel: CancellationToken,
    ) -> Self {
        if let Err(e) = validate(config) {
            log::error!("Relay not started: {e}");
            health.set_relay(false);
            return Relay::idle(cancel);
        }

        let port = match serial::open(config) {
            Ok(port) => port,
            Err(e) => {
                log::error!("Relay not started: {e}");
                health.set_relay(false);
                return Relay::idle(cancel);
            }
        };

        let target = SocketAddrV4::new(config.broadcast_address, config.broadcast_port);
        let broadcaster = match Broadcaster::bind(target).await {
            Ok(b) => Some(b),
            Err(e) => {
                log::warn!("Broadcast disabled: {e}");
                None
            }
        };

        let time_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.time_port));
        let responder = match Responder::bind(time_addr, clock.clone(), health.clone()).await {
            Ok(r) => Some(r),
            Err(e) => {
                log::warn!("Time responder disabled: {e}");
                None
            }
        };

        Relay::spawn(port, broadcaster, responder, clock, health, cancel)
    }

    /// Spawn the relay tasks over an already opened source and sockets.
    pub fn spawn<R>(
        reader: R,
        broadcaster: Option<Broadcaster>,
        responder: Option<Responder>,
        clock: SharedClock,
        health: Arc<Health>,
        cancel: CancellationToken,
    ) -> Self
    where
        R: Read + Send + 'static,
    {
        let mut tasks = Vec::new();

        health.set_broadcaster(broadcaster.is_some());
        health.set_responder(responder.is_some());
        health.set_relay(true);

        let (tx, rx) = mpsc::channel(serial::CHANNEL_DEPTH);
        let reader = serial::spawn_reader(reader, tx, cancel.clone());
        let reader_health = health.clone();
        tasks.push((
            "serial reader",
            tokio::spawn(async move {
                match reader.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        log::error!("Relay stopped: {e}");
                        reader_health.set_relay(false);
                    }
                    Err(e) => {
                        log::error!("Serial reader panicked: {e}");
                        reader_health.set_relay(false);
                    }
                }
            }),
        ));

        let ingest = Ingest::new(broadcaster, clock, health.clone());
        tasks.push(("ingestion", tokio::spawn(ingest.run(rx, cancel.clone()))));

        if let Some(responder) = responder {
            let responder_health = health;
            let token = cancel.clone();
            tasks.push((
                "time responder",
                tokio::spawn(async move {
                    responder.run(token).await;
                    responder_health.set_responder(false);
                }),
            ));
        }

        Relay { cancel, tasks }
    }

    /// Signal every task and wait up to `grace` for them to finish.
    ///
    /// Returns false if the grace period ran out.
    pub async fn shutdown(self, grace: Duration) -> bool {
        self.cancel.cancel();

        let names: Vec<&'static str> = self.tasks.iter().map(|(name, _)| *name).collect();
        let join_all = async {
            for (name, task) in self.tasks {
                if let Err(e) = task.await {
                    log::warn!("{name} task failed during shutdown: {e}");
                }
            }
        };

        match tokio::time::timeout(grace, join_all).await {
            Ok(()) => {
                log::info!("Relay stopped");
                true
            }
            Err(_) => {
                log::warn!(
                    "Shutdown grace period of {grace:?} expired, abandoning {}",
                    names.join(", ")
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
