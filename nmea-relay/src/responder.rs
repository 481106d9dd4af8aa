//! Minimal NTP responder backed by the GPS clock.
//!
//! ```text
//! Idle ──bind──▶ AwaitingRequest ──datagram──▶ Responding ──sent──┐
//!   │                  ▲                                          │
//!   │                  └──────────────────────────────────────────┘
//!   └──bind failed──▶ Stopped ◀──cancelled── (any state)
//! ```
//!
//! Every request gets a 48-byte reply built by `nmea_core::ntp`. A bind
//! failure disables the responder for the lifetime of the process; it is not
//! retried.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use nmea_core::{ntp, SharedClock};

use crate::error::{RelayError, Result};
use crate::health::Health;

/// Largest request datagram read; anything longer is truncated.
const MAX_REQUEST: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderState {
    Idle,
    AwaitingRequest,
    Responding,
    Stopped,
}

pub struct Responder {
    socket: UdpSocket,
    clock: SharedClock,
    health: Arc<Health>,
    state: ResponderState,
    answered: u64,
}

impl Responder {
    /// Bind the time-service port.
    pub async fn bind(addr: SocketAddr, clock: SharedClock, health: Arc<Health>) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| RelayError::SocketUnavailable {
                what: "time service",
                addr,
                source,
            })?;
        log::info!("Time responder listening on {}", socket.local_addr()?);
        Ok(Responder {
            socket,
            clock,
            health,
            state: ResponderState::Idle,
            answered: 0,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn state(&self) -> ResponderState {
        self.state
    }

    /// Answer requests until cancelled. Returns the number answered.
    ///
    /// Receive and send errors on individual requests are logged and the
    /// loop keeps going.
    pub async fn run(mut self, cancel: CancellationToken) -> u64 {
        let mut buf = [0u8; MAX_REQUEST];
        loop {
            self.state = ResponderState::AwaitingRequest;
            let (len, peer) = tokio::select! {
                _ = cancel.cancelled() => break,
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok(received) => received,
                    Err(e) => {
                        log::warn!("Time request receive failed: {e}");
                        continue;
                    }
                },
            };

            self.state = ResponderState::Responding;
            Health::incr(&self.health.time_requests);
            if len != ntp::PACKET_LEN {
                log::debug!("Time request from {peer} is {len} bytes, answering anyway");
            }
            let response = ntp::build_response(self.clock.load());
            match self.socket.send_to(&response, peer).await {
                Ok(_) => self.answered += 1,
                Err(e) => log::warn!("Time response to {peer} failed: {e}"),
            }
        }
        self.state = ResponderState::Stopped;
        log::info!("Time responder stopped after {} responses", self.answered);
        self.answered
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
