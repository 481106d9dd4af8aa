//! Per-subsystem health flags and relay counters.
//!
//! Written by the relay tasks, read by the `/api/health` endpoint and the
//! shutdown summary. Every field is an independent atomic.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

use nmea_core::SharedClock;

#[derive(Debug, Default)]
pub struct Health {
    relay: AtomicBool,
    broadcaster: AtomicBool,
    responder: AtomicBool,
    pub sentences: AtomicU64,
    pub checksum_errors: AtomicU64,
    pub time_errors: AtomicU64,
    pub broadcast_errors: AtomicU64,
    pub discarded_bytes: AtomicU64,
    pub time_requests: AtomicU64,
}

/// Point-in-time view for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub relay: bool,
    pub broadcaster: bool,
    pub responder: bool,
    pub last_fix: Option<String>,
    pub sentences: u64,
    pub checksum_errors: u64,
    pub time_errors: u64,
    pub broadcast_errors: u64,
    pub discarded_bytes: u64,
    pub time_requests: u64,
}

impl Health {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_relay(&self, up: bool) {
        self.relay.store(up, Ordering::Relaxed);
    }

    pub fn set_broadcaster(&self, up: bool) {
        self.broadcaster.store(up, Ordering::Relaxed);
    }

    pub fn set_responder(&self, up: bool) {
        self.responder.store(up, Ordering::Relaxed);
    }

    pub fn relay_up(&self) -> bool {
        self.relay.load(Ordering::Relaxed)
    }

    pub fn incr(counter: &AtomicU64) {
        Health::add(counter, 1);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn report(&self, clock: &SharedClock) -> HealthReport {
        HealthReport {
            relay: self.relay.load(Ordering::Relaxed),
            broadcaster: self.broadcaster.load(Ordering::Relaxed),
            responder: self.responder.load(Ordering::Relaxed),
            last_fix: clock.load().map(|t| t.to_rfc3339()),
            sentences: self.sentences.load(Ordering::Relaxed),
            checksum_errors: self.checksum_errors.load(Ordering::Relaxed),
            time_errors: self.time_errors.load(Ordering::Relaxed),
            broadcast_errors: self.broadcast_errors.load(Ordering::Relaxed),
            discarded_bytes: self.discarded_bytes.load(Ordering::Relaxed),
            time_requests: self.time_requests.load(Ordering::Relaxed),
        }
    }
}
