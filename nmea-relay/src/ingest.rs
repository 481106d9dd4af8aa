//! Ingestion loop: serial chunks in, verified sentences out.
//!
//! For each framed sentence, in arrival order:
//!
//! 1. verify the checksum (failures are counted, logged, and dropped)
//! 2. broadcast it, if a broadcaster is bound
//! 3. fold it into the time tracker and publish the instant to the shared clock
//!
//! No per-sentence failure stops the loop.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use nmea_core::frame::DEFAULT_MAX_BUFFERED;
use nmea_core::{checksum, Sentence, SentenceFramer, SharedClock, TimeTracker};

use crate::broadcast::Broadcaster;
use crate::health::Health;

pub struct Ingest {
    framer: SentenceFramer,
    tracker: TimeTracker,
    broadcaster: Option<Broadcaster>,
    clock: SharedClock,
    health: Arc<Health>,
}

impl Ingest {
    pub fn new(broadcaster: Option<Broadcaster>, clock: SharedClock, health: Arc<Health>) -> Self {
        Ingest {
            framer: SentenceFramer::new(DEFAULT_MAX_BUFFERED),
            tracker: TimeTracker::new(),
            broadcaster,
            clock,
            health,
        }
    }

    /// Frame one chunk and handle every sentence it completes.
    pub async fn handle_chunk(&mut self, chunk: &[u8]) {
        let before = self.framer.stats().discarded_bytes;
        let sentences = self.framer.feed(chunk);
        let discarded = self.framer.stats().discarded_bytes - before;
        if discarded > 0 {
            Health::add(&self.health.discarded_bytes, discarded);
            log::debug!("Discarded {discarded} bytes of line noise");
        }

        for sentence in sentences {
            self.handle_sentence(&sentence).await;
        }
    }

    pub async fn handle_sentence(&mut self, sentence: &Sentence) {
        if let Err(e) = checksum::validate(sentence.as_str()) {
            Health::incr(&self.health.checksum_errors);
            log::warn!("Dropping {}: {e}", sentence.address());
            return;
        }
        Health::incr(&self.health.sentences);
        log::trace!("{sentence}");

        if let Some(broadcaster) = &self.broadcaster {
            if let Err(e) = broadcaster.send(sentence).await {
                Health::incr(&self.health.broadcast_errors);
                log::warn!("Broadcast to {} failed: {e}", broadcaster.target());
            }
        }

        match self.tracker.update_now(sentence.as_str()) {
            Ok(Some(instant)) => self.clock.store(instant),
            Ok(None) => {}
            Err(e) => {
                Health::incr(&self.health.time_errors);
                log::warn!("Ignoring time from {}: {e}", sentence.address());
            }
        }
    }

    /// Drain chunks until cancelled or the reader hangs up.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Vec<u8>>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                chunk = rx.recv() => match chunk {
                    Some(chunk) => self.handle_chunk(&chunk).await,
                    None => break,
                },
            }
        }

        let stats = self.framer.stats();
        log::info!(
            "Ingestion stopped: {} sentences framed, {} resyncs, {} overflows, {} time updates",
            stats.sentences,
            stats.resyncs,
            stats.overflows,
            self.tracker.updates
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use tokio::net::UdpSocket;

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const RMC: &str = "$GPRMC,235959,A,4807.038,N,01131.000,E,022.4,084.4,010124,003.1,W*6F";

    async fn listener_and_broadcaster() -> (UdpSocket, Broadcaster) {
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let SocketAddr::V4(target) = listener.local_addr().unwrap() else {
            unreachable!("bound to an IPv4 address");
        };
        (listener, Broadcaster::bind(target).await.unwrap())
    }

    async fn recv_text(listener: &UdpSocket) -> String {
        let mut buf = [0u8; 512];
        let n = tokio::time::timeout(Duration::from_secs(2), listener.recv(&mut buf))
            .await
            .expect("datagram expected")
            .unwrap();
        String::from_utf8(buf[..n].to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_broadcast_payload_decodes_like_source() {
        let (listener, broadcaster) = listener_and_broadcaster().await;
        let health = Arc::new(Health::new());
        let mut ingest = Ingest::new(Some(broadcaster), SharedClock::new(), health.clone());

        let stream = format!("{GGA}\r\n");
        let (a, b) = stream.as_bytes().split_at(20);
        ingest.handle_chunk(a).await;
        ingest.handle_chunk(b).await;

        let payload = recv_text(&listener).await;
        assert_eq!(payload, GGA);
        assert_eq!(
            nmea_core::decode_document(&payload).unwrap(),
            nmea_core::decode_document(GGA).unwrap()
        );
        assert_eq!(health.report(&SharedClock::new()).sentences, 1);
    }

    #[tokio::test]
    async fn test_rmc_updates_clock() {
        let clock = SharedClock::new();
        let mut ingest = Ingest::new(None, clock.clone(), Arc::new(Health::new()));

        ingest.handle_chunk(format!("{RMC}\r\n").as_bytes()).await;
        assert_eq!(
            clock.load(),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap())
        );
    }

    #[tokio::test]
    async fn test_bad_checksum_not_broadcast_or_timed() {
        let (listener, broadcaster) = listener_and_broadcaster().await;
        let clock = SharedClock::new();
        let health = Arc::new(Health::new());
        let mut ingest = Ingest::new(Some(broadcaster), clock.clone(), health.clone());

        let corrupt = RMC.replace("*6F", "*00");
        let stream = format!("{corrupt}\r\n{GGA}\r\n");
        ingest.handle_chunk(stream.as_bytes()).await;

        // Only the valid GGA goes out
        assert_eq!(recv_text(&listener).await, GGA);
        let report = health.report(&clock);
        assert_eq!(report.checksum_errors, 1);
        assert_eq!(report.sentences, 1);
        // Clock set from the GGA, not the corrupt RMC
        let instant = clock.load().unwrap();
        assert_eq!(instant.time(), chrono::NaiveTime::from_hms_opt(12, 35, 19).unwrap());
    }

    #[tokio::test]
    async fn test_unparsable_time_keeps_previous() {
        let clock = SharedClock::new();
        let health = Arc::new(Health::new());
        let mut ingest = Ingest::new(None, clock.clone(), health.clone());

        ingest.handle_chunk(format!("{RMC}\r\n").as_bytes()).await;
        let bad = checksum::with_checksum("$GPRMC,99xx99,A,,,,,,,010124,,");
        ingest.handle_chunk(format!("{bad}\r\n").as_bytes()).await;

        assert_eq!(
            clock.load(),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap())
        );
        assert_eq!(health.report(&clock).time_errors, 1);
    }

    #[tokio::test]
    async fn test_line_noise_counted() {
        let health = Arc::new(Health::new());
        let mut ingest = Ingest::new(None, SharedClock::new(), health.clone());
        ingest.handle_chunk(format!("xx{GGA}\r\n").as_bytes()).await;
        let report = health.report(&SharedClock::new());
        assert_eq!(report.discarded_bytes, 2);
        assert_eq!(report.sentences, 1);
    }

    #[tokio::test]
    async fn test_run_ends_when_reader_hangs_up() {
        let clock = SharedClock::new();
        let ingest = Ingest::new(None, clock.clone(), Arc::new(Health::new()));
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(ingest.run(rx, CancellationToken::new()));

        tx.send(format!("{RMC}\r\n").into_bytes()).await.unwrap();
        drop(tx);
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("ingest should stop")
            .unwrap();
        assert!(clock.load().is_some());
    }
}
