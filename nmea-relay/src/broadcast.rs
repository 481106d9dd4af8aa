//! UDP broadcast of framed sentences.
//!
//! One datagram per sentence, payload = sentence text as ASCII (`$` included,
//! no `\r\n`). Sends are fire-and-forget: a failure is returned to the caller
//! for logging and the next sentence is sent as usual.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use tokio::net::UdpSocket;

use nmea_core::Sentence;

use crate::error::{RelayError, Result};

pub struct Broadcaster {
    socket: UdpSocket,
    target: SocketAddr,
}

impl Broadcaster {
    /// Bind an ephemeral broadcast-enabled socket aimed at `target`.
    pub async fn bind(target: SocketAddrV4) -> Result<Self> {
        let local = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| RelayError::SocketUnavailable {
                what: "broadcast",
                addr: local,
                source,
            })?;
        socket.set_broadcast(true)?;

        log::info!("Broadcasting sentences to {target}");
        Ok(Broadcaster {
            socket,
            target: SocketAddr::V4(target),
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Send one sentence as one datagram.
    pub async fn send(&self, sentence: &Sentence) -> io::Result<usize> {
        let payload = encode_ascii(sentence.as_str());
        self.socket.send_to(&payload, self.target).await
    }
}

/// Single-byte encoding; anything outside ASCII becomes `?`.
pub fn encode_ascii(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}
