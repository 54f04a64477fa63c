//! Relay channel between the HTTP front end and the ingestion worker.
//!
//! One submission body travels as exactly one message, byte for byte, with no
//! envelope. Delivery is best effort: no acknowledgement, ordering or
//! duplicate suppression. Both sides only see the two traits below, so the UDP
//! transport can be swapped for another one without touching either side.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::mpsc;

use crate::error::RelayError;

/// One relayed submission as seen by the receiving side.
#[derive(Debug, Clone)]
pub struct RelayMessage {
    pub payload: Bytes,
    pub source: SocketAddr,
}

/// Sending half. `send` returns once the message is handed to the transport.
#[async_trait]
pub trait RelaySender: Send + Sync {
    async fn send(&self, payload: Bytes) -> Result<(), RelayError>;
}

/// Receiving half. `recv` waits until a message arrives.
#[async_trait]
pub trait RelayReceiver: Send {
    async fn recv(&mut self) -> Result<RelayMessage, RelayError>;
}

async fn resolve(addr: &str) -> Result<SocketAddr, RelayError> {
    lookup_host(addr)
        .await?
        .next()
        .ok_or_else(|| RelayError::Unresolved(addr.to_string()))
}

// ============================================================================
// UDP
// ============================================================================

pub struct UdpRelaySender {
    socket: UdpSocket,
    target: SocketAddr,
    max_datagram_size: usize,
}

impl UdpRelaySender {
    /// Bind an ephemeral local socket that sends to `target`.
    pub async fn connect(target: &str, max_datagram_size: usize) -> Result<Self, RelayError> {
        let target = resolve(target).await?;
        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        Ok(Self {
            socket,
            target,
            max_datagram_size,
        })
    }
}

#[async_trait]
impl RelaySender for UdpRelaySender {
    async fn send(&self, payload: Bytes) -> Result<(), RelayError> {
        if payload.len() > self.max_datagram_size {
            return Err(RelayError::PayloadTooLarge {
                size: payload.len(),
                limit: self.max_datagram_size,
            });
        }
        self.socket.send_to(&payload, self.target).await?;
        Ok(())
    }
}

pub struct UdpRelayReceiver {
    socket: UdpSocket,
    max_datagram_size: usize,
    buf: Vec<u8>,
}

impl UdpRelayReceiver {
    pub async fn bind(addr: &str, max_datagram_size: usize) -> Result<Self, RelayError> {
        let socket = UdpSocket::bind(resolve(addr).await?).await?;
        Ok(Self {
            socket,
            max_datagram_size,
            // One spare byte so a datagram cut at the limit can be told apart
            // from one that fits exactly.
            buf: vec![0; max_datagram_size + 1],
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.socket.local_addr()?)
    }
}

#[async_trait]
impl RelayReceiver for UdpRelayReceiver {
    async fn recv(&mut self) -> Result<RelayMessage, RelayError> {
        let (len, source) = self.socket.recv_from(&mut self.buf).await?;
        if len > self.max_datagram_size {
            return Err(RelayError::PayloadTooLarge {
                size: len,
                limit: self.max_datagram_size,
            });
        }
        Ok(RelayMessage {
            payload: Bytes::copy_from_slice(&self.buf[..len]),
            source,
        })
    }
}

// ============================================================================
// In-process channel
// ============================================================================

/// Address reported as the source of in-process messages.
pub const IN_PROCESS_SOURCE: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::LOCALHOST), 0);

#[derive(Clone)]
pub struct ChannelRelaySender {
    tx: mpsc::Sender<Bytes>,
}

pub struct ChannelRelayReceiver {
    rx: mpsc::Receiver<Bytes>,
}

/// Bounded in-process relay. A full channel drops the message instead of
/// waiting, the same way an overloaded datagram socket would.
pub fn channel_relay(capacity: usize) -> (ChannelRelaySender, ChannelRelayReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (ChannelRelaySender { tx }, ChannelRelayReceiver { rx })
}

#[async_trait]
impl RelaySender for ChannelRelaySender {
    async fn send(&self, payload: Bytes) -> Result<(), RelayError> {
        self.tx.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => RelayError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => RelayError::Closed,
        })
    }
}

#[async_trait]
impl RelayReceiver for ChannelRelayReceiver {
    async fn recv(&mut self) -> Result<RelayMessage, RelayError> {
        let payload = self.rx.recv().await.ok_or(RelayError::Closed)?;
        Ok(RelayMessage {
            payload,
            source: IN_PROCESS_SOURCE,
        })
    }
}
