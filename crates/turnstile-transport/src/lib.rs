//! Network edge of Turnstile.
//!
//! The server accept loop is written against [`Transport`] (a listener
//! handing out peers) and [`Connection`] (one peer exchanging whole
//! request/response frames), so the session service never touches sockets.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{HANDSHAKE_TIMEOUT, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;

/// Process-unique handle for a peer, used to tag log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A bound listener.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Resolves with the next peer that completed its handshake.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Where the listener is bound; useful after binding port 0.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// One connected peer. Every `send`/`recv` moves exactly one frame.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Writes one frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Waits for the next frame; `Ok(None)` once the peer has hung up.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Says goodbye to the peer.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;

    fn peer_addr(&self) -> SocketAddr;
}
