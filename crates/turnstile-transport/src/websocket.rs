//! [`Transport`] over WebSocket, built on `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// How long a freshly accepted TCP peer gets to finish the WebSocket
/// upgrade before it is dropped.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of [`ConnectionId`]s.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<TcpStream>;

/// TCP listener that upgrades every peer to WebSocket before handing it out.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Starts listening on `addr`.
    ///
    /// Use port 0 to let the OS pick a free port, then read it back with
    /// [`Transport::local_addr`].
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        tracing::info!(addr, "listening for WebSocket peers");
        Ok(Self { listener })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let ws = tokio::time::timeout(HANDSHAKE_TIMEOUT, tokio_tungstenite::accept_async(stream))
            .await
            .map_err(|_| TransportError::HandshakeFailed("timed out".into()))?
            .map_err(|e| TransportError::HandshakeFailed(e.to_string()))?;

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %peer, "accepted WebSocket connection");

        // Split so a send never waits behind a pending recv.
        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            peer,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }

    fn local_addr(&self) -> Result<SocketAddr, Self::Error> {
        self.listener.local_addr().map_err(TransportError::LocalAddr)
    }
}

/// An upgraded peer.
///
/// Messages that are valid UTF-8 go out as text frames, anything else as
/// binary frames. Both kinds are accepted on receive.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::text(text.to_owned()),
            Err(_) => Message::binary(data.to_vec()),
        };
        self.sink
            .lock()
            .await
            .send(msg)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_bytes().to_vec())),
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.to_vec())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                // Ping/pong and raw frames are handled by tungstenite.
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(TransportError::ReceiveFailed(e.to_string())),
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}
