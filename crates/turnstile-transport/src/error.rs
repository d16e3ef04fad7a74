use std::io;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listener could not be bound.
    #[error("bind failed: {0}")]
    BindFailed(#[source] io::Error),

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] io::Error),

    /// The peer connected but the protocol upgrade failed or timed out.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// The local address could not be read.
    #[error("local address unavailable: {0}")]
    LocalAddr(#[source] io::Error),
}
