//! Per-connection handler.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. Requests are answered strictly in the order they
//! arrive. The loop ends when the peer closes, the connection sits idle
//! too long, or the server starts shutting down.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::watch;
use turnstile_protocol::{Codec, RequestEnvelope, ResponseEnvelope, Status};
use turnstile_store::Store;
use turnstile_transport::{Connection, WebSocketConnection};

use crate::TurnstileError;
use crate::server::ServerState;

/// Just enough of a request to answer it with `bad_request` under the
/// right id.
#[derive(Deserialize)]
struct RequestId {
    id: u64,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S: Store>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S>>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), TurnstileError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    loop {
        if *shutdown.borrow_and_update() {
            break;
        }

        let data = tokio::select! {
            // A dropped sender also means shutdown.
            _ = shutdown.changed() => break,
            received = tokio::time::timeout(state.idle_timeout, conn.recv()) => match received {
                Ok(Ok(Some(data))) => data,
                Ok(Ok(None)) => {
                    tracing::debug!(%conn_id, "connection closed by peer");
                    return Ok(());
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    tracing::info!(%conn_id, "connection idle, closing");
                    break;
                }
            },
        };

        let response = match state.codec.decode::<RequestEnvelope>(&data) {
            Ok(envelope) => {
                tracing::debug!(%conn_id, id = envelope.id, op = envelope.request.op(), "request");
                state.auth.handle(envelope).await
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode request");
                let id = state
                    .codec
                    .decode::<RequestId>(&data)
                    .map_or(0, |r| r.id);
                ResponseEnvelope::error(id, Status::BadRequest)
            }
        };

        let bytes = state.codec.encode(&response)?;
        conn.send(&bytes).await?;
    }

    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
    Ok(())
}
