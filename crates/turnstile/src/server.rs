//! `TurnstileServer` builder and server loop.
//!
//! Ties the layers together: transport → protocol → auth service →
//! session manager → store, with the blacklist sweeper running beside
//! them against the same store.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use turnstile_protocol::JsonCodec;
use turnstile_session::SessionManager;
use turnstile_store::{MemoryStore, Store};
use turnstile_sweep::Sweeper;
use turnstile_transport::{Connection, Transport, WebSocketTransport};

use crate::config::Settings;
use crate::handler::handle_connection;
use crate::service::AuthService;
use crate::TurnstileError;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<S: Store> {
    pub(crate) auth: AuthService<S>,
    pub(crate) codec: JsonCodec,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a Turnstile server.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use turnstile::prelude::*;
///
/// # async fn run() -> Result<(), TurnstileError> {
/// let settings = Settings::load(None)?;
/// let server = TurnstileServer::builder()
///     .settings(settings)
///     .build(Arc::new(MemoryStore::new()))
///     .await?;
/// server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await
/// # }
/// ```
pub struct TurnstileServerBuilder {
    settings: Settings,
    bind_addr: Option<String>,
}

impl TurnstileServerBuilder {
    /// Creates a builder with default settings. The defaults carry no
    /// signing secret or cipher keys, so [`settings`](Self::settings) must
    /// be called before [`build`](Self::build).
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            bind_addr: None,
        }
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Overrides `server.bind_addr` from the settings.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = Some(addr.to_string());
        self
    }

    /// Validates the settings and binds the listener.
    pub async fn build<S: Store>(self, store: Arc<S>) -> Result<TurnstileServer<S>, TurnstileError> {
        let mut settings = self.settings;
        if let Some(addr) = self.bind_addr {
            settings.server.bind_addr = addr;
        }
        settings.validate()?;

        let sessions = SessionManager::new(
            Arc::clone(&store),
            settings.signer(),
            settings.key_ring()?,
            settings.session_options(),
        );
        let sweeper = Sweeper::new(Arc::clone(&store), settings.sweep_config());
        let transport = WebSocketTransport::bind(&settings.server.bind_addr).await?;

        let state = Arc::new(ServerState {
            auth: AuthService::new(sessions),
            codec: JsonCodec,
            idle_timeout: settings.server.idle_timeout(),
        });

        Ok(TurnstileServer {
            transport,
            state,
            store,
            sweeper,
            shutdown_timeout: settings.server.shutdown_timeout(),
        })
    }
}

impl Default for TurnstileServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound, not yet running Turnstile server.
pub struct TurnstileServer<S: Store> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S>>,
    store: Arc<S>,
    sweeper: Sweeper<S>,
    shutdown_timeout: Duration,
}

impl TurnstileServer<MemoryStore> {
    /// Starts a builder. The store type is fixed later by
    /// [`TurnstileServerBuilder::build`]; this impl only anchors the call.
    pub fn builder() -> TurnstileServerBuilder {
        TurnstileServerBuilder::new()
    }
}

impl<S: Store> TurnstileServer<S> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, TurnstileError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the sweeper and the accept loop until `signal` completes, then
    /// shuts down gracefully.
    ///
    /// Shutdown stops accepting, tells every connection handler to finish
    /// its current request, and then concurrently closes the sweeper and
    /// drains the handlers (closing the store once they are gone). The
    /// whole shutdown is bounded by `server.shutdown_timeout_secs`; the
    /// first error wins.
    pub async fn run_until(self, signal: impl Future<Output = ()>) -> Result<(), TurnstileError> {
        let TurnstileServer {
            mut transport,
            state,
            store,
            mut sweeper,
            shutdown_timeout,
        } = self;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut handlers = JoinSet::new();

        sweeper.start()?;
        tracing::info!(addr = ?transport.local_addr().ok(), "turnstile server running");

        tokio::pin!(signal);
        loop {
            tokio::select! {
                _ = &mut signal => break,
                accepted = transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&state);
                        let shutdown = shutdown_rx.clone();
                        handlers.spawn(async move {
                            let conn_id = conn.id();
                            if let Err(e) = handle_connection(conn, state, shutdown).await {
                                tracing::debug!(%conn_id, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                },
            }
            while let Some(finished) = handlers.try_join_next() {
                if let Err(e) = finished {
                    tracing::warn!(error = %e, "connection handler panicked");
                }
            }
        }

        tracing::info!(connections = handlers.len(), "shutting down");
        drop(transport);
        shutdown_tx.send_replace(true);

        let close_sweeper = async { sweeper.close(shutdown_timeout).await.map_err(TurnstileError::from) };
        let drain_and_close_store = async {
            tokio::time::timeout(shutdown_timeout, async {
                while let Some(finished) = handlers.join_next().await {
                    if let Err(e) = finished {
                        tracing::warn!(error = %e, "connection handler panicked");
                    }
                }
                store.close().await
            })
            .await
            .map_err(|_| TurnstileError::ShutdownDeadlineExceeded)??;
            Ok::<_, TurnstileError>(())
        };

        tokio::try_join!(close_sweeper, drain_and_close_store)?;
        tracing::info!("turnstile server stopped");
        Ok(())
    }
}
