//! # Turnstile
//!
//! Credential issuance and session lifecycle service.
//!
//! A client proves who it is once with a user id and password and gets a
//! session back: a short-lived signed token plus a long-lived refresh
//! token. It can then check the signed token, trade the refresh token for
//! a fresh session, and log out, which revokes the signed token until it
//! would have expired on its own. A background sweeper keeps the
//! revocation list from growing without bound.
//!
//! This crate wires the component crates into a running server:
//!
//! - [`config::Settings`]: configuration from a TOML file and the environment
//! - [`AuthService`]: the four client operations and their wire statuses
//! - [`TurnstileServer`]: WebSocket listener, per-connection handlers, the
//!   sweeper, and graceful shutdown
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use turnstile::prelude::*;
//!
//! # async fn run() -> Result<(), TurnstileError> {
//! let server = TurnstileServer::builder()
//!     .settings(Settings::load(None)?)
//!     .bind("0.0.0.0:9000")
//!     .build(Arc::new(MemoryStore::new()))
//!     .await?;
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```

pub mod config;
mod error;
mod handler;
mod server;
mod service;

pub use error::TurnstileError;
pub use server::{TurnstileServer, TurnstileServerBuilder};
pub use service::{AuthService, status_for};

/// Re-exports the types most programs need.
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::{AuthService, TurnstileError, TurnstileServer, TurnstileServerBuilder};

    pub use turnstile_protocol::{
        Codec, JsonCodec, Request, RequestEnvelope, ResponseBody, ResponseEnvelope, Status,
        WireSession,
    };
    pub use turnstile_session::{Session, SessionError, SessionManager, SessionOptions};
    pub use turnstile_store::{MemoryStore, Store, StoreError};
    pub use turnstile_sweep::{SweepConfig, Sweeper};
    pub use turnstile_challenge::{Challenger, KeyRing};
    pub use turnstile_token::TokenSigner;
}
