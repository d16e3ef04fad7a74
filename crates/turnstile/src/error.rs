//! Unified error type for Turnstile.

use turnstile_challenge::ChallengeError;
use turnstile_protocol::ProtocolError;
use turnstile_session::SessionError;
use turnstile_store::StoreError;
use turnstile_sweep::SweepError;
use turnstile_token::TokenError;
use turnstile_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TurnstileError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Sweep(#[from] SweepError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Challenge(#[from] ChallengeError),

    /// The configuration sources could not be read or deserialised.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The configuration was read but is not usable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Connection handlers or the store did not finish closing in time.
    #[error("shutdown deadline exceeded")]
    ShutdownDeadlineExceeded,
}
