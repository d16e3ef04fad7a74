//! Wire protocol for Turnstile.
//!
//! This crate defines what travels between a client and the session
//! service:
//!
//! - **Types** ([`RequestEnvelope`], [`ResponseEnvelope`], [`Status`],
//!   [`WireSession`]): the request/response messages.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages are
//!   turned into bytes and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (envelopes) → Auth service (sessions)
//! ```
//!
//! Every request carries a client-chosen `id` that is echoed in its
//! response, so a client can pipeline requests on one connection.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Request, RequestEnvelope, ResponseBody, ResponseEnvelope, Status, WireSession};
