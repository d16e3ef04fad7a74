//! Session orchestration for Turnstile.
//!
//! This crate is where the pieces meet. A [`SessionManager`] owns a
//! [`Store`](turnstile_store::Store), a token signer and a challenge
//! engine, and exposes the four-operation session protocol:
//!
//! | operation                               | result                  |
//! |-----------------------------------------|-------------------------|
//! | [`login`](SessionManager::login)        | a fresh [`Session`]     |
//! | [`validate_session`](SessionManager::validate_session) | ok / error |
//! | [`destroy_session`](SessionManager::destroy_session)   | ok / error |
//! | [`renew_session`](SessionManager::renew_session)       | a fresh [`Session`] |
//!
//! # Concurrency
//!
//! Each operation is a handful of sub-steps that touch different storage
//! keys or different primitives. They run concurrently with
//! `tokio::try_join!`: the first error wins, and the remaining sibling
//! futures are dropped, which cancels them. No operation ever returns a
//! half-built session.
//!
//! Every public operation is bounded by
//! [`SessionOptions::request_timeout`]. When it fires, in-flight storage
//! calls are abandoned and [`SessionError::DeadlineExceeded`] is returned.
//!
//! The password KDF is CPU-bound, so it runs on Tokio's blocking pool
//! instead of a runtime worker.
//!
//! # Lifecycle
//!
//! ```text
//! Absent ──login──→ Active ──destroy──→ Destroyed
//!                     ↑                    │
//!                     └──────renew─────────┘
//! ```

mod error;
mod manager;
mod options;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use options::SessionOptions;
pub use session::Session;
