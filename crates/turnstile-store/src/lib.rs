//! Storage contract for Turnstile.
//!
//! The session layer never talks to a database directly. It talks to a
//! [`Store`]: a small capability covering the per-user credential record
//! (salt, verifier, refresh token) and the revoked-token blacklist.
//!
//! ```text
//! Session Orchestrator ──┐
//!                        ├──→ Store (this crate) ──→ backend
//! Blacklist Sweeper ─────┘
//! ```
//!
//! [`MemoryStore`] is the in-process backend. It is what the server runs
//! with out of the box and what every test constructs fresh.

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use std::future::Future;
use std::time::Duration;

/// Credential and blacklist storage.
///
/// Every method returns a `Send` future so that callers can run several
/// of them concurrently inside a spawned task. Implementations own their
/// internal concurrency; callers never hold a lock across calls.
///
/// `StoreError::NotFound` is the one distinguished failure: it means the
/// user (or the requested field of the user's record) does not exist.
pub trait Store: Send + Sync + 'static {
    /// Returns the current refresh token for `user_id`.
    ///
    /// A refresh token whose TTL has elapsed is reported as `NotFound`.
    fn get_refresh(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Returns the hex-encoded salt for `user_id`.
    fn get_salt(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Returns the hex-encoded verifier ciphertext for `user_id`.
    fn get_verifier(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Stores `token` as the refresh token for `user_id`, replacing any
    /// previous one. The token stops being returned after `ttl`.
    fn set_refresh(
        &self,
        user_id: &str,
        token: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Stores the hex-encoded salt for `user_id`.
    fn set_salt(
        &self,
        user_id: &str,
        salt: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Stores the hex-encoded verifier ciphertext for `user_id`.
    fn set_verifier(
        &self,
        user_id: &str,
        verifier: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Clears the refresh token of `user_id`.
    ///
    /// Returns `NotFound` when the user has no record at all. Clearing a
    /// refresh token that is already gone succeeds.
    fn remove_refresh(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Adds `token` to the blacklist. The entry becomes eligible for
    /// sweeping once `ttl` has elapsed.
    fn set_blacklist(
        &self,
        token: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Pure membership check; expiry is not consulted.
    fn is_blacklisted(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Removes every blacklist entry whose expiry is at or before now and
    /// returns how many were removed.
    fn sweep_expired_blacklist(
        &self,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Releases the backend. Later calls fail with [`StoreError::Closed`].
    fn close(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
