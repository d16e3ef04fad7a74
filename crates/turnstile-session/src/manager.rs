//! The session manager: login, validation, logout and renewal.
//!
//! Every operation here follows the same shape:
//!
//! 1. Reject obviously malformed input before any I/O.
//! 2. Fan out the independent sub-steps with `tokio::try_join!`.
//! 3. Combine their results (or return the first error).
//!
//! Step 2 is where the cancellation semantics come from. `try_join!`
//! polls all branches inside the caller's task; when one branch fails,
//! `try_join!` returns and the other branches are dropped mid-flight.
//! Dropping a future in Rust is how you cancel it, so nothing keeps
//! running on behalf of a request that has already failed.
//!
//! # Concurrency note
//!
//! The manager holds no locks and no mutable state. Two concurrent
//! logins for the same user both write a refresh token; whichever write
//! lands last wins. Serializing that is left to the storage backend.

use std::future::Future;
use std::sync::Arc;

use subtle::ConstantTimeEq;
use turnstile_challenge::{Challenger, KeyRing};
use turnstile_store::{Store, StoreError};
use turnstile_token::{TokenSigner, new_refresh};

use crate::{Session, SessionError, SessionOptions};

/// Runs the session protocol against a [`Store`].
///
/// Generic over the store so the same code runs against the in-memory
/// backend in tests and any other backend in production.
pub struct SessionManager<S: Store> {
    store: Arc<S>,
    signer: TokenSigner,
    /// `Arc` so the KDF can be moved onto the blocking pool.
    challenger: Arc<Challenger>,
    options: SessionOptions,
}

impl<S: Store> SessionManager<S> {
    /// Creates a manager. The challenge engine is built from `ring` and
    /// `options.salt_len`.
    pub fn new(store: Arc<S>, signer: TokenSigner, ring: KeyRing, options: SessionOptions) -> Self {
        let challenger = Arc::new(Challenger::new(ring, options.salt_len));
        Self {
            store,
            signer,
            challenger,
            options,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn challenger(&self) -> &Challenger {
        &self.challenger
    }

    // -----------------------------------------------------------------------
    // Public operations
    // -----------------------------------------------------------------------

    /// Exchanges a user id and password for a brand-new session.
    ///
    /// The new refresh token is persisted before the password is checked.
    /// A failed login therefore leaves an unclaimed refresh token behind;
    /// the next successful login overwrites it.
    ///
    /// # Errors
    /// - [`SessionError::InvalidChallenge`]: empty input or wrong password
    /// - [`SessionError::UserNotExist`]: no salt/verifier for the user
    pub async fn login(&self, user_id: &str, password: &str) -> Result<Session, SessionError> {
        self.bounded(self.login_inner(user_id, password)).await
    }

    /// Checks a session, returning `Ok(false)` when it is well-formed but
    /// not (or no longer) valid.
    ///
    /// Valid means: the stored refresh token matches, AND the signed token
    /// parses, names the session's user, is not blacklisted and has not
    /// expired.
    ///
    /// # Errors
    /// [`SessionError::InvalidSession`] if any field is empty. A forged
    /// signed token fails with [`SessionError::Token`].
    pub async fn is_valid_session(&self, session: &Session) -> Result<bool, SessionError> {
        self.bounded(self.check_session(session)).await
    }

    /// Like [`is_valid_session`](Self::is_valid_session) but turns `false`
    /// into [`SessionError::InvalidSession`].
    pub async fn validate_session(&self, session: &Session) -> Result<(), SessionError> {
        if self.is_valid_session(session).await? {
            Ok(())
        } else {
            Err(SessionError::InvalidSession)
        }
    }

    /// Logs a session out: clears the stored refresh token and blacklists
    /// the signed token for the rest of its lifetime.
    ///
    /// The session must validate first. The two side effects run
    /// concurrently and are not rolled back if the other one fails; both
    /// are safe to repeat.
    pub async fn destroy_session(&self, session: &Session) -> Result<(), SessionError> {
        self.bounded(self.destroy_inner(session)).await
    }

    /// Trades a session's refresh token for a brand-new session.
    ///
    /// The old signed token may be missing or already expired; it is only
    /// revoked on a best-effort basis. The old refresh token must still be
    /// current, otherwise no new session is created.
    pub async fn renew_session(&self, old: &Session) -> Result<Session, SessionError> {
        self.bounded(self.renew_inner(old)).await
    }

    /// Parses a signed token and reports whether it is still current.
    ///
    /// Does not consult the blacklist; use
    /// [`is_valid_session`](Self::is_valid_session) for the full check.
    pub fn check_token(&self, token: &str) -> Result<bool, SessionError> {
        Ok(!self.signer.parse(token)?.is_expired())
    }

    // -----------------------------------------------------------------------
    // Operation bodies
    // -----------------------------------------------------------------------

    async fn login_inner(&self, user_id: &str, password: &str) -> Result<Session, SessionError> {
        if user_id.is_empty() || password.is_empty() {
            return Err(SessionError::InvalidChallenge);
        }

        let (salt, verifier, session) = tokio::try_join!(
            async { self.store.get_salt(user_id).await.map_err(SessionError::from) },
            async { self.store.get_verifier(user_id).await.map_err(SessionError::from) },
            self.create_session(user_id),
        )?;

        if !self.check_password(salt, password, verifier).await? {
            tracing::info!(%user_id, "login rejected");
            return Err(SessionError::InvalidChallenge);
        }

        tracing::info!(%user_id, "login succeeded");
        Ok(session)
    }

    async fn check_session(&self, session: &Session) -> Result<bool, SessionError> {
        if !session.is_complete() {
            return Err(SessionError::InvalidSession);
        }

        let (refresh_ok, signed_ok) = tokio::try_join!(
            self.refresh_matches(&session.user_id, &session.refresh),
            self.signed_token_current(&session.user_id, &session.signed_token),
        )?;
        Ok(refresh_ok && signed_ok)
    }

    async fn destroy_inner(&self, session: &Session) -> Result<(), SessionError> {
        if !self.check_session(session).await? {
            return Err(SessionError::InvalidSession);
        }

        tokio::try_join!(
            async {
                self.store
                    .remove_refresh(&session.user_id)
                    .await
                    .map_err(SessionError::from)
            },
            self.revoke(&session.user_id, &session.signed_token),
        )?;

        tracing::info!(user_id = %session.user_id, "session destroyed");
        Ok(())
    }

    async fn renew_inner(&self, old: &Session) -> Result<Session, SessionError> {
        if old.user_id.is_empty() || old.refresh.is_empty() {
            return Err(SessionError::InvalidSession);
        }

        tokio::try_join!(
            self.revoke_best_effort(old),
            self.retire_refresh(&old.user_id, &old.refresh),
        )?;

        let session = self.create_session(&old.user_id).await?;
        tracing::info!(user_id = %old.user_id, "session renewed");
        Ok(session)
    }

    // -----------------------------------------------------------------------
    // Sub-steps
    // -----------------------------------------------------------------------

    /// Bounds `fut` by the request timeout.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, SessionError>>,
    ) -> Result<T, SessionError> {
        tokio::time::timeout(self.options.request_timeout, fut)
            .await
            .map_err(|_| SessionError::DeadlineExceeded)?
    }

    /// Mints a refresh token and a signed token for `user_id` and persists
    /// the refresh token.
    async fn create_session(&self, user_id: &str) -> Result<Session, SessionError> {
        let refresh = new_refresh(self.options.refresh_token_len)?;
        let signed = self.signer.issue(user_id, self.options.signed_token_ttl)?;

        self.store
            .set_refresh(user_id, &refresh, self.options.refresh_token_ttl)
            .await?;

        Ok(Session::new(user_id, refresh, signed.into_string()))
    }

    /// Runs the challenge on the blocking pool.
    async fn check_password(
        &self,
        salt: String,
        password: &str,
        verifier: String,
    ) -> Result<bool, SessionError> {
        let challenger = Arc::clone(&self.challenger);
        let password = password.to_string();

        let valid = tokio::task::spawn_blocking(move || {
            challenger.validate(&salt, &password, &verifier)
        })
        .await
        .map_err(|e| SessionError::Worker(e.to_string()))??;
        Ok(valid)
    }

    /// Whether the stored refresh token equals `refresh`. A missing (or
    /// expired) stored token is a plain `false`.
    async fn refresh_matches(&self, user_id: &str, refresh: &str) -> Result<bool, SessionError> {
        match self.store.get_refresh(user_id).await {
            Ok(stored) => Ok(stored.as_bytes().ct_eq(refresh.as_bytes()).into()),
            Err(StoreError::NotFound) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Issued to `user_id`, not blacklisted and not expired.
    async fn signed_token_current(&self, user_id: &str, token: &str) -> Result<bool, SessionError> {
        let parsed = self.signer.parse(token)?;
        if parsed.subject() != user_id {
            return Ok(false);
        }
        let blacklisted = self.store.is_blacklisted(token).await?;
        Ok(!blacklisted && !parsed.is_expired())
    }

    /// Blacklists `token` until it would have expired anyway. Only a token
    /// issued to `user_id` is touched.
    async fn revoke(&self, user_id: &str, token: &str) -> Result<(), SessionError> {
        let parsed = self.signer.parse(token)?;
        if parsed.subject() != user_id {
            return Err(SessionError::InvalidSession);
        }
        self.store.set_blacklist(token, parsed.remaining_ttl()).await?;
        Ok(())
    }

    /// Revokes the old signed token if there is one. Never fails.
    async fn revoke_best_effort(&self, old: &Session) -> Result<(), SessionError> {
        if old.signed_token.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.revoke(&old.user_id, &old.signed_token).await {
            tracing::warn!(user_id = %old.user_id, error = %e, "could not revoke old signed token");
        }
        Ok(())
    }

    /// Checks the old refresh token is still current, then removes it.
    async fn retire_refresh(&self, user_id: &str, refresh: &str) -> Result<(), SessionError> {
        if !self.refresh_matches(user_id, refresh).await? {
            return Err(SessionError::InvalidSession);
        }
        self.store.remove_refresh(user_id).await?;
        Ok(())
    }
}
