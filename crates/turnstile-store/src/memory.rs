//! In-memory [`Store`] backend.
//!
//! Mirrors the key layout of a key-value deployment: one record per user
//! holding salt, verifier and the current refresh token, plus a blacklist
//! keyed by token with an expiry instant used only for sweeping.
//!
//! Expiry instants come from `tokio::time::Instant`, so tests running
//! with a paused clock can move time forward with `tokio::time::advance`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::{Store, StoreError};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A refresh token plus the instant it stops being valid.
/// `None` means the TTL was too large to represent.
#[derive(Debug, Clone)]
struct RefreshEntry {
    token: String,
    expires_at: Option<Instant>,
}

/// Everything stored under one user id.
#[derive(Debug, Default, Clone)]
struct CredentialRecord {
    salt: Option<String>,
    verifier: Option<String>,
    refresh: Option<RefreshEntry>,
}

/// `now + ttl`, or `None` if that overflows the clock.
fn expiry_after(ttl: Duration) -> Option<Instant> {
    Instant::now().checked_add(ttl)
}

fn is_past(expires_at: Option<Instant>, now: Instant) -> bool {
    expires_at.is_some_and(|at| at <= now)
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// A [`Store`] that keeps everything in process memory.
///
/// Safe to share behind an `Arc`: both maps sit behind Tokio `RwLock`s,
/// and no lock is held across an await point of the caller.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, CredentialRecord>>,
    blacklist: RwLock<HashMap<String, Option<Instant>>>,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blacklist entries currently held, expired or not.
    pub async fn blacklist_len(&self) -> usize {
        self.blacklist.read().await.len()
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Store for MemoryStore {
    async fn get_refresh(&self, user_id: &str) -> Result<String, StoreError> {
        self.ensure_open()?;
        let mut users = self.users.write().await;
        let record = users.get_mut(user_id).ok_or(StoreError::NotFound)?;
        let entry = record.refresh.as_ref().ok_or(StoreError::NotFound)?;

        if is_past(entry.expires_at, Instant::now()) {
            record.refresh = None;
            tracing::debug!(%user_id, "refresh token expired in storage");
            return Err(StoreError::NotFound);
        }
        Ok(entry.token.clone())
    }

    async fn get_salt(&self, user_id: &str) -> Result<String, StoreError> {
        self.ensure_open()?;
        self.users
            .read()
            .await
            .get(user_id)
            .and_then(|r| r.salt.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn get_verifier(&self, user_id: &str) -> Result<String, StoreError> {
        self.ensure_open()?;
        self.users
            .read()
            .await
            .get(user_id)
            .and_then(|r| r.verifier.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn set_refresh(
        &self,
        user_id: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut users = self.users.write().await;
        users.entry(user_id.to_string()).or_default().refresh =
            Some(RefreshEntry {
                token: token.to_string(),
                expires_at: expiry_after(ttl),
            });
        Ok(())
    }

    async fn set_salt(&self, user_id: &str, salt: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut users = self.users.write().await;
        users.entry(user_id.to_string()).or_default().salt = Some(salt.to_string());
        Ok(())
    }

    async fn set_verifier(
        &self,
        user_id: &str,
        verifier: &str,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut users = self.users.write().await;
        users.entry(user_id.to_string()).or_default().verifier =
            Some(verifier.to_string());
        Ok(())
    }

    async fn remove_refresh(&self, user_id: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut users = self.users.write().await;
        let record = users.get_mut(user_id).ok_or(StoreError::NotFound)?;
        record.refresh = None;
        Ok(())
    }

    async fn set_blacklist(&self, token: &str, ttl: Duration) -> Result<(), StoreError> {
        self.ensure_open()?;
        // Re-adding an existing token only moves its expiry.
        self.blacklist
            .write()
            .await
            .insert(token.to_string(), expiry_after(ttl));
        Ok(())
    }

    async fn is_blacklisted(&self, token: &str) -> Result<bool, StoreError> {
        self.ensure_open()?;
        Ok(self.blacklist.read().await.contains_key(token))
    }

    async fn sweep_expired_blacklist(&self) -> Result<usize, StoreError> {
        self.ensure_open()?;
        let now = Instant::now();
        let mut blacklist = self.blacklist.write().await;
        let before = blacklist.len();
        blacklist.retain(|_, expires_at| !is_past(*expires_at, now));
        Ok(before - blacklist.len())
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StoreError::Closed);
        }
        tracing::debug!("memory store closed");
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================
