//! Process-wide session options.

use std::time::Duration;

use turnstile_challenge::DEFAULT_SALT_LEN;
use turnstile_token::DEFAULT_REFRESH_LEN;

/// Immutable configuration shared by the session manager and the
/// challenge engine. Built once at startup.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Random bytes in each refresh token. Default: 32.
    pub refresh_token_len: usize,
    /// Lifetime of a signed token. Default: 15 minutes.
    pub signed_token_ttl: Duration,
    /// Lifetime of a refresh token in storage. Default: 24 hours.
    pub refresh_token_ttl: Duration,
    /// Random salt bytes per verifier. Default: 16.
    pub salt_len: usize,
    /// Upper bound on any single operation. Default: 3 seconds.
    pub request_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            refresh_token_len: DEFAULT_REFRESH_LEN,
            signed_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(24 * 60 * 60),
            salt_len: DEFAULT_SALT_LEN,
            request_timeout: Duration::from_secs(3),
        }
    }
}
