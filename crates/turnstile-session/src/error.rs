//! Error types for the session layer.

use turnstile_challenge::ChallengeError;
use turnstile_store::StoreError;
use turnstile_token::TokenError;

/// Errors returned by the [`SessionManager`](crate::SessionManager).
///
/// The first three variants are the domain outcomes callers are expected
/// to handle. The rest mean the service could not decide.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Missing or wrong credentials.
    #[error("invalid challenge")]
    InvalidChallenge,

    /// The session is malformed, revoked, or no longer current.
    #[error("invalid session")]
    InvalidSession,

    /// Storage has no record for the user.
    #[error("user does not exist")]
    UserNotExist,

    /// The operation did not finish within its deadline.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Challenge(#[from] ChallengeError),

    /// Any storage failure other than "not found".
    #[error(transparent)]
    Storage(StoreError),

    /// The blocking task running the password KDF failed.
    #[error("worker task failed: {0}")]
    Worker(String),
}

/// "Not found" never leaves this crate as a storage error; it becomes
/// [`SessionError::UserNotExist`].
impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => SessionError::UserNotExist,
            other => SessionError::Storage(other),
        }
    }
}
