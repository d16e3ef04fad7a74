//! Error types for the token layer.

/// Errors that can occur while minting or reading tokens.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The signed token is forged, malformed, signed with an unexpected
    /// algorithm, or is missing its subject/expiry claims.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The token could not be signed.
    #[error("token signing failed: {0}")]
    Signing(String),

    /// The requested expiry cannot be represented.
    #[error("token expiry out of range")]
    ExpiryOutOfRange,

    /// The operating system's secure random source failed.
    #[error("secure random source unavailable: {0}")]
    RandomSource(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        TokenError::InvalidToken(err.to_string())
    }
}
