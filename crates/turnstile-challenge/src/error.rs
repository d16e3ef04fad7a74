//! Error types for the challenge engine.

/// Errors that can occur while generating or validating a challenge.
///
/// A wrong password is NOT an error: [`Challenger::validate`] returns
/// `Ok(false)` for it. These variants mean validity could not be decided.
///
/// [`Challenger::validate`]: crate::Challenger::validate
#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    /// The key ring was built without any key.
    #[error("key ring must contain at least one key")]
    EmptyKeyRing,

    /// A key in the ring has the wrong length.
    #[error("key {index} must be {expected} bytes, got {actual}")]
    InvalidKey {
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// Authenticated encryption failed.
    #[error("cipher failure: {0}")]
    Cipher(String),

    /// The decoded verifier is shorter than a nonce.
    #[error("verifier ciphertext too short: {0} bytes")]
    CipherTooShort(usize),

    /// The salt or verifier is not valid hex.
    #[error("encoding error: {0}")]
    Encoding(#[from] hex::FromHexError),

    /// The operating system's secure random source failed.
    #[error("secure random source unavailable: {0}")]
    RandomSource(String),
}
