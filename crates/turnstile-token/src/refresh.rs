//! Opaque refresh tokens.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::TokenError;

/// Default number of random bytes in a refresh token.
pub const DEFAULT_REFRESH_LEN: usize = 32;

/// Generates a refresh token from `len` bytes of OS randomness, encoded as
/// URL-safe base64 (with padding).
///
/// The bytes come straight from the operating system so a failure there
/// is reported instead of silently falling back to a weaker generator.
pub fn new_refresh(len: usize) -> Result<String, TokenError> {
    let mut bytes = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| TokenError::RandomSource(e.to_string()))?;
    Ok(URL_SAFE.encode(bytes))
}
