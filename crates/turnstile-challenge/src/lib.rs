//! Password challenge engine for Turnstile.
//!
//! A password is never stored, and neither is a plain hash of it. What
//! gets stored is a *verifier*:
//!
//! ```text
//! salt      = random(salt_len)
//! hash      = PBKDF2-HMAC-SHA256(password, salt, 4096 rounds, 64 bytes)
//! verifier  = nonce ‖ AES-256-GCM(key_ring[random index], nonce, hash)
//! ```
//!
//! Stealing the storage alone is not enough to start brute-forcing: the
//! attacker also needs a key from the ring. The ring can be rotated by
//! restarting with new keys appended. Old verifiers keep validating for
//! as long as their key is still somewhere in the ring, because
//! validation tries every key.
//!
//! Both the salt and the verifier are hex-encoded for storage.

mod challenger;
mod error;
mod keyring;

pub use challenger::{Challenge, Challenger, HASH_LEN, SLOW_HASH_ITERATIONS};
pub use error::ChallengeError;
pub use keyring::{KEY_LEN, KeyRing, NONCE_LEN, TAG_LEN};

/// Default number of random salt bytes.
pub const DEFAULT_SALT_LEN: usize = 16;
