//! Verifier generation and validation.

use pbkdf2::pbkdf2_hmac;
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::{ChallengeError, KeyRing};

/// PBKDF2 rounds. Deliberately slow.
pub const SLOW_HASH_ITERATIONS: u32 = 4096;
/// Length of the derived hash that gets encrypted.
pub const HASH_LEN: usize = 64;

/// The stored half of a challenge: hex salt and hex verifier ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub salt: String,
    pub verifier: String,
}

/// Generates and checks password verifiers.
///
/// Both operations run the slow hash, so they are CPU-bound for a few
/// milliseconds. Async callers should move them off the runtime's worker
/// threads (e.g. `tokio::task::spawn_blocking`).
#[derive(Debug, Clone)]
pub struct Challenger {
    ring: KeyRing,
    salt_len: usize,
}

impl Challenger {
    pub fn new(ring: KeyRing, salt_len: usize) -> Self {
        Self { ring, salt_len }
    }

    pub fn salt_len(&self) -> usize {
        self.salt_len
    }

    pub fn key_ring(&self) -> &KeyRing {
        &self.ring
    }

    /// Produces a fresh salt and verifier for `password`.
    pub fn generate(&self, password: &str) -> Result<Challenge, ChallengeError> {
        let mut salt = vec![0u8; self.salt_len];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| ChallengeError::RandomSource(e.to_string()))?;

        let hash = slow_hash(password.as_bytes(), &salt);
        let sealed = self.ring.seal(&hash)?;

        Ok(Challenge {
            salt: hex::encode(salt),
            verifier: hex::encode(sealed),
        })
    }

    /// Checks `password` against a stored salt and verifier.
    ///
    /// Returns `Ok(false)` for a wrong password and also for a verifier no
    /// key in the ring can open: at this layer a corrupted or foreign
    /// ciphertext looks the same as a wrong password.
    pub fn validate(
        &self,
        salt: &str,
        password: &str,
        verifier: &str,
    ) -> Result<bool, ChallengeError> {
        let salt = hex::decode(salt)?;
        let sealed = hex::decode(verifier)?;
        if sealed.len() < crate::NONCE_LEN {
            return Err(ChallengeError::CipherTooShort(sealed.len()));
        }

        let hash = slow_hash(password.as_bytes(), &salt);
        match self.ring.open(&sealed)? {
            // The first key that authenticates decides; no further keys
            // are tried on a mismatch.
            Some(stored) => Ok(stored.as_slice().ct_eq(&hash[..]).into()),
            None => Ok(false),
        }
    }
}

fn slow_hash(password: &[u8], salt: &[u8]) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password, salt, SLOW_HASH_ITERATIONS, &mut out);
    out
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NONCE_LEN, TAG_LEN};

    const K1: &[u8] = b"vcMGBMVbxobHRRdX1WBYq0T4L3UYWQLd";
    const K2: &[u8] = b"EvMT3FFDNX9dW3SggfyC7sJJ74EkzH32";
    const K3: &[u8] = b"tHWYreQPuHhfPLIIqcAliQWgfXdNVWLF";

    fn challenger(keys: &[&[u8]]) -> Challenger {
        Challenger::new(KeyRing::new(keys.iter().copied()).unwrap(), 16)
    }

    // =====================================================================
    // generate()
    // =====================================================================

    #[test]
    fn test_generate_123password_has_expected_lengths() {
        let engine = challenger(&[K1, K2, K3]);

        let challenge = engine.generate("123password").unwrap();

        let salt = hex::decode(&challenge.salt).unwrap();
        let sealed = hex::decode(&challenge.verifier).unwrap();
        assert_eq!(salt.len(), 16);
        assert_eq!(sealed.len(), NONCE_LEN + HASH_LEN + TAG_LEN);
        assert!(
            engine
                .validate(&challenge.salt, "123password", &challenge.verifier)
                .unwrap()
        );
    }

    #[test]
    fn test_generate_honours_salt_len() {
        for salt_len in [0, 8, 32] {
            let engine = Challenger::new(KeyRing::new([K1]).unwrap(), salt_len);

            let challenge = engine.generate("pw").unwrap();

            assert_eq!(hex::decode(&challenge.salt).unwrap().len(), salt_len);
        }
    }

    #[test]
    fn test_generate_same_password_gives_different_challenges() {
        let engine = challenger(&[K1]);

        let a = engine.generate("secret6").unwrap();
        let b = engine.generate("secret6").unwrap();

        assert_ne!(a.salt, b.salt);
        assert_ne!(a.verifier, b.verifier);
    }

    #[test]
    fn test_generate_spreads_over_every_key() {
        let engine = challenger(&[K1, K2, K3]);
        let mut used = [false; 3];

        for _ in 0..48 {
            let challenge = engine.generate("pw").unwrap();
            for (i, key) in [K1, K2, K3].into_iter().enumerate() {
                if challenger(&[key])
                    .validate(&challenge.salt, "pw", &challenge.verifier)
                    .unwrap()
                {
                    used[i] = true;
                }
            }
        }

        assert_eq!(used, [true; 3], "every key should be picked at least once");
    }

    // =====================================================================
    // validate()
    // =====================================================================

    #[test]
    fn test_validate_round_trip_for_each_ring_size() {
        let rings: [&[&[u8]]; 3] = [&[K1], &[K1, K2], &[K1, K2, K3]];
        for keys in rings {
            let engine = challenger(keys);
            for password in ["", "a", "123password", "pässwörd with spaces"] {
                let c = engine.generate(password).unwrap();
                assert!(
                    engine.validate(&c.salt, password, &c.verifier).unwrap(),
                    "round trip failed for {password:?} with {} keys",
                    keys.len()
                );
            }
        }
    }

    #[test]
    fn test_validate_wrong_password_returns_false() {
        let engine = challenger(&[K1, K2]);
        let c = engine.generate("secret6").unwrap();

        assert!(!engine.validate(&c.salt, "secret7", &c.verifier).unwrap());
        assert!(!engine.validate(&c.salt, "", &c.verifier).unwrap());
    }

    #[test]
    fn test_validate_wrong_salt_returns_false() {
        let engine = challenger(&[K1]);
        let c = engine.generate("secret6").unwrap();
        let other = engine.generate("secret6").unwrap();

        assert!(!engine.validate(&other.salt, "secret6", &c.verifier).unwrap());
    }

    #[test]
    fn test_validate_key_still_in_rotated_ring_returns_true() {
        let c = challenger(&[K1]).generate("secret6").unwrap();

        let rotated = challenger(&[K2, K3, K1]);

        assert!(rotated.validate(&c.salt, "secret6", &c.verifier).unwrap());
    }

    #[test]
    fn test_validate_key_retired_from_ring_returns_false() {
        let c = challenger(&[K1]).generate("secret6").unwrap();

        let rotated = challenger(&[K2, K3]);

        assert!(!rotated.validate(&c.salt, "secret6", &c.verifier).unwrap());
    }

    #[test]
    fn test_validate_corrupted_verifier_returns_false() {
        let engine = challenger(&[K1]);
        let c = engine.generate("secret6").unwrap();
        let mut sealed = hex::decode(&c.verifier).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;

        let valid = engine.validate(&c.salt, "secret6", &hex::encode(sealed)).unwrap();

        assert!(!valid);
    }

    #[test]
    fn test_validate_malformed_hex_returns_encoding_error() {
        let engine = challenger(&[K1]);
        let c = engine.generate("secret6").unwrap();

        assert!(matches!(
            engine.validate("zz", "secret6", &c.verifier),
            Err(ChallengeError::Encoding(_))
        ));
        assert!(matches!(
            engine.validate(&c.salt, "secret6", "abc"),
            Err(ChallengeError::Encoding(_))
        ));
    }

    #[test]
    fn test_validate_short_verifier_returns_too_short() {
        let engine = challenger(&[K1]);

        let result = engine.validate("00", "secret6", &"ab".repeat(NONCE_LEN - 1));

        assert!(matches!(result, Err(ChallengeError::CipherTooShort(11))));
    }
}
