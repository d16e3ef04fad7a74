//! The cipher key ring.

use std::fmt;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use rand::rngs::{OsRng, StdRng};
use rand::{Rng, SeedableRng, TryRngCore};

use crate::ChallengeError;

/// Length of every key in the ring (AES-256).
pub const KEY_LEN: usize = 32;
/// Length of the random nonce prepended to each ciphertext.
pub const NONCE_LEN: usize = 12;
/// Length of the GCM authentication tag appended by the cipher.
pub const TAG_LEN: usize = 16;

/// An ordered, immutable set of AES-256-GCM keys.
///
/// Sealing picks one key uniformly at random; opening tries each key in
/// order. Both only read the ring, so one `KeyRing` can be shared by any
/// number of concurrent validations without locking.
#[derive(Clone)]
pub struct KeyRing {
    ciphers: Vec<Aes256Gcm>,
}

impl KeyRing {
    /// Builds a ring from raw keys. Every key must be [`KEY_LEN`] bytes and
    /// there must be at least one.
    pub fn new<I, K>(keys: I) -> Result<Self, ChallengeError>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        let ciphers = keys
            .into_iter()
            .enumerate()
            .map(|(index, key)| {
                let key = key.as_ref();
                Aes256Gcm::new_from_slice(key).map_err(|_| ChallengeError::InvalidKey {
                    index,
                    expected: KEY_LEN,
                    actual: key.len(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if ciphers.is_empty() {
            return Err(ChallengeError::EmptyKeyRing);
        }
        Ok(Self { ciphers })
    }

    /// Number of keys in the ring (always at least one).
    pub fn len(&self) -> usize {
        self.ciphers.len()
    }

    /// Always `false`; a ring cannot be built empty.
    pub fn is_empty(&self) -> bool {
        self.ciphers.is_empty()
    }

    /// Encrypts `plaintext` under a randomly chosen key and returns
    /// `nonce ‖ ciphertext ‖ tag`.
    pub(crate) fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, ChallengeError> {
        let index = self.pick()?;
        self.seal_with(index, plaintext)
    }

    pub(crate) fn seal_with(
        &self,
        index: usize,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, ChallengeError> {
        let cipher = self
            .ciphers
            .get(index)
            .ok_or_else(|| ChallengeError::Cipher(format!("no key at index {index}")))?;

        let mut nonce = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|e| ChallengeError::RandomSource(e.to_string()))?;

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| ChallengeError::Cipher("encryption failed".into()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Tries every key in order and returns the first plaintext that
    /// authenticates, or `None` if no key does.
    ///
    /// AES-GCM reports exactly one kind of decryption failure (the tag did
    /// not verify), which here just means "not this key".
    pub(crate) fn open(&self, sealed: &[u8]) -> Result<Option<Vec<u8>>, ChallengeError> {
        if sealed.len() < NONCE_LEN {
            return Err(ChallengeError::CipherTooShort(sealed.len()));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce);

        Ok(self
            .ciphers
            .iter()
            .find_map(|cipher| cipher.decrypt(nonce, ciphertext).ok()))
    }

    /// Uniform key index from a CSPRNG seeded by the OS.
    fn pick(&self) -> Result<usize, ChallengeError> {
        let mut rng =
            StdRng::try_from_os_rng().map_err(|e| ChallengeError::RandomSource(e.to_string()))?;
        Ok(rng.random_range(0..self.ciphers.len()))
    }
}

// Key material stays out of logs.
impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRing")
            .field("keys", &self.ciphers.len())
            .finish()
    }
}
