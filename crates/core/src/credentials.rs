//! Sealing of stored third-party credentials (advisor SMTP passwords).
//!
//! AES-256-GCM with a key derived from the configured secret. The sealed
//! form is `nonce (12 bytes) || ciphertext`.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// Size of the AES-GCM nonce prepended to every sealed value.
const NONCE_LEN: usize = 12;

#[derive(Clone)]
pub struct CredentialSealer {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for CredentialSealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSealer").finish_non_exhaustive()
    }
}

impl CredentialSealer {
    /// Derive the sealing key from an arbitrary-length secret.
    pub fn from_secret(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    pub fn seal(&self, plaintext: &str) -> Result<Vec<u8>, CoreError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CoreError::Internal("Failed to seal credential".into()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    pub fn open(&self, sealed: &[u8]) -> Result<String, CoreError> {
        if sealed.len() <= NONCE_LEN {
            return Err(CoreError::Internal("Sealed credential is truncated".into()));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CoreError::Internal("Failed to open sealed credential".into()))?;
        String::from_utf8(plaintext)
            .map_err(|_| CoreError::Internal("Sealed credential is not UTF-8".into()))
    }
}
