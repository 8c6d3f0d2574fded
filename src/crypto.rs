//! Slug sealing.
//!
//! URL slugs are stored as `base64(nonce || ciphertext || tag)` produced by
//! AES-256-GCM under a single configured key. A fresh random nonce is drawn for
//! every encryption, so the same slug never produces the same stored value and
//! uniqueness checks have to run on decrypted plaintext.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine, engine::general_purpose};
use thiserror::Error;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption key must be base64 encoded")]
    KeyEncoding(#[source] base64::DecodeError),

    #[error("encryption key must be 32 bytes, got {0}")]
    KeyLength(usize),

    #[error("ciphertext is not valid base64")]
    Encoding(#[from] base64::DecodeError),

    #[error("ciphertext is too short")]
    Truncated,

    #[error("ciphertext failed authentication")]
    Authentication,

    #[error("decrypted value is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// SlugCipher
///
/// Authenticated encryption for a single string field. Cheap to clone; the
/// expanded key schedule is shared by value.
#[derive(Clone)]
pub struct SlugCipher {
    cipher: Aes256Gcm,
}

impl SlugCipher {
    /// Builds a cipher from the base64 encoded 256-bit key held in configuration.
    pub fn from_base64_key(key: &str) -> Result<Self, CryptoError> {
        let bytes = general_purpose::STANDARD
            .decode(key.trim())
            .map_err(CryptoError::KeyEncoding)?;
        let cipher =
            Aes256Gcm::new_from_slice(&bytes).map_err(|_| CryptoError::KeyLength(bytes.len()))?;
        Ok(Self { cipher })
    }

    /// Seals `plaintext`. The empty string passes through untouched.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Authentication)?;

        let mut payload = Vec::with_capacity(NONCE_LEN + sealed.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&sealed);
        Ok(general_purpose::STANDARD.encode(payload))
    }

    /// Opens a value produced by [`SlugCipher::encrypt`]. Tampered, truncated or
    /// foreign-key input is rejected rather than returned garbled.
    pub fn decrypt(&self, encoded: &str) -> Result<String, CryptoError> {
        if encoded.is_empty() {
            return Ok(String::new());
        }

        let payload = general_purpose::STANDARD.decode(encoded)?;
        if payload.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::Truncated);
        }

        let (nonce, sealed) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::Authentication)?;

        Ok(String::from_utf8(plaintext)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

    fn cipher() -> SlugCipher {
        SlugCipher::from_base64_key(KEY).unwrap()
    }

    #[test]
    fn test_round_trip_restores_slug() {
        let cipher = cipher();
        for slug in ["rust", "hello-world-2024", "ünïcödé slug", "a/b?c=d&e"] {
            let sealed = cipher.encrypt(slug).unwrap();
            assert_ne!(sealed, slug);
            assert_eq!(cipher.decrypt(&sealed).unwrap(), slug);
        }
    }

    #[test]
    fn test_empty_string_passes_through() {
        let cipher = cipher();
        assert_eq!(cipher.encrypt("").unwrap(), "");
        assert_eq!(cipher.decrypt("").unwrap(), "");
    }

    #[test]
    fn test_same_slug_encrypts_differently() {
        let cipher = cipher();
        let first = cipher.encrypt("same").unwrap();
        let second = cipher.encrypt("same").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_tampered_ciphertext_is_rejected() {
        let cipher = cipher();
        let sealed = cipher.encrypt("integrity").unwrap();
        let mut bytes = general_purpose::STANDARD.decode(&sealed).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = general_purpose::STANDARD.encode(bytes);

        assert!(matches!(
            cipher.decrypt(&tampered),
            Err(CryptoError::Authentication)
        ));
    }

    #[test]
    fn test_short_payload_is_rejected() {
        let short = general_purpose::STANDARD.encode([0u8; 10]);
        assert!(matches!(cipher().decrypt(&short), Err(CryptoError::Truncated)));
    }

    #[test]
    fn test_key_must_be_32_bytes() {
        let key = general_purpose::STANDARD.encode([7u8; 16]);
        assert!(matches!(
            SlugCipher::from_base64_key(&key),
            Err(CryptoError::KeyLength(16))
        ));
    }
}
