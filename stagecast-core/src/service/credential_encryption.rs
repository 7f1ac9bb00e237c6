//! At-rest encryption for destination stream keys using AES-256-GCM.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::models::DestinationConfig;
use crate::{Error, Result};

/// AES-256-GCM nonce size (96 bits)
const NONCE_SIZE: usize = 12;

/// Prefix distinguishing ciphertext from legacy plaintext JSON
const ENCRYPTED_PREFIX: &str = "enc:";

/// Key version byte, reserved for rotation
const KEY_VERSION: u8 = 0x01;

/// Encrypts and decrypts destination configs for database storage
#[derive(Clone)]
pub struct CredentialEncryption {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for CredentialEncryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialEncryption")
            .field("cipher", &"[REDACTED]")
            .finish()
    }
}

impl CredentialEncryption {
    /// Build from a 32-byte AES-256 key
    pub fn new(key_bytes: &[u8]) -> Result<Self> {
        if key_bytes.len() != 32 {
            return Err(Error::Config(format!(
                "Encryption key must be exactly 32 bytes, got {}",
                key_bytes.len()
            )));
        }
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Build from a 64-character hex key string
    pub fn from_hex_key(hex_key: &str) -> Result<Self> {
        let key_bytes =
            hex::decode(hex_key).map_err(|e| Error::Config(format!("Invalid hex key: {e}")))?;
        Self::new(&key_bytes)
    }

    /// Encrypt a destination config into `enc:<base64(version + nonce + ciphertext)>`
    pub fn encrypt_config(&self, config: &DestinationConfig) -> Result<String> {
        let plaintext = serde_json::to_vec(config)?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_ref())
            .map_err(|e| Error::Internal(format!("Config encryption failed: {e}")))?;

        let mut combined = Vec::with_capacity(1 + NONCE_SIZE + ciphertext.len());
        combined.push(KEY_VERSION);
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(format!("{ENCRYPTED_PREFIX}{}", BASE64.encode(&combined)))
    }

    /// Decrypt a stored config. Plaintext JSON (pre-encryption rows) is
    /// accepted as-is.
    pub fn decrypt_config(&self, stored: &str) -> Result<DestinationConfig> {
        let Some(encoded) = stored.strip_prefix(ENCRYPTED_PREFIX) else {
            return serde_json::from_str(stored)
                .map_err(|e| Error::Internal(format!("Stored config is not valid JSON: {e}")));
        };

        let combined = BASE64
            .decode(encoded)
            .map_err(|e| Error::Internal(format!("Invalid base64 in encrypted config: {e}")))?;

        if combined.len() < 1 + NONCE_SIZE {
            return Err(Error::Internal("Encrypted config too short".to_string()));
        }

        let version = combined[0];
        if version != KEY_VERSION {
            return Err(Error::Internal(format!(
                "Unsupported config encryption version: {version}"
            )));
        }

        let (nonce_bytes, ciphertext) = combined[1..].split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| Error::Internal("Config decryption failed (wrong key or corrupted data)".to_string()))?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| Error::Internal(format!("Decrypted config is not valid JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encryption() -> CredentialEncryption {
        CredentialEncryption::from_hex_key(&"ab".repeat(32)).unwrap()
    }

    fn sample_config() -> DestinationConfig {
        DestinationConfig {
            url: Some("rtmp://a.rtmp.youtube.com/live2".to_string()),
            key: Some("abcd-efgh-ijkl".to_string()),
        }
    }

    #[test]
    fn test_round_trip() {
        let enc = encryption();
        let stored = enc.encrypt_config(&sample_config()).unwrap();
        assert!(stored.starts_with("enc:"));
        assert!(!stored.contains("abcd-efgh-ijkl"));

        let decrypted = enc.decrypt_config(&stored).unwrap();
        assert_eq!(decrypted, sample_config());
    }

    #[test]
    fn test_nonces_vary() {
        let enc = encryption();
        let a = enc.encrypt_config(&sample_config()).unwrap();
        let b = enc.encrypt_config(&sample_config()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_plaintext_fallback() {
        let enc = encryption();
        let decrypted = enc
            .decrypt_config(r#"{"url":"rtmp://x.example.com/live","key":null}"#)
            .unwrap();
        assert_eq!(decrypted.url.as_deref(), Some("rtmp://x.example.com/live"));
        assert!(decrypted.key.is_none());
    }

    #[test]
    fn test_wrong_key_fails() {
        let stored = encryption().encrypt_config(&sample_config()).unwrap();
        let other = CredentialEncryption::from_hex_key(&"cd".repeat(32)).unwrap();
        assert!(other.decrypt_config(&stored).is_err());
    }

    #[test]
    fn test_bad_key_length() {
        assert!(CredentialEncryption::new(&[0u8; 16]).is_err());
        assert!(CredentialEncryption::from_hex_key("zz").is_err());
    }
}
