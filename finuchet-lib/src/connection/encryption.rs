//! Encryption of bank API keys at rest

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use anyhow::{anyhow, Context};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::Rng;

pub const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// AES-256-GCM with a random nonce per value. Ciphertexts are stored as
/// `base64(nonce):base64(ciphertext)`.
#[derive(Clone)]
pub struct KeyCipher {
    cipher: Aes256Gcm,
}

impl KeyCipher {
    pub fn new(key: &[u8]) -> Result<KeyCipher, anyhow::Error> {
        if key.len() != KEY_LEN {
            return Err(anyhow!(
                "Encryption key must be {} bytes, got {}",
                KEY_LEN,
                key.len()
            ));
        }
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| anyhow!("Invalid encryption key"))?;
        Ok(KeyCipher { cipher })
    }

    pub fn from_base64(key: &str) -> Result<KeyCipher, anyhow::Error> {
        let key = STANDARD
            .decode(key.trim())
            .context("Encryption key is not valid base64")?;
        KeyCipher::new(&key)
    }

    pub fn generate_key() -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        rand::thread_rng().fill(&mut key);
        key
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, anyhow::Error> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(GenericArray::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| anyhow!("Encryption failed"))?;
        Ok(format!(
            "{}:{}",
            STANDARD.encode(nonce),
            STANDARD.encode(ciphertext)
        ))
    }

    pub fn decrypt(&self, encrypted: &str) -> Result<String, anyhow::Error> {
        let (nonce, ciphertext) = encrypted
            .split_once(':')
            .ok_or_else(|| anyhow!("Encrypted value has no nonce"))?;
        let nonce = STANDARD.decode(nonce).context("Invalid nonce encoding")?;
        if nonce.len() != NONCE_LEN {
            return Err(anyhow!("Invalid nonce length {}", nonce.len()));
        }
        let ciphertext = STANDARD
            .decode(ciphertext)
            .context("Invalid ciphertext encoding")?;
        let plaintext = self
            .cipher
            .decrypt(GenericArray::from_slice(&nonce), ciphertext.as_ref())
            .map_err(|_| anyhow!("Decryption failed"))?;
        String::from_utf8(plaintext).context("Decrypted value is not UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> KeyCipher {
        KeyCipher::new(&KeyCipher::generate_key()).unwrap()
    }

    #[actix_rt::test]
    async fn decrypts_own_ciphertext() {
        let cipher = cipher();
        let encrypted = cipher.encrypt("sk-live-123").unwrap();
        assert!(!encrypted.contains("sk-live-123"));
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), "sk-live-123");
    }

    #[actix_rt::test]
    async fn nonce_differs_per_value() {
        let cipher = cipher();
        let first = cipher.encrypt("key").unwrap();
        let second = cipher.encrypt("key").unwrap();
        assert_ne!(first, second);
    }

    #[actix_rt::test]
    async fn rejects_other_key() {
        let encrypted = cipher().encrypt("key").unwrap();
        assert!(cipher().decrypt(&encrypted).is_err());
    }

    #[actix_rt::test]
    async fn rejects_tampered_value() {
        let cipher = cipher();
        let encrypted = cipher.encrypt("key").unwrap();
        let (nonce, _) = encrypted.split_once(':').unwrap();
        let tampered = format!("{}:{}", nonce, STANDARD.encode(b"not the ciphertext"));
        assert!(cipher.decrypt(&tampered).is_err());
        assert!(cipher.decrypt("no-separator").is_err());
    }

    #[actix_rt::test]
    async fn key_length() {
        assert!(KeyCipher::new(&[0u8; 16]).is_err());
        let key = STANDARD.encode(KeyCipher::generate_key());
        assert!(KeyCipher::from_base64(&key).is_ok());
    }
}
