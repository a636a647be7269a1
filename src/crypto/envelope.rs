//! Authenticated envelope encryption of a single string field
//!
//! Every encryption uses a fresh random nonce; the nonce is prepended to the
//! ciphertext before Base64 encoding so decryption needs only the envelope
//! and the key. A fixed or zero nonce would leak plaintext equality and, for
//! counter-mode ciphers, break confidentiality outright.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VeilError};

use super::EncryptionKey;

/// AEAD nonce length in bytes (96-bit, the GCM standard)
pub const NONCE_SIZE: usize = 12;

/// A Base64-encoded authenticated ciphertext of one field value
///
/// Wire form: `Base64(nonce ‖ ciphertext ‖ tag)`. Serializes as a plain
/// JSON string so encrypted payloads stay ordinary JSON objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedField(String);

impl EncryptedField {
    /// Wrap an already-encoded envelope (e.g. read back from a payload)
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The Base64 envelope string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EncryptedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Symmetric authenticated encryption of individual string fields
///
/// Stateless given the key: operations are pure apart from nonce randomness
/// and may run concurrently across independent records.
pub struct CryptoEnvelope;

impl CryptoEnvelope {
    /// Encrypt a field value under the given key
    ///
    /// Two calls with identical inputs produce different envelopes (fresh
    /// nonce per call). Any alteration of the returned value causes
    /// [`CryptoEnvelope::decrypt`] to fail rather than return corrupted
    /// plaintext.
    pub fn encrypt(plaintext: &str, key: &EncryptionKey) -> Result<EncryptedField> {
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| VeilError::Format(format!("cipher init failed: {}", e)))?;

        let nonce_bytes = random_nonce();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| VeilError::Format(format!("encryption failed: {}", e)))?;

        // nonce travels with the ciphertext
        let mut envelope = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&ciphertext);

        Ok(EncryptedField(BASE64.encode(envelope)))
    }

    /// Decrypt a field envelope under the given key
    ///
    /// Errors:
    /// - `Format` — not valid Base64, too short to hold a nonce, or the
    ///   recovered plaintext is not UTF-8
    /// - `Integrity` — authentication failed (tampered or wrong key)
    pub fn decrypt(field: &EncryptedField, key: &EncryptionKey) -> Result<String> {
        let envelope = BASE64
            .decode(field.as_str())
            .map_err(|e| VeilError::Format(format!("invalid Base64 envelope: {}", e)))?;

        if envelope.len() < NONCE_SIZE {
            return Err(VeilError::Format(format!(
                "envelope too short: {} bytes, need at least {}",
                envelope.len(),
                NONCE_SIZE
            )));
        }

        let (nonce_bytes, ciphertext) = envelope.split_at(NONCE_SIZE);

        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| VeilError::Format(format!("cipher init failed: {}", e)))?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| {
                VeilError::Integrity("ciphertext failed authentication".to_string())
            })?;

        String::from_utf8(plaintext)
            .map_err(|e| VeilError::Format(format!("decrypted bytes are not UTF-8: {}", e)))
    }
}

/// Generate a cryptographically random 12-byte nonce
fn random_nonce() -> [u8; NONCE_SIZE] {
    use rand::RngCore;
    let mut bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}
