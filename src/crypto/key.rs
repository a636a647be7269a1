//! Key material and the secret-provider seam
//!
//! Keys are supplied externally and never derived from or logged alongside
//! plaintext. Material is zeroized on drop and redacted from Debug output.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, VeilError};

/// Key length in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// 256-bit symmetric key
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    /// Wrap raw key material
    pub fn new(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Build a key from a byte slice, validating its length
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            VeilError::Config(format!(
                "invalid key length: expected {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Generate a random key
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Raw key bytes (for internal cipher construction)
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EncryptionKey([REDACTED])")
    }
}

/// Seam to an external secret store
///
/// The pipeline uses exactly one active key for the scope of a run;
/// rotation happens outside this crate.
pub trait KeyProvider: Send + Sync {
    /// The currently active 256-bit key
    fn current_key(&self) -> Result<EncryptionKey>;
}

/// Key provider backed by a single fixed key
///
/// Used for tests and single-key migration runs.
pub struct StaticKeyProvider {
    key: EncryptionKey,
}

impl StaticKeyProvider {
    pub fn new(key: EncryptionKey) -> Self {
        Self { key }
    }
}

impl KeyProvider for StaticKeyProvider {
    fn current_key(&self) -> Result<EncryptionKey> {
        Ok(self.key.clone())
    }
}
