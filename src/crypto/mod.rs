//! Field-level envelope encryption
//!
//! Provides authenticated encryption of individual string fields,
//! independent of any log semantics.
//!
//! ## Responsibilities
//! - AES-256-GCM encrypt/decrypt of one field value
//! - Fresh random nonce per encryption, carried inside the envelope
//! - Key injection via the `KeyProvider` seam (no process-wide key state)
//!
//! ## Envelope Format
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Base64( nonce (12) ‖ ciphertext + tag )  │
//! └──────────────────────────────────────────┘
//! ```

mod envelope;
mod key;

pub use envelope::{CryptoEnvelope, EncryptedField, NONCE_SIZE};
pub use key::{EncryptionKey, KeyProvider, StaticKeyProvider, KEY_SIZE};
