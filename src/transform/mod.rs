//! Per-record transformation
//!
//! Maps one input record to its output records according to a type-driven
//! field-encryption policy. Pure functions, no I/O: the only
//! non-determinism is the ciphertext's random nonce.
//!
//! ## Responsibilities
//! - `TransformPolicy`: type tag → strategy registry (copy vs. encrypt)
//! - `RecordTransformer`: applies the policy to one record at a time
//! - Unknown types are rejected, never silently passed through

mod policy;
mod transformer;

pub use policy::{TransformPolicy, TransformRule};
pub use transformer::RecordTransformer;
