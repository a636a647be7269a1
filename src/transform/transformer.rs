//! Record transformer
//!
//! Applies the transform policy to one record at a time. Copies are
//! identity-preserving (same id, type, payload, metadata); encrypted
//! outputs carry a freshly minted id, the target type tag, and no metadata
//! (the encrypted schema regenerates its own).

use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use uuid::Uuid;

use crate::crypto::{CryptoEnvelope, KeyProvider};
use crate::error::{Result, VeilError};
use crate::log::Record;

use super::{TransformPolicy, TransformRule};

/// Maps one input record to its output records
pub struct RecordTransformer {
    policy: TransformPolicy,
    keys: Arc<dyn KeyProvider>,
}

impl RecordTransformer {
    pub fn new(policy: TransformPolicy, keys: Arc<dyn KeyProvider>) -> Self {
        Self { policy, keys }
    }

    /// The policy driving this transformer
    pub fn policy(&self) -> &TransformPolicy {
        &self.policy
    }

    /// Transform one record according to the policy
    ///
    /// - Non-sensitive type: exactly one structural copy
    /// - Sensitive type: exactly one record with the designated payload
    ///   fields enveloped
    /// - Unclassified type: `UnknownType` error, forcing an operator
    ///   decision instead of risking unflagged PII leakage
    pub fn transform(&self, record: &Record) -> Result<Vec<Record>> {
        match self.policy.rule_for(&record.record_type) {
            Some(TransformRule::Copy) => Ok(vec![record.clone()]),
            Some(TransformRule::EncryptFields { target_type, fields }) => {
                let encrypted = self.encrypt_record(record, target_type, fields)?;
                Ok(vec![encrypted])
            }
            None => Err(VeilError::UnknownType {
                record_type: record.record_type.clone(),
            }),
        }
    }

    /// Replace each designated payload field with its envelope and re-emit
    /// under the target type
    fn encrypt_record(
        &self,
        record: &Record,
        target_type: &str,
        fields: &[String],
    ) -> Result<Record> {
        let mut payload: Value = serde_json::from_slice(&record.payload).map_err(|e| {
            VeilError::Format(format!(
                "record {} ({}): payload is not valid JSON: {}",
                record.id, record.record_type, e
            ))
        })?;

        let object = payload.as_object_mut().ok_or_else(|| {
            VeilError::Format(format!(
                "record {} ({}): payload is not a JSON object",
                record.id, record.record_type
            ))
        })?;

        let key = self.keys.current_key()?;

        for field in fields {
            let value = object.get(field).ok_or_else(|| {
                VeilError::Format(format!(
                    "record {} ({}): designated field '{}' missing from payload",
                    record.id, record.record_type, field
                ))
            })?;

            let plaintext = value.as_str().ok_or_else(|| {
                VeilError::Format(format!(
                    "record {} ({}): designated field '{}' is not a string",
                    record.id, record.record_type, field
                ))
            })?;

            let envelope = CryptoEnvelope::encrypt(plaintext, &key)?;
            object.insert(field.clone(), Value::String(envelope.as_str().to_string()));
        }

        Ok(Record {
            id: Uuid::new_v4(),
            record_type: target_type.to_string(),
            payload: Bytes::from(serde_json::to_vec(&payload)?),
            metadata: None,
        })
    }
}
