//! Transform policy
//!
//! A registry mapping record type tags to transformation strategies. New
//! sensitive types are added as entries, not as branches in the transformer.
//!
//! Policies serialize to JSON so operators can supply them as files:
//!
//! ```json
//! {
//!   "BankAccountCreated": "copy",
//!   "BankAccountStakeholderDetailsUpdated": {
//!     "encrypt_fields": {
//!       "target_type": "BankAccountStakeholderDetailsUpdatedV2",
//!       "fields": ["Name", "Address", "Account"]
//!     }
//!   }
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How records of one type are handled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformRule {
    /// Non-sensitive: emit one structural copy of the input record
    Copy,

    /// Sensitive: encrypt the named top-level payload fields and re-emit
    /// under the target (versioned) type tag with a fresh record id
    EncryptFields {
        /// Type tag of the emitted record (the encrypted schema)
        target_type: String,
        /// Top-level payload fields to replace with envelopes
        fields: Vec<String>,
    },
}

/// Type tag → rule registry
///
/// The copy-vs-transform decision is a pure function of the record type;
/// types absent from the registry are rejected by the transformer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformPolicy {
    rules: HashMap<String, TransformRule>,
}

impl TransformPolicy {
    /// Create an empty policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a type as non-sensitive (copied through unchanged)
    pub fn copy(mut self, record_type: impl Into<String>) -> Self {
        self.rules.insert(record_type.into(), TransformRule::Copy);
        self
    }

    /// Classify a type as sensitive, naming the encrypted target type and
    /// the PII fields to envelope
    pub fn encrypt_fields(
        mut self,
        record_type: impl Into<String>,
        target_type: impl Into<String>,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.rules.insert(
            record_type.into(),
            TransformRule::EncryptFields {
                target_type: target_type.into(),
                fields: fields.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    /// Look up the rule for a type tag
    pub fn rule_for(&self, record_type: &str) -> Option<&TransformRule> {
        self.rules.get(record_type)
    }

    /// Number of classified types
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the policy classifies no types
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
