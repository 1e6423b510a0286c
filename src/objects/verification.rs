use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// An independent attestation over a completed ceremony.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    verifier_id: String,
    timestamp: OffsetDateTime,
    result: bool,
    metadata: Value,
}

impl Verification {
    #[inline]
    pub(crate) fn new(verifier_id: String, timestamp: OffsetDateTime, result: bool, metadata: Value) -> Self {
        Self {
            verifier_id,
            timestamp,
            result,
            metadata,
        }
    }

    #[inline]
    pub fn verifier_id(&self) -> &str {
        &self.verifier_id
    }

    #[inline]
    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    /// Returns `true` if the verifier attested that the ceremony is sound.
    #[inline]
    pub fn result(&self) -> bool {
        self.result
    }

    #[inline]
    pub fn metadata(&self) -> &Value {
        &self.metadata
    }
}
