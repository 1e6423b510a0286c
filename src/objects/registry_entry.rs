use crate::objects::VerificationKey;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryStatus {
    Active,
}

/// A verification key that reached verifier quorum and is trusted for use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub id: String,
    pub ceremony_id: String,
    pub circuit_id: String,
    pub timestamp: OffsetDateTime,
    pub key: VerificationKey,
    pub hash: String,
    pub status: RegistryStatus,
}

impl RegistryEntry {
    /// Creates an active entry for the given key.
    #[inline]
    pub(crate) fn active(key: VerificationKey, hash: String, timestamp: OffsetDateTime) -> Self {
        Self {
            id: key.id().to_string(),
            ceremony_id: key.source().ceremony_id.clone(),
            circuit_id: key.source().circuit_id.clone(),
            timestamp,
            key,
            hash,
            status: RegistryStatus::Active,
        }
    }
}
