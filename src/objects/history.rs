use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// An accepted contribution, as recorded in the global append-only log.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub sequence: u64,
    pub ceremony_id: String,
    pub participant_id: String,
    pub contribution_order: u64,
    pub timestamp: OffsetDateTime,
    pub hash: String,
}

/// A finalized key awaiting verifier quorum.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingVerification {
    pub ceremony_id: String,
    pub key_id: String,
    pub key_hash: String,
    pub created_at: OffsetDateTime,
    pub verifiers_required: usize,
}
