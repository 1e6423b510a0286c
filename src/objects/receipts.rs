use crate::objects::{Ceremony, CeremonyStatus, Contribution, ContributionStatus, DistributionConfig, SecurityLevel, StatusChange};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub ceremony_id: String,
    pub participant_id: String,
    pub display_name: String,
    pub contribution_order: u64,
    pub registration_time: OffsetDateTime,
    pub timeout_at: OffsetDateTime,
    pub status: ContributionStatus,
}

impl Registration {
    pub(crate) fn new(ceremony_id: &str, contribution: &Contribution) -> Self {
        Self {
            ceremony_id: ceremony_id.to_string(),
            participant_id: contribution.participant_id().to_string(),
            display_name: contribution.display_name().to_string(),
            contribution_order: contribution.contribution_order(),
            registration_time: contribution.registration_time(),
            timeout_at: contribution.timeout_at(),
            status: contribution.status(),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Accepted,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionReceipt {
    pub ceremony_id: String,
    pub contribution_id: String,
    pub participant_id: String,
    pub contribution_order: u64,
    pub timestamp: OffsetDateTime,
    pub hash: String,
    /// A digest binding the ceremony, participant, position, and hash of this contribution.
    pub receipt: String,
    pub validation_id: String,
    pub status: ReceiptStatus,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedKey {
    pub id: String,
    pub circuit: String,
    pub hash: String,
    pub validated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizationResult {
    pub ceremony_id: String,
    pub status: CeremonyStatus,
    pub finalized_at: OffsetDateTime,
    pub participant_count: usize,
    pub verification_key: FinalizedKey,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub ceremony_id: String,
    pub verifier_id: String,
    pub timestamp: OffsetDateTime,
    pub result: bool,
    pub ceremony_status: CeremonyStatus,
    pub successful_verifications: usize,
    pub required_verifications: usize,
}

/// A read projection of a ceremony, without the parameter blobs.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CeremonySummary {
    pub id: String,
    pub circuit_id: String,
    pub circuit_name: String,
    pub status: CeremonyStatus,
    pub security_level: SecurityLevel,
    pub start_time: OffsetDateTime,
    pub end_time: Option<OffsetDateTime>,
    pub required_participants: usize,
    pub current_participants: usize,
    pub contributed_participants: usize,
    pub verifications: usize,
    pub successful_verifications: usize,
    pub verification_key_id: Option<String>,
    pub verification_key_hash: Option<String>,
    pub distribution_config: DistributionConfig,
    pub status_history: Vec<StatusChange>,
    pub failure_reason: Option<String>,
}

impl From<&Ceremony> for CeremonySummary {
    fn from(ceremony: &Ceremony) -> Self {
        Self {
            id: ceremony.id().to_string(),
            circuit_id: ceremony.circuit_id().to_string(),
            circuit_name: ceremony.circuit_name().to_string(),
            status: ceremony.status(),
            security_level: ceremony.security_level(),
            start_time: ceremony.start_time(),
            end_time: ceremony.end_time(),
            required_participants: ceremony.required_participants(),
            current_participants: ceremony.current_participants(),
            contributed_participants: ceremony.contributed_count(),
            verifications: ceremony.verifications().len(),
            successful_verifications: ceremony.successful_verifications(),
            verification_key_id: ceremony.verification_key().map(|key| key.id().to_string()),
            verification_key_hash: ceremony.verification_key_hash().map(str::to_string),
            distribution_config: ceremony.distribution_config().clone(),
            status_history: ceremony.status_history().to_vec(),
            failure_reason: ceremony.failure_reason().map(str::to_string),
        }
    }
}
