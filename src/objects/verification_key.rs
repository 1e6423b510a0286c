use crate::objects::{Parameters, SecurityLevel};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub ceremony_id: String,
    pub circuit_id: String,
    pub circuit_type: String,
}

///
/// The verification state of a key at synthesis time.
///
/// Keys are hashed and distributed as synthesized, so this stays `Pending`
/// after activation. The live state is the `status` of the key's `RegistryEntry`.
///
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyVerificationStatus {
    /// The key awaits verifier attestations.
    Pending,
}

///
/// The verification requirements attached to a key when it was synthesized.
///
/// This is a snapshot covered by the key hash. `verifier_count` is always 0 and
/// is not updated as attestations arrive; the ceremony holds the attestations
/// and the distribution registry holds the activation.
///
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyVerification {
    pub status: KeyVerificationStatus,
    pub verifiers_required: usize,
    pub verifier_count: usize,
}

///
/// The public artifact derived from the final parameters of a ceremony.
///
/// A verification key is immutable once synthesized. Its activation state
/// is tracked by the distribution registry, never on the key itself.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationKey {
    id: String,
    timestamp: OffsetDateTime,
    protocol: String,
    version: u32,
    curve: String,
    points: Parameters,
    security_level: SecurityLevel,
    contributor_count: usize,
    source: KeySource,
    verification: KeyVerification,
}

impl VerificationKey {
    #[allow(clippy::too_many_arguments)]
    #[inline]
    pub(crate) fn new(
        id: String,
        timestamp: OffsetDateTime,
        protocol: String,
        version: u32,
        curve: String,
        points: Parameters,
        security_level: SecurityLevel,
        contributor_count: usize,
        source: KeySource,
        verification: KeyVerification,
    ) -> Self {
        Self {
            id,
            timestamp,
            protocol,
            version,
            curve,
            points,
            security_level,
            contributor_count,
            source,
            verification,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    #[inline]
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[inline]
    pub fn curve(&self) -> &str {
        &self.curve
    }

    /// Returns the curve points, passed through from the final parameters.
    #[inline]
    pub fn points(&self) -> &Parameters {
        &self.points
    }

    #[inline]
    pub fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    #[inline]
    pub fn contributor_count(&self) -> usize {
        self.contributor_count
    }

    #[inline]
    pub fn source(&self) -> &KeySource {
        &self.source
    }

    #[inline]
    pub fn verification(&self) -> &KeyVerification {
        &self.verification
    }
}
