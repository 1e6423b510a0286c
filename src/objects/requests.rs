use crate::objects::{CeremonyStatus, Parameters, SecurityLevel, ValidationOptions};

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeCeremony {
    pub circuit_id: String,
    pub circuit_name: String,
    pub security_level: Option<SecurityLevel>,
    pub validation_options: Option<ValidationOptions>,
    pub distribution_channels: Option<Vec<String>>,
}

impl InitializeCeremony {
    /// Creates a request with the given circuit and default options.
    pub fn new(circuit_id: &str, circuit_name: &str) -> Self {
        Self {
            circuit_id: circuit_id.to_string(),
            circuit_name: circuit_name.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterParticipant {
    pub id: String,
    pub name: Option<String>,
    pub public_key: String,
}

impl RegisterParticipant {
    pub fn new(id: &str, public_key: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            public_key: public_key.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitContribution {
    pub participant_id: String,
    pub parameters: Parameters,
    /// The canonical hash of `parameters`, as computed by the contributor.
    pub hash: String,
    /// The canonical hash of the parameters the contribution was built on.
    /// `None` skips the chain check.
    pub previous_hash: Option<String>,
}

impl SubmitContribution {
    pub fn new(participant_id: &str, parameters: Parameters, hash: &str) -> Self {
        Self {
            participant_id: participant_id.to_string(),
            parameters,
            hash: hash.to_string(),
            previous_hash: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCeremony {
    pub verifier_id: String,
    pub result: bool,
    pub metadata: Option<Value>,
}

impl VerifyCeremony {
    pub fn new(verifier_id: &str, result: bool) -> Self {
        Self {
            verifier_id: verifier_id.to_string(),
            result,
            metadata: None,
        }
    }
}

/// Filters for listing ceremonies. Unset fields match every ceremony.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CeremonyFilter {
    pub status: Option<CeremonyStatus>,
    pub circuit_id: Option<String>,
}
