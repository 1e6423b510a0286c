use crate::objects::{Parameters, ValidationOptions, VerificationKey};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single rejection reason reported by a validator.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterValidation {
    pub is_valid: bool,
    pub validation_id: String,
    pub parameter_hash: String,
    pub errors: Vec<FieldError>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValidation {
    pub is_valid: bool,
    pub validation_id: String,
    pub key_hash: String,
    pub errors: Vec<FieldError>,
}

/// The proving-system checks consumed by the coordinator.
pub trait ParameterValidator: Send + Sync {
    /// Returns the name of the validator.
    fn name(&self) -> String;

    /// Validates a parameter set submitted as a contribution, or about to be finalized.
    fn validate_parameters(
        &self,
        parameters: &Parameters,
        options: &ValidationOptions,
    ) -> anyhow::Result<ParameterValidation>;

    /// Validates a verification key synthesized from the final parameters.
    fn validate_verification_key(&self, key: &VerificationKey) -> anyhow::Result<KeyValidation>;
}
