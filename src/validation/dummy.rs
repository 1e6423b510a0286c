use crate::{
    hashing::ContributionHasher,
    objects::{Parameters, ValidationOptions, VerificationKey},
    validation::{FieldError, KeyValidation, ParameterValidation, ParameterValidator},
};

use serde_json::Value;

/// A structural validator for parameters. It performs no cryptographic checks.
pub struct Dummy;

impl ParameterValidator for Dummy {
    /// Returns the name of the validator.
    fn name(&self) -> String {
        Self::warning();
        "DummyParameterValidator".to_string()
    }

    /// Checks that the parameters are present, structured when `strict`, and within the size limit.
    fn validate_parameters(
        &self,
        parameters: &Parameters,
        options: &ValidationOptions,
    ) -> anyhow::Result<ParameterValidation> {
        Self::warning();

        let mut errors = vec![];
        if parameters.is_empty() {
            errors.push(FieldError::new("parameters", "must not be empty"));
        }
        if options.strict {
            if let Parameters::Json(value) = parameters {
                if !matches!(value, Value::Object(_) | Value::Array(_)) {
                    errors.push(FieldError::new("parameters", "must be an object or an array"));
                }
            }
        }
        if let Some(limit) = options.max_parameter_bytes {
            if parameters.size_in_bytes() > limit {
                errors.push(FieldError::new("parameters", &format!("must not exceed {} bytes", limit)));
            }
        }

        let parameter_hash = ContributionHasher::hash(parameters)?;
        Ok(ParameterValidation {
            is_valid: errors.is_empty(),
            validation_id: format!("validation-{}", &parameter_hash[..16]),
            parameter_hash,
            errors,
        })
    }

    /// Checks that the key names its protocol and curve, and carries points and contributors.
    fn validate_verification_key(&self, key: &VerificationKey) -> anyhow::Result<KeyValidation> {
        Self::warning();

        let mut errors = vec![];
        if key.protocol().is_empty() {
            errors.push(FieldError::new("protocol", "must not be empty"));
        }
        if key.curve().is_empty() {
            errors.push(FieldError::new("curve", "must not be empty"));
        }
        if key.points().is_empty() {
            errors.push(FieldError::new("points", "must not be empty"));
        }
        if key.contributor_count() == 0 {
            errors.push(FieldError::new("contributorCount", "must be positive"));
        }

        let key_hash = ContributionHasher::hash_value(key)?;
        Ok(KeyValidation {
            is_valid: errors.is_empty(),
            validation_id: format!("validation-{}", &key_hash[..16]),
            key_hash,
            errors,
        })
    }
}

impl Dummy {
    /// Outputs an explicit message that the validator performs no cryptographic checks.
    fn warning() {
        #[cfg(not(test))]
        {
            tracing::trace!("A DUMMY PARAMETER VALIDATOR IS CURRENTLY BEING USED");
            tracing::warn!("DUMMY PARAMETER VALIDATOR IS NOT SAFE FOR USE IN PRODUCTION");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_dummy_validate_parameters() {
        let dummy = Dummy;
        let options = ValidationOptions::default();

        let parameters = Parameters::Json(json!({ "tau": "0x01" }));
        let validation = dummy.validate_parameters(&parameters, &options).unwrap();
        assert!(validation.is_valid);
        assert_eq!(ContributionHasher::hash(&parameters).unwrap(), validation.parameter_hash);
        assert_eq!(validation, dummy.validate_parameters(&parameters, &options).unwrap());

        let validation = dummy.validate_parameters(&Parameters::Json(json!({})), &options).unwrap();
        assert!(!validation.is_valid);
        assert_eq!("parameters", validation.errors[0].field);
    }

    #[test]
    fn test_dummy_strict_and_size_limit() {
        let dummy = Dummy;
        let options = ValidationOptions {
            strict: true,
            max_parameter_bytes: Some(4),
            ..Default::default()
        };

        let validation = dummy
            .validate_parameters(&Parameters::Json(json!("scalar")), &options)
            .unwrap();
        assert!(!validation.is_valid);
        assert_eq!(2, validation.errors.len());

        let validation = dummy.validate_parameters(&Parameters::Bytes(vec![1, 2, 3]), &options).unwrap();
        assert!(validation.is_valid);
    }
}
