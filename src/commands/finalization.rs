use crate::{
    commands::{new_identifier, Context},
    hashing::ContributionHasher,
    objects::{
        Ceremony,
        FinalizationResult,
        FinalizedKey,
        KeySource,
        KeyVerification,
        KeyVerificationStatus,
        Parameters,
        PendingVerification,
        VerificationKey,
    },
    CoordinatorError,
};

use itertools::Itertools;
use serde_json::{json, Map, Value};
use std::time::Instant;
use time::OffsetDateTime;
use tracing::{debug, error, info, trace, warn};

/// The conventional Groth16 verification key fields carried by parameter sets.
const KEY_POINT_FIELDS: [&str; 6] = ["vk_alpha_1", "vk_beta_2", "vk_gamma_2", "vk_delta_2", "vk_alphabeta_12", "IC"];

pub(crate) struct Finalization;

impl Finalization {
    ///
    /// Freezes the running parameters of a ceremony, derives its verification key,
    /// and publishes the key to the distribution channels of the ceremony.
    ///
    /// Validation runs against a snapshot, and the commit only succeeds if no other
    /// command was committed to the ceremony since. On a concurrent modification
    /// the whole finalization is retried, up to the configured number of attempts.
    ///
    pub(crate) fn run(context: &Context, ceremony_id: &str) -> Result<FinalizationResult, CoordinatorError> {
        let started = Instant::now();
        let max_attempts = context.environment.max_commit_attempts();

        for attempt in 1..=max_attempts {
            trace!("Finalizing ceremony {} (attempt {} of {})", ceremony_id, attempt, max_attempts);

            let ceremony = context.storage.get(ceremony_id)?;
            let (key, key_hash) = Self::synthesize(context, &ceremony)?;
            let finalized_at = OffsetDateTime::now_utc();

            let verifiers_required = context.environment.verifiers_required();
            let result = context.storage.update_and_publish(
                ceremony_id,
                Some(ceremony.version()),
                |ceremony| {
                    ceremony.finalize(key.clone(), key_hash.clone(), finalized_at)?;
                    Ok(ceremony.contributed_count())
                },
                |ceremony, _| {
                    // The pending record and the channel copies are in place before
                    // any reader can observe the completed ceremony.
                    context.storage.insert_pending_verification(PendingVerification {
                        ceremony_id: ceremony.id().to_string(),
                        key_id: key.id().to_string(),
                        key_hash: key_hash.clone(),
                        created_at: finalized_at,
                        verifiers_required,
                    });
                    context
                        .distribution
                        .fan_out(&ceremony.distribution_config().channels, ceremony.id(), &key, &key_hash)
                },
            );

            let (participant_count, published, ceremony) = match result {
                Ok(result) => result,
                Err(CoordinatorError::ConcurrentModification(_)) => {
                    debug!("Ceremony {} was modified during finalization, retrying", ceremony_id);
                    continue;
                }
                Err(error) => return Err(error),
            };

            info!(
                "Finalized ceremony {} with key {} (published to {})",
                ceremony_id,
                key.id(),
                published.iter().join(", ")
            );
            context.audit.log(
                "ceremony_finalized",
                &json!({
                    "ceremonyId": ceremony_id,
                    "keyId": key.id(),
                    "keyHash": key_hash,
                    "participantCount": participant_count,
                    "channels": published,
                }),
            );

            return Ok(FinalizationResult {
                ceremony_id: ceremony_id.to_string(),
                status: ceremony.status(),
                finalized_at,
                participant_count,
                verification_key: FinalizedKey {
                    id: key.id().to_string(),
                    circuit: ceremony.circuit_id().to_string(),
                    hash: key_hash,
                    validated_at: finalized_at,
                },
                processing_time_ms: started.elapsed().as_millis() as u64,
            });
        }

        warn!(
            "Failed to finalize ceremony {} after {} attempts",
            ceremony_id, max_attempts
        );
        Err(CoordinatorError::ConcurrentModification(ceremony_id.to_string()))
    }

    ///
    /// Validates the running parameters of the given snapshot and returns
    /// the verification key derived from them, with its canonical hash.
    ///
    fn synthesize(context: &Context, ceremony: &Ceremony) -> Result<(VerificationKey, String), CoordinatorError> {
        // Check that the ceremony reached its contribution quorum.
        let parameters = ceremony.check_finalizable()?;

        // Check that the final parameters still pass validation.
        let validation = context
            .validator
            .validate_parameters(parameters, ceremony.validation_options())
            .map_err(|error| Self::validator_failed(context, ceremony.id(), error))?;
        if !validation.is_valid {
            error!("The final parameters of ceremony {} failed validation", ceremony.id());
            context.audit.log_error(
                "finalization_parameters_rejected",
                &json!({ "ceremonyId": ceremony.id(), "errors": validation.errors }),
            );
            return Err(CoordinatorError::ValidationFailed {
                target: "parameters",
                errors: validation.errors,
            });
        }

        let settings = context.environment.settings();
        let key = VerificationKey::new(
            new_identifier("vk"),
            OffsetDateTime::now_utc(),
            settings.protocol.clone(),
            settings.key_version,
            settings.curve.clone(),
            extract_key_points(parameters),
            ceremony.security_level(),
            ceremony.contributed_count(),
            KeySource {
                source_type: "ceremony".to_string(),
                ceremony_id: ceremony.id().to_string(),
                circuit_id: ceremony.circuit_id().to_string(),
                circuit_type: ceremony.validation_options().circuit_type.clone(),
            },
            KeyVerification {
                status: KeyVerificationStatus::Pending,
                verifiers_required: context.environment.verifiers_required(),
                verifier_count: 0,
            },
        );

        // Check that the synthesized key is well-formed.
        let validation = context
            .validator
            .validate_verification_key(&key)
            .map_err(|error| Self::validator_failed(context, ceremony.id(), error))?;
        if !validation.is_valid {
            error!("The verification key of ceremony {} failed validation", ceremony.id());
            context.audit.log_error(
                "finalization_key_rejected",
                &json!({ "ceremonyId": ceremony.id(), "keyId": key.id(), "errors": validation.errors }),
            );
            return Err(CoordinatorError::ValidationFailed {
                target: "verificationKey",
                errors: validation.errors,
            });
        }

        let key_hash = ContributionHasher::hash_value(&key)?;
        Ok((key, key_hash))
    }

    fn validator_failed(context: &Context, ceremony_id: &str, error: anyhow::Error) -> CoordinatorError {
        error!("The validator failed while finalizing ceremony {}: {}", ceremony_id, error);
        context.audit.log_error(
            "finalization_validator_failed",
            &json!({ "ceremonyId": ceremony_id, "error": error.to_string() }),
        );
        CoordinatorError::ValidatorFailed(error.to_string())
    }
}

///
/// Returns the verification key points carried by the given parameters.
///
/// If the parameters are a JSON object with any of the conventional key fields,
/// only those fields are kept. Otherwise the parameters are passed through.
///
pub(crate) fn extract_key_points(parameters: &Parameters) -> Parameters {
    if let Parameters::Json(Value::Object(fields)) = parameters {
        let points: Map<String, Value> = KEY_POINT_FIELDS
            .iter()
            .filter_map(|field| fields.get(*field).map(|value| (field.to_string(), value.clone())))
            .collect();
        if !points.is_empty() {
            return Parameters::Json(Value::Object(points));
        }
    }
    parameters.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_key_points_keeps_only_point_fields() {
        let parameters = Parameters::Json(json!({
            "vk_alpha_1": ["1", "2"],
            "IC": [["3", "4"]],
            "tau_powers": ["5", "6", "7"],
        }));

        let expected = Parameters::Json(json!({
            "vk_alpha_1": ["1", "2"],
            "IC": [["3", "4"]],
        }));
        assert_eq!(expected, extract_key_points(&parameters));
    }

    #[test]
    fn test_extract_key_points_passes_through() {
        let parameters = Parameters::Json(json!({ "round": 3 }));
        assert_eq!(parameters, extract_key_points(&parameters));

        let parameters = Parameters::Json(json!([1, 2, 3]));
        assert_eq!(parameters, extract_key_points(&parameters));

        let parameters = Parameters::Bytes(vec![0xde, 0xad]);
        assert_eq!(parameters, extract_key_points(&parameters));
    }
}
