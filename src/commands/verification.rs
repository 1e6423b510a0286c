use crate::{
    commands::{is_missing, Context},
    objects::{RegistryEntry, Verification, VerificationOutcome, VerifyCeremony},
    CoordinatorError,
};

use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::{info, warn};

pub(crate) struct Quorum;

impl Quorum {
    ///
    /// Records a verifier attestation over a ceremony.
    ///
    /// When the attestations of a completed ceremony first reach the verifier
    /// quorum, the ceremony becomes `verified` and its key is activated.
    /// Later attestations are recorded without activating the key again.
    ///
    pub(crate) fn run(
        context: &Context,
        ceremony_id: &str,
        request: VerifyCeremony,
    ) -> Result<VerificationOutcome, CoordinatorError> {
        let VerifyCeremony {
            verifier_id,
            result,
            metadata,
        } = request;

        // Check that the ceremony exists before inspecting the request.
        context.storage.get(ceremony_id)?;

        // Check that the verifier is identified.
        if is_missing(&verifier_id) {
            return Err(CoordinatorError::MissingField("verifierId"));
        }

        let timestamp = OffsetDateTime::now_utc();
        let verifiers_required = context.environment.verifiers_required();
        let verification = Verification::new(
            verifier_id.clone(),
            timestamp,
            result,
            metadata.unwrap_or_else(|| Value::Object(Default::default())),
        );

        let outcome = context.storage.update_and_publish(
            ceremony_id,
            None,
            |ceremony| ceremony.record_verification(verification, verifiers_required),
            |ceremony, promoted| {
                // The key is active before any reader can observe the verified ceremony.
                if !*promoted {
                    return None;
                }
                let entry = match (ceremony.verification_key(), ceremony.verification_key_hash()) {
                    (Some(key), Some(hash)) => context
                        .distribution
                        .activate(RegistryEntry::active(key.clone(), hash.to_string(), timestamp)),
                    _ => return None,
                };
                context.storage.remove_pending_verification(ceremony.id());
                Some(entry)
            },
        );
        let (_, activated, ceremony) = match outcome {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!("Rejected verification of ceremony {} by {}: {}", ceremony_id, verifier_id, error);
                context.audit.log_warning(
                    "verification_rejected",
                    &json!({ "ceremonyId": ceremony_id, "verifierId": verifier_id, "error": error.to_string() }),
                );
                return Err(error);
            }
        };

        info!(
            "Verifier {} attested ceremony {} as {}",
            verifier_id,
            ceremony_id,
            if result { "sound" } else { "unsound" }
        );
        context.audit.log(
            "ceremony_verification_recorded",
            &json!({ "ceremonyId": ceremony_id, "verifierId": verifier_id, "result": result }),
        );

        if let Some(entry) = activated {
            context.audit.log_security(
                "verification_key_activated",
                &json!({
                    "ceremonyId": ceremony_id,
                    "keyId": entry.id,
                    "keyHash": entry.hash,
                    "successfulVerifications": ceremony.successful_verifications(),
                }),
            );
        }

        Ok(VerificationOutcome {
            ceremony_id: ceremony_id.to_string(),
            verifier_id,
            timestamp,
            result,
            ceremony_status: ceremony.status(),
            successful_verifications: ceremony.successful_verifications(),
            required_verifications: verifiers_required,
        })
    }
}
