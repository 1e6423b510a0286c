use crate::{
    commands::{is_missing, new_identifier, Context},
    hashing::ContributionHasher,
    objects::{CeremonyStatus, ContributionReceipt, ReceiptStatus, SubmitContribution},
    CoordinatorError,
};

use serde_json::json;
use time::OffsetDateTime;
use tracing::{debug, error, info, trace};

pub(crate) struct Submission;

impl Submission {
    ///
    /// Accepts a participant's parameters as the new running parameter set.
    ///
    /// The parameters are hashed and validated before the ceremony is locked.
    /// The commit then re-checks the participant against the latest state,
    /// so a rejected submission never modifies the ceremony.
    ///
    /// Reaching the contribution quorum does not finalize the ceremony.
    ///
    pub(crate) fn run(
        context: &Context,
        ceremony_id: &str,
        request: SubmitContribution,
    ) -> Result<ContributionReceipt, CoordinatorError> {
        let SubmitContribution {
            participant_id,
            parameters,
            hash,
            previous_hash,
        } = request;

        // Check that the ceremony exists and is accepting contributions.
        let ceremony = context.storage.get(ceremony_id)?;
        ceremony.expect_status(CeremonyStatus::InProgress)?;

        // Check that the required fields are provided.
        if is_missing(&participant_id) {
            return Err(CoordinatorError::MissingField("participantId"));
        }
        if parameters.is_empty() {
            return Err(CoordinatorError::MissingField("parameters"));
        }
        if is_missing(&hash) {
            return Err(CoordinatorError::MissingField("hash"));
        }

        // Check that the participant holds a slot awaiting a contribution.
        ceremony.check_contributor(&participant_id)?;

        // Check that the claimed hash binds the submitted parameters.
        let computed_hash = ContributionHasher::hash(&parameters)?;
        if !ContributionHasher::matches(&hash, &computed_hash) {
            error!(
                "Contribution from {} to ceremony {} has a mismatched hash",
                participant_id, ceremony_id
            );
            context.audit.log_security(
                "contribution_hash_mismatch",
                &json!({
                    "ceremonyId": ceremony_id,
                    "participantId": participant_id,
                    "suppliedHash": hash,
                    "computedHash": computed_hash,
                }),
            );
            return Err(CoordinatorError::HashMismatch {
                supplied: hash,
                computed: computed_hash,
            });
        }

        // Check that the parameters pass the proving-system validation.
        trace!("Validating contribution from {} with {}", participant_id, context.validator.name());
        let validation = match context
            .validator
            .validate_parameters(&parameters, ceremony.validation_options())
        {
            Ok(validation) => validation,
            Err(error) => {
                error!("The validator failed on a contribution to ceremony {}: {}", ceremony_id, error);
                context.audit.log_error(
                    "contribution_validator_failed",
                    &json!({ "ceremonyId": ceremony_id, "participantId": participant_id, "error": error.to_string() }),
                );
                return Err(CoordinatorError::ValidatorFailed(error.to_string()));
            }
        };
        if !validation.is_valid {
            error!(
                "Contribution from {} to ceremony {} failed validation",
                participant_id, ceremony_id
            );
            context.audit.log_error(
                "contribution_validation_failed",
                &json!({
                    "ceremonyId": ceremony_id,
                    "participantId": participant_id,
                    "validationId": validation.validation_id,
                    "errors": validation.errors,
                }),
            );
            return Err(CoordinatorError::ValidationFailed {
                target: "parameters",
                errors: validation.errors,
            });
        }
        if validation.parameter_hash != computed_hash {
            debug!("The validator reports parameter hash {}", validation.parameter_hash);
        }

        let contribution_id = new_identifier("contribution");
        let contribution_time = OffsetDateTime::now_utc();

        let (contribution, _) = context.storage.update(ceremony_id, None, |ceremony| {
            // Check that the contribution extends the latest accepted parameters.
            if let Some(previous_hash) = &previous_hash {
                let current = ceremony.current_parameters_hash();
                let is_current = match current {
                    Some(current) => ContributionHasher::matches(previous_hash, current),
                    None => false,
                };
                if !is_current {
                    return Err(CoordinatorError::StaleContribution {
                        supplied: previous_hash.clone(),
                        current: current.unwrap_or("none").to_string(),
                    });
                }
            }

            ceremony.accept_contribution(
                &participant_id,
                parameters,
                computed_hash.clone(),
                contribution_id.clone(),
                validation.validation_id.clone(),
                contribution_time,
            )
        })?;

        context.storage.append_history(
            ceremony_id,
            &participant_id,
            contribution.contribution_order(),
            contribution_time,
            &computed_hash,
        );

        let receipt = ContributionHasher::hash_value(&json!({
            "ceremonyId": ceremony_id,
            "contributionId": contribution_id,
            "participantId": participant_id,
            "contributionOrder": contribution.contribution_order(),
            "hash": computed_hash,
            "timestamp": contribution_time,
        }))?;

        info!(
            "Accepted contribution {} from {} to ceremony {}",
            contribution.contribution_order(),
            participant_id,
            ceremony_id
        );
        context.audit.log(
            "contribution_accepted",
            &json!({
                "ceremonyId": ceremony_id,
                "participantId": participant_id,
                "contributionOrder": contribution.contribution_order(),
                "hash": computed_hash,
            }),
        );

        Ok(ContributionReceipt {
            ceremony_id: ceremony_id.to_string(),
            contribution_id,
            participant_id,
            contribution_order: contribution.contribution_order(),
            timestamp: contribution_time,
            hash: computed_hash,
            receipt,
            validation_id: validation.validation_id,
            status: ReceiptStatus::Accepted,
        })
    }
}
