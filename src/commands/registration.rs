use crate::{
    commands::{is_missing, Context},
    objects::{Registration, RegisterParticipant},
    CoordinatorError,
};

use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, warn};

pub(crate) struct Registrar;

impl Registrar {
    ///
    /// Registers a participant at the end of the ceremony's participant list.
    ///
    /// The registration window is advisory. Overdue registrations stay
    /// registered until an external sweep acts on them.
    ///
    pub(crate) fn run(
        context: &Context,
        ceremony_id: &str,
        request: RegisterParticipant,
    ) -> Result<Registration, CoordinatorError> {
        let RegisterParticipant { id, name, public_key } = request;

        // Check that the ceremony exists before inspecting the request.
        context.storage.get(ceremony_id)?;

        // Check that the participant is identified.
        if is_missing(&id) {
            return Err(CoordinatorError::MissingField("id"));
        }
        if is_missing(&public_key) {
            return Err(CoordinatorError::MissingField("publicKey"));
        }

        let now = OffsetDateTime::now_utc();
        let timeout_at = now + context.environment.registration_window();
        let display_name = match name {
            Some(name) if !is_missing(&name) => name,
            _ => id.clone(),
        };
        let participant_id = id.clone();

        let result = context.storage.update(ceremony_id, None, |ceremony| {
            ceremony.register(id, display_name, public_key, now, timeout_at)
        });
        let (contribution, _) = match result {
            Ok(result) => result,
            Err(error) => {
                warn!("Failed to register {} in ceremony {}: {}", participant_id, ceremony_id, error);
                context.audit.log_warning(
                    "participant_registration_rejected",
                    &json!({ "ceremonyId": ceremony_id, "participantId": participant_id, "error": error.to_string() }),
                );
                return Err(error);
            }
        };

        info!(
            "Registered {} in ceremony {} at position {}",
            participant_id,
            ceremony_id,
            contribution.contribution_order()
        );
        context.audit.log(
            "participant_registered",
            &json!({
                "ceremonyId": ceremony_id,
                "participantId": participant_id,
                "contributionOrder": contribution.contribution_order(),
            }),
        );

        Ok(Registration::new(ceremony_id, &contribution))
    }
}
