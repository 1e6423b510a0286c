use crate::{
    commands::{is_missing, Context},
    objects::CeremonySummary,
    CoordinatorError,
};

use serde_json::json;
use time::OffsetDateTime;
use tracing::warn;

pub(crate) struct Abort;

impl Abort {
    ///
    /// Marks a ceremony that has not been verified as failed.
    ///
    /// A failed ceremony accepts no further registrations, contributions,
    /// finalization, or verifications. A key it already published to channels
    /// is never activated.
    ///
    pub(crate) fn run(context: &Context, ceremony_id: &str, reason: &str) -> Result<CeremonySummary, CoordinatorError> {
        // Check that a reason is given.
        if is_missing(reason) {
            return Err(CoordinatorError::MissingField("reason"));
        }

        let timestamp = OffsetDateTime::now_utc();
        let (_, _, ceremony) = context.storage.update_and_publish(
            ceremony_id,
            None,
            |ceremony| ceremony.abort(reason.to_string(), timestamp),
            |ceremony, _| context.storage.remove_pending_verification(ceremony.id()),
        )?;

        warn!("Aborted ceremony {}: {}", ceremony_id, reason);
        context.audit.log_security(
            "ceremony_aborted",
            &json!({ "ceremonyId": ceremony_id, "reason": reason }),
        );

        Ok(CeremonySummary::from(ceremony.as_ref()))
    }
}
