use crate::{
    commands::{is_missing, new_identifier, Context},
    objects::{Ceremony, DistributionConfig, InitializeCeremony},
    CoordinatorError,
};

use serde_json::json;
use time::OffsetDateTime;
use tracing::info;

pub(crate) struct Initialization;

impl Initialization {
    ///
    /// Creates a new ceremony for the given circuit and returns its ID.
    ///
    /// The contribution quorum is derived from the security level here
    /// and stays fixed for the lifetime of the ceremony.
    ///
    pub(crate) fn run(context: &Context, request: InitializeCeremony) -> Result<String, CoordinatorError> {
        // Check that the circuit is identified.
        if is_missing(&request.circuit_id) {
            return Err(CoordinatorError::MissingField("circuitId"));
        }
        if is_missing(&request.circuit_name) {
            return Err(CoordinatorError::MissingField("circuitName"));
        }

        let security_level = request.security_level.unwrap_or_default();
        let required_participants = context.environment.required_participants(security_level);

        let channels = match request.distribution_channels {
            Some(channels) if !channels.is_empty() => channels,
            _ => context.environment.default_channels().to_vec(),
        };

        let ceremony = Ceremony::new(
            new_identifier("ceremony"),
            context.storage.next_ceremony_sequence(),
            request.circuit_id,
            request.circuit_name,
            security_level,
            required_participants,
            request.validation_options.unwrap_or_default(),
            DistributionConfig::new(channels),
            OffsetDateTime::now_utc(),
        );
        let ceremony = context.storage.insert(ceremony)?;

        info!(
            "Initialized ceremony {} for circuit {} ({} participants required)",
            ceremony.id(),
            ceremony.circuit_id(),
            required_participants
        );
        context.audit.log(
            "ceremony_initialized",
            &json!({
                "ceremonyId": ceremony.id(),
                "circuitId": ceremony.circuit_id(),
                "securityLevel": ceremony.security_level(),
                "requiredParticipants": required_participants,
                "channels": ceremony.distribution_config().channels,
            }),
        );

        Ok(ceremony.id().to_string())
    }
}
