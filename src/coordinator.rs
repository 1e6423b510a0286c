use crate::{
    audit::{SecurityAuditLogger, TracingAuditLogger},
    commands::{Abort, Context, Finalization, Initialization, Quorum, Registrar, Submission},
    distribution::{ChannelEntry, DistributionChannel, DistributionRegistry},
    environment::Environment,
    logger::initialize_logger,
    objects::{
        Ceremony,
        CeremonyFilter,
        CeremonyStatus,
        CeremonySummary,
        Contribution,
        ContributionReceipt,
        FinalizationResult,
        HistoryEntry,
        InitializeCeremony,
        PendingVerification,
        RegisterParticipant,
        RegistryEntry,
        Registration,
        SubmitContribution,
        VerificationOutcome,
        VerifyCeremony,
    },
    storage::Memory,
    validation::{FieldError, ParameterValidator},
};

use itertools::Itertools;
use std::{fmt, sync::Arc};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};

/// The class of a coordinator failure, as reported to callers.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// A ceremony, participant, or key does not exist.
    NotFound,
    /// A required field is missing or malformed.
    Input,
    /// The request conflicts with existing state.
    Conflict,
    /// The ceremony is not in a status that allows the request.
    State,
    /// A supplied hash does not match the submitted parameters.
    Integrity,
    /// The parameter validator rejected the request, or could not be reached.
    Validation,
}

impl ErrorKind {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::Input => "InputError",
            ErrorKind::Conflict => "ConflictError",
            ErrorKind::State => "StateError",
            ErrorKind::Integrity => "IntegrityError",
            ErrorKind::Validation => "ValidationError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("ceremony {0} does not exist")]
    CeremonyNotFound(String),
    #[error("participant {participant_id} is not registered in ceremony {ceremony_id}")]
    ParticipantNotFound { ceremony_id: String, participant_id: String },
    #[error("participant {participant_id} has no pending contribution in ceremony {ceremony_id}")]
    ParticipantNotAwaitingContribution { ceremony_id: String, participant_id: String },
    #[error("verification key {0} is not active")]
    VerificationKeyNotFound(String),

    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{0} is invalid")]
    InvalidField(&'static str),
    #[error("failed to canonicalize value: {0}")]
    Canonicalization(String),
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("unknown distribution channel {0}")]
    UnknownChannel(String),

    #[error("participant {0} is already registered")]
    ParticipantAlreadyRegistered(String),
    #[error("verifier {0} has already submitted a verification")]
    VerifierAlreadyVoted(String),
    #[error("contribution builds on {supplied}, but the current parameters are {current}")]
    StaleContribution { supplied: String, current: String },
    #[error("ceremony {0} was modified concurrently")]
    ConcurrentModification(String),
    #[error("ceremony {0} already exists")]
    CeremonyAlreadyExists(String),

    #[error("ceremony cannot move from {from} to {to}")]
    InvalidTransition { from: CeremonyStatus, to: CeremonyStatus },
    #[error("ceremony is {actual}, expected {expected}")]
    UnexpectedStatus {
        expected: CeremonyStatus,
        actual: CeremonyStatus,
    },
    #[error("{contributed} of {required} required contributions were accepted")]
    InsufficientContributions { contributed: usize, required: usize },
    #[error("ceremony {0} has no parameters")]
    MissingParameters(String),
    #[error("storage is unavailable")]
    StorageFailed,

    #[error("supplied hash {supplied} does not match computed hash {computed}")]
    HashMismatch { supplied: String, computed: String },

    #[error("{target} failed validation: {}", .errors.iter().join("; "))]
    ValidationFailed {
        target: &'static str,
        errors: Vec<FieldError>,
    },
    #[error("validator failed: {0}")]
    ValidatorFailed(String),
}

impl CoordinatorError {
    /// Returns the class of this failure.
    pub fn kind(&self) -> ErrorKind {
        use CoordinatorError::*;
        match self {
            CeremonyNotFound(_)
            | ParticipantNotFound { .. }
            | ParticipantNotAwaitingContribution { .. }
            | VerificationKeyNotFound(_) => ErrorKind::NotFound,
            MissingField(_) | InvalidField(_) | Canonicalization(_) | InvalidSettings(_) | UnknownChannel(_) => {
                ErrorKind::Input
            }
            ParticipantAlreadyRegistered(_)
            | VerifierAlreadyVoted(_)
            | StaleContribution { .. }
            | ConcurrentModification(_)
            | CeremonyAlreadyExists(_) => ErrorKind::Conflict,
            InvalidTransition { .. }
            | UnexpectedStatus { .. }
            | InsufficientContributions { .. }
            | MissingParameters(_)
            | StorageFailed => ErrorKind::State,
            HashMismatch { .. } => ErrorKind::Integrity,
            ValidationFailed { .. } | ValidatorFailed(_) => ErrorKind::Validation,
        }
    }

    /// Returns the field-level errors reported by the validator, if any.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            CoordinatorError::ValidationFailed { errors, .. } => errors,
            _ => &[],
        }
    }
}

///
/// The ceremony coordinator.
///
/// A coordinator owns its storage and distribution registry. Clones share them,
/// so a coordinator may be handed to any number of threads.
///
#[derive(Clone)]
pub struct Coordinator {
    /// The parameters and settings of this coordinator.
    environment: Environment,
    /// The ceremonies and the contribution history.
    storage: Arc<Memory>,
    /// The distribution channels and the active key registry.
    distribution: Arc<DistributionRegistry>,
    /// The proving-system checks applied to parameters and keys.
    validator: Arc<dyn ParameterValidator>,
    /// The sink of the audit trail.
    audit: Arc<dyn SecurityAuditLogger>,
}

impl Coordinator {
    ///
    /// Creates a new instance of the `Coordinator`, for a given environment.
    ///
    /// The coordinator is loaded with an empty in-memory storage, and writes
    /// its audit trail to the `audit` tracing target.
    ///
    #[inline]
    pub fn new(environment: Environment, validator: Box<dyn ParameterValidator>) -> Result<Self, CoordinatorError> {
        Self::with_audit_logger(environment, validator, Box::new(TracingAuditLogger))
    }

    ///
    /// Creates a new instance of the `Coordinator` that writes its audit trail
    /// to the given logger.
    ///
    pub fn with_audit_logger(
        environment: Environment,
        validator: Box<dyn ParameterValidator>,
        audit: Box<dyn SecurityAuditLogger>,
    ) -> Result<Self, CoordinatorError> {
        // Initialize the logger.
        initialize_logger(&environment);

        // Check that the settings are usable.
        environment
            .check()
            .map_err(|error| CoordinatorError::InvalidSettings(error.to_string()))?;

        info!("Starting the coordinator with validator {}", validator.name());

        Ok(Self {
            environment,
            storage: Arc::new(Memory::new()),
            distribution: Arc::new(DistributionRegistry::new()),
            validator: Arc::from(validator),
            audit: Arc::from(audit),
        })
    }

    ///
    /// Creates a new ceremony for the given circuit, and returns the ceremony ID.
    ///
    /// The number of contributions required to finalize the ceremony is derived
    /// from its security level and fixed for the lifetime of the ceremony.
    ///
    pub fn initialize_ceremony(&self, request: InitializeCeremony) -> Result<String, CoordinatorError> {
        Initialization::run(&self.context(), request)
    }

    ///
    /// Registers a participant in the given ceremony.
    ///
    /// Participants are assigned gapless contribution positions starting at 1,
    /// in the order their registrations are committed.
    ///
    pub fn register_participant(
        &self,
        ceremony_id: &str,
        request: RegisterParticipant,
    ) -> Result<Registration, CoordinatorError> {
        Registrar::run(&self.context(), ceremony_id, request)
    }

    ///
    /// Accepts a contribution from a registered participant, and returns its receipt.
    ///
    /// The contribution becomes the running parameter set of the ceremony.
    /// Participants may contribute in any order, once each.
    ///
    pub fn submit_contribution(
        &self,
        ceremony_id: &str,
        request: SubmitContribution,
    ) -> Result<ContributionReceipt, CoordinatorError> {
        Submission::run(&self.context(), ceremony_id, request)
    }

    ///
    /// Completes a ceremony that reached its contribution quorum, and publishes
    /// its verification key to the distribution channels of the ceremony.
    ///
    /// The key is not active until it is attested by enough verifiers.
    ///
    pub fn finalize_ceremony(&self, ceremony_id: &str) -> Result<FinalizationResult, CoordinatorError> {
        Finalization::run(&self.context(), ceremony_id)
    }

    ///
    /// Records a verifier attestation over a ceremony.
    ///
    pub fn verify_ceremony(
        &self,
        ceremony_id: &str,
        request: VerifyCeremony,
    ) -> Result<VerificationOutcome, CoordinatorError> {
        Quorum::run(&self.context(), ceremony_id, request)
    }

    ///
    /// Marks a ceremony as failed. Verified and failed ceremonies cannot be aborted.
    ///
    pub fn abort_ceremony(&self, ceremony_id: &str, reason: &str) -> Result<CeremonySummary, CoordinatorError> {
        Abort::run(&self.context(), ceremony_id, reason)
    }

    /// Returns a summary of the current state of the given ceremony.
    #[inline]
    pub fn get_ceremony_status(&self, ceremony_id: &str) -> Result<CeremonySummary, CoordinatorError> {
        let ceremony = self.storage.get(ceremony_id)?;
        Ok(CeremonySummary::from(ceremony.as_ref()))
    }

    ///
    /// Returns a snapshot of the given ceremony.
    ///
    /// The snapshot is immutable and is not affected by later commands.
    ///
    #[inline]
    pub fn get_ceremony(&self, ceremony_id: &str) -> Result<Arc<Ceremony>, CoordinatorError> {
        self.storage.get(ceremony_id)
    }

    ///
    /// Returns a summary of every ceremony matching the given filter,
    /// in the order the ceremonies were created.
    ///
    pub fn list_ceremonies(&self, filter: Option<CeremonyFilter>) -> Result<Vec<CeremonySummary>, CoordinatorError> {
        let filter = filter.unwrap_or_default();
        let summaries: Vec<CeremonySummary> = self
            .storage
            .snapshots()?
            .iter()
            .filter(|ceremony| filter.status.map_or(true, |status| ceremony.status() == status))
            .filter(|ceremony| {
                filter
                    .circuit_id
                    .as_ref()
                    .map_or(true, |circuit_id| ceremony.circuit_id() == circuit_id)
            })
            .map(|ceremony| CeremonySummary::from(ceremony.as_ref()))
            .collect();

        debug!("Listed {} ceremonies", summaries.len());
        Ok(summaries)
    }

    /// Returns the registry entry of the given key, if the key is active.
    #[inline]
    pub fn get_verification_key(&self, key_id: &str) -> Result<RegistryEntry, CoordinatorError> {
        self.distribution.get(key_id)
    }

    ///
    /// Returns the registrations of the given ceremony that have not contributed
    /// and whose registration window closed before `at`.
    ///
    /// Overdue registrations are reported only. They keep their position.
    ///
    pub fn overdue_registrations(
        &self,
        ceremony_id: &str,
        at: OffsetDateTime,
    ) -> Result<Vec<Contribution>, CoordinatorError> {
        let ceremony = self.storage.get(ceremony_id)?;
        Ok(ceremony
            .contributions()
            .iter()
            .filter(|contribution| contribution.is_overdue(at))
            .cloned()
            .collect())
    }

    /// Returns the accepted contributions of the given ceremony, in acceptance order.
    #[inline]
    pub fn contribution_history(&self, ceremony_id: &str) -> Result<Vec<HistoryEntry>, CoordinatorError> {
        // Check that the ceremony exists.
        self.storage.get(ceremony_id)?;
        Ok(self.storage.history(ceremony_id))
    }

    /// Returns the keys published to the given channel, in any activation state.
    #[inline]
    pub fn channel_keys(&self, channel: &str) -> Result<Vec<ChannelEntry>, CoordinatorError> {
        let channel = channel.parse::<DistributionChannel>()?;
        Ok(self.distribution.channel_keys(channel))
    }

    /// Returns the pending verification record of the given ceremony, if its key awaits quorum.
    #[inline]
    pub fn pending_verification(&self, ceremony_id: &str) -> Result<Option<PendingVerification>, CoordinatorError> {
        // Check that the ceremony exists.
        self.storage.get(ceremony_id)?;
        Ok(self.storage.pending_verification(ceremony_id))
    }

    /// Returns the environment of this coordinator.
    #[inline]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    #[inline]
    fn context(&self) -> Context<'_> {
        Context {
            environment: &self.environment,
            storage: self.storage.as_ref(),
            distribution: self.distribution.as_ref(),
            validator: self.validator.as_ref(),
            audit: self.audit.as_ref(),
        }
    }
}
