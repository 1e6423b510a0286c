use crate::{
    objects::{Contribution, Parameters, Verification, VerificationKey},
    CoordinatorError,
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use time::OffsetDateTime;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CeremonyStatus {
    Initialized,
    InProgress,
    Completed,
    Verified,
    Failed,
}

impl CeremonyStatus {
    ///
    /// Returns `true` if a ceremony in this status may move to the given status.
    ///
    /// The lifecycle only moves forward: `initialized -> in_progress -> completed -> verified`.
    /// Any status that is not terminal may also move to `failed`.
    ///
    #[inline]
    pub fn can_transition_to(self, next: CeremonyStatus) -> bool {
        use CeremonyStatus::*;
        matches!(
            (self, next),
            (Initialized, InProgress)
                | (InProgress, Completed)
                | (Completed, Verified)
                | (Initialized, Failed)
                | (InProgress, Failed)
                | (Completed, Failed)
        )
    }

    /// Returns `true` if no further transitions are possible.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, CeremonyStatus::Verified | CeremonyStatus::Failed)
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            CeremonyStatus::Initialized => "initialized",
            CeremonyStatus::InProgress => "in_progress",
            CeremonyStatus::Completed => "completed",
            CeremonyStatus::Verified => "verified",
            CeremonyStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for CeremonyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    Low,
    Standard,
    High,
    Maximum,
}

impl Default for SecurityLevel {
    fn default() -> Self {
        SecurityLevel::Standard
    }
}

impl FromStr for SecurityLevel {
    type Err = CoordinatorError;

    fn from_str(level: &str) -> Result<Self, Self::Err> {
        match level.to_ascii_lowercase().as_str() {
            "low" => Ok(SecurityLevel::Low),
            "standard" => Ok(SecurityLevel::Standard),
            "high" => Ok(SecurityLevel::High),
            "maximum" => Ok(SecurityLevel::Maximum),
            _ => Err(CoordinatorError::InvalidField("securityLevel")),
        }
    }
}

/// Options forwarded to the parameter validator for every check in a ceremony.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOptions {
    /// The circuit representation the parameters were produced for.
    pub circuit_type: String,
    /// Whether the validator should reject parameters that are not structured.
    pub strict: bool,
    /// The maximum accepted size of a parameter set, if any.
    pub max_parameter_bytes: Option<usize>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            circuit_type: "r1cs".to_string(),
            strict: false,
            max_parameter_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionConfig {
    pub channels: Vec<String>,
    pub redundancy: bool,
    pub public_access: bool,
}

impl DistributionConfig {
    /// Creates a distribution config for the given channels.
    #[inline]
    pub fn new(channels: Vec<String>) -> Self {
        let redundancy = channels.len() > 1;
        let public_access = channels.iter().any(|channel| channel == "public");
        Self {
            channels,
            redundancy,
            public_access,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub from: Option<CeremonyStatus>,
    pub to: CeremonyStatus,
    pub timestamp: OffsetDateTime,
    pub reason: Option<String>,
}

///
/// A single trusted-setup run for one circuit.
///
/// A ceremony is only mutated through a storage slot writer, which clones
/// the latest snapshot, applies one command, and publishes the result.
/// Readers always observe a complete snapshot.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ceremony {
    id: String,
    circuit_id: String,
    circuit_name: String,
    status: CeremonyStatus,
    security_level: SecurityLevel,
    start_time: OffsetDateTime,
    end_time: Option<OffsetDateTime>,
    required_participants: usize,
    current_participants: usize,
    contributions: Vec<Contribution>,
    verifications: Vec<Verification>,
    current_parameters: Option<Parameters>,
    current_parameters_hash: Option<String>,
    final_parameters: Option<Parameters>,
    verification_key: Option<VerificationKey>,
    verification_key_hash: Option<String>,
    validation_options: ValidationOptions,
    distribution_config: DistributionConfig,
    status_history: Vec<StatusChange>,
    failure_reason: Option<String>,
    version: u64,
    sequence: u64,
}

impl Ceremony {
    #[allow(clippy::too_many_arguments)]
    #[inline]
    pub(crate) fn new(
        id: String,
        sequence: u64,
        circuit_id: String,
        circuit_name: String,
        security_level: SecurityLevel,
        required_participants: usize,
        validation_options: ValidationOptions,
        distribution_config: DistributionConfig,
        start_time: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            circuit_id,
            circuit_name,
            status: CeremonyStatus::Initialized,
            security_level,
            start_time,
            end_time: None,
            required_participants,
            current_participants: 0,
            contributions: Vec::new(),
            verifications: Vec::new(),
            current_parameters: None,
            current_parameters_hash: None,
            final_parameters: None,
            verification_key: None,
            verification_key_hash: None,
            validation_options,
            distribution_config,
            status_history: vec![StatusChange {
                from: None,
                to: CeremonyStatus::Initialized,
                timestamp: start_time,
                reason: None,
            }],
            failure_reason: None,
            version: 0,
            sequence,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn circuit_id(&self) -> &str {
        &self.circuit_id
    }

    #[inline]
    pub fn circuit_name(&self) -> &str {
        &self.circuit_name
    }

    #[inline]
    pub fn status(&self) -> CeremonyStatus {
        self.status
    }

    #[inline]
    pub fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    #[inline]
    pub fn start_time(&self) -> OffsetDateTime {
        self.start_time
    }

    #[inline]
    pub fn end_time(&self) -> Option<OffsetDateTime> {
        self.end_time
    }

    /// Returns the contribution quorum fixed when the ceremony was initialized.
    #[inline]
    pub fn required_participants(&self) -> usize {
        self.required_participants
    }

    /// Returns the number of registered participants, in any status.
    #[inline]
    pub fn current_participants(&self) -> usize {
        self.current_participants
    }

    /// Returns the participant slots in registration order.
    #[inline]
    pub fn contributions(&self) -> &[Contribution] {
        &self.contributions
    }

    #[inline]
    pub fn verifications(&self) -> &[Verification] {
        &self.verifications
    }

    /// Returns the latest accepted parameters, if any contribution was accepted.
    #[inline]
    pub fn current_parameters(&self) -> Option<&Parameters> {
        self.current_parameters.as_ref()
    }

    /// Returns the canonical hash of the latest accepted parameters.
    #[inline]
    pub fn current_parameters_hash(&self) -> Option<&str> {
        self.current_parameters_hash.as_deref()
    }

    #[inline]
    pub fn final_parameters(&self) -> Option<&Parameters> {
        self.final_parameters.as_ref()
    }

    #[inline]
    pub fn verification_key(&self) -> Option<&VerificationKey> {
        self.verification_key.as_ref()
    }

    #[inline]
    pub fn verification_key_hash(&self) -> Option<&str> {
        self.verification_key_hash.as_deref()
    }

    #[inline]
    pub fn validation_options(&self) -> &ValidationOptions {
        &self.validation_options
    }

    #[inline]
    pub fn distribution_config(&self) -> &DistributionConfig {
        &self.distribution_config
    }

    #[inline]
    pub fn status_history(&self) -> &[StatusChange] {
        &self.status_history
    }

    #[inline]
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Returns the number of commits applied to this ceremony.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the creation order of this ceremony among all ceremonies.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns `true` if the given participant holds a slot, in any status.
    #[inline]
    pub fn contains_participant(&self, participant_id: &str) -> bool {
        self.contributions
            .iter()
            .any(|contribution| contribution.participant_id() == participant_id)
    }

    /// Returns the participant slot for the given participant, if it exists.
    #[inline]
    pub fn get_contribution(&self, participant_id: &str) -> Option<&Contribution> {
        self.contributions
            .iter()
            .find(|contribution| contribution.participant_id() == participant_id)
    }

    /// Returns the number of participants whose parameters were accepted.
    #[inline]
    pub fn contributed_count(&self) -> usize {
        self.contributions
            .par_iter()
            .filter(|contribution| contribution.is_contributed())
            .count()
    }

    /// Returns the number of verifiers that attested the ceremony is sound.
    #[inline]
    pub fn successful_verifications(&self) -> usize {
        self.verifications
            .par_iter()
            .filter(|verification| verification.result())
            .count()
    }

    /// Returns `true` if the given verifier has already submitted a verification.
    #[inline]
    pub fn has_verifier(&self, verifier_id: &str) -> bool {
        self.verifications
            .iter()
            .any(|verification| verification.verifier_id() == verifier_id)
    }

    ///
    /// Moves the ceremony to the given status and records the change.
    ///
    #[inline]
    pub(crate) fn transition(
        &mut self,
        next: CeremonyStatus,
        timestamp: OffsetDateTime,
        reason: Option<String>,
    ) -> Result<(), CoordinatorError> {
        // Check that the transition moves forward in the lifecycle.
        if !self.status.can_transition_to(next) {
            return Err(CoordinatorError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        debug!("Ceremony {} transitions from {} to {}", self.id, self.status, next);

        self.status_history.push(StatusChange {
            from: Some(self.status),
            to: next,
            timestamp,
            reason,
        });
        self.status = next;
        Ok(())
    }

    ///
    /// Checks that the ceremony is in the given status.
    ///
    #[inline]
    pub(crate) fn expect_status(&self, expected: CeremonyStatus) -> Result<(), CoordinatorError> {
        match self.status == expected {
            true => Ok(()),
            false => Err(CoordinatorError::UnexpectedStatus {
                expected,
                actual: self.status,
            }),
        }
    }

    ///
    /// Adds a participant slot at the end of the ceremony and returns it.
    ///
    /// The first registration moves the ceremony from `initialized` to `in_progress`.
    ///
    #[inline]
    pub(crate) fn register(
        &mut self,
        participant_id: String,
        display_name: String,
        public_key: String,
        registration_time: OffsetDateTime,
        timeout_at: OffsetDateTime,
    ) -> Result<Contribution, CoordinatorError> {
        // Check that the ceremony still accepts participants.
        if self.status != CeremonyStatus::Initialized {
            self.expect_status(CeremonyStatus::InProgress)?;
        }

        // Check that the participant does not already hold a slot.
        if self.contains_participant(&participant_id) {
            return Err(CoordinatorError::ParticipantAlreadyRegistered(participant_id));
        }

        let contribution_order = self.contributions.len() as u64 + 1;
        let contribution = Contribution::new_registration(
            participant_id,
            display_name,
            public_key,
            contribution_order,
            registration_time,
            timeout_at,
        );
        self.contributions.push(contribution.clone());
        self.current_participants = self.contributions.len();

        if self.status == CeremonyStatus::Initialized {
            self.transition(CeremonyStatus::InProgress, registration_time, None)?;
        }

        trace!(
            "Registered {} in ceremony {} at position {}",
            contribution.participant_id(),
            self.id,
            contribution_order
        );
        Ok(contribution)
    }

    ///
    /// Checks that the given participant may contribute to the ceremony now.
    ///
    #[inline]
    pub(crate) fn check_contributor(&self, participant_id: &str) -> Result<(), CoordinatorError> {
        // Check that the ceremony is accepting contributions.
        self.expect_status(CeremonyStatus::InProgress)?;

        // Check that the participant holds a slot that has not contributed yet.
        match self.get_contribution(participant_id) {
            Some(contribution) if !contribution.is_contributed() => Ok(()),
            Some(_) => Err(CoordinatorError::ParticipantNotAwaitingContribution {
                ceremony_id: self.id.clone(),
                participant_id: participant_id.to_string(),
            }),
            None => Err(CoordinatorError::ParticipantNotFound {
                ceremony_id: self.id.clone(),
                participant_id: participant_id.to_string(),
            }),
        }
    }

    ///
    /// Accepts the given parameters from the participant and makes them
    /// the running parameter set of the ceremony.
    ///
    #[allow(clippy::too_many_arguments)]
    #[inline]
    pub(crate) fn accept_contribution(
        &mut self,
        participant_id: &str,
        parameters: Parameters,
        hash: String,
        contribution_id: String,
        validation_id: String,
        contribution_time: OffsetDateTime,
    ) -> Result<Contribution, CoordinatorError> {
        self.check_contributor(participant_id)?;

        let ceremony_id = self.id.clone();
        let contribution = match self
            .contributions
            .iter_mut()
            .find(|contribution| contribution.participant_id() == participant_id)
        {
            Some(contribution) => contribution,
            None => {
                return Err(CoordinatorError::ParticipantNotFound {
                    ceremony_id,
                    participant_id: participant_id.to_string(),
                })
            }
        };

        if !contribution.mark_contributed(hash.clone(), contribution_id, validation_id, contribution_time) {
            return Err(CoordinatorError::ParticipantNotAwaitingContribution {
                ceremony_id,
                participant_id: participant_id.to_string(),
            });
        }
        let contribution = contribution.clone();

        self.current_parameters = Some(parameters);
        self.current_parameters_hash = Some(hash);
        Ok(contribution)
    }

    ///
    /// Checks that the ceremony may be finalized, and returns the parameters
    /// the verification key is derived from.
    ///
    #[inline]
    pub(crate) fn check_finalizable(&self) -> Result<&Parameters, CoordinatorError> {
        // Check that the ceremony has not been finalized or aborted.
        self.expect_status(CeremonyStatus::InProgress)?;

        // Check that the contribution quorum fixed at initialization is met.
        let contributed = self.contributed_count();
        if contributed < self.required_participants {
            return Err(CoordinatorError::InsufficientContributions {
                contributed,
                required: self.required_participants,
            });
        }

        self.current_parameters
            .as_ref()
            .ok_or_else(|| CoordinatorError::MissingParameters(self.id.clone()))
    }

    ///
    /// Freezes the running parameters and attaches the verification key.
    ///
    #[inline]
    pub(crate) fn finalize(
        &mut self,
        verification_key: VerificationKey,
        verification_key_hash: String,
        finalized_at: OffsetDateTime,
    ) -> Result<(), CoordinatorError> {
        let final_parameters = self.check_finalizable()?.clone();

        self.transition(CeremonyStatus::Completed, finalized_at, None)?;
        self.end_time = Some(finalized_at);
        self.final_parameters = Some(final_parameters);
        self.verification_key = Some(verification_key);
        self.verification_key_hash = Some(verification_key_hash);
        Ok(())
    }

    ///
    /// Records a verifier attestation.
    ///
    /// Returns `true` if this attestation promoted the ceremony to `verified`.
    /// The promotion happens exactly once, when the number of successful
    /// attestations on a completed ceremony first reaches `verifiers_required`.
    /// Attestations are only accepted once the ceremony has a key to attest.
    ///
    #[inline]
    pub(crate) fn record_verification(
        &mut self,
        verification: Verification,
        verifiers_required: usize,
    ) -> Result<bool, CoordinatorError> {
        // Check that the ceremony is completed or already verified.
        if !matches!(self.status, CeremonyStatus::Completed | CeremonyStatus::Verified) {
            return Err(CoordinatorError::UnexpectedStatus {
                expected: CeremonyStatus::Completed,
                actual: self.status,
            });
        }

        // Check that the verifier has not attested before.
        if self.has_verifier(verification.verifier_id()) {
            return Err(CoordinatorError::VerifierAlreadyVoted(
                verification.verifier_id().to_string(),
            ));
        }

        let timestamp = verification.timestamp();
        self.verifications.push(verification);

        if self.status == CeremonyStatus::Completed && self.successful_verifications() >= verifiers_required {
            self.transition(CeremonyStatus::Verified, timestamp, None)?;
            return Ok(true);
        }
        Ok(false)
    }

    ///
    /// Marks the ceremony as failed for the given reason.
    ///
    #[inline]
    pub(crate) fn abort(&mut self, reason: String, timestamp: OffsetDateTime) -> Result<(), CoordinatorError> {
        self.transition(CeremonyStatus::Failed, timestamp, Some(reason.clone()))?;
        self.end_time = Some(timestamp);
        self.failure_reason = Some(reason);
        Ok(())
    }

    #[inline]
    pub(crate) fn increment_version(&mut self) {
        self.version += 1;
    }
}
