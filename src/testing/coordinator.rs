use crate::{
    audit::SecurityAuditLogger,
    environment::{Environment, Settings},
    hashing::ContributionHasher,
    objects::{InitializeCeremony, Parameters, RegisterParticipant, SubmitContribution, ValidationOptions, VerificationKey},
    validation::{Dummy, FieldError, KeyValidation, ParameterValidation, ParameterValidator},
    Coordinator,
};

use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
    Mutex,
};
use tracing::info;

/// Installs a TRACE subscriber for the test process, at most once.
pub fn test_logger() {
    use once_cell::sync::OnceCell;
    use tracing::Level;

    static INSTANCE: OnceCell<()> = OnceCell::new();
    INSTANCE.get_or_init(|| {
        let subscriber = tracing_subscriber::fmt().with_max_level(Level::TRACE).finish();
        // The coordinator logger may have been installed first.
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Returns the test environment, with the test logger installed.
pub fn initialize_test_environment() -> Environment {
    test_logger();
    Environment::Test(Settings::testing())
}

/// Returns a coordinator for the given environment, backed by the dummy validator.
pub fn test_coordinator(environment: &Environment) -> anyhow::Result<Coordinator> {
    info!("Starting coordinator");
    let coordinator = Coordinator::new(environment.clone(), Box::new(Dummy))?;
    info!("Coordinator is ready");
    Ok(coordinator)
}

/// Returns a ceremony request for the test circuit.
pub fn test_ceremony_request() -> InitializeCeremony {
    InitializeCeremony::new("test-circuit", "Test Circuit")
}

/// Returns a registration for the given participant.
pub fn test_registration(participant_id: &str) -> RegisterParticipant {
    RegisterParticipant::new(participant_id, &format!("{}-public-key", participant_id))
}

/// Returns the parameters of the given contribution round.
pub fn test_parameters(round: u64) -> Parameters {
    Parameters::Json(json!({
        "vk_alpha_1": [format!("{}", round), "2", "1"],
        "vk_beta_2": [["3", "4"], ["5", "6"], ["1", "0"]],
        "IC": [["7", "8", "1"]],
        "tau_powers": [round, round * 2, round * 3],
    }))
}

/// Returns a contribution from the given participant, with a correct hash.
pub fn test_contribution(participant_id: &str, round: u64) -> anyhow::Result<SubmitContribution> {
    let parameters = test_parameters(round);
    let hash = ContributionHasher::hash(&parameters)?;
    Ok(SubmitContribution::new(participant_id, parameters, &hash))
}

/// Creates a ceremony with the given participants registered, and returns its ID.
pub fn test_ceremony_with_participants(coordinator: &Coordinator, participants: &[&str]) -> anyhow::Result<String> {
    let ceremony_id = coordinator.initialize_ceremony(test_ceremony_request())?;
    for participant_id in participants {
        coordinator.register_participant(&ceremony_id, test_registration(participant_id))?;
    }
    Ok(ceremony_id)
}

#[derive(Default)]
struct ScriptedState {
    reject_parameters: AtomicBool,
    reject_keys: AtomicBool,
    unreachable: AtomicBool,
}

///
/// A validator that behaves as the dummy validator until told otherwise.
///
/// Clones share their script, so a test may keep a handle after passing
/// a clone to the coordinator.
///
#[derive(Clone, Default)]
pub struct ScriptedValidator {
    state: Arc<ScriptedState>,
}

impl ScriptedValidator {
    /// Rejects every parameter set from now on.
    pub fn reject_parameters(&self, reject: bool) {
        self.state.reject_parameters.store(reject, Ordering::SeqCst);
    }

    /// Rejects every verification key from now on.
    pub fn reject_keys(&self, reject: bool) {
        self.state.reject_keys.store(reject, Ordering::SeqCst);
    }

    /// Fails every call from now on, as if the validator could not be reached.
    pub fn unreachable(&self, unreachable: bool) {
        self.state.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> anyhow::Result<()> {
        match self.state.unreachable.load(Ordering::SeqCst) {
            true => Err(anyhow::anyhow!("connection refused")),
            false => Ok(()),
        }
    }
}

impl ParameterValidator for ScriptedValidator {
    fn name(&self) -> String {
        "ScriptedValidator".to_string()
    }

    fn validate_parameters(
        &self,
        parameters: &Parameters,
        options: &ValidationOptions,
    ) -> anyhow::Result<ParameterValidation> {
        self.check_reachable()?;
        let mut validation = Dummy.validate_parameters(parameters, options)?;
        if self.state.reject_parameters.load(Ordering::SeqCst) {
            validation.is_valid = false;
            validation.errors.push(FieldError::new("tau_powers", "is not a valid accumulator"));
        }
        Ok(validation)
    }

    fn validate_verification_key(&self, key: &VerificationKey) -> anyhow::Result<KeyValidation> {
        self.check_reachable()?;
        let mut validation = Dummy.validate_verification_key(key)?;
        if self.state.reject_keys.load(Ordering::SeqCst) {
            validation.is_valid = false;
            validation.errors.push(FieldError::new("points", "are not on the curve"));
        }
        Ok(validation)
    }
}

/// A single record written to the audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub level: &'static str,
    pub event: String,
    pub details: Value,
}

///
/// An audit logger that keeps every record in memory.
///
/// Clones share their records.
///
#[derive(Clone, Default)]
pub struct RecordingAuditLogger {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl RecordingAuditLogger {
    /// Returns the records written so far, oldest first.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Returns the names of the events written at the given level, oldest first.
    pub fn events(&self, level: &str) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|record| record.level == level)
            .map(|record| record.event)
            .collect()
    }

    fn record(&self, level: &'static str, event: &str, details: &Value) {
        self.records.lock().unwrap().push(AuditRecord {
            level,
            event: event.to_string(),
            details: details.clone(),
        });
    }
}

impl SecurityAuditLogger for RecordingAuditLogger {
    fn log(&self, event: &str, details: &Value) {
        self.record("info", event, details);
    }

    fn log_warning(&self, event: &str, details: &Value) {
        self.record("warning", event, details);
    }

    fn log_error(&self, event: &str, details: &Value) {
        self.record("error", event, details);
    }

    fn log_security(&self, event: &str, details: &Value) {
        self.record("security", event, details);
    }
}

/// Returns a coordinator for the test environment, with handles on its validator and audit trail.
pub fn test_coordinator_with_hooks() -> anyhow::Result<(Coordinator, ScriptedValidator, RecordingAuditLogger)> {
    let validator = ScriptedValidator::default();
    let audit = RecordingAuditLogger::default();
    let coordinator = Coordinator::with_audit_logger(
        initialize_test_environment(),
        Box::new(validator.clone()),
        Box::new(audit.clone()),
    )?;
    Ok((coordinator, validator, audit))
}
