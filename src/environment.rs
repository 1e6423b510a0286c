use crate::objects::SecurityLevel;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::Level;

/// The number of participants required to finalize a ceremony, per security level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantPolicy {
    pub low: usize,
    pub standard: usize,
    pub high: usize,
    pub maximum: usize,
}

impl ParticipantPolicy {
    /// Returns the required number of contributors for the given security level.
    #[inline]
    pub fn required_participants(&self, security_level: SecurityLevel) -> usize {
        match security_level {
            SecurityLevel::Low => self.low,
            SecurityLevel::Standard => self.standard,
            SecurityLevel::High => self.high,
            SecurityLevel::Maximum => self.maximum,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// The participant quorum table, fixed per ceremony at initialization.
    pub participant_policy: ParticipantPolicy,
    /// The number of successful verifier attestations required to activate a key.
    pub verifiers_required: usize,
    /// The number of hours a registration remains open before it is considered overdue.
    pub registration_window_hours: i64,
    /// The distribution channels used when a ceremony does not specify any.
    pub default_channels: Vec<String>,
    /// The proving system named in synthesized verification keys.
    pub protocol: String,
    /// The curve named in synthesized verification keys.
    pub curve: String,
    /// The format version of synthesized verification keys.
    pub key_version: u32,
    /// The number of times finalization is retried after a concurrent modification.
    pub max_commit_attempts: usize,
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    pub verbosity: String,
}

impl Settings {
    fn with_policy(participant_policy: ParticipantPolicy, verbosity: &str) -> Self {
        Self {
            participant_policy,
            verifiers_required: 2,
            registration_window_hours: 48,
            default_channels: vec!["standard".to_string()],
            protocol: "groth16".to_string(),
            curve: "bn128".to_string(),
            key_version: 1,
            max_commit_attempts: 3,
            verbosity: verbosity.to_string(),
        }
    }

    pub fn testing() -> Self {
        Self::with_policy(
            ParticipantPolicy {
                low: 1,
                standard: 2,
                high: 3,
                maximum: 4,
            },
            "trace",
        )
    }

    pub fn development() -> Self {
        Self::with_policy(
            ParticipantPolicy {
                low: 2,
                standard: 3,
                high: 5,
                maximum: 8,
            },
            "debug",
        )
    }

    pub fn production() -> Self {
        Self::with_policy(
            ParticipantPolicy {
                low: 3,
                standard: 3,
                high: 7,
                maximum: 12,
            },
            "info",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "settings", rename_all = "lowercase")]
pub enum Environment {
    Test(Settings),
    Development(Settings),
    Production(Settings),
}

impl Environment {
    ///
    /// Loads an environment from a JSON file of the form
    /// `{ "mode": "production", "settings": { ... } }`.
    ///
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs_err::read_to_string(path.as_ref())?;
        let environment: Environment = serde_json::from_str(&contents)?;
        environment.check()?;
        Ok(environment)
    }

    /// Checks that the settings of this environment are usable.
    pub fn check(&self) -> anyhow::Result<()> {
        let settings = self.settings();
        if settings.verifiers_required == 0 {
            return Err(anyhow::anyhow!("verifiersRequired must be nonzero"));
        }
        if settings.max_commit_attempts == 0 {
            return Err(anyhow::anyhow!("maxCommitAttempts must be nonzero"));
        }
        if settings.registration_window_hours <= 0 {
            return Err(anyhow::anyhow!("registrationWindowHours must be positive"));
        }
        let policy = &settings.participant_policy;
        if [policy.low, policy.standard, policy.high, policy.maximum].contains(&0) {
            return Err(anyhow::anyhow!("participantPolicy entries must be nonzero"));
        }
        Ok(())
    }

    /// Returns the settings of this environment.
    #[inline]
    pub fn settings(&self) -> &Settings {
        match self {
            Environment::Test(settings) => settings,
            Environment::Development(settings) => settings,
            Environment::Production(settings) => settings,
        }
    }

    /// Returns the number of contributions required to finalize at the given security level.
    #[inline]
    pub fn required_participants(&self, security_level: SecurityLevel) -> usize {
        self.settings().participant_policy.required_participants(security_level)
    }

    /// Returns the number of successful verifications required to activate a key.
    #[inline]
    pub fn verifiers_required(&self) -> usize {
        self.settings().verifiers_required
    }

    /// Returns the window after which a registration without a contribution is overdue.
    #[inline]
    pub fn registration_window(&self) -> time::Duration {
        time::Duration::hours(self.settings().registration_window_hours)
    }

    #[inline]
    pub fn default_channels(&self) -> &[String] {
        &self.settings().default_channels
    }

    #[inline]
    pub fn max_commit_attempts(&self) -> usize {
        self.settings().max_commit_attempts
    }

    /// Returns the log level of this environment, defaulting to `INFO` on unknown values.
    #[inline]
    pub fn verbosity(&self) -> Level {
        self.settings().verbosity.parse().unwrap_or(Level::INFO)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Production(Settings::production())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn test_required_participants_per_environment() {
        let test = Environment::Test(Settings::testing());
        let production = Environment::Production(Settings::production());

        assert_eq!(2, test.required_participants(SecurityLevel::Standard));
        assert_eq!(3, production.required_participants(SecurityLevel::Standard));
        assert_eq!(12, production.required_participants(SecurityLevel::Maximum));
        assert_eq!(2, production.verifiers_required());
        assert_eq!(time::Duration::hours(48), production.registration_window());
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(Level::TRACE, Environment::Test(Settings::testing()).verbosity());

        let mut settings = Settings::production();
        settings.verbosity = "loud".to_string();
        assert_eq!(Level::INFO, Environment::Production(settings).verbosity());
    }

    #[test]
    fn test_from_file() -> anyhow::Result<()> {
        let mut settings = Settings::development();
        settings.default_channels = vec!["standard".to_string(), "public".to_string()];
        let expected = Environment::Development(settings);

        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(serde_json::to_string(&expected)?.as_bytes())?;

        let candidate = Environment::from_file(file.path())?;
        assert_eq!(expected, candidate);
        assert_eq!(2, candidate.default_channels().len());
        Ok(())
    }

    #[test]
    fn test_from_file_rejects_zero_verifiers() -> anyhow::Result<()> {
        let mut settings = Settings::production();
        settings.verifiers_required = 0;

        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(serde_json::to_string(&Environment::Production(settings))?.as_bytes())?;

        assert!(Environment::from_file(file.path()).is_err());
        Ok(())
    }
}
