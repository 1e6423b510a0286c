use crate::{
    objects::{RegistryEntry, VerificationKey},
    CoordinatorError,
};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionChannel {
    Standard,
    Public,
    Archive,
    Mirror,
}

impl DistributionChannel {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionChannel::Standard => "standard",
            DistributionChannel::Public => "public",
            DistributionChannel::Archive => "archive",
            DistributionChannel::Mirror => "mirror",
        }
    }
}

impl FromStr for DistributionChannel {
    type Err = CoordinatorError;

    fn from_str(channel: &str) -> Result<Self, Self::Err> {
        match channel {
            "standard" => Ok(DistributionChannel::Standard),
            "public" => Ok(DistributionChannel::Public),
            "archive" => Ok(DistributionChannel::Archive),
            "mirror" => Ok(DistributionChannel::Mirror),
            _ => Err(CoordinatorError::UnknownChannel(channel.to_string())),
        }
    }
}

impl fmt::Display for DistributionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A verification key as published to one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelEntry {
    pub channel: DistributionChannel,
    pub ceremony_id: String,
    pub key: VerificationKey,
    pub hash: String,
    pub published_at: OffsetDateTime,
}

///
/// The publication targets of finalized verification keys.
///
/// Channel stores and the active registry are independent. A key that was
/// published to a channel is not trusted until it is activated on quorum.
///
pub struct DistributionRegistry {
    /// The map of (channel, key ID) to published keys.
    channels: DashMap<(DistributionChannel, String), ChannelEntry>,
    /// The map of key IDs to keys that reached verifier quorum.
    registry: DashMap<String, RegistryEntry>,
}

impl DistributionRegistry {
    #[inline]
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            registry: DashMap::new(),
        }
    }

    ///
    /// Publishes the given key to every known channel in `channels`,
    /// and returns the channels it was published to.
    ///
    /// Unknown channel names are skipped.
    ///
    pub(crate) fn fan_out(
        &self,
        channels: &[String],
        ceremony_id: &str,
        key: &VerificationKey,
        hash: &str,
    ) -> Vec<DistributionChannel> {
        let published_at = OffsetDateTime::now_utc();
        let mut published = Vec::with_capacity(channels.len());

        for name in channels {
            let channel = match name.parse::<DistributionChannel>() {
                Ok(channel) => channel,
                Err(_) => {
                    warn!("Skipping unknown distribution channel {}", name);
                    continue;
                }
            };
            if published.contains(&channel) {
                continue;
            }

            self.channels.insert((channel, key.id().to_string()), ChannelEntry {
                channel,
                ceremony_id: ceremony_id.to_string(),
                key: key.clone(),
                hash: hash.to_string(),
                published_at,
            });
            debug!("Published key {} to channel {}", key.id(), channel);
            published.push(channel);
        }

        published
    }

    /// Returns the keys published to the given channel, oldest first.
    pub fn channel_keys(&self, channel: DistributionChannel) -> Vec<ChannelEntry> {
        let mut entries: Vec<ChannelEntry> = self
            .channels
            .iter()
            .filter(|entry| entry.key().0 == channel)
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by_key(|entry| entry.published_at);
        entries
    }

    ///
    /// Activates the given key. Activation is idempotent; the first entry is kept.
    ///
    pub(crate) fn activate(&self, entry: RegistryEntry) -> RegistryEntry {
        let id = entry.id.clone();
        let active = self.registry.entry(id.clone()).or_insert(entry).value().clone();
        info!("Verification key {} is active", id);
        active
    }

    /// Returns the active registry entry for the given key.
    pub fn get(&self, key_id: &str) -> Result<RegistryEntry, CoordinatorError> {
        match self.registry.get(key_id) {
            Some(entry) => Ok(entry.value().clone()),
            None => Err(CoordinatorError::VerificationKeyNotFound(key_id.to_string())),
        }
    }

    /// Returns `true` if the given key is active.
    #[inline]
    pub fn is_active(&self, key_id: &str) -> bool {
        self.registry.contains_key(key_id)
    }
}

impl Default for DistributionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        objects::{KeySource, KeyVerification, KeyVerificationStatus, Parameters, RegistryStatus, SecurityLevel},
        ErrorKind,
    };

    use serde_json::json;

    fn test_key(id: &str) -> VerificationKey {
        VerificationKey::new(
            id.to_string(),
            OffsetDateTime::now_utc(),
            "groth16".to_string(),
            1,
            "bn128".to_string(),
            Parameters::Json(json!({ "IC": [["1", "2"]] })),
            SecurityLevel::Standard,
            2,
            KeySource {
                source_type: "ceremony".to_string(),
                ceremony_id: "ceremony-1".to_string(),
                circuit_id: "c1".to_string(),
                circuit_type: "r1cs".to_string(),
            },
            KeyVerification {
                status: KeyVerificationStatus::Pending,
                verifiers_required: 2,
                verifier_count: 0,
            },
        )
    }

    fn channels(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_fan_out_skips_unknown_and_duplicate_channels() {
        let registry = DistributionRegistry::new();
        let key = test_key("vk-1");

        let published = registry.fan_out(
            &channels(&["mirror", "ftp", "standard", "mirror"]),
            "ceremony-1",
            &key,
            "hash-1",
        );
        assert_eq!(vec![DistributionChannel::Mirror, DistributionChannel::Standard], published);

        let mirrored = registry.channel_keys(DistributionChannel::Mirror);
        assert_eq!(1, mirrored.len());
        assert_eq!("hash-1", mirrored[0].hash);
        assert_eq!("ceremony-1", mirrored[0].ceremony_id);
        assert!(registry.channel_keys(DistributionChannel::Archive).is_empty());
    }

    #[test]
    fn test_published_keys_are_not_active() {
        let registry = DistributionRegistry::new();
        let key = test_key("vk-1");
        registry.fan_out(&channels(&["public"]), "ceremony-1", &key, "hash-1");

        assert!(!registry.is_active("vk-1"));
        assert_eq!(ErrorKind::NotFound, registry.get("vk-1").unwrap_err().kind());
    }

    #[test]
    fn test_activate_is_idempotent() {
        let registry = DistributionRegistry::new();
        let key = test_key("vk-1");

        let first = registry.activate(RegistryEntry::active(key.clone(), "hash-1".to_string(), OffsetDateTime::now_utc()));
        let second = registry.activate(RegistryEntry::active(key, "hash-2".to_string(), OffsetDateTime::now_utc()));
        assert_eq!(first, second);
        assert_eq!("hash-1", registry.get("vk-1").unwrap().hash);
        assert_eq!(RegistryStatus::Active, registry.get("vk-1").unwrap().status);
        assert_eq!("c1", registry.get("vk-1").unwrap().circuit_id);
    }

    #[test]
    fn test_channel_from_str() {
        assert_eq!(DistributionChannel::Archive, "archive".parse().unwrap());
        assert_eq!(ErrorKind::Input, "ftp".parse::<DistributionChannel>().unwrap_err().kind());
    }
}
