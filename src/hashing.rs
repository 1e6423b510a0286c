//! Canonical hashing of contribution parameters and coordinator artifacts.
//!
//! JSON values are hashed over their RFC 8785 (JCS) serialization, so any
//! client that canonicalizes the same value obtains the same digest. Raw
//! byte parameters are hashed as-is.

use crate::{objects::Parameters, CoordinatorError};

use serde::Serialize;
use sha2::{Digest, Sha256};

/// The length in hex characters of every digest produced by the hasher.
pub const DIGEST_HEX_LENGTH: usize = 64;

pub struct ContributionHasher;

impl ContributionHasher {
    ///
    /// Returns the canonical SHA-256 digest of the given parameters,
    /// as a lowercase hex string.
    ///
    pub fn hash(parameters: &Parameters) -> Result<String, CoordinatorError> {
        match parameters {
            Parameters::Json(value) => Ok(hex::encode(Sha256::digest(&canonical_bytes(value)?))),
            Parameters::Bytes(bytes) => Ok(hex::encode(Sha256::digest(bytes))),
        }
    }

    ///
    /// Returns the canonical SHA-256 digest of any serializable value.
    ///
    pub fn hash_value<T: Serialize>(value: &T) -> Result<String, CoordinatorError> {
        let value = serde_json::to_value(value).map_err(|error| CoordinatorError::Canonicalization(error.to_string()))?;
        Ok(hex::encode(Sha256::digest(&canonical_bytes(&value)?)))
    }

    ///
    /// Returns `true` if the supplied digest names the computed digest.
    ///
    /// The supplied digest may carry a `0x` prefix and any letter case.
    ///
    pub fn matches(supplied: &str, computed: &str) -> bool {
        let supplied = supplied.trim();
        let supplied = supplied
            .strip_prefix("0x")
            .or_else(|| supplied.strip_prefix("0X"))
            .unwrap_or(supplied);
        supplied.len() == computed.len() && supplied.eq_ignore_ascii_case(computed)
    }
}

fn canonical_bytes(value: &serde_json::Value) -> Result<Vec<u8>, CoordinatorError> {
    serde_jcs::to_vec(value).map_err(|error| CoordinatorError::Canonicalization(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_hash_is_key_order_independent() {
        let first: serde_json::Value = serde_json::from_str(r#"{"b": [1, 2], "a": {"y": true, "x": null}}"#).unwrap();
        let second: serde_json::Value = serde_json::from_str(r#"{"a": {"x": null, "y": true}, "b": [1, 2]}"#).unwrap();

        let first = ContributionHasher::hash(&Parameters::Json(first)).unwrap();
        let second = ContributionHasher::hash(&Parameters::Json(second)).unwrap();
        assert_eq!(first, second);
        assert_eq!(DIGEST_HEX_LENGTH, first.len());
    }

    #[test]
    fn test_hash_known_vector() {
        // SHA-256 of the canonical form `{"a":1}`.
        let digest = ContributionHasher::hash(&Parameters::Json(json!({ "a": 1 }))).unwrap();
        assert_eq!(
            "015abd7f5cc57a2dd94b7590f04ad8084273905ee33ec5cebeae62276a97f862",
            digest
        );

        // SHA-256 of the empty byte string.
        let digest = ContributionHasher::hash(&Parameters::Bytes(b"".to_vec())).unwrap();
        assert_eq!(
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            digest
        );
    }

    #[test]
    fn test_matches() {
        let computed = ContributionHasher::hash(&Parameters::Json(json!({ "a": 1 }))).unwrap();

        assert!(ContributionHasher::matches(&computed, &computed));
        assert!(ContributionHasher::matches(&format!("0x{}", computed.to_uppercase()), &computed));
        assert!(!ContributionHasher::matches("0xBAD", &computed));
        assert!(!ContributionHasher::matches("", &computed));
    }

    proptest! {
        #[test]
        fn test_hash_is_deterministic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let parameters = Parameters::Bytes(bytes);
            prop_assert_eq!(
                ContributionHasher::hash(&parameters).unwrap(),
                ContributionHasher::hash(&parameters).unwrap()
            );
        }

        #[test]
        fn test_hash_distinguishes_values(first in any::<i64>(), second in any::<i64>()) {
            prop_assume!(first != second);
            let first = ContributionHasher::hash(&Parameters::Json(json!({ "tau": first }))).unwrap();
            let second = ContributionHasher::hash(&Parameters::Json(json!({ "tau": second }))).unwrap();
            prop_assert_ne!(first, second);
        }
    }
}
