use serde::{Deserialize, Serialize};
use serde_json::Value;

///
/// An opaque parameter set passed through the ceremony core.
///
/// The field layout of the parameters is owned by the proving system.
/// The coordinator only hashes, validates (through a collaborator),
/// and forwards them.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "encoding", content = "value", rename_all = "lowercase")]
pub enum Parameters {
    Json(Value),
    Bytes(#[serde(with = "hex::serde")] Vec<u8>),
}

impl Parameters {
    /// Returns `true` if the parameters carry no content.
    #[inline]
    pub fn is_empty(&self) -> bool {
        match self {
            Parameters::Json(Value::Null) => true,
            Parameters::Json(Value::Object(map)) => map.is_empty(),
            Parameters::Json(Value::Array(elements)) => elements.is_empty(),
            Parameters::Json(Value::String(string)) => string.is_empty(),
            Parameters::Json(_) => false,
            Parameters::Bytes(bytes) => bytes.is_empty(),
        }
    }

    /// Returns the size of the parameters in bytes, measured on their compact encoding.
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        match self {
            Parameters::Json(value) => value.to_string().len(),
            Parameters::Bytes(bytes) => bytes.len(),
        }
    }
}

impl From<Value> for Parameters {
    fn from(value: Value) -> Self {
        Parameters::Json(value)
    }
}

impl From<Vec<u8>> for Parameters {
    fn from(bytes: Vec<u8>) -> Self {
        Parameters::Bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_empty() {
        assert!(Parameters::Json(Value::Null).is_empty());
        assert!(Parameters::Json(json!({})).is_empty());
        assert!(Parameters::Json(json!([])).is_empty());
        assert!(Parameters::Bytes(vec![]).is_empty());

        assert!(!Parameters::Json(json!({ "tau": "0x01" })).is_empty());
        assert!(!Parameters::Json(json!(0)).is_empty());
        assert!(!Parameters::Bytes(vec![0u8]).is_empty());
    }

    #[test]
    fn test_bytes_serialize_as_hex() {
        let parameters = Parameters::Bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        let serialized = serde_json::to_value(&parameters).unwrap();
        assert_eq!(json!({ "encoding": "bytes", "value": "deadbeef" }), serialized);

        let candidate: Parameters = serde_json::from_value(serialized).unwrap();
        assert_eq!(parameters, candidate);
    }
}
