//! JSON backends

use super::Serializer;
use crate::cassette::format::CassetteData;
use crate::{Result, RewindError};

/// Compact JSON, the default backend
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn name(&self) -> &str {
        "json"
    }

    fn extension(&self) -> &str {
        "json"
    }

    fn serialize(&self, data: &CassetteData) -> Result<Vec<u8>> {
        serde_json::to_vec(data).map_err(|e| RewindError::InvalidFormat(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<CassetteData> {
        serde_json::from_slice(bytes).map_err(|e| RewindError::InvalidFormat(e.to_string()))
    }
}

/// Indented JSON, for cassettes read by humans
#[derive(Debug, Clone, Copy, Default)]
pub struct PrettyJsonSerializer;

impl Serializer for PrettyJsonSerializer {
    fn name(&self) -> &str {
        "prettyjson"
    }

    fn extension(&self) -> &str {
        "json"
    }

    fn serialize(&self, data: &CassetteData) -> Result<Vec<u8>> {
        let mut bytes =
            serde_json::to_vec_pretty(data).map_err(|e| RewindError::InvalidFormat(e.to_string()))?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<CassetteData> {
        JsonSerializer.deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializers::tests::sample_cassette;

    #[test]
    fn test_json_round_trip() {
        let data = sample_cassette();
        let bytes = JsonSerializer.serialize(&data).unwrap();

        assert!(!bytes.contains(&b'\n'));
        assert_eq!(JsonSerializer.deserialize(&bytes).unwrap(), data);
    }

    #[test]
    fn test_json_top_level_keys() {
        let bytes = JsonSerializer.serialize(&sample_cassette()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert!(value["http_interactions"].is_array());
        assert_eq!(value["recorded_with"], "rewind/test");
        assert_eq!(
            value["http_interactions"][0]["recorded_at"],
            "2013-08-31T12:30:00"
        );
    }

    #[test]
    fn test_pretty_json_is_indented_and_readable_by_json() {
        let data = sample_cassette();
        let bytes = PrettyJsonSerializer.serialize(&data).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();

        assert!(text.contains("\n  \"http_interactions\""));
        assert_eq!(JsonSerializer.deserialize(&bytes).unwrap(), data);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(JsonSerializer.deserialize(b"not json").is_err());
        assert!(JsonSerializer.deserialize(b"").is_err());
    }
}
