//! The tagged `__type__` wire envelope used to carry binary, datetime, and
//! duration values over JSON-RPC, where plain JSON has no native
//! representation for them. A raw base64 string presented where a bytes
//! envelope is expected is a validation error, not a value to coerce —
//! callers must be explicit.

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("expected a {{\"__type__\":\"{expected}\"}} envelope, found a bare value")]
    MissingEnvelope { expected: &'static str },
    #[error("invalid base64 in bytes envelope: {0}")]
    BadBase64(String),
}

/// Bytes that must arrive wrapped as `{"__type__":"bytes","data":"<base64>"}`.
/// Deserializing a bare JSON string into this type fails closed rather than
/// guessing the caller meant base64.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WireBytes(pub Vec<u8>);

#[derive(Deserialize)]
#[serde(tag = "__type__", rename_all = "snake_case")]
enum TaggedBytes {
    Bytes { data: String },
}

impl Serialize for WireBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("WireBytes", 2)?;
        s.serialize_field("__type__", "bytes")?;
        s.serialize_field("data", &BASE64.encode(&self.0))?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for WireBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // A bare string (no envelope) must be rejected, not treated as
        // base64 in disguise — deserialize the untagged JSON value first and
        // inspect its shape the way IncomingClaims::deserialize_audience
        // probes for shape before committing to an interpretation.
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.is_string() {
            return Err(D::Error::custom(EnvelopeError::MissingEnvelope { expected: "bytes" }));
        }
        let tagged: TaggedBytes = serde_json::from_value(value).map_err(D::Error::custom)?;
        let TaggedBytes::Bytes { data } = tagged;
        let bytes = BASE64
            .decode(&data)
            .map_err(|e| D::Error::custom(EnvelopeError::BadBase64(e.to_string())))?;
        Ok(WireBytes(bytes))
    }
}

/// A timestamp wrapped as `{"__type__":"datetime","data":"<ISO-8601>"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireDateTime(pub DateTime<Utc>);

#[derive(Deserialize)]
#[serde(tag = "__type__", rename_all = "snake_case")]
enum TaggedDateTime {
    Datetime { data: DateTime<Utc> },
}

impl Serialize for WireDateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("WireDateTime", 2)?;
        s.serialize_field("__type__", "datetime")?;
        s.serialize_field("data", &self.0.to_rfc3339())?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for WireDateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tagged = TaggedDateTime::deserialize(deserializer)?;
        let TaggedDateTime::Datetime { data } = tagged;
        Ok(WireDateTime(data))
    }
}

/// A duration wrapped as `{"__type__":"timedelta","seconds":<num>}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WireDuration(pub f64);

#[derive(Deserialize)]
#[serde(tag = "__type__", rename_all = "snake_case")]
enum TaggedDuration {
    Timedelta { seconds: f64 },
}

impl Serialize for WireDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("WireDuration", 2)?;
        s.serialize_field("__type__", "timedelta")?;
        s.serialize_field("seconds", &self.0)?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for WireDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tagged = TaggedDuration::deserialize(deserializer)?;
        let TaggedDuration::Timedelta { seconds } = tagged;
        Ok(WireDuration(seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_envelope_roundtrips() {
        let original = WireBytes(b"Hello".to_vec());
        let json = serde_json::to_value(&original).unwrap();
        assert_eq!(json["__type__"], "bytes");
        assert_eq!(json["data"], "SGVsbG8=");
        let back: WireBytes = serde_json::from_value(json).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn bare_base64_string_is_rejected() {
        let raw = serde_json::json!("SGVsbG8=");
        let err = serde_json::from_value::<WireBytes>(raw).unwrap_err();
        assert!(err.to_string().contains("envelope"));
    }

    #[test]
    fn duration_envelope_roundtrips() {
        let original = WireDuration(1.5);
        let json = serde_json::to_value(&original).unwrap();
        let back: WireDuration = serde_json::from_value(json).unwrap();
        assert_eq!(back.0, original.0);
    }
}
