//! Request fingerprinting.
//!
//! A [`Fingerprint`] is the SHA-256 of the JCS (RFC 8785) canonical form of
//! `{"method": ..., "payload": ...}`, rendered as 64 lowercase hex chars.
//! JCS sorts object keys and strips insignificant whitespace, so two payloads
//! that differ only in field order or formatting share a fingerprint.
//!
//! The scheme is a local policy: the backend's own request signatures are
//! opaque and unstable, so nothing here tries to match them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};

use crate::error::{ClientError, ClientResult};

/// Length of a fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 64;

/// Stable identifier for a request; also the cache file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parse a fingerprint, accepting exactly 64 lowercase hex characters.
    pub fn parse(s: &str) -> ClientResult<Self> {
        let valid = s.len() == FINGERPRINT_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(ClientError::InvalidFingerprint {
                value: s.to_string(),
            });
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 16 characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..16]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = ClientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}

/// A named RPC method plus its serialized payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub payload: JsonValue,
}

impl Request {
    /// Build a request from any serializable payload.
    pub fn new<T: Serialize + ?Sized>(method: impl Into<String>, payload: &T) -> ClientResult<Self> {
        let payload = serde_json::to_value(payload).map_err(|e| ClientError::Serialization {
            message: format!("request payload is not serializable: {}", e),
        })?;
        Ok(Self {
            method: method.into(),
            payload,
        })
    }

    /// Build a request from an already-constructed JSON value.
    pub fn from_value(method: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            method: method.into(),
            payload,
        }
    }

    /// Compute this request's fingerprint.
    pub fn fingerprint(&self) -> ClientResult<Fingerprint> {
        fingerprint(&self.method, &self.payload)
    }
}

/// Canonical bytes that get hashed for `method` + `payload`.
pub fn canonical_bytes(method: &str, payload: &JsonValue) -> ClientResult<Vec<u8>> {
    let envelope = serde_json::json!({
        "method": method,
        "payload": payload,
    });
    serde_jcs::to_vec(&envelope).map_err(|e| ClientError::Serialization {
        message: format!("failed to canonicalize request: {}", e),
    })
}

/// Fingerprint for `method` + `payload`.
pub fn fingerprint(method: &str, payload: &JsonValue) -> ClientResult<Fingerprint> {
    let canonical = canonical_bytes(method, payload)?;
    let digest = Sha256::digest(&canonical);
    Ok(Fingerprint(hex::encode(digest)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_fingerprint_stability() {
        let a = Request::from_value("search", json!({"query": "hello world"}));
        let b = Request::from_value("search", json!({"query": "hello world"}));
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

        let c = Request::from_value("search", json!({"query": "hello"}));
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
    }

    #[test]
    fn test_field_order_does_not_matter() {
        let a: JsonValue =
            serde_json::from_str(r#"{"query": "x", "max_num_results": 10, "opts": {"a": 1, "b": [1, 2]}}"#)
                .unwrap();
        let b: JsonValue =
            serde_json::from_str(r#"{"opts":{"b":[1,2],"a":1},"max_num_results":10,"query":"x"}"#).unwrap();
        assert_eq!(
            fingerprint("search", &a).unwrap(),
            fingerprint("search", &b).unwrap()
        );
    }

    #[test]
    fn test_method_is_part_of_fingerprint() {
        let payload = json!({"query": "x"});
        assert_ne!(
            fingerprint("search", &payload).unwrap(),
            fingerprint("xref_search", &payload).unwrap()
        );
    }

    #[test]
    fn test_array_order_matters() {
        assert_ne!(
            fingerprint("m", &json!({"v": [1, 2]})).unwrap(),
            fingerprint("m", &json!({"v": [2, 1]})).unwrap()
        );
    }

    #[test]
    fn test_fingerprint_shape() {
        let fp = fingerprint("status", &json!({})).unwrap();
        assert_eq!(fp.as_str().len(), FINGERPRINT_LEN);
        assert!(fp
            .as_str()
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(fp.short().len(), 16);
        assert!(Fingerprint::parse(fp.as_str()).is_ok());
    }

    #[test]
    fn test_known_canonical_form() {
        let bytes = canonical_bytes("search", &json!({"query": "hello world"})).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"method":"search","payload":{"query":"hello world"}}"#
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Fingerprint::parse("abc").is_err());
        assert!(Fingerprint::parse(&"G".repeat(64)).is_err());
        assert!(Fingerprint::parse(&"AB".repeat(32)).is_err());
        assert!(Fingerprint::parse("../../../../etc/passwd").is_err());
    }

    #[test]
    fn test_parse_error_is_input_error() {
        let err = Fingerprint::parse("not-a-fingerprint").unwrap_err();
        assert!(matches!(err, ClientError::InvalidFingerprint { .. }));
        assert_eq!(err.to_string(), r#"invalid fingerprint: "not-a-fingerprint""#);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_non_string_keys_are_serialization_errors() {
        let mut bad = BTreeMap::new();
        bad.insert((1, 2), "value");
        let err = Request::new("search", &bad).unwrap_err();
        assert!(matches!(err, ClientError::Serialization { .. }));
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let fp = fingerprint("status", &json!({})).unwrap();
        let s = serde_json::to_string(&fp).unwrap();
        let back: Fingerprint = serde_json::from_str(&s).unwrap();
        assert_eq!(back, fp);
        assert!(serde_json::from_str::<Fingerprint>("\"nope\"").is_err());
    }
}
