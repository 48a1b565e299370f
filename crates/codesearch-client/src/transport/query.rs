//! Query-string codec used by the backend's JSON endpoint.
//!
//! The backend takes requests as flat `key=value` pairs. Nested messages are
//! bracketed with `key=b` ... `key=e`, repeated fields repeat the key, and
//! fields are emitted in sorted key order:
//!
//! ```text
//! {"search_request": [{"query": "foo", "max_num_results": 2}]}
//!   => search_request=b&max_num_results=2&query=foo&search_request=e
//! ```
//!
//! Nulls and empty strings are omitted; booleans are `true`/`false`.

use serde_json::Value as JsonValue;

use crate::error::{ClientError, ClientResult};

/// Flatten a JSON object into ordered key/value pairs.
pub fn encode_pairs(payload: &JsonValue) -> ClientResult<Vec<(String, String)>> {
    let JsonValue::Object(map) = payload else {
        return Err(ClientError::Serialization {
            message: format!(
                "request payload must be a JSON object, got {}",
                kind_name(payload)
            ),
        });
    };

    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    let mut pairs = Vec::new();
    for key in keys {
        push_value(&mut pairs, key, &map[key.as_str()]);
    }
    Ok(pairs)
}

/// Encode a payload as an `application/x-www-form-urlencoded` string.
pub fn encode_query_string(payload: &JsonValue) -> ClientResult<String> {
    let pairs = encode_pairs(payload)?;
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in &pairs {
        serializer.append_pair(key, value);
    }
    Ok(serializer.finish())
}

fn push_value(pairs: &mut Vec<(String, String)>, key: &str, value: &JsonValue) {
    match value {
        JsonValue::Null => {}
        JsonValue::Bool(b) => pairs.push((key.to_string(), b.to_string())),
        JsonValue::Number(n) => pairs.push((key.to_string(), n.to_string())),
        JsonValue::String(s) if s.is_empty() => {}
        JsonValue::String(s) => pairs.push((key.to_string(), s.clone())),
        JsonValue::Array(items) => {
            for item in items {
                push_value(pairs, key, item);
            }
        }
        JsonValue::Object(map) => {
            pairs.push((key.to_string(), "b".to_string()));
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for inner in keys {
                push_value(pairs, inner, &map[inner.as_str()]);
            }
            pairs.push((key.to_string(), "e".to_string()));
        }
    }
}

fn kind_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
