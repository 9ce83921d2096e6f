//! Canonical JSON codec for stored records
//!
//! The embedded store holds each record as one key-value entry: key =
//! object id bytes, value = the record's canonical JSON text. JSON has
//! no native date or binary type, so those ride in single-key wrapper
//! objects:
//!
//! - `{"$date": "<rfc3339>"}` for timestamps, at full nanosecond
//!   precision so stored dates compare identically on every backend
//! - `{"$blob": "<base64>"}` for binary payloads
//!
//! Canonical means deterministic: serde_json's default map keeps keys
//! sorted, so equal records encode to equal text. Anything outside the
//! closed value universe (null, arrays, nested objects) fails decode
//! with an error naming the offending property.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use polystore_core::{Record, RepositoryError, Result, Value};
use serde_json::{json, Map};

/// Encode a record into canonical JSON text
pub fn encode(record: &Record) -> Result<String> {
    let mut map = Map::new();
    for (key, value) in record.iter() {
        map.insert(key.clone(), value_to_json(key, value)?);
    }
    Ok(serde_json::Value::Object(map).to_string())
}

/// Decode canonical JSON text back into a record
pub fn decode(text: &str) -> Result<Record> {
    let parsed: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
    let serde_json::Value::Object(map) = parsed else {
        return Err(RepositoryError::Serialization(
            "stored record is not a JSON object".to_string(),
        ));
    };
    let mut record = Record::new();
    for (key, value) in map {
        let decoded = json_to_value(&key, value)?;
        record.put(key, decoded);
    }
    Ok(record)
}

fn value_to_json(key: &str, value: &Value) -> Result<serde_json::Value> {
    Ok(match value {
        Value::Str(s) => json!(s),
        Value::Int(i) => json!(i),
        Value::Double(f) => {
            if !f.is_finite() {
                return Err(RepositoryError::Serialization(format!(
                    "non-finite double for property '{key}'"
                )));
            }
            json!(f)
        }
        Value::Bool(b) => json!(b),
        Value::Date(d) => json!({ "$date": d.to_rfc3339_opts(SecondsFormat::AutoSi, true) }),
        Value::Blob(b) => json!({ "$blob": BASE64.encode(b) }),
    })
}

fn json_to_value(key: &str, value: serde_json::Value) -> Result<Value> {
    match value {
        serde_json::Value::String(s) => Ok(Value::Str(s)),
        serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Double(f))
            } else {
                Err(unsupported(key, "number"))
            }
        }
        serde_json::Value::Object(map) if map.len() == 1 => {
            if let Some(serde_json::Value::String(s)) = map.get("$date") {
                let parsed = DateTime::parse_from_rfc3339(s).map_err(|e| {
                    RepositoryError::Serialization(format!(
                        "bad date for property '{key}': {e}"
                    ))
                })?;
                return Ok(Value::Date(parsed.with_timezone(&Utc)));
            }
            if let Some(serde_json::Value::String(s)) = map.get("$blob") {
                let bytes = BASE64.decode(s).map_err(|e| {
                    RepositoryError::Serialization(format!(
                        "bad blob for property '{key}': {e}"
                    ))
                })?;
                return Ok(Value::Blob(bytes));
            }
            Err(unsupported(key, "object"))
        }
        serde_json::Value::Null => Err(unsupported(key, "null")),
        serde_json::Value::Array(_) => Err(unsupported(key, "array")),
        serde_json::Value::Object(_) => Err(unsupported(key, "object")),
    }
}

fn unsupported(key: &str, type_name: &str) -> RepositoryError {
    RepositoryError::UnsupportedType {
        key: key.to_string(),
        type_name: type_name.to_string(),
    }
}
