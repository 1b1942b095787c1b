//! The snapshot wire format: a self-describing JSON document holding a
//! format version, a checksum, and one record per binding. Records carry an
//! explicit type tag so foreign readers do not depend on this crate, and so
//! unknown tags can be skipped in lenient mode instead of failing the load.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use sesh_core::{Environment, Value};

use crate::error::StoreError;

/// Version written into every snapshot. Bump on any schema change.
pub const FORMAT_VERSION: u32 = 1;

const KNOWN_TAGS: [&str; 7] = ["unit", "bool", "int", "float", "str", "list", "map"];

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDoc {
    version: u32,
    checksum: String,
    bindings: Vec<Record>,
}

/// One persisted binding.
#[derive(Debug, Serialize, Deserialize)]
struct Record {
    name: String,
    #[serde(rename = "type")]
    tag: String,
    value: serde_json::Value,
}

#[derive(Debug, Error)]
pub(crate) enum DecodeError {
    #[error("not a valid snapshot document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported format version {0}")]
    Version(u32),
    #[error("checksum mismatch: stored {stored}, computed {computed}")]
    Checksum { stored: String, computed: String },
    #[error("record `{name}` has unknown type tag `{tag}`")]
    UnknownTag { name: String, tag: String },
    #[error("record `{name}` does not match its `{tag}` tag")]
    TagMismatch { name: String, tag: String },
}

/// Serialize the whole environment. Every value is checked for
/// representability here, before the caller commits any bytes; in lenient
/// mode unrepresentable bindings are skipped with a warning instead.
pub(crate) fn encode(env: &Environment, lenient: bool) -> Result<Vec<u8>, StoreError> {
    let mut records = Vec::new();
    for (name, value) in env.iter() {
        match encode_value(value) {
            Ok(json) => records.push(Record {
                name: name.to_string(),
                tag: value.type_name().to_string(),
                value: json,
            }),
            Err(kind) if lenient => {
                tracing::warn!(name, kind, "skipping binding that cannot be snapshotted");
            }
            Err(kind) => {
                return Err(StoreError::UnserializableValue {
                    name: name.to_string(),
                    kind,
                })
            }
        }
    }
    let doc = SnapshotDoc {
        version: FORMAT_VERSION,
        checksum: checksum(&records),
        bindings: records,
    };
    Ok(serde_json::to_vec_pretty(&doc).expect("snapshot doc serializable"))
}

/// Rebuild an environment from snapshot bytes. In lenient mode, records with
/// an unknown type tag are skipped with a warning; every other defect is
/// fatal in both modes.
pub(crate) fn decode(bytes: &[u8], lenient: bool) -> Result<Environment, DecodeError> {
    let doc: SnapshotDoc = serde_json::from_slice(bytes)?;
    if doc.version != FORMAT_VERSION {
        return Err(DecodeError::Version(doc.version));
    }
    let computed = checksum(&doc.bindings);
    if computed != doc.checksum {
        return Err(DecodeError::Checksum {
            stored: doc.checksum,
            computed,
        });
    }

    let mut env = Environment::new();
    for record in doc.bindings {
        if !KNOWN_TAGS.contains(&record.tag.as_str()) {
            if lenient {
                tracing::warn!(
                    name = %record.name,
                    tag = %record.tag,
                    "skipping record with unknown type tag"
                );
                continue;
            }
            return Err(DecodeError::UnknownTag {
                name: record.name,
                tag: record.tag,
            });
        }
        let value = match decode_json(&record.value) {
            Some(value) if value.type_name() == record.tag => value,
            _ => {
                return Err(DecodeError::TagMismatch {
                    name: record.name,
                    tag: record.tag,
                })
            }
        };
        env.set(record.name, value);
    }
    Ok(env)
}

/// Content checksum over the serialized record list, hex-encoded SHA-256.
/// Record order and map-key order are deterministic, so the bytes are too.
fn checksum(records: &[Record]) -> String {
    let bytes = serde_json::to_vec(records).expect("records serializable");
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hex::encode(hasher.finalize())
}

fn encode_value(value: &Value) -> Result<serde_json::Value, &'static str> {
    use serde_json::Value as Json;
    match value {
        Value::Unit => Ok(Json::Null),
        Value::Bool(b) => Ok(Json::Bool(*b)),
        Value::Int(n) => Ok(Json::from(*n)),
        Value::Float(x) => serde_json::Number::from_f64(*x)
            .map(Json::Number)
            .ok_or("non-finite float"),
        Value::Str(s) => Ok(Json::String(s.clone())),
        Value::List(items) => items
            .iter()
            .map(encode_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Json::Array),
        Value::Map(entries) => {
            let mut map = serde_json::Map::new();
            for (key, val) in entries {
                map.insert(key.clone(), encode_value(val)?);
            }
            Ok(Json::Object(map))
        }
        Value::Builtin(_) => Err("native routine"),
    }
}

/// Nested values carry no tags; their kind is recovered from the JSON shape.
/// `serde_json` keeps ints and floats distinct, so the mapping is lossless.
fn decode_json(json: &serde_json::Value) -> Option<Value> {
    use serde_json::Value as Json;
    match json {
        Json::Null => Some(Value::Unit),
        Json::Bool(b) => Some(Value::Bool(*b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::Int(i))
            } else {
                n.as_f64().map(Value::Float)
            }
        }
        Json::String(s) => Some(Value::Str(s.clone())),
        Json::Array(items) => items
            .iter()
            .map(decode_json)
            .collect::<Option<Vec<_>>>()
            .map(Value::List),
        Json::Object(entries) => {
            let mut map = BTreeMap::new();
            for (key, val) in entries {
                map.insert(key.clone(), decode_json(val)?);
            }
            Some(Value::Map(map))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sesh_core::Builtin;

    fn sample_env() -> Environment {
        let mut env = Environment::new();
        env.set("flag", Value::Bool(true));
        env.set("count", Value::Int(-3));
        env.set("ratio", Value::Float(2.5));
        env.set("name", Value::Str("ada".into()));
        env.set("items", Value::List(vec![Value::Int(1), Value::Str("two".into())]));
        let mut map = BTreeMap::new();
        map.insert("inner".to_string(), Value::List(vec![Value::Float(1.5)]));
        env.set("nested", Value::Map(map));
        env.set("nothing", Value::Unit);
        env
    }

    #[test]
    fn round_trips_every_kind() {
        let env = sample_env();
        let bytes = encode(&env, false).unwrap();
        let restored = decode(&bytes, false).unwrap();
        assert_eq!(restored, env);
    }

    #[test]
    fn garbage_bytes_are_corrupt() {
        assert!(matches!(
            decode(b"not json at all", false).unwrap_err(),
            DecodeError::Json(_)
        ));
    }

    #[test]
    fn truncated_document_is_corrupt() {
        let bytes = encode(&sample_env(), false).unwrap();
        let cut = &bytes[..bytes.len() / 2];
        assert!(matches!(decode(cut, false).unwrap_err(), DecodeError::Json(_)));
    }

    #[test]
    fn unknown_version_is_corrupt() {
        let bytes = encode(&Environment::new(), false).unwrap();
        let text = String::from_utf8(bytes).unwrap().replace(
            &format!("\"version\": {}", FORMAT_VERSION),
            "\"version\": 99",
        );
        assert!(matches!(
            decode(text.as_bytes(), false).unwrap_err(),
            DecodeError::Version(99)
        ));
    }

    #[test]
    fn tampered_record_fails_the_checksum() {
        let mut env = Environment::new();
        env.set("x", Value::Int(5));
        let bytes = encode(&env, false).unwrap();
        let text = String::from_utf8(bytes)
            .unwrap()
            .replace("\"value\": 5", "\"value\": 6");
        assert!(matches!(
            decode(text.as_bytes(), false).unwrap_err(),
            DecodeError::Checksum { .. }
        ));
    }

    #[test]
    fn native_routine_is_unserializable() {
        let mut env = Environment::new();
        env.set("f", Value::Builtin(Builtin::Len));
        let err = encode(&env, false).unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnserializableValue { ref name, kind: "native routine" } if name == "f"
        ));
    }

    #[test]
    fn non_finite_float_is_unserializable_even_nested() {
        let mut env = Environment::new();
        env.set("xs", Value::List(vec![Value::Float(f64::INFINITY)]));
        let err = encode(&env, false).unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnserializableValue { ref name, kind: "non-finite float" } if name == "xs"
        ));
    }

    #[test]
    fn lenient_encode_skips_bad_bindings_and_keeps_the_rest() {
        let mut env = Environment::new();
        env.set("keep", Value::Int(1));
        env.set("skip", Value::Builtin(Builtin::Print));
        let bytes = encode(&env, true).unwrap();
        let restored = decode(&bytes, false).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.get("keep"), Some(&Value::Int(1)));
    }

    #[test]
    fn lenient_decode_skips_unknown_tags() {
        // A future writer might add tags this version does not know.
        let records = vec![
            Record {
                name: "known".into(),
                tag: "int".into(),
                value: serde_json::json!(1),
            },
            Record {
                name: "mystery".into(),
                tag: "blob".into(),
                value: serde_json::json!("??"),
            },
        ];
        let doc = SnapshotDoc {
            version: FORMAT_VERSION,
            checksum: checksum(&records),
            bindings: records,
        };
        let bytes = serde_json::to_vec(&doc).unwrap();

        assert!(matches!(
            decode(&bytes, false).unwrap_err(),
            DecodeError::UnknownTag { .. }
        ));
        let restored = decode(&bytes, true).unwrap();
        assert_eq!(restored.len(), 1);
        assert!(restored.contains("known"));
    }

    #[test]
    fn tag_value_mismatch_is_corrupt() {
        let records = vec![Record {
            name: "x".into(),
            tag: "int".into(),
            value: serde_json::json!("not an int"),
        }];
        let doc = SnapshotDoc {
            version: FORMAT_VERSION,
            checksum: checksum(&records),
            bindings: records,
        };
        let bytes = serde_json::to_vec(&doc).unwrap();
        assert!(matches!(
            decode(&bytes, false).unwrap_err(),
            DecodeError::TagMismatch { .. }
        ));
    }

    #[test]
    fn float_and_int_records_stay_distinct() {
        let mut env = Environment::new();
        env.set("i", Value::Int(5));
        env.set("f", Value::Float(5.0));
        let restored = decode(&encode(&env, false).unwrap(), false).unwrap();
        assert_eq!(restored.get("i"), Some(&Value::Int(5)));
        assert_eq!(restored.get("f"), Some(&Value::Float(5.0)));
    }
}
