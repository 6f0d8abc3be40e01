//! Typed value encoding used by the document store's REST API.
//!
//! Plain JSON maps to `{"stringValue": ..}`, `{"integerValue": "42"}`,
//! `{"mapValue": {"fields": ..}}` and so on. Integers travel as strings.

use serde_json::{json, Map, Value};

use crate::error::{StoreError, StoreResult};

pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode).collect::<Vec<_>>() } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub fn encode_fields(map: &Map<String, Value>) -> Value {
    Value::Object(map.iter().map(|(k, v)| (k.clone(), encode(v))).collect())
}

pub fn string_value(s: &str) -> Value {
    json!({ "stringValue": s })
}

pub fn timestamp_value(at: chrono::DateTime<chrono::Utc>) -> Value {
    json!({ "timestampValue": at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true) })
}

pub fn decode(value: &Value) -> StoreResult<Value> {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Err(StoreError::decode(format!("not a typed value: {}", value)));
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" | "doubleValue" | "stringValue" | "timestampValue" | "referenceValue" => {
            Ok(inner.clone())
        }
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| StoreError::decode(format!("bad integer {:?}: {}", s, e))),
            other => Ok(other.clone()),
        },
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(decode).collect::<StoreResult<Vec<_>>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Array(values))
        }
        "mapValue" => match inner.get("fields") {
            Some(fields) => decode_fields(fields),
            None => Ok(Value::Object(Map::new())),
        },
        other => Err(StoreError::decode(format!("unsupported value type {}", other))),
    }
}

/// Decode a document's `fields` object into plain JSON.
pub fn decode_fields(fields: &Value) -> StoreResult<Value> {
    let Some(map) = fields.as_object() else {
        return Err(StoreError::decode("fields is not an object"));
    };
    let mut out = Map::new();
    for (key, value) in map {
        out.insert(key.clone(), decode(value)?);
    }
    Ok(Value::Object(out))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode(&json!("Paris")), json!({ "stringValue": "Paris" }));
        assert_eq!(encode(&json!(true)), json!({ "booleanValue": true }));
        assert_eq!(encode(&json!(42)), json!({ "integerValue": "42" }));
        assert_eq!(encode(&json!(1.5)), json!({ "doubleValue": 1.5 }));
        assert_eq!(encode(&Value::Null), json!({ "nullValue": null }));
    }

    #[test]
    fn test_encode_nested_map() {
        let encoded = encode_fields(
            json!({ "settings": { "unitSystem": "imperial" }, "favoriteLocations": ["Oslo"] })
                .as_object()
                .unwrap(),
        );
        assert_eq!(
            encoded,
            json!({
                "settings": { "mapValue": { "fields": {
                    "unitSystem": { "stringValue": "imperial" }
                }}},
                "favoriteLocations": { "arrayValue": { "values": [
                    { "stringValue": "Oslo" }
                ]}}
            })
        );
    }

    #[test]
    fn test_decode_document_fields() {
        let fields = json!({
            "favoriteLocations": { "arrayValue": { "values": [
                { "stringValue": "Paris" }, { "stringValue": "Tokyo" }
            ]}},
            "emptyList": { "arrayValue": {} },
            "phoneVerified": { "booleanValue": true },
            "count": { "integerValue": "3" },
            "createdAt": { "timestampValue": "2026-10-19T12:00:00.000Z" }
        });
        let decoded = decode_fields(&fields).unwrap();
        assert_eq!(decoded["favoriteLocations"], json!(["Paris", "Tokyo"]));
        assert_eq!(decoded["emptyList"], json!([]));
        assert_eq!(decoded["phoneVerified"], json!(true));
        assert_eq!(decoded["count"], json!(3));
        assert_eq!(decoded["createdAt"], json!("2026-10-19T12:00:00.000Z"));
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        assert!(decode(&json!({ "geoPointValue": {} })).is_err());
        assert!(decode(&json!("bare")).is_err());
    }
}
