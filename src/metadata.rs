//! Metadata codec.
//!
//! The store holds metadata as a structured JSON document of primitives.
//! `encode` writes each value as a self-describing `{"type", "value"}` pair
//! so `decode` can reconstruct the original primitive kind without
//! heuristics; `decode(encode(m)) == m` for every map over the closed
//! [`MetadataValue`] set.

use serde_json::{json, Map, Value};

use crate::model::{Metadata, MetadataValue};

const TAG_STRING: &str = "string";
const TAG_INT32: &str = "int32";
const TAG_INT64: &str = "int64";
const TAG_FLOAT32: &str = "float32";
const TAG_FLOAT64: &str = "float64";
const TAG_BOOL: &str = "bool";

/// Encode a metadata mapping into the store's document shape.
pub fn encode(metadata: &Metadata) -> Value {
    let mut document = Map::with_capacity(metadata.len());
    for (key, value) in metadata {
        document.insert(key.clone(), encode_value(value));
    }
    Value::Object(document)
}

fn encode_value(value: &MetadataValue) -> Value {
    match value {
        MetadataValue::Str(v) => tagged(TAG_STRING, json!(v)),
        MetadataValue::Int32(v) => tagged(TAG_INT32, json!(v)),
        MetadataValue::Int64(v) => tagged(TAG_INT64, json!(v)),
        // JSON has no non-finite numbers; carry those textually under the
        // same tag so the kind still round-trips.
        MetadataValue::Float32(v) if !v.is_finite() => tagged(TAG_FLOAT32, json!(v.to_string())),
        MetadataValue::Float32(v) => tagged(TAG_FLOAT32, json!(v)),
        MetadataValue::Float64(v) if !v.is_finite() => tagged(TAG_FLOAT64, json!(v.to_string())),
        MetadataValue::Float64(v) => tagged(TAG_FLOAT64, json!(v)),
        MetadataValue::Bool(v) => tagged(TAG_BOOL, json!(v)),
    }
}

fn tagged(tag: &str, value: Value) -> Value {
    json!({ "type": tag, "value": value })
}

/// Decode a store document back into a metadata mapping.
///
/// Inverts [`encode`] exactly for tagged values. Fields that were not
/// written by this codec (metadata from other producers) fall back to
/// [`coerce`], so decoding is total and never an error. Non-object
/// documents decode to the empty mapping.
pub fn decode(document: &Value) -> Metadata {
    let mut metadata = Metadata::new();
    let Value::Object(fields) = document else {
        return metadata;
    };
    for (key, value) in fields {
        metadata.insert(key.clone(), decode_value(value));
    }
    metadata
}

fn decode_value(value: &Value) -> MetadataValue {
    let tagged = value
        .as_object()
        .and_then(|o| Some((o.get("type")?.as_str()?, o.get("value")?)));
    let Some((tag, inner)) = tagged else {
        return coerce(value);
    };
    let decoded = match tag {
        TAG_STRING => inner.as_str().map(|s| MetadataValue::Str(s.to_string())),
        TAG_INT32 => inner
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(MetadataValue::Int32),
        TAG_INT64 => inner.as_i64().map(MetadataValue::Int64),
        TAG_FLOAT32 => number_or_text(inner).map(|f| MetadataValue::Float32(f as f32)),
        TAG_FLOAT64 => number_or_text(inner).map(MetadataValue::Float64),
        TAG_BOOL => inner.as_bool().map(MetadataValue::Bool),
        _ => None,
    };
    decoded.unwrap_or_else(|| coerce(value))
}

fn number_or_text(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Lossy fallback for values outside the closed primitive set.
///
/// JSON primitives map onto their natural variant (integers widen to
/// `Int64`, other numbers to `Float64`); null, arrays, and objects are
/// carried as their JSON text. By contract this never fails.
pub fn coerce(value: &Value) -> MetadataValue {
    match value {
        Value::String(s) => MetadataValue::Str(s.clone()),
        Value::Bool(b) => MetadataValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => MetadataValue::Int64(i),
            None => MetadataValue::Float64(n.as_f64().unwrap_or(0.0)),
        },
        other => MetadataValue::Str(other.to_string()),
    }
}
