//! Schema-less CBOR walking on top of [`ciborium::Value`].
//!
//! COSE and CWT structures are decoded into a generic value tree first and
//! then inspected by label, so that unknown or private claims never make the
//! decode fail.

use ciborium::value::{Integer, Value};
use serde::de::DeserializeOwned;

use crate::error::{DecodeStage, Error};

/// Decode a single CBOR data item. Trailing bytes are rejected.
pub fn decode(bytes: &[u8]) -> Result<Value, Error> {
    let mut reader = bytes;
    let value: Value = ciborium::de::from_reader(&mut reader)?;
    if !reader.is_empty() {
        return Err(Error::decode(
            DecodeStage::Cbor,
            format!("{} trailing bytes after data item", reader.len()),
        ));
    }
    Ok(value)
}

pub fn encode(value: &Value) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out).map_err(|e| Error::decode(DecodeStage::Cbor, e))?;
    Ok(out)
}

/// Remove any number of nested tags, returning the tag numbers outermost first.
pub fn untag(mut value: Value) -> (Vec<u64>, Value) {
    let mut tags = Vec::new();
    while let Value::Tag(tag, inner) = value {
        tags.push(tag);
        value = *inner;
    }
    (tags, value)
}

/// Look up an entry of a CBOR map by integer label.
pub fn map_get_int(entries: &[(Value, Value)], label: i64) -> Option<&Value> {
    entries.iter().find_map(|(k, v)| match k {
        Value::Integer(i) if i128::from(*i) == label as i128 => Some(v),
        _ => None,
    })
}

/// Look up an entry of a CBOR map by text label.
pub fn map_get_text<'a>(entries: &'a [(Value, Value)], label: &str) -> Option<&'a Value> {
    entries.iter().find_map(|(k, v)| match k {
        Value::Text(t) if t == label => Some(v),
        _ => None,
    })
}

pub fn as_map(value: &Value) -> Result<&[(Value, Value)], Error> {
    match value {
        Value::Map(entries) => Ok(entries),
        other => Err(unexpected("map", other)),
    }
}

pub fn as_text(value: &Value) -> Result<&str, Error> {
    match value {
        Value::Text(t) => Ok(t),
        other => Err(unexpected("text string", other)),
    }
}

/// Read a numeric value as whole seconds. Floats are truncated, as some
/// issuers encode NumericDate values as CBOR floats.
pub fn as_seconds(value: &Value) -> Result<i64, Error> {
    match value {
        Value::Integer(i) => i64::try_from(*i)
            .map_err(|_| Error::decode(DecodeStage::Cbor, "integer out of range")),
        Value::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
        Value::Tag(1, inner) => as_seconds(inner),
        other => Err(unexpected("numeric date", other)),
    }
}

/// Deserialize a value subtree into a typed structure.
pub fn deserialize<T: DeserializeOwned>(value: &Value) -> Result<T, Error> {
    value
        .deserialized()
        .map_err(|e| Error::decode(DecodeStage::Cbor, e))
}

pub fn int(i: i64) -> Value {
    Value::Integer(Integer::from(i))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) => "integer",
        Value::Bytes(_) => "byte string",
        Value::Float(_) => "float",
        Value::Text(_) => "text string",
        Value::Bool(_) => "bool",
        Value::Null => "null",
        Value::Tag(_, _) => "tagged item",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        _ => "unknown item",
    }
}

fn unexpected(expected: &str, found: &Value) -> Error {
    Error::decode(
        DecodeStage::Cbor,
        format!("expected {}, found {}", expected, kind(found)),
    )
}
