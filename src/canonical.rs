//! Canonical serializations of a JSON credential's unsigned payload.
//!
//! Issuers have been seen signing either of two byte forms of the same
//! object, so both are produced and tried during verification.

use serde_json::{Map, Value};

use crate::error::{DecodeStage, Error};

const OBFUSCATION: &str = "obfuscation";

/// Remove `proof.signatureValue` and every `obfuscation` member.
pub fn unsigned_payload(credential: &Value) -> Value {
    let mut value = strip_obfuscation(credential);
    if let Some(proof) = value.get_mut("proof").and_then(Value::as_object_mut) {
        proof.remove("signatureValue");
    }
    value
}

fn strip_obfuscation(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| k.as_str() != OBFUSCATION)
                .map(|(k, v)| (k.clone(), strip_obfuscation(v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_obfuscation).collect()),
        other => other.clone(),
    }
}

/// JSON Canonicalization Scheme (RFC 8785): sorted keys, minimal escaping.
pub fn jcs(value: &Value) -> Result<Vec<u8>, Error> {
    serde_jcs::to_vec(value).map_err(|e| Error::decode(DecodeStage::Json, e))
}

/// Sorted-key serialization with strings emitted verbatim, without any
/// escaping.
pub fn sorted_verbatim(value: &Value) -> Vec<u8> {
    let mut out = String::new();
    write_verbatim(value, &mut out);
    out.into_bytes()
}

fn write_verbatim(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_verbatim(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push('"');
                out.push_str(key);
                out.push_str("\":");
                write_verbatim(&map[key], out);
            }
            out.push('}');
        }
    }
}

/// Both candidate forms, JCS first.
pub fn candidates(credential: &Value) -> Result<Vec<Vec<u8>>, Error> {
    let unsigned = unsigned_payload(credential);
    let mut forms = vec![jcs(&unsigned)?];
    let verbatim = sorted_verbatim(&unsigned);
    if verbatim != forms[0] {
        forms.push(verbatim);
    }
    Ok(forms)
}
