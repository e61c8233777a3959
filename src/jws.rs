use crate::base64url;
use crate::error::{DecodeStage, Error};
use crate::inflate::{self, Wrapper};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// RFC 7515 - JSON Web Signature (JWS), compact serialization only.

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Header {
    #[serde(rename = "alg")]
    pub algorithm: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "kid")]
    pub key_id: Option<String>,

    /// Payload compression; SMART Health Cards use `"DEF"` (raw DEFLATE).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "typ")]
    pub type_: Option<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    #[serde(flatten)]
    pub additional_parameters: BTreeMap<String, serde_json::Value>,
}

impl Header {
    pub fn is_deflated(&self) -> bool {
        self.zip.as_deref() == Some("DEF")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedJws {
    pub header: Header,
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
    /// ASCII of `header_segment "." payload_segment`, exactly as received.
    pub signing_input: Vec<u8>,
}

pub fn split_jws(jws: &str) -> Result<(&str, &str, &str), Error> {
    let parts: Vec<&str> = jws.split('.').collect();
    match parts[..] {
        [header, payload, signature] => Ok((header, payload, signature)),
        _ => Err(Error::InvalidNumberOfSegments(parts.len())),
    }
}

/// Decode a compact JWS without verifying it.
pub fn parse(jws: &str) -> Result<DecodedJws, Error> {
    let jws = jws.trim();
    let (header_b64, payload_b64, signature_b64) = split_jws(jws)?;
    let header_json = base64url::decode(header_b64)?;
    let header: Header = serde_json::from_slice(&header_json)
        .map_err(|e| Error::decode(DecodeStage::Jws, format!("header: {}", e)))?;
    let mut payload = base64url::decode(payload_b64)?;
    if header.is_deflated() {
        payload = inflate::inflate(&payload, Wrapper::Raw)?;
    } else if let Some(other) = &header.zip {
        return Err(Error::decode(
            DecodeStage::Jws,
            format!("unsupported zip value {:?}", other),
        ));
    }
    let signature = base64url::decode(signature_b64)?;
    let signing_input = [header_b64.as_bytes(), b".", payload_b64.as_bytes()].concat();
    Ok(DecodedJws {
        header,
        payload,
        signature,
        signing_input,
    })
}

/// Serialize a header and payload into the signing input, compressing the
/// payload when the header asks for it.
#[cfg(test)]
pub(crate) fn signing_input(header: &Header, payload: &[u8]) -> String {
    let header_b64 = base64url::encode(serde_json::to_vec(header).unwrap());
    let payload = if header.is_deflated() {
        inflate::deflate(payload, Wrapper::Raw)
    } else {
        payload.to_vec()
    };
    header_b64 + "." + &base64url::encode(payload)
}
