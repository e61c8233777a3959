//! COSE_Sign1 messages (RFC 9052) as carried by EU Digital COVID Certificates.

use ciborium::value::Value;
use coset::{iana, AsCborValue, CoseSign1, RegisteredLabelWithPrivate};

use crate::cbor;
use crate::envelope::SignatureAlgorithm;
use crate::error::Error;

pub const TAG_COSE_SIGN1: u64 = 18;
pub const TAG_COSE_SIGN: u64 = 98;
pub const TAG_CWT: u64 = 61;

/// A decoded single-signer COSE message.
#[derive(Debug, Clone)]
pub struct CoseSign1Message {
    tags: Vec<u64>,
    algorithm: SignatureAlgorithm,
    key_id: Option<Vec<u8>>,
    inner: CoseSign1,
}

/// Decode a COSE_Sign1 message. The item may be tagged 18, untagged, or
/// wrapped in a CWT tag (61).
pub fn parse(bytes: &[u8]) -> Result<CoseSign1Message, Error> {
    let (tags, value) = cbor::untag(cbor::decode(bytes)?);
    match tags[..] {
        [] | [TAG_COSE_SIGN1] | [TAG_CWT] | [TAG_CWT, TAG_COSE_SIGN1] => {}
        _ if tags.contains(&TAG_COSE_SIGN) => {
            return Err(Error::UnsupportedMessageType(
                "COSE_Sign (multiple signers)".to_string(),
            ))
        }
        _ => {
            return Err(Error::UnsupportedMessageType(format!(
                "CBOR tags {:?}",
                tags
            )))
        }
    }
    // COSE_Sign carries an array of signatures where COSE_Sign1 has a bstr.
    if let Value::Array(items) = &value {
        if let [_, _, _, Value::Array(_)] = &items[..] {
            return Err(Error::UnsupportedMessageType(
                "COSE_Sign (multiple signers)".to_string(),
            ));
        }
    }
    let inner = CoseSign1::from_cbor_value(value)?;
    let algorithm = match &inner.protected.header.alg {
        Some(RegisteredLabelWithPrivate::Assigned(iana::Algorithm::ES256)) => {
            SignatureAlgorithm::Es256
        }
        Some(RegisteredLabelWithPrivate::Assigned(iana::Algorithm::PS256)) => {
            SignatureAlgorithm::Ps256
        }
        Some(other) => SignatureAlgorithm::Unsupported(format!("{:?}", other)),
        None => SignatureAlgorithm::Unsupported("none".to_string()),
    };
    let key_id = [&inner.protected.header.key_id, &inner.unprotected.key_id]
        .into_iter()
        .find(|kid| !kid.is_empty())
        .cloned();
    log::debug!(
        "COSE_Sign1 tags={:?} alg={:?} kid_present={}",
        tags,
        algorithm,
        key_id.is_some()
    );
    Ok(CoseSign1Message {
        tags,
        algorithm,
        key_id,
        inner,
    })
}

impl CoseSign1Message {
    pub fn tags(&self) -> &[u64] {
        &self.tags
    }

    pub fn algorithm(&self) -> &SignatureAlgorithm {
        &self.algorithm
    }

    /// Key identifier from the protected header, else the unprotected one.
    pub fn key_id(&self) -> Option<&[u8]> {
        self.key_id.as_deref()
    }

    pub fn payload(&self) -> &[u8] {
        self.inner.payload.as_deref().unwrap_or_default()
    }

    pub fn signature(&self) -> &[u8] {
        &self.inner.signature
    }

    /// The encoded `Sig_structure`
    /// `["Signature1", protected, h'', payload]` covered by the signature.
    pub fn to_be_signed(&self) -> Vec<u8> {
        self.inner.tbs_data(&[])
    }
}
