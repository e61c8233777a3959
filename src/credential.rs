use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::base64url;
use crate::canonical;
use crate::envelope::{string_or_list, Claims, SignatureAlgorithm, SignatureMaterial};
use crate::error::{DecodeStage, Error};

// W3C-style JSON credentials with a detached proof block, as issued by
// IBM Digital Health Pass, Good Health Pass and DIVOC.
// https://www.w3.org/TR/vc-data-model/

/// Proof suite signed with ECDSA P-256 / SHA-256.
pub const ECDSA_SECP256R1_2019: &str = "EcdsaSecp256r1Signature2019";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum JsonCredentialKind {
    IdHealthPass,
    GoodHealthPass,
    VerifiableCredential,
    DivocOrigin,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DetachedProof {
    #[serde(rename = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jws: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsonCredential {
    pub id: Option<String>,
    pub types: Vec<String>,
    pub issuer: Option<String>,
    pub issuance_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub credential_subject: Option<Value>,
    pub proof: Option<DetachedProof>,
    pub kind: JsonCredentialKind,
    /// The complete object as received.
    pub document: Value,
}

/// Parse a JSON credential from raw JSON text, or from base64 of it.
pub fn parse(input: &[u8]) -> Result<JsonCredential, Error> {
    let document: Value = match serde_json::from_slice(input) {
        Ok(value) => value,
        Err(json_err) => {
            let text = std::str::from_utf8(input)
                .map_err(|_| Error::from(json_err))?
                .trim();
            let decoded = base64url::decode(text)?;
            serde_json::from_slice(&decoded)?
        }
    };
    JsonCredential::from_value(document)
}

impl JsonCredential {
    pub fn from_value(document: Value) -> Result<Self, Error> {
        if !document.is_object() {
            return Err(Error::decode(
                DecodeStage::Json,
                "credential is not a JSON object",
            ));
        }
        let types = string_or_list(document.get("type")).unwrap_or_default();
        let issuer = match document.get("issuer") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(o)) => o.get("id").and_then(Value::as_str).map(str::to_string),
            _ => None,
        };
        let proof = match document.get("proof") {
            None | Some(Value::Null) => None,
            Some(proof) => Some(serde_json::from_value(proof.clone())?),
        };
        let kind = classify(&types, issuer.as_deref());
        Ok(JsonCredential {
            id: document.get("id").and_then(Value::as_str).map(str::to_string),
            issuance_date: date_time(&document, "issuanceDate")?,
            expiration_date: date_time(&document, "expirationDate")?,
            credential_subject: document
                .get("credentialSubject")
                .filter(|s| !s.is_null())
                .cloned(),
            types,
            issuer,
            proof,
            kind,
            document,
        })
    }

    /// Reject credentials that parsed but cannot be verified or displayed.
    pub fn check_sane(&self) -> Result<(), Error> {
        if self.proof.is_none() {
            return Err(Error::MissingProof);
        }
        if self.credential_subject.is_none() {
            return Err(Error::MissingCredentialSubject);
        }
        if self.types.is_empty() {
            return Err(Error::MissingType);
        }
        Ok(())
    }

    pub fn claims(&self) -> Claims {
        let subject = self.credential_subject.as_ref().and_then(|s| {
            ["id", "name"]
                .iter()
                .find_map(|k| s.get(k).and_then(Value::as_str))
                .map(str::to_string)
        });
        Claims {
            issuer: self.issuer.clone(),
            subject,
            issued_at: self.issuance_date,
            expires_at: self.expiration_date,
            credential_id: self.id.clone(),
        }
    }

    pub fn signature_material(&self) -> Result<SignatureMaterial, Error> {
        let proof = self.proof.as_ref().ok_or(Error::MissingProof)?;
        let algorithm = match proof.type_.as_deref() {
            Some(ECDSA_SECP256R1_2019) => SignatureAlgorithm::Es256,
            Some(other) => SignatureAlgorithm::Unsupported(other.to_string()),
            None => SignatureAlgorithm::Unsupported("none".to_string()),
        };
        let signature = match &proof.signature_value {
            Some(value) => base64url::decode(value)?,
            None => Vec::new(),
        };
        Ok(SignatureMaterial {
            algorithm,
            signed_bytes: canonical::candidates(&self.document)?,
            signature,
            key_hint: proof
                .creator
                .clone()
                .or_else(|| proof.verification_method.clone()),
        })
    }
}

fn classify(types: &[String], issuer: Option<&str>) -> JsonCredentialKind {
    let has = |needle: &str| types.iter().any(|t| t.contains(needle));
    if has("IBMDigitalHealthPass") || issuer.map_or(false, |i| i.starts_with("did:hpass:")) {
        JsonCredentialKind::IdHealthPass
    } else if has("GoodHealthPass") {
        JsonCredentialKind::GoodHealthPass
    } else if has("ProofOfVaccinationCredential") {
        JsonCredentialKind::DivocOrigin
    } else {
        JsonCredentialKind::VerifiableCredential
    }
}

fn date_time(document: &Value, field: &str) -> Result<Option<DateTime<Utc>>, Error> {
    match document.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| Error::decode(DecodeStage::Json, format!("{}: {}", field, e))),
        Some(_) => Err(Error::decode(
            DecodeStage::Json,
            format!("{} is not a string", field),
        )),
    }
}
