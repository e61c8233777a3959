//! Decoded, format-tagged credentials.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::credential::JsonCredential;
use crate::cwt::CwtClaims;
use crate::error::{DecodeStage, Error};
use crate::hcert::HealthCertificate;
use crate::jws::{DecodedJws, Header};
use crate::shc;
use crate::sniff;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialFormat {
    SmartHealthCard,
    EuDigitalCovidCertificate,
    VerifiableCredentialJson,
    Divoc,
    Unknown,
}

impl CredentialFormat {
    /// Classify input with the same prefix checks [`sniff`](crate::sniff::sniff)
    /// uses to pick a decoder, without decoding it. A DIVOC certificate given
    /// as raw JSON is reported as `VerifiableCredentialJson` here.
    pub fn detect(input: &[u8]) -> Self {
        if let Ok(text) = std::str::from_utf8(input) {
            let text = text.trim();
            if shc::has_prefix(text) || sniff::is_compact_jws(text) {
                return CredentialFormat::SmartHealthCard;
            }
            if text.starts_with(sniff::HC1_PREFIX) {
                return CredentialFormat::EuDigitalCovidCertificate;
            }
            if sniff::is_json_object(text) {
                return CredentialFormat::VerifiableCredentialJson;
            }
        }
        if input.starts_with(crate::divoc::ZIP_MAGIC) {
            return CredentialFormat::Divoc;
        }
        CredentialFormat::Unknown
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// ECDSA over P-256 with SHA-256.
    Es256,
    /// RSASSA-PSS with SHA-256.
    Ps256,
    Unsupported(String),
}

impl SignatureAlgorithm {
    pub fn from_jose(alg: &str) -> Self {
        match alg {
            "ES256" => SignatureAlgorithm::Es256,
            "PS256" => SignatureAlgorithm::Ps256,
            other => SignatureAlgorithm::Unsupported(other.to_string()),
        }
    }
}

/// Everything needed to check a signature, independent of the format.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureMaterial {
    pub algorithm: SignatureAlgorithm,
    /// Candidate byte strings the issuer may have signed; a match against any
    /// one of them is enough.
    pub signed_bytes: Vec<Vec<u8>>,
    pub signature: Vec<u8>,
    pub key_hint: Option<String>,
}

/// Claim subset shared by every format.
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub issuer: Option<String>,
    pub subject: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    /// `None` means the credential does not expire.
    pub expires_at: Option<DateTime<Utc>>,
    /// Identifier checked against revocation registries.
    pub credential_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInput {
    Text(String),
    Bytes(Vec<u8>),
}

impl RawInput {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            RawInput::Text(text) => text.as_bytes(),
            RawInput::Bytes(bytes) => bytes,
        }
    }
}

/// SMART Health Card JWS payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ShcClaims {
    pub header: Header,
    /// Compact JWS as received (after digit decoding).
    pub jws: String,
    pub issuer: String,
    pub not_before: Option<i64>,
    pub expires_at: Option<i64>,
    pub types: Vec<String>,
    pub fhir_bundle: Value,
    pub revocation_id: Option<String>,
    pub payload: Value,
}

impl ShcClaims {
    pub fn from_jws(jws: &str, decoded: &DecodedJws) -> Result<Self, Error> {
        let payload: Value = serde_json::from_slice(&decoded.payload)?;
        let issuer = payload
            .get("iss")
            .and_then(Value::as_str)
            .ok_or(Error::MissingClaim("iss"))?
            .to_string();
        let vc = payload.get("vc").ok_or(Error::MissingClaim("vc"))?;
        let subject = vc
            .get("credentialSubject")
            .ok_or(Error::MissingCredentialSubject)?;
        let fhir_bundle = subject
            .get("fhirBundle")
            .cloned()
            .ok_or(Error::MissingClaim("vc.credentialSubject.fhirBundle"))?;
        let types = string_or_list(vc.get("type")).ok_or(Error::MissingType)?;
        Ok(ShcClaims {
            header: decoded.header.clone(),
            jws: jws.to_string(),
            issuer,
            not_before: numeric_date(payload.get("nbf"))?,
            expires_at: numeric_date(payload.get("exp"))?,
            types,
            fhir_bundle,
            revocation_id: vc.get("rid").and_then(Value::as_str).map(str::to_string),
            payload,
        })
    }

    /// Display name of the first FHIR `Patient` resource in the bundle.
    pub fn patient_name(&self) -> Option<String> {
        let entries = self.fhir_bundle.get("entry")?.as_array()?;
        let patient = entries
            .iter()
            .filter_map(|entry| entry.get("resource"))
            .find(|r| r.get("resourceType").and_then(Value::as_str) == Some("Patient"))?;
        let name = patient.get("name")?.get(0)?;
        let mut parts: Vec<&str> = name
            .get("given")
            .and_then(Value::as_array)
            .map(|given| given.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if let Some(family) = name.get("family").and_then(Value::as_str) {
            parts.push(family);
        }
        if parts.is_empty() {
            return None;
        }
        Some(parts.join(" "))
    }
}

/// EU Digital COVID Certificate CWT.
#[derive(Debug, Clone, PartialEq)]
pub struct DccClaims {
    pub cwt: CwtClaims,
    pub key_id: Option<Vec<u8>>,
}

impl DccClaims {
    pub fn certificate(&self) -> &HealthCertificate {
        &self.cwt.health_certificate
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Credential {
    SmartHealthCard(ShcClaims),
    EuDigitalCovidCertificate(DccClaims),
    VerifiableCredentialJson(JsonCredential),
    Divoc(JsonCredential),
}

impl Credential {
    pub fn format(&self) -> CredentialFormat {
        match self {
            Credential::SmartHealthCard(_) => CredentialFormat::SmartHealthCard,
            Credential::EuDigitalCovidCertificate(_) => CredentialFormat::EuDigitalCovidCertificate,
            Credential::VerifiableCredentialJson(_) => CredentialFormat::VerifiableCredentialJson,
            Credential::Divoc(_) => CredentialFormat::Divoc,
        }
    }

    pub fn claims(&self) -> Claims {
        match self {
            Credential::SmartHealthCard(shc) => Claims {
                issuer: Some(shc.issuer.clone()),
                subject: shc.patient_name(),
                issued_at: shc.not_before.and_then(timestamp),
                expires_at: shc.expires_at.and_then(timestamp),
                credential_id: shc.revocation_id.clone(),
            },
            Credential::EuDigitalCovidCertificate(dcc) => {
                let name = &dcc.certificate().name;
                let subject = [&name.given_name, &name.family_name]
                    .iter()
                    .filter_map(|part| part.as_deref())
                    .collect::<Vec<_>>()
                    .join(" ");
                Claims {
                    issuer: dcc.cwt.issuer.clone(),
                    subject: Some(subject).filter(|s| !s.is_empty()),
                    issued_at: dcc.cwt.issued_at.and_then(timestamp),
                    expires_at: dcc.cwt.expires_at.and_then(timestamp),
                    credential_id: dcc.certificate().certificate_id().map(str::to_string),
                }
            }
            Credential::VerifiableCredentialJson(vc) | Credential::Divoc(vc) => vc.claims(),
        }
    }
}

/// Result of sniffing: the decoded credential, what was signed, and the input
/// it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialEnvelope {
    credential: Credential,
    signature: SignatureMaterial,
    raw: RawInput,
}

impl CredentialEnvelope {
    pub(crate) fn new(credential: Credential, signature: SignatureMaterial, raw: RawInput) -> Self {
        Self {
            credential,
            signature,
            raw,
        }
    }

    pub fn format(&self) -> CredentialFormat {
        self.credential.format()
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn claims(&self) -> Claims {
        self.credential.claims()
    }

    pub fn signature(&self) -> &SignatureMaterial {
        &self.signature
    }

    pub fn raw(&self) -> &RawInput {
        &self.raw
    }

    /// The `shc:/` numeric form of a SMART Health Card, however it was
    /// imported.
    pub fn shc_uri(&self) -> Option<String> {
        match &self.credential {
            Credential::SmartHealthCard(shc) => shc::encode_uri(&shc.jws).ok(),
            _ => None,
        }
    }
}

pub(crate) fn timestamp(seconds: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0).single()
}

/// JWT NumericDate; fractional seconds are truncated.
fn numeric_date(value: Option<&Value>) -> Result<Option<i64>, Error> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .map(Some)
            .ok_or_else(|| Error::decode(DecodeStage::Json, "invalid NumericDate")),
        Some(other) => Err(Error::decode(
            DecodeStage::Json,
            format!("invalid NumericDate {}", other),
        )),
    }
}

pub(crate) fn string_or_list(value: Option<&Value>) -> Option<Vec<String>> {
    match value? {
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}
