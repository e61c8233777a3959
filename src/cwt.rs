//! CBOR Web Token claims (RFC 8392) with the EU health certificate claim.

use ciborium::value::Value;

use crate::cbor;
use crate::error::Error;
use crate::hcert::HealthCertificate;

pub const CLAIM_ISS: i64 = 1;
pub const CLAIM_SUB: i64 = 2;
pub const CLAIM_EXP: i64 = 4;
pub const CLAIM_NBF: i64 = 5;
pub const CLAIM_IAT: i64 = 6;
/// `hcert` private claim; the certificate itself sits under key 1 inside it.
pub const CLAIM_HCERT: i64 = -260;
const HCERT_EU_DGC_V1: i64 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct CwtClaims {
    pub issuer: Option<String>,
    pub subject: Option<String>,
    /// Seconds since the Unix epoch.
    pub expires_at: Option<i64>,
    pub not_before: Option<i64>,
    pub issued_at: Option<i64>,
    pub health_certificate: HealthCertificate,
}

pub fn decode(payload: &[u8]) -> Result<CwtClaims, Error> {
    let (_, value) = cbor::untag(cbor::decode(payload)?);
    let map = cbor::as_map(&value)?;

    let text = |label| -> Result<Option<String>, Error> {
        cbor::map_get_int(map, label)
            .map(|v| cbor::as_text(v).map(str::to_string))
            .transpose()
    };
    let seconds = |label| -> Result<Option<i64>, Error> {
        cbor::map_get_int(map, label).map(cbor::as_seconds).transpose()
    };

    let hcert = cbor::map_get_int(map, CLAIM_HCERT).ok_or(Error::MissingClaim("hcert"))?;
    let certificate = cbor::map_get_int(cbor::as_map(hcert)?, HCERT_EU_DGC_V1)
        .ok_or(Error::MissingClaim("hcert.1"))?;

    Ok(CwtClaims {
        issuer: text(CLAIM_ISS)?,
        subject: text(CLAIM_SUB)?,
        expires_at: seconds(CLAIM_EXP)?,
        not_before: seconds(CLAIM_NBF)?,
        issued_at: seconds(CLAIM_IAT)?,
        health_certificate: HealthCertificate::from_cbor(certificate)?,
    })
}

/// Build a CWT claims map around a certificate.
pub fn encode(
    issuer: &str,
    issued_at: i64,
    expires_at: Option<i64>,
    certificate: &Value,
) -> Result<Vec<u8>, Error> {
    let mut entries = vec![
        (cbor::int(CLAIM_ISS), Value::Text(issuer.to_string())),
        (cbor::int(CLAIM_IAT), cbor::int(issued_at)),
    ];
    if let Some(exp) = expires_at {
        entries.push((cbor::int(CLAIM_EXP), cbor::int(exp)));
    }
    entries.push((
        cbor::int(CLAIM_HCERT),
        Value::Map(vec![(cbor::int(HCERT_EU_DGC_V1), certificate.clone())]),
    ));
    cbor::encode(&Value::Map(entries))
}
