use std::convert::TryFrom;

use p256::pkcs8::DecodePublicKey;
use serde::{Deserialize, Serialize};

use crate::error::Error;

// RFC 7517 - JSON Web Key (JWK), public keys only.
// RFC 5280 - SubjectPublicKeyInfo, for keys taken from DSC certificates.

/// Public key an issuer may have signed with. Keys are supplied by the
/// caller; nothing here stores or fetches them.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrustAnchorKey {
    #[serde(rename = "kid")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(rename = "iss")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(flatten)]
    pub params: Params,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kty")]
pub enum Params {
    EC(ECParams),
    RSA(RSAParams),
    #[serde(rename = "SPKI")]
    PublicKeyInfo(PublicKeyInfo),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ECParams {
    #[serde(rename = "crv")]
    pub curve: Option<String>,
    #[serde(rename = "x")]
    pub x_coordinate: Base64urlUInt,
    #[serde(rename = "y")]
    pub y_coordinate: Base64urlUInt,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RSAParams {
    #[serde(rename = "n")]
    pub modulus: Base64urlUInt,
    #[serde(rename = "e")]
    pub exponent: Base64urlUInt,
}

/// DER-encoded SubjectPublicKeyInfo.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PublicKeyInfo {
    #[serde(rename = "spki")]
    pub der: Base64urlUInt,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct Base64urlUInt(pub Vec<u8>);

impl TryFrom<String> for Base64urlUInt {
    type Error = Error;
    fn try_from(data: String) -> Result<Self, Self::Error> {
        Ok(Base64urlUInt(crate::base64url::decode(data)?))
    }
}

impl From<Base64urlUInt> for String {
    fn from(data: Base64urlUInt) -> String {
        crate::base64url::encode(&data.0)
    }
}

impl TrustAnchorKey {
    pub fn from_p256_coordinates(key_id: Option<String>, x: &[u8], y: &[u8]) -> Self {
        TrustAnchorKey {
            key_id,
            issuer: None,
            params: Params::EC(ECParams {
                curve: Some("P-256".to_string()),
                x_coordinate: Base64urlUInt(x.to_vec()),
                y_coordinate: Base64urlUInt(y.to_vec()),
            }),
        }
    }

    pub fn from_rsa_components(key_id: Option<String>, n: &[u8], e: &[u8]) -> Self {
        TrustAnchorKey {
            key_id,
            issuer: None,
            params: Params::RSA(RSAParams {
                modulus: Base64urlUInt(n.to_vec()),
                exponent: Base64urlUInt(e.to_vec()),
            }),
        }
    }

    pub fn from_public_key_der(key_id: Option<String>, der: &[u8]) -> Self {
        TrustAnchorKey {
            key_id,
            issuer: None,
            params: Params::PublicKeyInfo(PublicKeyInfo {
                der: Base64urlUInt(der.to_vec()),
            }),
        }
    }

    pub fn with_issuer(self, issuer: impl Into<String>) -> Self {
        TrustAnchorKey {
            issuer: Some(issuer.into()),
            ..self
        }
    }

    /// Whether a key hint from a credential names this key.
    ///
    /// Hints are compared by exact key id, and for DID-style hints
    /// (`did:...#fragment`) also by fragment.
    pub fn matches_hint(&self, hint: &str) -> bool {
        let key_id = match &self.key_id {
            Some(kid) => kid,
            None => return false,
        };
        if key_id == hint {
            return true;
        }
        match (hint.rsplit_once('#'), key_id.rsplit_once('#')) {
            (Some((_, fragment)), None) => fragment == key_id,
            (None, Some((_, fragment))) => fragment == hint,
            _ => false,
        }
    }

    pub fn is_rsa(&self) -> bool {
        match &self.params {
            Params::RSA(_) => true,
            Params::PublicKeyInfo(spki) => rsa_public_key_from_der(&spki.der.0).is_ok(),
            Params::EC(_) => false,
        }
    }
}

impl TryFrom<&ECParams> for p256::PublicKey {
    type Error = Error;
    fn try_from(params: &ECParams) -> Result<Self, Self::Error> {
        if let Some(curve) = &params.curve {
            if curve != "P-256" {
                return Err(Error::InvalidKey(format!("curve {} not supported", curve)));
            }
        }
        let (x, y) = (&params.x_coordinate.0, &params.y_coordinate.0);
        if x.len() != 32 || y.len() != 32 {
            return Err(Error::InvalidKey("P-256 coordinates must be 32 bytes".into()));
        }
        let sec1 = [&[0x04u8][..], &x[..], &y[..]].concat();
        p256::PublicKey::from_sec1_bytes(&sec1).map_err(|e| Error::InvalidKey(e.to_string()))
    }
}

impl TryFrom<&PublicKeyInfo> for p256::PublicKey {
    type Error = Error;
    fn try_from(spki: &PublicKeyInfo) -> Result<Self, Self::Error> {
        p256::PublicKey::from_public_key_der(&spki.der.0)
            .map_err(|e| Error::InvalidKey(e.to_string()))
    }
}

impl TryFrom<&RSAParams> for rsa::RsaPublicKey {
    type Error = Error;
    fn try_from(params: &RSAParams) -> Result<Self, Self::Error> {
        rsa::RsaPublicKey::new(
            rsa::BigUint::from_bytes_be(&params.modulus.0),
            rsa::BigUint::from_bytes_be(&params.exponent.0),
        )
        .map_err(|e| Error::InvalidKey(e.to_string()))
    }
}

pub(crate) fn rsa_public_key_from_der(der: &[u8]) -> Result<rsa::RsaPublicKey, Error> {
    use rsa::pkcs8::DecodePublicKey;
    rsa::RsaPublicKey::from_public_key_der(der).map_err(|e| Error::InvalidKey(e.to_string()))
}
