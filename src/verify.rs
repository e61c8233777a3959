//! Signature verification against caller-supplied candidate keys.
//!
//! Every format reduces to a [`SignatureMaterial`]: an algorithm, one or more
//! byte strings the issuer may have signed, and a signature. A credential is
//! authentic when any candidate key validates any of those byte strings.

use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::der;
use crate::envelope::{CredentialEnvelope, SignatureAlgorithm, SignatureMaterial};
use crate::error::Error;
use crate::hash::sha256;
use crate::key::{rsa_public_key_from_der, Params, TrustAnchorKey};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum FailureReason {
    SignatureMismatch,
    Expired,
    Revoked,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoCandidateKeys,
    UnsupportedAlgorithm(String),
    /// The credential carries nothing to check against.
    NoData,
    /// The registry does not know this credential.
    StatusUnknown,
    Unavailable(String),
    Timeout,
    Disabled,
}

/// Result of one check. `Failed` means the credential is invalid; `Skipped`
/// means the check could not be performed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "status", content = "reason")]
pub enum CheckStatus {
    Passed,
    Failed(FailureReason),
    Skipped(SkipReason),
}

impl CheckStatus {
    pub fn is_passed(&self) -> bool {
        *self == CheckStatus::Passed
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CheckStatus::Failed(_))
    }
}

/// Verify the signature of a decoded credential.
pub fn verify(envelope: &CredentialEnvelope, keys: &[TrustAnchorKey]) -> CheckStatus {
    verify_signature(envelope.signature(), keys)
}

pub fn verify_signature(material: &SignatureMaterial, keys: &[TrustAnchorKey]) -> CheckStatus {
    if keys.is_empty() {
        log::debug!("no candidate keys; signature check skipped");
        return CheckStatus::Skipped(SkipReason::NoCandidateKeys);
    }
    if let SignatureAlgorithm::Unsupported(alg) = &material.algorithm {
        log::debug!("unsupported signature algorithm {}", alg);
        return CheckStatus::Skipped(SkipReason::UnsupportedAlgorithm(alg.clone()));
    }
    for key in order_candidates(keys, material.key_hint.as_deref()) {
        for data in &material.signed_bytes {
            match verify_bytes(&material.algorithm, data, key, &material.signature) {
                Ok(()) => {
                    log::debug!("signature valid for key {:?}", key.key_id);
                    return CheckStatus::Passed;
                }
                Err(err) => log::debug!("key {:?} rejected: {}", key.key_id, err),
            }
        }
    }
    CheckStatus::Failed(FailureReason::SignatureMismatch)
}

/// Keys matching the hint first, then all others, each group in input order.
pub fn order_candidates<'a>(
    keys: &'a [TrustAnchorKey],
    hint: Option<&str>,
) -> Vec<&'a TrustAnchorKey> {
    let hint = match hint {
        Some(hint) => hint,
        None => return keys.iter().collect(),
    };
    let (mut matching, rest): (Vec<_>, Vec<_>) =
        keys.iter().partition(|key| key.matches_hint(hint));
    matching.extend(rest);
    matching
}

pub fn verify_bytes(
    algorithm: &SignatureAlgorithm,
    data: &[u8],
    key: &TrustAnchorKey,
    signature: &[u8],
) -> Result<(), Error> {
    match (algorithm, &key.params) {
        (SignatureAlgorithm::Es256, Params::EC(ec)) => {
            let public_key = p256::PublicKey::try_from(ec)?;
            verify_es256(&public_key, data, ecdsa_signature(signature)?)
        }
        (SignatureAlgorithm::Es256, Params::PublicKeyInfo(spki)) => {
            let public_key = p256::PublicKey::try_from(spki)?;
            let sig = if signature.len() == 64 {
                let der = der::ecdsa_raw_to_der(signature)?;
                p256::ecdsa::Signature::from_der(&der)
            } else {
                p256::ecdsa::Signature::from_der(signature)
            }
            .map_err(|_| Error::SignatureMismatch)?;
            verify_es256(&public_key, data, sig)
        }
        (SignatureAlgorithm::Ps256, Params::RSA(rsa_params)) => {
            let public_key = rsa::RsaPublicKey::try_from(rsa_params)?;
            verify_ps256(&public_key, data, signature)
        }
        (SignatureAlgorithm::Ps256, Params::PublicKeyInfo(spki)) => {
            let public_key = rsa_public_key_from_der(&spki.der.0)?;
            verify_ps256(&public_key, data, signature)
        }
        (SignatureAlgorithm::Unsupported(alg), _) => Err(Error::UnsupportedAlgorithm(alg.clone())),
        _ => Err(Error::InvalidKey(
            "key type does not match signature algorithm".to_string(),
        )),
    }
}

/// ECDSA signatures are `r || s` when 64 bytes long, DER otherwise.
fn ecdsa_signature(signature: &[u8]) -> Result<p256::ecdsa::Signature, Error> {
    let sig = if signature.len() == 64 {
        p256::ecdsa::Signature::from_slice(signature)
    } else {
        p256::ecdsa::Signature::from_der(signature)
    };
    sig.map_err(|_| Error::SignatureMismatch)
}

fn verify_es256(
    public_key: &p256::PublicKey,
    data: &[u8],
    sig: p256::ecdsa::Signature,
) -> Result<(), Error> {
    use p256::ecdsa::signature::Verifier;
    let verifying_key = p256::ecdsa::VerifyingKey::from(public_key);
    verifying_key
        .verify(data, &sig)
        .map_err(|_| Error::SignatureMismatch)
}

fn verify_ps256(
    public_key: &rsa::RsaPublicKey,
    data: &[u8],
    signature: &[u8],
) -> Result<(), Error> {
    let hashed = sha256(data);
    public_key
        .verify(rsa::Pss::new::<sha2::Sha256>(), &hashed, signature)
        .map_err(|_| Error::SignatureMismatch)
}
