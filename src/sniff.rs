//! Format detection and dispatch.
//!
//! Recognizers are tried in a fixed order and claim input by prefix. Once a
//! recognizer has claimed the input, any decode failure is returned as is;
//! no other format is tried and no partial envelope is produced.

use crate::base45;
use crate::base64url;
use crate::cose;
use crate::credential::{self, JsonCredential, JsonCredentialKind};
use crate::cwt;
use crate::envelope::{
    Credential, CredentialEnvelope, DccClaims, RawInput, ShcClaims, SignatureAlgorithm,
    SignatureMaterial,
};
use crate::error::Error;
use crate::inflate::{self, Wrapper};
use crate::jws;
use crate::shc;

pub const HC1_PREFIX: &str = "HC1:";

/// Decode a credential of unknown format.
pub fn sniff(input: &[u8]) -> Result<CredentialEnvelope, Error> {
    let raw = match std::str::from_utf8(input) {
        Ok(text) => RawInput::Text(text.to_string()),
        Err(_) => RawInput::Bytes(input.to_vec()),
    };
    if let RawInput::Text(text) = &raw {
        let text = text.trim();
        if shc::has_prefix(text) {
            log::debug!("recognized SMART Health Card URI");
            let chunks: Vec<&str> = text.split_whitespace().collect();
            let jws = shc::decode_uri(&shc::assemble_chunks(&chunks)?)?;
            return decode_shc(&jws, raw);
        }
        if is_compact_jws(text) {
            log::debug!("recognized bare JWS, decoding as SMART Health Card");
            let jws = text.to_string();
            return decode_shc(&jws, raw);
        }
        if let Some(rest) = text.strip_prefix(HC1_PREFIX) {
            log::debug!("recognized EU DCC");
            let rest = rest.to_string();
            return decode_dcc(&rest, raw);
        }
        if is_json_object(text) {
            log::debug!("recognized JSON credential");
            let credential = credential::parse(text.as_bytes())?;
            let wrap = match credential.kind {
                JsonCredentialKind::DivocOrigin => Credential::Divoc,
                _ => Credential::VerifiableCredentialJson,
            };
            return json_envelope(credential, raw, wrap);
        }
    }
    if input.starts_with(crate::divoc::ZIP_MAGIC) {
        #[cfg(feature = "divoc")]
        {
            log::debug!("recognized ZIP, decoding as DIVOC certificate");
            let certificate = crate::divoc::extract_certificate(input)?;
            let credential = credential::parse(&certificate)?;
            return json_envelope(credential, raw, Credential::Divoc);
        }
        #[cfg(not(feature = "divoc"))]
        log::debug!("ZIP input ignored, DIVOC support not enabled");
    }
    Err(Error::FormatUnrecognized)
}

pub fn sniff_str(input: &str) -> Result<CredentialEnvelope, Error> {
    sniff(input.as_bytes())
}

pub(crate) fn is_compact_jws(text: &str) -> bool {
    text.starts_with("eyJ") && text.matches('.').count() == 2
}

/// Raw JSON text, or base64 of it.
pub(crate) fn is_json_object(text: &str) -> bool {
    if text.starts_with('{') {
        return true;
    }
    // Only the first block is needed to see the opening brace.
    let head: String = text.chars().filter(|c| !c.is_whitespace()).take(8).collect();
    match base64url::decode(&head) {
        Ok(bytes) => bytes
            .iter()
            .find(|c| !c.is_ascii_whitespace())
            .map_or(false, |&c| c == b'{'),
        Err(_) => false,
    }
}

fn decode_shc(jws: &str, raw: RawInput) -> Result<CredentialEnvelope, Error> {
    let decoded = jws::parse(jws)?;
    let claims = ShcClaims::from_jws(jws, &decoded)?;
    let signature = SignatureMaterial {
        algorithm: SignatureAlgorithm::from_jose(&decoded.header.algorithm),
        signed_bytes: vec![decoded.signing_input],
        signature: decoded.signature,
        key_hint: decoded.header.key_id,
    };
    Ok(CredentialEnvelope::new(
        Credential::SmartHealthCard(claims),
        signature,
        raw,
    ))
}

fn decode_dcc(text: &str, raw: RawInput) -> Result<CredentialEnvelope, Error> {
    let compressed = base45::decode(text)?;
    let cose_bytes = if inflate::has_zlib_header(&compressed) {
        inflate::inflate(&compressed, Wrapper::Zlib)?
    } else {
        log::debug!("EU DCC payload is not zlib-compressed");
        compressed
    };
    let message = cose::parse(&cose_bytes)?;
    let cwt = cwt::decode(message.payload())?;
    let signature = SignatureMaterial {
        algorithm: message.algorithm().clone(),
        signed_bytes: vec![message.to_be_signed()],
        signature: message.signature().to_vec(),
        key_hint: message.key_id().map(base64::encode),
    };
    let claims = DccClaims {
        cwt,
        key_id: message.key_id().map(<[u8]>::to_vec),
    };
    Ok(CredentialEnvelope::new(
        Credential::EuDigitalCovidCertificate(claims),
        signature,
        raw,
    ))
}

fn json_envelope(
    credential: JsonCredential,
    raw: RawInput,
    wrap: fn(JsonCredential) -> Credential,
) -> Result<CredentialEnvelope, Error> {
    credential.check_sane()?;
    let signature = credential.signature_material()?;
    Ok(CredentialEnvelope::new(wrap(credential), signature, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::CredentialFormat;
    use crate::error::DecodeStage;

    #[test]
    fn unrecognized() {
        for input in [&b"hello"[..], b"", b"\xff\xfe\x00", b"HC2:ABC"] {
            assert!(matches!(sniff(input), Err(Error::FormatUnrecognized)));
        }
    }

    #[test]
    fn claimed_input_fails_closed() {
        assert_eq!(
            sniff_str("shc:/567").unwrap_err().stage(),
            Some(DecodeStage::Shc)
        );
        assert_eq!(
            sniff_str("shc:/1/18446744073709551615/5676").unwrap_err().stage(),
            Some(DecodeStage::Shc)
        );
        assert_eq!(
            sniff_str("HC1:A").unwrap_err().stage(),
            Some(DecodeStage::Base45)
        );
        let base45_garbage = format!("HC1:{}", base45::encode(b"\xd2\x84garbage"));
        assert!(sniff_str(&base45_garbage).is_err());
        assert!(matches!(
            sniff_str(r#"{"type":["VerifiableCredential"],"credentialSubject":{}}"#),
            Err(Error::MissingProof)
        ));
        assert!(sniff_str("eyJhbGciOiJFUzI1NiJ9.e30.").is_err());
    }

    #[test]
    fn json_and_base64_json() {
        let text = r#"{"type":["VerifiableCredential"],"proof":{"type":"EcdsaSecp256r1Signature2019"},"credentialSubject":{"id":"x"}}"#;
        let envelope = sniff_str(text).unwrap();
        assert_eq!(envelope.format(), CredentialFormat::VerifiableCredentialJson);
        assert_eq!(envelope.signature().algorithm, SignatureAlgorithm::Es256);
        assert_eq!(envelope.raw(), &RawInput::Text(text.to_string()));

        let encoded = base64::encode(text);
        let envelope = sniff_str(&encoded).unwrap();
        assert_eq!(envelope.claims().subject.as_deref(), Some("x"));
        assert!(envelope.shc_uri().is_none());

        let divoc = r#"{"type":["VerifiableCredential","ProofOfVaccinationCredential"],"proof":{},"credentialSubject":{}}"#;
        assert_eq!(sniff_str(divoc).unwrap().format(), CredentialFormat::Divoc);
    }

    #[cfg(feature = "divoc")]
    #[test]
    fn divoc_zip() {
        let zip = crate::divoc::zip_archive(&[(
            crate::divoc::CERTIFICATE_ENTRY,
            &br#"{"type":["VerifiableCredential","ProofOfVaccinationCredential"],
                  "credentialSubject":{"name":"A"},
                  "proof":{"type":"RsaSignature2018","verificationMethod":"did:india","jws":"x"}}"#[..],
        )]);
        let envelope = sniff(&zip).unwrap();
        assert_eq!(envelope.format(), CredentialFormat::Divoc);
        assert!(matches!(envelope.raw(), RawInput::Bytes(_)));
        assert_eq!(
            envelope.signature().algorithm,
            SignatureAlgorithm::Unsupported("RsaSignature2018".into())
        );
        assert_eq!(envelope.signature().key_hint.as_deref(), Some("did:india"));
    }
}
