use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use coset::{
    iana, CborSerializable, CoseSign1, CoseSign1Builder, CoseSignBuilder, CoseSignatureBuilder,
    HeaderBuilder, TaggedCborSerializable,
};
use p256::ecdsa::{signature::Signer, Signature, SigningKey};
use serde_json::{json, Value};

use health_vc::{
    base45, base64url, canonical, cwt, sniff_str, CheckStatus, Credential, CredentialFormat,
    Error, FailureReason, NoRevocationData, RevocationList, RevocationRegistry,
    RevocationStatus, SkipReason, TrustAnchorKey, ValidityEngine, VerificationOptions,
};

const DCC_ISSUED: i64 = 1_622_505_600; // 2021-06-01
const DCC_EXPIRES: i64 = 1_654_041_600; // 2022-06-01
const CERTIFICATE_ID: &str = "URN:UVCI:01DE/IZ12345A/5CWLU12RNOB9RXSEOP6FG8#W";

fn p256_key(seed: u8, kid: &str) -> (SigningKey, TrustAnchorKey) {
    let signing_key = SigningKey::from_slice(&[seed; 32]).unwrap();
    let point = signing_key.verifying_key().to_encoded_point(false);
    let key = TrustAnchorKey::from_p256_coordinates(
        Some(kid.to_string()),
        point.x().unwrap(),
        point.y().unwrap(),
    );
    (signing_key, key)
}

fn options_at(seconds: i64) -> VerificationOptions {
    VerificationOptions {
        now: Some(Utc.timestamp_opt(seconds, 0).unwrap()),
        ..VerificationOptions::default()
    }
}

fn vaccination() -> Value {
    json!({
        "ver": "1.3.0",
        "nam": {"fn": "Musterfrau", "fnt": "MUSTERFRAU", "gn": "Erika", "gnt": "ERIKA"},
        "dob": "1964-08-12",
        "v": [{
            "tg": "840539006", "vp": "1119349007", "mp": "EU/1/20/1528",
            "ma": "ORG-100030215", "dn": 2, "sd": 2, "dt": "2021-05-29",
            "co": "DE", "is": "Robert Koch-Institut", "ci": CERTIFICATE_ID
        }]
    })
}

fn sign1(key: &SigningKey, kid: &[u8], payload: Vec<u8>) -> CoseSign1 {
    CoseSign1Builder::new()
        .protected(
            HeaderBuilder::new()
                .algorithm(iana::Algorithm::ES256)
                .key_id(kid.to_vec())
                .build(),
        )
        .payload(payload)
        .create_signature(&[], |data| {
            let sig: Signature = key.sign(data);
            sig.to_bytes().to_vec()
        })
        .build()
}

fn hc1(message: &CoseSign1) -> String {
    let cose = message.clone().to_tagged_vec().unwrap();
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&cose).unwrap();
    format!("HC1:{}", base45::encode(&encoder.finish().unwrap()))
}

fn dcc_message(key: &SigningKey) -> CoseSign1 {
    let certificate = ciborium::value::Value::serialized(&vaccination()).unwrap();
    let payload = cwt::encode("DE", DCC_ISSUED, Some(DCC_EXPIRES), &certificate).unwrap();
    sign1(key, b"dcc-kid1", payload)
}

fn shc_jws(key: &SigningKey, kid: &str) -> String {
    let header = json!({"alg": "ES256", "zip": "DEF", "kid": kid});
    let payload = json!({
        "iss": "https://spec.smarthealth.cards/examples/issuer",
        "nbf": 1_620_847_989,
        "vc": {
            "type": ["https://smarthealth.cards#health-card"],
            "rid": "rid-0001",
            "credentialSubject": {
                "fhirVersion": "4.0.1",
                "fhirBundle": {
                    "resourceType": "Bundle",
                    "entry": [{"resource": {
                        "resourceType": "Patient",
                        "name": [{"family": "Anyperson", "given": ["John", "B."]}]
                    }}]
                }
            }
        }
    });
    let mut encoder =
        flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
    encoder
        .write_all(payload.to_string().as_bytes())
        .unwrap();
    let signing_input = format!(
        "{}.{}",
        base64url::encode(header.to_string()),
        base64url::encode(encoder.finish().unwrap())
    );
    let sig: Signature = key.sign(signing_input.as_bytes());
    format!("{}.{}", signing_input, base64url::encode(sig.to_bytes()))
}

fn json_credential(key: &SigningKey) -> Value {
    let mut credential = json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "id": "urn:uuid:0c07d4a4-4a35-4a5a-9d65-1c6fc0b7b1bb",
        "type": ["VerifiableCredential", "IBMDigitalHealthPass", "Vaccination"],
        "issuer": "did:hpass:issuer1",
        "issuanceDate": "2021-06-01T00:00:00Z",
        "expirationDate": "2022-06-01T00:00:00Z",
        "credentialSubject": {"name": "Jane Doe", "vaccine": "Comirnaty"},
        "proof": {
            "type": "EcdsaSecp256r1Signature2019",
            "created": "2021-06-01T00:00:00Z",
            "creator": "did:hpass:issuer1#key-1"
        }
    });
    let signed = canonical::candidates(&credential).unwrap().remove(0);
    let sig: Signature = key.sign(&signed);
    credential["proof"]["signatureValue"] = Value::String(base64url::encode(sig.to_der().as_bytes()));
    credential
}

#[tokio::test]
async fn dcc_verifies() {
    let (sk, key) = p256_key(0x11, "dcc");
    let envelope = sniff_str(&hc1(&dcc_message(&sk))).unwrap();
    assert_eq!(envelope.format(), CredentialFormat::EuDigitalCovidCertificate);
    let claims = envelope.claims();
    assert_eq!(claims.issuer.as_deref(), Some("DE"));
    assert_eq!(claims.credential_id.as_deref(), Some(CERTIFICATE_ID));
    assert_eq!(claims.expires_at.map(|t| t.timestamp()), Some(DCC_EXPIRES));
    assert_eq!(
        envelope.signature().key_hint.as_deref(),
        Some(base64::encode(b"dcc-kid1").as_str())
    );

    let outcome = ValidityEngine::new(options_at(DCC_ISSUED + 60))
        .evaluate(&envelope, &[key], &NoRevocationData)
        .await;
    assert_eq!(outcome.signature, CheckStatus::Passed);
    assert_eq!(outcome.expiry, CheckStatus::Passed);
    assert_eq!(
        outcome.revocation,
        CheckStatus::Skipped(SkipReason::StatusUnknown)
    );
    assert!(!outcome.is_invalid());
    assert!(!outcome.is_fully_valid());
}

#[test]
fn dcc_tampered_payload_fails() {
    let (sk, key) = p256_key(0x11, "dcc");
    let mut message = dcc_message(&sk);
    let payload = message.payload.as_mut().unwrap();
    let last = payload.len() - 1;
    payload[last] ^= 0x01;
    let envelope = sniff_str(&hc1(&message)).unwrap();
    assert_eq!(
        health_vc::verify(&envelope, &[key]),
        CheckStatus::Failed(FailureReason::SignatureMismatch)
    );
}

#[test]
fn dcc_wrong_key_fails_and_no_keys_skips() {
    let (sk, _) = p256_key(0x11, "dcc");
    let (_, other) = p256_key(0x22, "other");
    let envelope = sniff_str(&hc1(&dcc_message(&sk))).unwrap();
    assert_eq!(
        health_vc::verify(&envelope, &[other]),
        CheckStatus::Failed(FailureReason::SignatureMismatch)
    );
    assert_eq!(
        health_vc::verify(&envelope, &[]),
        CheckStatus::Skipped(SkipReason::NoCandidateKeys)
    );
}

#[test]
fn dcc_without_hcert_is_rejected() {
    let (sk, _) = p256_key(0x11, "dcc");
    let payload = ciborium::value::Value::Map(vec![(
        ciborium::value::Value::Integer(1.into()),
        ciborium::value::Value::Text("DE".into()),
    )]);
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&payload, &mut bytes).unwrap();
    let text = hc1(&sign1(&sk, b"kid", bytes));
    assert!(matches!(sniff_str(&text), Err(Error::MissingClaim(_))));
}

#[test]
fn dcc_cose_sign_rejected() {
    let (sk, _) = p256_key(0x11, "dcc");
    let certificate = ciborium::value::Value::serialized(&vaccination()).unwrap();
    let payload = cwt::encode("DE", DCC_ISSUED, Some(DCC_EXPIRES), &certificate).unwrap();
    let sign = CoseSignBuilder::new()
        .protected(HeaderBuilder::new().build())
        .payload(payload)
        .add_created_signature(
            CoseSignatureBuilder::new()
                .protected(
                    HeaderBuilder::new()
                        .algorithm(iana::Algorithm::ES256)
                        .key_id(b"dcc-kid1".to_vec())
                        .build(),
                )
                .build(),
            &[],
            |data| {
                let sig: Signature = sk.sign(data);
                sig.to_bytes().to_vec()
            },
        )
        .build();
    for cose in [sign.clone().to_vec().unwrap(), sign.to_tagged_vec().unwrap()] {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&cose).unwrap();
        let text = format!("HC1:{}", base45::encode(&encoder.finish().unwrap()));
        assert!(matches!(
            sniff_str(&text),
            Err(Error::UnsupportedMessageType(_))
        ));
    }
}

#[tokio::test]
async fn dcc_expiry_boundary() {
    let (sk, key) = p256_key(0x11, "dcc");
    let envelope = sniff_str(&hc1(&dcc_message(&sk))).unwrap();
    let engine = ValidityEngine::new(options_at(DCC_EXPIRES));
    let outcome = engine.evaluate(&envelope, &[key.clone()], &NoRevocationData).await;
    assert_eq!(outcome.expiry, CheckStatus::Failed(FailureReason::Expired));
    assert!(outcome.is_invalid());

    let engine = ValidityEngine::new(options_at(DCC_EXPIRES - 1));
    let outcome = engine.evaluate(&envelope, &[key], &NoRevocationData).await;
    assert_eq!(outcome.expiry, CheckStatus::Passed);
}

#[tokio::test]
async fn shc_uri_and_bare_jws() {
    let (sk, key) = p256_key(0x33, "shc-key");
    let jws = shc_jws(&sk, "shc-key");
    let uri = health_vc::shc::encode_uri(&jws).unwrap();

    for text in [uri.clone(), jws.clone()] {
        let envelope = sniff_str(&text).unwrap();
        assert_eq!(envelope.format(), CredentialFormat::SmartHealthCard);
        let claims = envelope.claims();
        assert_eq!(
            claims.issuer.as_deref(),
            Some("https://spec.smarthealth.cards/examples/issuer")
        );
        assert_eq!(claims.credential_id.as_deref(), Some("rid-0001"));
        assert_eq!(claims.expires_at, None);
        match envelope.credential() {
            Credential::SmartHealthCard(shc) => {
                assert_eq!(shc.patient_name().as_deref(), Some("John B. Anyperson"));
                assert_eq!(shc.jws, jws);
            }
            other => panic!("unexpected credential {:?}", other),
        }
        assert_eq!(envelope.shc_uri().as_deref(), Some(uri.as_str()));

        let outcome = ValidityEngine::new(options_at(1_630_000_000))
            .evaluate(&envelope, &[key.clone()], &NoRevocationData)
            .await;
        assert_eq!(outcome.signature, CheckStatus::Passed);
        assert_eq!(outcome.expiry, CheckStatus::Passed);
    }
}

#[test]
fn shc_chunks_reassembled() {
    let (sk, key) = p256_key(0x33, "shc-key");
    let digits = health_vc::shc::from_jws(&shc_jws(&sk, "shc-key")).unwrap();
    let (first, second) = digits.split_at(digits.len() / 2 / 2 * 2);
    let text = format!("shc:/2/2/{}\nshc:/1/2/{}", second, first);
    let envelope = sniff_str(&text).unwrap();
    assert!(health_vc::verify(&envelope, &[key]).is_passed());

    let missing = format!("shc:/1/2/{}", first);
    assert!(sniff_str(&missing).is_err());
}

#[test]
fn shc_tampered_signature_fails() {
    let (sk, key) = p256_key(0x33, "shc-key");
    let jws = shc_jws(&sk, "shc-key");
    let (signing_input, signature) = jws.rsplit_once('.').unwrap();
    let mut signature = base64url::decode(signature).unwrap();
    signature[0] ^= 0x80;
    let tampered = format!("{}.{}", signing_input, base64url::encode(signature));
    let envelope = sniff_str(&tampered).unwrap();
    assert_eq!(
        health_vc::verify(&envelope, &[key]),
        CheckStatus::Failed(FailureReason::SignatureMismatch)
    );
}

#[tokio::test]
async fn json_credential_verifies() {
    let (sk, key) = p256_key(0x44, "key-1");
    let credential = json_credential(&sk);
    let text = credential.to_string();

    for input in [text.clone(), base64::encode(&text)] {
        let envelope = sniff_str(&input).unwrap();
        assert_eq!(envelope.format(), CredentialFormat::VerifiableCredentialJson);
        let claims = envelope.claims();
        assert_eq!(claims.issuer.as_deref(), Some("did:hpass:issuer1"));
        assert_eq!(claims.subject.as_deref(), Some("Jane Doe"));
        assert_eq!(
            envelope.signature().key_hint.as_deref(),
            Some("did:hpass:issuer1#key-1")
        );
        let outcome = ValidityEngine::new(options_at(1_630_000_000))
            .evaluate(&envelope, &[key.clone()], &NoRevocationData)
            .await;
        assert_eq!(outcome.signature, CheckStatus::Passed);
        assert_eq!(outcome.expiry, CheckStatus::Passed);
    }

    let mut tampered = credential;
    tampered["credentialSubject"]["vaccine"] = json!("Placebo");
    let envelope = sniff_str(&tampered.to_string()).unwrap();
    assert_eq!(
        health_vc::verify(&envelope, &[key]),
        CheckStatus::Failed(FailureReason::SignatureMismatch)
    );
}

#[tokio::test]
async fn revoked_credential() {
    let (sk, key) = p256_key(0x44, "key-1");
    let envelope = sniff_str(&json_credential(&sk).to_string()).unwrap();
    let mut list = RevocationList::new();
    list.revoke("urn:uuid:0c07d4a4-4a35-4a5a-9d65-1c6fc0b7b1bb");

    let engine = ValidityEngine::new(options_at(1_630_000_000));
    let outcome = engine.evaluate(&envelope, &[key.clone()], &list).await;
    assert_eq!(outcome.signature, CheckStatus::Passed);
    assert_eq!(outcome.revocation, CheckStatus::Failed(FailureReason::Revoked));
    assert!(outcome.is_invalid());

    let outcome = engine
        .evaluate(&envelope, &[key], &RevocationList::new())
        .await;
    assert!(outcome.is_fully_valid());
}

struct SlowRegistry;

#[async_trait]
impl RevocationRegistry for SlowRegistry {
    async fn status(&self, _credential_id: &str) -> Result<RevocationStatus, Error> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(RevocationStatus::Revoked)
    }
}

#[tokio::test]
async fn slow_registry_times_out() {
    let (sk, key) = p256_key(0x44, "key-1");
    let envelope = sniff_str(&json_credential(&sk).to_string()).unwrap();
    let engine = ValidityEngine::new(VerificationOptions {
        revocation_timeout_ms: 20,
        ..options_at(1_630_000_000)
    });
    let outcome = engine.evaluate(&envelope, &[key], &SlowRegistry).await;
    assert_eq!(outcome.signature, CheckStatus::Passed);
    assert_eq!(outcome.revocation, CheckStatus::Skipped(SkipReason::Timeout));
    assert!(!outcome.is_invalid());
}

#[tokio::test]
async fn disabled_checks_are_skipped() {
    let (sk, key) = p256_key(0x44, "key-1");
    let envelope = sniff_str(&json_credential(&sk).to_string()).unwrap();
    let engine = ValidityEngine::new(VerificationOptions {
        check_signature: false,
        check_revocation: false,
        ..options_at(1_700_000_000)
    });
    let outcome = engine.evaluate(&envelope, &[key], &NoRevocationData).await;
    assert_eq!(outcome.signature, CheckStatus::Skipped(SkipReason::Disabled));
    assert_eq!(outcome.revocation, CheckStatus::Skipped(SkipReason::Disabled));
    assert_eq!(outcome.expiry, CheckStatus::Failed(FailureReason::Expired));
}

#[tokio::test]
async fn directory_supplies_issuer_keys() {
    let (sk, key) = p256_key(0x11, "dcc");
    let (_, other) = p256_key(0x22, "other");
    let directory = vec![
        other.with_issuer("DE"),
        key.with_issuer("FR"),
    ];
    let envelope = sniff_str(&hc1(&dcc_message(&sk))).unwrap();
    let engine = ValidityEngine::new(options_at(DCC_ISSUED));
    let outcome = engine
        .evaluate_with_directory(&envelope, &directory, &NoRevocationData)
        .await;
    // Only the key bound to the credential's issuer is offered.
    assert_eq!(
        outcome.signature,
        CheckStatus::Failed(FailureReason::SignatureMismatch)
    );
}
