//! Decoding and verification of health credentials.
//!
//! The library recognizes the credential formats found in vaccination and
//! test-result QR codes, decodes them into a common [`CredentialEnvelope`],
//! and checks them against caller-supplied trust anchors:
//! - [SMART Health Cards][shc]: a compressed JWS, usually carried as a
//!   numeric `shc:/` URI;
//! - [EU Digital COVID Certificates][dcc] (`HC1:`): a CWT inside a COSE_Sign1
//!   message, zlib-compressed and Base45-encoded;
//! - W3C-style JSON credentials with a detached proof (IBM Digital Health
//!   Pass, Good Health Pass), raw or base64-encoded;
//! - [DIVOC][divoc] certificates delivered as a ZIP archive (feature `divoc`).
//!
//! [shc]: <https://spec.smarthealth.cards/>
//! [dcc]: <https://ec.europa.eu/health/sites/default/files/ehealth/docs/covid-certificate_json_specification_en.pdf>
//! [divoc]: <https://divoc.egov.org.in/>
//!
//! # Basic Usage
//!
//! ```no_run
//! use health_vc::{sniff_str, NoRevocationData, TrustAnchorKey, ValidityEngine};
//!
//! # async fn run(qr_text: &str, keys: Vec<TrustAnchorKey>) -> Result<(), health_vc::Error> {
//! let envelope = sniff_str(qr_text)?;
//! println!("{:?} issued by {:?}", envelope.format(), envelope.claims().issuer);
//!
//! let outcome = ValidityEngine::default()
//!     .evaluate(&envelope, &keys, &NoRevocationData)
//!     .await;
//! assert!(!outcome.is_invalid());
//! # Ok(())
//! # }
//! ```
//!
//! Decoding never consults the network. Key material comes either as a list
//! of [`TrustAnchorKey`]s or through an [`IssuerDirectory`]; revocation
//! status comes from a [`RevocationRegistry`].

pub mod base45;
pub mod base64url;
pub mod canonical;
pub mod cbor;
pub mod cose;
pub mod credential;
pub mod cwt;
pub mod der;
pub mod directory;
pub mod divoc;
pub mod envelope;
pub mod error;
pub mod hash;
pub mod hcert;
pub mod inflate;
pub mod jws;
pub mod key;
pub mod options;
pub mod revocation;
pub mod shc;
pub mod sniff;
pub mod validity;
pub mod verify;

pub use directory::IssuerDirectory;
pub use envelope::{
    Claims, Credential, CredentialEnvelope, CredentialFormat, RawInput, SignatureAlgorithm,
    SignatureMaterial,
};
pub use error::{DecodeStage, Error};
pub use key::TrustAnchorKey;
pub use options::VerificationOptions;
pub use revocation::{NoRevocationData, RevocationList, RevocationRegistry, RevocationStatus};
pub use sniff::{sniff, sniff_str};
pub use validity::{ValidityEngine, VerificationOutcome};
pub use verify::{verify, CheckStatus, FailureReason, SkipReason};

pub type Result<T, E = Error> = std::result::Result<T, E>;
