use std::fmt;

/// Pipeline stage at which decoding of a credential failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeStage {
    Base45,
    Inflate,
    Cbor,
    Base64Url,
    Json,
    Zip,
    Shc,
    Jws,
    Cose,
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecodeStage::Base45 => "Base45",
            DecodeStage::Inflate => "Inflate",
            DecodeStage::Cbor => "CBOR",
            DecodeStage::Base64Url => "Base64url",
            DecodeStage::Json => "JSON",
            DecodeStage::Zip => "ZIP",
            DecodeStage::Shc => "SHC",
            DecodeStage::Jws => "JWS",
            DecodeStage::Cose => "COSE",
        };
        f.write_str(name)
    }
}

/// Error type for `health-vc`.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// No recognizer claimed the input
    #[error("Unrecognized credential format")]
    FormatUnrecognized,
    #[error("{stage} decoding failed: {message}")]
    Decode { stage: DecodeStage, message: String },
    #[error("Expected 3 JWS segments but found {0}")]
    InvalidNumberOfSegments(usize),
    /// COSE structure other than COSE_Sign1
    #[error("Unsupported COSE message type: {0}")]
    UnsupportedMessageType(String),
    /// Health certificate structural rule broken
    #[error("Health certificate invariant violated: {0}")]
    InvariantViolated(String),
    #[error("Missing claim: {0}")]
    MissingClaim(&'static str),
    #[error("Missing proof")]
    MissingProof,
    #[error("Missing credential subject")]
    MissingCredentialSubject,
    #[error("Missing type")]
    MissingType,
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("No candidate keys")]
    NoCandidateKeys,
    #[error("Signature mismatch")]
    SignatureMismatch,
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Revocation status unavailable: {0}")]
    RevocationUnavailable(String),
}

impl Error {
    pub(crate) fn decode(stage: DecodeStage, message: impl fmt::Display) -> Self {
        Error::Decode {
            stage,
            message: message.to_string(),
        }
    }

    /// The decode stage, if this is a decode error.
    pub fn stage(&self) -> Option<DecodeStage> {
        match self {
            Error::Decode { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Error {
        Error::decode(DecodeStage::Base64Url, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::decode(DecodeStage::Json, err)
    }
}

impl From<coset::CoseError> for Error {
    fn from(err: coset::CoseError) -> Error {
        Error::decode(DecodeStage::Cose, err)
    }
}

impl From<ciborium::de::Error<std::io::Error>> for Error {
    fn from(err: ciborium::de::Error<std::io::Error>) -> Error {
        Error::decode(DecodeStage::Cbor, err)
    }
}

#[cfg(feature = "divoc")]
impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Error {
        Error::decode(DecodeStage::Zip, err)
    }
}

impl From<Error> for String {
    fn from(err: Error) -> String {
        format!("{}", err)
    }
}
