use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::IssuerDirectory;
use crate::envelope::CredentialEnvelope;
use crate::key::TrustAnchorKey;
use crate::options::VerificationOptions;
use crate::revocation::{RevocationRegistry, RevocationStatus};
use crate::verify::{self, CheckStatus, FailureReason, SkipReason};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub signature: CheckStatus,
    pub expiry: CheckStatus,
    pub revocation: CheckStatus,
}

impl VerificationOutcome {
    /// True only when every check ran and passed.
    pub fn is_fully_valid(&self) -> bool {
        self.signature.is_passed() && self.expiry.is_passed() && self.revocation.is_passed()
    }

    /// True when some check positively failed.
    pub fn is_invalid(&self) -> bool {
        self.signature.is_failed() || self.expiry.is_failed() || self.revocation.is_failed()
    }
}

/// Runs the signature, expiry and revocation checks for a credential.
///
/// The signature and expiry checks are CPU-bound and complete on their first
/// poll, so only the revocation lookup overlaps with other work. The lookup
/// is polled first and bounded by
/// [`VerificationOptions::revocation_timeout_ms`], which needs a Tokio
/// runtime.
#[derive(Debug, Clone, Default)]
pub struct ValidityEngine {
    options: VerificationOptions,
}

impl ValidityEngine {
    pub fn new(options: VerificationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &VerificationOptions {
        &self.options
    }

    pub async fn evaluate(
        &self,
        envelope: &CredentialEnvelope,
        keys: &[TrustAnchorKey],
        registry: &dyn RevocationRegistry,
    ) -> VerificationOutcome {
        let now = self.options.now();
        let signature = async {
            if !self.options.check_signature {
                return CheckStatus::Skipped(SkipReason::Disabled);
            }
            verify::verify(envelope, keys)
        };
        let expiry = async {
            if !self.options.check_expiry {
                return CheckStatus::Skipped(SkipReason::Disabled);
            }
            check_expiry(envelope.claims().expires_at, now)
        };
        let revocation = self.check_revocation(envelope, registry);
        // join! polls in argument order.
        let (revocation, signature, expiry) = futures::join!(revocation, signature, expiry);
        log::debug!(
            "{:?}: signature={:?} expiry={:?} revocation={:?}",
            envelope.format(),
            signature,
            expiry,
            revocation
        );
        VerificationOutcome {
            signature,
            expiry,
            revocation,
        }
    }

    /// Resolve candidate keys through a directory, then [`evaluate`](Self::evaluate).
    /// A directory failure leaves the signature check without keys.
    pub async fn evaluate_with_directory(
        &self,
        envelope: &CredentialEnvelope,
        directory: &dyn IssuerDirectory,
        registry: &dyn RevocationRegistry,
    ) -> VerificationOutcome {
        let claims = envelope.claims();
        let keys = match directory
            .candidate_keys(
                claims.issuer.as_deref(),
                envelope.signature().key_hint.as_deref(),
            )
            .await
        {
            Ok(keys) => keys,
            Err(err) => {
                log::warn!("issuer directory lookup failed: {}", err);
                Vec::new()
            }
        };
        self.evaluate(envelope, &keys, registry).await
    }

    async fn check_revocation(
        &self,
        envelope: &CredentialEnvelope,
        registry: &dyn RevocationRegistry,
    ) -> CheckStatus {
        if !self.options.check_revocation {
            return CheckStatus::Skipped(SkipReason::Disabled);
        }
        let credential_id = match envelope.claims().credential_id {
            Some(id) => id,
            None => return CheckStatus::Skipped(SkipReason::NoData),
        };
        let timeout = Duration::from_millis(self.options.revocation_timeout_ms);
        match tokio::time::timeout(timeout, registry.status(&credential_id)).await {
            Ok(Ok(RevocationStatus::Revoked)) => CheckStatus::Failed(FailureReason::Revoked),
            Ok(Ok(RevocationStatus::NotRevoked)) => CheckStatus::Passed,
            Ok(Ok(RevocationStatus::Unknown)) => {
                CheckStatus::Skipped(SkipReason::StatusUnknown)
            }
            Ok(Err(err)) => {
                log::warn!("revocation lookup failed: {}", err);
                CheckStatus::Skipped(SkipReason::Unavailable(err.to_string()))
            }
            Err(_) => {
                log::warn!(
                    "revocation lookup timed out after {} ms",
                    self.options.revocation_timeout_ms
                );
                CheckStatus::Skipped(SkipReason::Timeout)
            }
        }
    }
}

/// A credential is expired from its expiry instant on, at second
/// granularity. No expiry means it never expires.
pub fn check_expiry(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> CheckStatus {
    match expires_at {
        Some(exp) if now.timestamp() >= exp.timestamp() => {
            CheckStatus::Failed(FailureReason::Expired)
        }
        _ => CheckStatus::Passed,
    }
}
