use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_revocation_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
/// Options controlling which checks [`ValidityEngine`](crate::validity::ValidityEngine)
/// performs. A disabled check is reported as skipped.
pub struct VerificationOptions {
    #[serde(default = "default_true")]
    pub check_signature: bool,
    #[serde(default = "default_true")]
    pub check_expiry: bool,
    #[serde(default = "default_true")]
    pub check_revocation: bool,
    #[serde(default = "default_revocation_timeout_ms")]
    /// How long to wait for the revocation registry before skipping the check.
    pub revocation_timeout_ms: u64,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Evaluation instant. If omitted system time will be used.
    pub now: Option<DateTime<Utc>>,
}

impl Default for VerificationOptions {
    fn default() -> Self {
        Self {
            check_signature: true,
            check_expiry: true,
            check_revocation: true,
            revocation_timeout_ms: default_revocation_timeout_ms(),
            now: None,
        }
    }
}

impl VerificationOptions {
    pub fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}
