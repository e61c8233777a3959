use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::hash::sha256;

/// Number of leading SHA-256 bytes kept per revoked identifier.
pub const HASH_PREFIX_LEN: usize = 16;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum RevocationStatus {
    Revoked,
    NotRevoked,
    /// The registry has no information about this credential.
    Unknown,
}

/// Source of revocation status, e.g. an issuer's revocation service or a
/// locally cached list.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait RevocationRegistry: Sync {
    async fn status(&self, credential_id: &str) -> Result<RevocationStatus, Error>;
}

/// Registry that knows nothing; every lookup is [`RevocationStatus::Unknown`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRevocationData;

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl RevocationRegistry for NoRevocationData {
    async fn status(&self, _credential_id: &str) -> Result<RevocationStatus, Error> {
        Ok(RevocationStatus::Unknown)
    }
}

/// Truncated SHA-256 of a credential identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdHash([u8; HASH_PREFIX_LEN]);

impl IdHash {
    pub fn of(credential_id: &str) -> Self {
        let mut prefix = [0u8; HASH_PREFIX_LEN];
        prefix.copy_from_slice(&sha256(credential_id.as_bytes())[..HASH_PREFIX_LEN]);
        IdHash(prefix)
    }
}

/// Set of revoked credential identifiers, stored as hashes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevocationList(BTreeSet<IdHash>);

impl RevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revoke(&mut self, credential_id: &str) {
        self.0.insert(IdHash::of(credential_id));
    }

    pub fn is_revoked(&self, credential_id: &str) -> bool {
        self.0.contains(&IdHash::of(credential_id))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for RevocationList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(ids: I) -> Self {
        RevocationList(ids.into_iter().map(IdHash::of).collect())
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl RevocationRegistry for RevocationList {
    async fn status(&self, credential_id: &str) -> Result<RevocationStatus, Error> {
        Ok(if self.is_revoked(credential_id) {
            RevocationStatus::Revoked
        } else {
            RevocationStatus::NotRevoked
        })
    }
}
