use async_trait::async_trait;

use crate::error::Error;
use crate::key::TrustAnchorKey;

/// Read-through source of issuer public keys.
///
/// Implementations may fetch and cache keys however they like; verification
/// only ever sees the candidates returned for one credential.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait IssuerDirectory: Sync {
    async fn candidate_keys(
        &self,
        issuer: Option<&str>,
        key_id: Option<&str>,
    ) -> Result<Vec<TrustAnchorKey>, Error>;
}

/// A fixed key set. Keys bound to an issuer are only offered for that
/// issuer; keys without one are offered for every credential.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl IssuerDirectory for [TrustAnchorKey] {
    async fn candidate_keys(
        &self,
        issuer: Option<&str>,
        _key_id: Option<&str>,
    ) -> Result<Vec<TrustAnchorKey>, Error> {
        Ok(self
            .iter()
            .filter(|key| match (&key.issuer, issuer) {
                (Some(bound), Some(issuer)) => bound == issuer,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .cloned()
            .collect())
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl IssuerDirectory for Vec<TrustAnchorKey> {
    async fn candidate_keys(
        &self,
        issuer: Option<&str>,
        key_id: Option<&str>,
    ) -> Result<Vec<TrustAnchorKey>, Error> {
        self.as_slice().candidate_keys(issuer, key_id).await
    }
}
