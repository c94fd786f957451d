//! Secret issuance and verification.
//!
//! Completing the OAuth exchange is the only way to obtain a secret, and
//! the secret a client is handed never changes afterwards: issuance is
//! write-once per identity, so re-running the flow returns the same value
//! instead of invalidating sessions on other devices.

use std::sync::Arc;

use anyhow::Result;
use rand::RngCore;

use crate::digest::digest;
use crate::store::KvStore;

/// Random bytes behind each issued secret (96 hex characters on the wire).
const SECRET_BYTES: usize = 48;

/// Issues and verifies the per-identity secrets that stand in for
/// passwords.
///
/// Secrets are stored under `secrets:<digest(pepper, identity)>`, so the
/// store never sees a raw identity.
pub struct SecretStore {
    kv: Arc<dyn KvStore>,
    pepper: String,
}

impl SecretStore {
    pub fn new(kv: Arc<dyn KvStore>, pepper: impl Into<String>) -> Self {
        Self {
            kv,
            pepper: pepper.into(),
        }
    }

    fn key(&self, identity: &str) -> String {
        format!("secrets:{}", digest(&self.pepper, identity))
    }

    /// Returns the secret for `identity`, generating and installing one if
    /// none exists yet.
    ///
    /// Safe under concurrent first-time issuance: the store's
    /// create-if-absent picks a single winner and every caller is handed
    /// the winning secret. The losing candidate is discarded unused.
    pub async fn issue_or_get(&self, identity: &str) -> Result<String> {
        let candidate = generate_secret();
        self.kv.set_if_absent(&self.key(identity), &candidate).await
    }

    /// Checks `candidate` against the issued secret.
    ///
    /// Returns `false` both when no secret was ever issued and when the
    /// candidate is wrong; callers cannot tell the two apart.
    pub async fn verify(&self, identity: &str, candidate: &str) -> Result<bool> {
        match self.kv.get(&self.key(identity)).await? {
            Some(stored) => Ok(stored == candidate),
            None => Ok(false),
        }
    }
}

/// Generate a fresh secret from the thread-local CSPRNG.
fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
