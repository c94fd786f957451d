//! Settings blob storage.
//!
//! Blobs are opaque: stored and returned byte-for-byte, never parsed or
//! recompressed. Each record carries the wall-clock write time in epoch
//! milliseconds, which the HTTP layer reuses as the ETag.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;

use crate::digest::digest;
use crate::store::{KvStore, Record};

/// Why a write was refused.
#[derive(Debug)]
pub enum PutError {
    /// Blob exceeds the configured size limit. Nothing was stored.
    TooLarge { len: usize, limit: usize },
    /// The backing store failed.
    Store(anyhow::Error),
}

impl std::fmt::Display for PutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PutError::TooLarge { len, limit } => {
                write!(f, "settings blob of {} bytes exceeds the {} byte limit", len, limit)
            }
            PutError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl From<anyhow::Error> for PutError {
    fn from(e: anyhow::Error) -> Self {
        PutError::Store(e)
    }
}

/// Per-identity settings records, stored under
/// `settings:<digest(pepper, identity)>`.
///
/// Uses a different pepper than the secrets namespace, so the two key
/// spaces cannot be correlated even for the same identity.
pub struct SettingsStore {
    kv: Arc<dyn KvStore>,
    pepper: String,
    size_limit: usize,
}

impl SettingsStore {
    pub fn new(kv: Arc<dyn KvStore>, pepper: impl Into<String>, size_limit: usize) -> Self {
        Self {
            kv,
            pepper: pepper.into(),
            size_limit,
        }
    }

    /// Maximum accepted blob size in bytes.
    pub fn size_limit(&self) -> usize {
        self.size_limit
    }

    fn key(&self, identity: &str) -> String {
        format!("settings:{}", digest(&self.pepper, identity))
    }

    /// Fetch the stored record, if any.
    pub async fn get(&self, identity: &str) -> Result<Option<Record>> {
        self.kv.get_record(&self.key(identity)).await
    }

    /// Fetch only the write timestamp. Presence probes use this so a HEAD
    /// never pays for reading the blob itself.
    pub async fn written(&self, identity: &str) -> Result<Option<i64>> {
        self.kv.get_record_written(&self.key(identity)).await
    }

    /// Replace the stored blob and stamp it with the current time.
    ///
    /// Returns the new write timestamp. Oversize blobs are refused before
    /// the store is touched; any previous record stays intact.
    pub async fn put(&self, identity: &str, blob: &[u8]) -> Result<i64, PutError> {
        if blob.len() > self.size_limit {
            return Err(PutError::TooLarge {
                len: blob.len(),
                limit: self.size_limit,
            });
        }

        let written = Utc::now().timestamp_millis();
        let record = Record {
            value: blob.to_vec(),
            written,
        };
        self.kv.put_record(&self.key(identity), &record).await?;

        Ok(written)
    }

    /// Remove the stored record. Removing when nothing is stored succeeds.
    pub async fn delete(&self, identity: &str) -> Result<()> {
        self.kv.delete(&self.key(identity)).await
    }
}
