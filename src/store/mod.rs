//! Key-value store seam.
//!
//! All cross-request state lives behind the [`KvStore`] trait: issued
//! secrets as plain string values, settings as two-field records. The
//! process itself keeps nothing, so any number of instances can serve the
//! same store. Two backends ship here: a process-local [`MemoryStore`] and
//! a SQLite-backed [`SqliteStore`].

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use anyhow::Result;
use async_trait::async_trait;

/// A stored settings record: the opaque blob plus its write timestamp
/// (Unix epoch milliseconds).
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub value: Vec<u8>,
    pub written: i64,
}

/// External key-value store interface.
///
/// # Contract
/// - Per-key atomicity: `put_record` replaces both fields together and a
///   concurrent `get_record` sees either the old record or the new one,
///   never a mix.
/// - `set_if_absent` is the create-if-absent primitive first-time secret
///   issuance relies on: under concurrent calls for the same key exactly
///   one value is installed and every caller receives that value.
/// - A key holds either a plain value or a record, never both; asking for
///   the wrong kind is an error, mirroring a typed store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch a plain string value.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key` unless the key already holds one.
    /// Returns the value the key holds afterwards (the existing one when
    /// the write lost the race).
    async fn set_if_absent(&self, key: &str, value: &str) -> Result<String>;

    /// Fetch a record, both fields in one atomic read.
    async fn get_record(&self, key: &str) -> Result<Option<Record>>;

    /// Fetch only a record's write timestamp, leaving the blob unread.
    async fn get_record_written(&self, key: &str) -> Result<Option<i64>>;

    /// Replace the record under `key` wholesale.
    async fn put_record(&self, key: &str, record: &Record) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}
