//! In-memory store backend.
//!
//! Backs the store seam with a DashMap. State disappears when the process
//! exits, which is what the `:memory:` database path asks for; tests use
//! this backend throughout.

use anyhow::{bail, Result};
use async_trait::async_trait;
use dashmap::DashMap;

use super::{KvStore, Record};

/// What a key currently holds.
#[derive(Clone, Debug)]
enum Entry {
    Value(String),
    Record(Record),
}

/// Process-local key-value store.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entries.get(key).map(|e| e.value().clone()) {
            Some(Entry::Value(value)) => Ok(Some(value)),
            Some(Entry::Record(_)) => bail!("key holds a record, not a value"),
            None => Ok(None),
        }
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<String> {
        // The entry API locks the key's shard, so concurrent callers agree
        // on a single winner.
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Value(value.to_string()));

        match entry.value() {
            Entry::Value(stored) => Ok(stored.clone()),
            Entry::Record(_) => bail!("key holds a record, not a value"),
        }
    }

    async fn get_record(&self, key: &str) -> Result<Option<Record>> {
        match self.entries.get(key).map(|e| e.value().clone()) {
            Some(Entry::Record(record)) => Ok(Some(record)),
            Some(Entry::Value(_)) => bail!("key holds a value, not a record"),
            None => Ok(None),
        }
    }

    async fn get_record_written(&self, key: &str) -> Result<Option<i64>> {
        match self.entries.get(key) {
            Some(entry) => match entry.value() {
                Entry::Record(record) => Ok(Some(record.written)),
                Entry::Value(_) => bail!("key holds a value, not a record"),
            },
            None => Ok(None),
        }
    }

    async fn put_record(&self, key: &str, record: &Record) -> Result<()> {
        self.entries
            .insert(key.to_string(), Entry::Record(record.clone()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
