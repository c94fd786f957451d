//! SQLite store backend.
//!
//! Single-file durable backend for the store seam.
//!
//! # Schema
//! ```sql
//! CREATE TABLE kv (
//!     key     TEXT PRIMARY KEY,  -- peppered digest, namespaced
//!     value   BLOB NOT NULL,     -- secret (UTF-8) or settings blob
//!     written INTEGER            -- set only for settings records
//! );
//! ```
//!
//! A NULL `written` column marks a plain value, a non-NULL one a record.
//!
//! # Thread Safety
//! The connection is wrapped in a Mutex; calls are short and never hold
//! the lock across an await point.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

use super::{KvStore, Record};

/// Durable key-value store backed by a SQLite file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Creates or opens the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open database")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key     TEXT PRIMARY KEY,
                value   BLOB NOT NULL,
                written INTEGER
            )
            "#,
            [],
        )
        .context("Failed to create kv table")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl KvStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT value, written FROM kv WHERE key = ?1")
            .context("Failed to prepare query")?;

        let mut rows = stmt.query(params![key]).context("Failed to execute query")?;

        if let Some(row) = rows.next().context("Failed to read row")? {
            let written: Option<i64> = row.get(1)?;
            if written.is_some() {
                bail!("key holds a record, not a value");
            }
            let value: Vec<u8> = row.get(0)?;
            let value = String::from_utf8(value).context("Stored value is not UTF-8")?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<String> {
        let mut conn = self.conn.lock().unwrap();

        // Insert-or-ignore and read-back inside one transaction, so racing
        // callers all come away with the winning value.
        let tx = conn.transaction().context("Failed to begin transaction")?;

        tx.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO NOTHING",
            params![key, value.as_bytes()],
        )
        .context("Failed to insert value")?;

        let (stored, written): (Vec<u8>, Option<i64>) = tx
            .query_row(
                "SELECT value, written FROM kv WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .context("Failed to read back value")?;

        tx.commit().context("Failed to commit transaction")?;

        if written.is_some() {
            bail!("key holds a record, not a value");
        }
        String::from_utf8(stored).context("Stored value is not UTF-8")
    }

    async fn get_record(&self, key: &str) -> Result<Option<Record>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT value, written FROM kv WHERE key = ?1")
            .context("Failed to prepare query")?;

        let mut rows = stmt.query(params![key]).context("Failed to execute query")?;

        if let Some(row) = rows.next().context("Failed to read row")? {
            let written: Option<i64> = row.get(1)?;
            match written {
                Some(written) => {
                    let value: Vec<u8> = row.get(0)?;
                    Ok(Some(Record { value, written }))
                }
                None => bail!("key holds a value, not a record"),
            }
        } else {
            Ok(None)
        }
    }

    async fn get_record_written(&self, key: &str) -> Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT written FROM kv WHERE key = ?1")
            .context("Failed to prepare query")?;

        let mut rows = stmt.query(params![key]).context("Failed to execute query")?;

        if let Some(row) = rows.next().context("Failed to read row")? {
            let written: Option<i64> = row.get(0)?;
            match written {
                Some(written) => Ok(Some(written)),
                None => bail!("key holds a value, not a record"),
            }
        } else {
            Ok(None)
        }
    }

    async fn put_record(&self, key: &str, record: &Record) -> Result<()> {
        self.conn
            .lock()
            .unwrap()
            .execute(
                r#"
                INSERT INTO kv (key, value, written)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    written = excluded.written
                "#,
                params![key, record.value, record.written],
            )
            .context("Failed to store record")?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.conn
            .lock()
            .unwrap()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .context("Failed to delete key")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open(":memory:").expect("Failed to create test store")
    }

    #[tokio::test]
    async fn test_get_absent_key() {
        let store = create_test_store();
        assert_eq!(store.get("missing").await.unwrap(), None);
        assert_eq!(store.get_record("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_if_absent_first_write_wins() {
        let store = create_test_store();

        assert_eq!(store.set_if_absent("k", "one").await.unwrap(), "one");
        assert_eq!(store.set_if_absent("k", "two").await.unwrap(), "one");
        assert_eq!(store.get("k").await.unwrap(), Some("one".to_string()));
    }

    #[tokio::test]
    async fn test_record_roundtrip_and_replace() {
        let store = create_test_store();

        // Arbitrary bytes, including NUL and high values
        let record = Record {
            value: vec![0, 1, 2, 254, 255],
            written: 1_700_000_000_000,
        };
        store.put_record("r", &record).await.unwrap();
        assert_eq!(store.get_record("r").await.unwrap(), Some(record));

        let newer = Record {
            value: b"replaced".to_vec(),
            written: 1_700_000_000_001,
        };
        store.put_record("r", &newer).await.unwrap();
        assert_eq!(store.get_record("r").await.unwrap(), Some(newer));
    }

    #[tokio::test]
    async fn test_get_record_written() {
        let store = create_test_store();
        store
            .put_record(
                "r",
                &Record {
                    value: b"blob".to_vec(),
                    written: 77,
                },
            )
            .await
            .unwrap();

        assert_eq!(store.get_record_written("r").await.unwrap(), Some(77));
        assert_eq!(store.get_record_written("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = create_test_store();
        store.set_if_absent("k", "v").await.unwrap();

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_kind_mismatch_is_an_error() {
        let store = create_test_store();
        store.set_if_absent("v", "plain").await.unwrap();
        store
            .put_record(
                "r",
                &Record {
                    value: vec![1],
                    written: 1,
                },
            )
            .await
            .unwrap();

        assert!(store.get_record("v").await.is_err());
        assert!(store.get_record_written("v").await.is_err());
        assert!(store.get("r").await.is_err());
        assert!(store.set_if_absent("r", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("kv.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set_if_absent("k", "survives").await.unwrap();
            store
                .put_record(
                    "r",
                    &Record {
                        value: b"blob".to_vec(),
                        written: 42,
                    },
                )
                .await
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("survives".to_string()));
        assert_eq!(
            store.get_record("r").await.unwrap(),
            Some(Record {
                value: b"blob".to_vec(),
                written: 42,
            })
        );
    }
}
