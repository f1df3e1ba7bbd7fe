//! vaultgate-storage: SQLite-backed durable state for gateway sessions.
//!
//! Every authenticated session gets its own [`Namespace`] in a single `kv`
//! table. The [`Vault`] and [`DisclosureRegistry`] are thin typed layers on
//! top of a namespace; neither can see another session's keys.

pub mod disclosure;
pub mod vault;

use std::path::Path;
use std::sync::Arc;

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

pub use disclosure::{DisclosureChange, DisclosureRegistry};
pub use vault::{Vault, VaultEntry, VaultMetadata, derive_alias};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Blocking task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
        namespace TEXT NOT NULL,
        key TEXT NOT NULL,
        value TEXT NOT NULL,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (namespace, key)
    );";

/// SQLite key-value store shared by all sessions.
pub struct KvStore {
    conn: Arc<Mutex<Connection>>,
}

impl KvStore {
    /// Open (or create) the SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        tracing::info!("Storage opened: {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// A handle scoped to one namespace.
    pub fn namespace(&self, name: impl Into<String>) -> Namespace {
        Namespace {
            conn: self.conn.clone(),
            name: Arc::from(name.into()),
        }
    }
}

/// Key-value access restricted to a single namespace.
///
/// Each operation runs under the connection lock, and [`Namespace::update`]
/// performs its read-modify-write inside one locked section.
#[derive(Clone)]
pub struct Namespace {
    conn: Arc<Mutex<Connection>>,
    name: Arc<str>,
}

impl Namespace {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read and decode a value.
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let conn = self.conn.clone();
        let ns = self.name.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let raw = read_raw(&conn, &ns, &key)?;
            match raw {
                Some(text) => Ok(Some(serde_json::from_str(&text)?)),
                None => Ok(None),
            }
        })
        .await?
    }

    /// Insert or overwrite a value.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let text = serde_json::to_string(value)?;
        let conn = self.conn.clone();
        let ns = self.name.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            write_raw(&conn, &ns, &key, &text)
        })
        .await?
    }

    /// Delete a key. Returns whether a row was removed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.conn.clone();
        let ns = self.name.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let count = conn.execute(
                "DELETE FROM kv WHERE namespace = ?1 AND key = ?2",
                rusqlite::params![ns.as_ref(), key],
            )?;
            Ok(count > 0)
        })
        .await?
    }

    /// All entries whose key starts with `prefix`, ordered by key.
    pub async fn list_prefix<T>(&self, prefix: &str) -> Result<Vec<(String, T)>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let conn = self.conn.clone();
        let ns = self.name.clone();
        let prefix = prefix.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(
                "SELECT key, value FROM kv
                 WHERE namespace = ?1 AND substr(key, 1, length(?2)) = ?2
                 ORDER BY key",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![ns.as_ref(), prefix], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut out = Vec::with_capacity(rows.len());
            for (key, text) in rows {
                out.push((key, serde_json::from_str(&text)?));
            }
            Ok(out)
        })
        .await?
    }

    /// Atomically read, transform, and write back a value.
    ///
    /// `f` receives the current value (if any) and returns the value to store
    /// plus an arbitrary result handed back to the caller.
    pub async fn update<T, R, F>(&self, key: &str, f: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        R: Send + 'static,
        F: FnOnce(Option<T>) -> (T, R) + Send + 'static,
    {
        let conn = self.conn.clone();
        let ns = self.name.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let current = match read_raw(&conn, &ns, &key)? {
                Some(text) => Some(serde_json::from_str::<T>(&text)?),
                None => None,
            };
            let (next, result) = f(current);
            let text = serde_json::to_string(&next)?;
            write_raw(&conn, &ns, &key, &text)?;
            Ok(result)
        })
        .await?
    }
}

fn read_raw(conn: &Connection, ns: &str, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM kv WHERE namespace = ?1 AND key = ?2",
            rusqlite::params![ns, key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

fn write_raw(conn: &Connection, ns: &str, key: &str, text: &str) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO kv (namespace, key, value, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(namespace, key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at",
        rusqlite::params![ns, key, text, now],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_put_and_get() {
        let store = KvStore::open_in_memory().unwrap();
        let ns = store.namespace("sess-1");
        ns.put("a", &json!({"x": 1})).await.unwrap();

        let loaded: Value = ns.get("a").await.unwrap().unwrap();
        assert_eq!(loaded["x"], 1);
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let store = KvStore::open_in_memory().unwrap();
        let ns = store.namespace("sess-1");
        let loaded: Option<Value> = ns.get("missing").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let store = KvStore::open_in_memory().unwrap();
        let a = store.namespace("a");
        let b = store.namespace("b");
        a.put("k", &json!("from-a")).await.unwrap();

        let seen: Option<Value> = b.get("k").await.unwrap();
        assert!(seen.is_none());
        assert!(!b.delete("k").await.unwrap());
        assert!(b.list_prefix::<Value>("").await.unwrap().is_empty());

        let still: Value = a.get("k").await.unwrap().unwrap();
        assert_eq!(still, "from-a");
    }

    #[tokio::test]
    async fn test_list_prefix_ordered() {
        let store = KvStore::open_in_memory().unwrap();
        let ns = store.namespace("n");
        ns.put("p:b", &json!(2)).await.unwrap();
        ns.put("p:a", &json!(1)).await.unwrap();
        ns.put("q:c", &json!(3)).await.unwrap();
        // Underscores and percent signs are matched literally
        ns.put("p_z", &json!(4)).await.unwrap();

        let rows: Vec<(String, i64)> = ns.list_prefix("p:").await.unwrap();
        assert_eq!(rows, vec![("p:a".to_string(), 1), ("p:b".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = KvStore::open_in_memory().unwrap();
        let ns = store.namespace("n");
        ns.put("k", &json!(true)).await.unwrap();
        assert!(ns.delete("k").await.unwrap());
        assert!(!ns.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_updates_do_not_lose_writes() {
        let store = KvStore::open_in_memory().unwrap();
        let ns = store.namespace("n");

        let mut handles = Vec::new();
        for _ in 0..20 {
            let ns = ns.clone();
            handles.push(tokio::spawn(async move {
                ns.update::<i64, (), _>("counter", |cur| (cur.unwrap_or(0) + 1, ()))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let total: i64 = ns.get("counter").await.unwrap().unwrap();
        assert_eq!(total, 20);
    }

    #[tokio::test]
    async fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.db");
        {
            let store = KvStore::open(&path).unwrap();
            store.namespace("n").put("k", &json!("v")).await.unwrap();
        }
        let store = KvStore::open(&path).unwrap();
        let v: Value = store.namespace("n").get("k").await.unwrap().unwrap();
        assert_eq!(v, "v");
    }
}
