//! SQLite-backed store, safe to open from several processes at once.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::types::{Entries, KeyValueStore, Namespace, StoreError, StoreValue};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite key/value store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // WAL lets the widget process read while a sync writes
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("Store opened with journal_mode={}", mode);
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                kind TEXT NOT NULL,
                value,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (namespace, key)
            );
            "#,
        )?;
        Ok(())
    }

    fn encode(value: &StoreValue) -> Result<(&'static str, Value), StoreError> {
        Ok(match value {
            StoreValue::Int(i) => ("int", Value::Integer(*i)),
            StoreValue::Float(f) if !f.is_finite() => {
                return Err(StoreError::Encoding(format!("non-finite float {}", f)))
            }
            StoreValue::Float(f) => ("float", Value::Real(*f)),
            StoreValue::Bool(b) => ("bool", Value::Integer(i64::from(*b))),
            StoreValue::Text(s) => ("text", Value::Text(s.clone())),
        })
    }

    /// Rows written by other writers may carry an unknown kind; infer from
    /// the SQLite storage class instead of failing the read.
    fn decode(kind: &str, value: Value) -> Option<StoreValue> {
        match (kind, value) {
            ("bool", Value::Integer(i)) => Some(StoreValue::Bool(i != 0)),
            (_, Value::Integer(i)) => Some(StoreValue::Int(i)),
            (_, Value::Real(f)) => Some(StoreValue::Float(f)),
            (_, Value::Text(s)) => Some(StoreValue::Text(s)),
            (_, Value::Null) | (_, Value::Blob(_)) => None,
        }
    }

    fn insert(
        conn: &Connection,
        namespace: Namespace,
        key: &str,
        value: &StoreValue,
        now: i64,
    ) -> Result<(), StoreError> {
        let (kind, encoded) = Self::encode(value)?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO kv (namespace, key, kind, value, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![namespace.as_str(), key, kind, encoded, now],
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, namespace: Namespace, key: &str) -> Result<Option<StoreValue>, StoreError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT kind, value FROM kv WHERE namespace = ?1 AND key = ?2",
                params![namespace.as_str(), key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Value>(1)?)),
            )
            .optional()?;

        Ok(row.and_then(|(kind, value)| Self::decode(&kind, value)))
    }

    fn get_all(&self, namespace: Namespace) -> Result<Entries, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key, kind, value FROM kv WHERE namespace = ?1")?;

        let rows = stmt.query_map(params![namespace.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Value>(2)?,
            ))
        })?;

        let mut entries = Entries::new();
        for row in rows {
            let (key, kind, value) = row?;
            if let Some(decoded) = Self::decode(&kind, value) {
                entries.insert(key, decoded);
            }
        }
        Ok(entries)
    }

    fn set(&self, namespace: Namespace, key: &str, value: StoreValue) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        Self::insert(&conn, namespace, key, &value, Utc::now().timestamp_millis())
    }

    fn remove(&self, namespace: Namespace, key: &str) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "DELETE FROM kv WHERE namespace = ?1 AND key = ?2",
            params![namespace.as_str(), key],
        )?;
        Ok(())
    }

    fn replace_namespace(&self, namespace: Namespace, entries: Entries) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Utc::now().timestamp_millis();

        tx.execute(
            "DELETE FROM kv WHERE namespace = ?1",
            params![namespace.as_str()],
        )?;
        for (key, value) in &entries {
            Self::insert(&tx, namespace, key, value, now)?;
        }

        tx.commit()?;
        tracing::debug!(
            "Replaced {} namespace with {} keys",
            namespace.as_str(),
            entries.len()
        );
        Ok(())
    }
}
