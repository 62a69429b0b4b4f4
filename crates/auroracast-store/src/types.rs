use std::collections::BTreeMap;

use auroracast_core::{DatabaseError, RusqliteErrorExt};
use thiserror::Error;

/// Key space inside the shared store.
///
/// Only [`Namespace::Widget`] is read by the renderer process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Widget payload, one key per field
    Widget,
    /// Alert cooldown records
    Alerts,
    /// Settings and last-known location written by the app
    App,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Widget => "widget",
            Self::Alerts => "alerts",
            Self::App => "app",
        }
    }
}

/// A primitive stored under a single key.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl From<i64> for StoreValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for StoreValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for StoreValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for StoreValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for StoreValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for StoreValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// Ordered key/value set for one namespace
pub type Entries = BTreeMap<String, StoreValue>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Store value could not be encoded: {0}")]
    Encoding(String),

    #[error("Store write rejected: {0}")]
    WriteRejected(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(e) => e.is_retryable(),
            Self::Encoding(_) => false,
            Self::WriteRejected(_) => true,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.into_database_error())
    }
}

/// Flat, namespaced key/value repository.
///
/// Every write is a last-writer-wins replace of whole records; no reader can
/// observe a partially written record. There is no read-your-writes promise
/// across processes.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, namespace: Namespace, key: &str) -> Result<Option<StoreValue>, StoreError>;

    fn get_all(&self, namespace: Namespace) -> Result<Entries, StoreError>;

    fn set(&self, namespace: Namespace, key: &str, value: StoreValue) -> Result<(), StoreError>;

    fn remove(&self, namespace: Namespace, key: &str) -> Result<(), StoreError>;

    /// Atomically replace the whole namespace with `entries`.
    ///
    /// Keys not present in `entries` are deleted.
    fn replace_namespace(&self, namespace: Namespace, entries: Entries) -> Result<(), StoreError>;
}
