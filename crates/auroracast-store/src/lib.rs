//! Persisted key/value repository shared between the sync task, the
//! foreground app and the widget renderer.
//!
//! Callers depend on [`KeyValueStore`], never on a concrete backend.

pub mod memory;
pub mod sqlite;
pub mod types;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::{Entries, KeyValueStore, Namespace, StoreError, StoreValue};
