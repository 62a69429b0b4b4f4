//! In-process store for foreground use and tests.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::types::{Entries, KeyValueStore, Namespace, StoreError, StoreValue};

#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: Mutex<HashMap<Namespace, Entries>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, namespace: Namespace, key: &str) -> Result<Option<StoreValue>, StoreError> {
        Ok(self
            .namespaces
            .lock()
            .get(&namespace)
            .and_then(|entries| entries.get(key).cloned()))
    }

    fn get_all(&self, namespace: Namespace) -> Result<Entries, StoreError> {
        Ok(self
            .namespaces
            .lock()
            .get(&namespace)
            .cloned()
            .unwrap_or_default())
    }

    fn set(&self, namespace: Namespace, key: &str, value: StoreValue) -> Result<(), StoreError> {
        self.namespaces
            .lock()
            .entry(namespace)
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, namespace: Namespace, key: &str) -> Result<(), StoreError> {
        if let Some(entries) = self.namespaces.lock().get_mut(&namespace) {
            entries.remove(key);
        }
        Ok(())
    }

    fn replace_namespace(&self, namespace: Namespace, entries: Entries) -> Result<(), StoreError> {
        self.namespaces.lock().insert(namespace, entries);
        Ok(())
    }
}
