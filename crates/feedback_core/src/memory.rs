//! crates/feedback_core/src/memory.rs
//!
//! A process-local `KeyValueStore` for tests and embedding; the service
//! itself always persists through its file-backed store.

use crate::ports::{KeyValueStore, PortError, PortResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
    reject_writes: AtomicBool,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `set` fail, the way a full browser quota would.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }

    fn lock(&self) -> PortResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| PortError::Storage("in-memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(PortError::Storage(format!("quota exceeded writing {key}")));
        }
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_writes_leave_existing_entries() {
        let store = InMemoryKeyValueStore::new();
        store.set("k", "v1").unwrap();
        store.reject_writes(true);
        assert!(matches!(store.set("k", "v2"), Err(PortError::Storage(_))));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v1"));
        store.remove("k").unwrap();
        assert!(!store.contains("k"));
    }
}
