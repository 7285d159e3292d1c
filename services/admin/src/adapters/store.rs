//! services/admin/src/adapters/store.rs
//!
//! A `KeyValueStore` kept as one JSON object on disk. The whole map lives in
//! memory and is rewritten on every change.

use feedback_core::ports::{KeyValueStore, PortError, PortResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Opens the store at `path`. A missing file starts empty; an unreadable
    /// or malformed one is logged and also starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = read_entries(&path);
        info!(path = %path.display(), keys = entries.len(), "Opened key-value store");
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> PortResult<MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| PortError::Storage("key-value store lock poisoned".to_string()))
    }

    /// Writes to a sibling temp file, then renames over the real one.
    fn flush(&self, entries: &BTreeMap<String, String>) -> PortResult<()> {
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| PortError::Storage(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| storage_error(&self.path, e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).map_err(|e| storage_error(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| storage_error(&self.path, e))
    }
}

fn read_entries(path: &Path) -> BTreeMap<String, String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unable to read key-value store; starting empty");
            return BTreeMap::new();
        }
    };
    if raw.trim().is_empty() {
        return BTreeMap::new();
    }
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Invalid key-value store JSON; starting empty");
        BTreeMap::new()
    })
}

fn storage_error(path: &Path, e: std::io::Error) -> PortError {
    PortError::Storage(format!("{}: {}", path.display(), e))
}

//=========================================================================================
// `KeyValueStore` Trait Implementation
//=========================================================================================

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    /// The in-memory map only changes if the file write succeeds.
    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let mut entries = self.lock()?;
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        let mut entries = self.lock()?;
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("admin-store-{}", Uuid::new_v4()))
            .join("store.json")
    }

    #[test]
    fn values_survive_reopening() {
        let path = temp_path();
        let store = JsonFileStore::open(&path);
        store.set("token", "abc").unwrap();
        store.set("surveyScratchDraft", r#"{"surveyName":"Q1"}"#).unwrap();
        store.remove("token").unwrap();

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get("token").unwrap(), None);
        assert_eq!(
            reopened.get("surveyScratchDraft").unwrap().as_deref(),
            Some(r#"{"surveyName":"Q1"}"#)
        );

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn malformed_file_opens_empty() {
        let path = temp_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ broken").unwrap();

        let store = JsonFileStore::open(&path);
        assert_eq!(store.get("anything").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(JsonFileStore::open(&path).get("k").unwrap().as_deref(), Some("v"));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn removing_a_missing_key_is_fine() {
        let store = JsonFileStore::open(temp_path());
        assert!(store.remove("nothing").is_ok());
        assert!(!store.path().exists());
    }
}
