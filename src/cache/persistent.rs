//! File-backed persistent storage cache.
//!
//! Values live as JSON files under a root directory; an in-memory index holds
//! the ones already read. Evicting a key only drops the index entry, so the
//! next read falls through to disk and picks up whatever another server wrote.

use crate::error::TaskResult;

use dashmap::DashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub struct PersistentStorage {
    root: PathBuf,
    index: DashMap<String, serde_json::Value>,
}

impl PersistentStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index: DashMap::new(),
        }
    }

    /// Keys are hex encoded so any key maps to a valid, unique file name.
    fn path_for(&self, key: &str) -> PathBuf {
        let encoded: String = key.bytes().map(|b| format!("{:02x}", b)).collect();
        self.root.join(format!("{}.json", encoded))
    }

    pub fn put(&self, key: &str, value: serde_json::Value) -> TaskResult<()> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.path_for(key), serde_json::to_vec(&value)?)?;
        self.index.insert(key.to_string(), value);
        Ok(())
    }

    /// Reads from the index, falling back to disk on a miss.
    pub fn get(&self, key: &str) -> TaskResult<Option<serde_json::Value>> {
        if let Some(value) = self.index.get(key) {
            return Ok(Some(value.clone()));
        }

        let bytes = match fs::read(self.path_for(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        tracing::trace!("Persistent storage key {} loaded from disk", key);
        self.index.insert(key.to_string(), value.clone());
        Ok(Some(value))
    }

    /// Drops the in-memory index entry for `key`; the file stays.
    pub fn evict(&self, key: &str) -> bool {
        self.index.remove(key).is_some()
    }

    pub fn is_indexed(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }
}
