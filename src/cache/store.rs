//! In-memory data cache with touch-based dependency invalidation.
//!
//! Every entry may depend on any number of dependency keys. Touching a key
//! records a new version for it; entries depending on a key touched after
//! they were stored are treated as missing and evicted on the next read.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub dependencies: Vec<String>,
    version: u64,
}

pub struct CacheStore {
    entries: DashMap<String, CacheEntry>,
    /// Dependency key (lowercase) -> version at which it was last touched.
    touched: DashMap<String, u64>,
    clock: AtomicU64,
}

impl CacheStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            touched: DashMap::new(),
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn insert(&self, key: impl Into<String>, value: serde_json::Value, dependencies: Vec<String>) {
        let entry = CacheEntry {
            value,
            dependencies: dependencies
                .into_iter()
                .map(|dependency| dependency.to_ascii_lowercase())
                .collect(),
            version: self.tick(),
        };
        self.entries.insert(key.into(), entry);
    }

    fn is_valid(&self, entry: &CacheEntry) -> bool {
        entry.dependencies.iter().all(|dependency| {
            self.touched
                .get(dependency)
                .map(|touched_at| *touched_at <= entry.version)
                .unwrap_or(true)
        })
    }

    /// Returns the cached value unless one of its dependencies was touched.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        {
            let entry = self.entries.get(key)?;
            if self.is_valid(&entry) {
                return Some(entry.value.clone());
            }
        }

        tracing::trace!("Cache entry {} invalidated by dependency", key);
        self.entries.remove_if(key, |_, entry| !self.is_valid(entry));
        None
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Marks dependency keys as changed. Entries depending on them become stale;
    /// the touched entries themselves are left in place.
    pub fn touch<S: AsRef<str>>(&self, keys: &[S]) {
        let version = self.tick();
        for key in keys {
            self.touched
                .insert(key.as_ref().to_ascii_lowercase(), version);
        }
    }

    /// Removes the entry under `key`. Returns the number of removed entries.
    pub fn remove(&self, key: &str, case_sensitive: bool) -> usize {
        if case_sensitive {
            return usize::from(self.entries.remove(key).is_some());
        }

        let mut removed = 0;
        self.entries.retain(|existing, _| {
            let matches = existing.eq_ignore_ascii_case(key);
            if matches {
                removed += 1;
            }
            !matches
        });
        removed
    }

    /// Removes every entry whose key starts with `prefix`.
    pub fn clear_prefix(&self, prefix: &str, case_sensitive: bool) -> usize {
        let lowered = prefix.to_ascii_lowercase();
        let mut removed = 0;

        self.entries.retain(|existing, _| {
            let matches = if case_sensitive {
                existing.starts_with(prefix)
            } else {
                existing.to_ascii_lowercase().starts_with(&lowered)
            };
            if matches {
                removed += 1;
            }
            !matches
        });
        removed
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}
