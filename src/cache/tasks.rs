//! Cache invalidation task handlers.
//!
//! | Task type                  | Text data                   |
//! |----------------------------|-----------------------------|
//! | TOUCHCACHEITEM             | one or more keys            |
//! | REMOVECACHEITEM            | `[caseSensitive, key]`      |
//! | CLEARCACHEITEMS            | `[caseSensitive, prefix]`   |
//! | CLEARFULLPAGECACHE         | none                        |
//! | REMOVEPERSISTENTSTORAGEKEY | `[key]`                     |
//!
//! Every handler is idempotent.

use super::output::OutputCache;
use super::persistent::PersistentStorage;
use super::store::CacheStore;
use crate::error::TaskResult;
use crate::tasks::registry::{TaskHandler, TaskRegistration, TaskRegistry};
use crate::tasks::types::{OptimizationType, TaskKind, TaskPayload};

use std::sync::Arc;

/// The local cache layers the invalidation tasks act on.
#[derive(Clone)]
pub struct Caches {
    pub data: Arc<CacheStore>,
    pub output: Arc<OutputCache>,
    pub persistent: Arc<PersistentStorage>,
}

impl Caches {
    pub fn new(persistent_root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            data: Arc::new(CacheStore::new()),
            output: Arc::new(OutputCache::new()),
            persistent: Arc::new(PersistentStorage::new(persistent_root)),
        }
    }
}

pub struct TouchCacheItemHandler {
    data: Arc<CacheStore>,
}

impl TaskHandler for TouchCacheItemHandler {
    fn apply(&self, payload: &TaskPayload) -> TaskResult<()> {
        payload.expect_min_arity(1)?;
        self.data.touch(&payload.text_data);
        tracing::debug!("Touched {} cache key(s)", payload.text_data.len());
        Ok(())
    }
}

pub struct RemoveCacheItemHandler {
    data: Arc<CacheStore>,
}

impl TaskHandler for RemoveCacheItemHandler {
    fn apply(&self, payload: &TaskPayload) -> TaskResult<()> {
        payload.expect_arity(2)?;
        let case_sensitive = payload.bool_arg(0)?;
        let key = payload.text(1)?;

        let removed = self.data.remove(key, case_sensitive);
        tracing::debug!("Removed cache item {} ({} entries)", key, removed);
        Ok(())
    }
}

pub struct ClearCacheItemsHandler {
    data: Arc<CacheStore>,
}

impl TaskHandler for ClearCacheItemsHandler {
    fn apply(&self, payload: &TaskPayload) -> TaskResult<()> {
        payload.expect_arity(2)?;
        let case_sensitive = payload.bool_arg(0)?;
        let prefix = payload.text(1)?;

        let removed = self.data.clear_prefix(prefix, case_sensitive);
        tracing::debug!("Cleared {} cache item(s) starting with {}", removed, prefix);
        Ok(())
    }
}

pub struct ClearFullPageCacheHandler {
    output: Arc<OutputCache>,
}

impl TaskHandler for ClearFullPageCacheHandler {
    fn apply(&self, _payload: &TaskPayload) -> TaskResult<()> {
        let cleared = self.output.clear();
        tracing::debug!("Cleared full-page cache ({} pages)", cleared);
        Ok(())
    }
}

pub struct RemovePersistentStorageKeyHandler {
    persistent: Arc<PersistentStorage>,
}

impl TaskHandler for RemovePersistentStorageKeyHandler {
    fn apply(&self, payload: &TaskPayload) -> TaskResult<()> {
        payload.expect_arity(1)?;
        let key = payload.text(0)?;

        self.persistent.evict(key);
        tracing::debug!("Evicted persistent storage key {}", key);
        Ok(())
    }
}

/// Registers all cache invalidation tasks.
pub fn register_cache_tasks(registry: &TaskRegistry, caches: &Caches) -> TaskResult<()> {
    registry.register(
        TaskRegistration::new(
            TaskKind::TouchCacheItem,
            TouchCacheItemHandler {
                data: caches.data.clone(),
            },
        )
        .optimization(OptimizationType::GroupData),
    )?;

    registry.register(
        TaskRegistration::new(
            TaskKind::RemoveCacheItem,
            RemoveCacheItemHandler {
                data: caches.data.clone(),
            },
        )
        .optimization(OptimizationType::GroupData),
    )?;

    registry.register(
        TaskRegistration::new(
            TaskKind::ClearCacheItems,
            ClearCacheItemsHandler {
                data: caches.data.clone(),
            },
        )
        .optimization(OptimizationType::GroupData),
    )?;

    registry.register(
        TaskRegistration::new(
            TaskKind::ClearFullPageCache,
            ClearFullPageCacheHandler {
                output: caches.output.clone(),
            },
        )
        .optimization(OptimizationType::GroupData),
    )?;

    registry.register(
        TaskRegistration::new(
            TaskKind::RemovePersistentStorageKey,
            RemovePersistentStorageKeyHandler {
                persistent: caches.persistent.clone(),
            },
        )
        .optimization(OptimizationType::GroupData),
    )?;

    Ok(())
}
