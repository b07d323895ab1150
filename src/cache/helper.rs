//! Cache operations that keep the whole farm coherent.
//!
//! Each operation is applied to the local caches first, then the matching web
//! farm task is created so the peers do the same.

use super::tasks::Caches;
use crate::dispatcher::dispatcher::WebFarmDispatcher;
use crate::tasks::types::FarmTask;

use std::sync::Arc;

/// Result of a cache operation: local effect and whether peers were notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOperation {
    pub removed: usize,
    pub farm_task_created: bool,
}

pub struct CacheHelper {
    caches: Caches,
    dispatcher: Arc<WebFarmDispatcher>,
}

impl CacheHelper {
    pub fn new(caches: Caches, dispatcher: Arc<WebFarmDispatcher>) -> Arc<Self> {
        Arc::new(Self { caches, dispatcher })
    }

    pub fn caches(&self) -> &Caches {
        &self.caches
    }

    pub fn touch_keys(&self, keys: Vec<String>) -> CacheOperation {
        if keys.is_empty() {
            return CacheOperation {
                removed: 0,
                farm_task_created: false,
            };
        }

        self.caches.data.touch(&keys);
        CacheOperation {
            removed: 0,
            farm_task_created: self.dispatcher.create_task(FarmTask::TouchCacheItem { keys }),
        }
    }

    pub fn remove(&self, key: &str, case_sensitive: bool) -> CacheOperation {
        let removed = self.caches.data.remove(key, case_sensitive);
        CacheOperation {
            removed,
            farm_task_created: self.dispatcher.create_task(FarmTask::RemoveCacheItem {
                key: key.to_string(),
                case_sensitive,
            }),
        }
    }

    pub fn clear_prefix(&self, prefix: &str, case_sensitive: bool) -> CacheOperation {
        let removed = self.caches.data.clear_prefix(prefix, case_sensitive);
        CacheOperation {
            removed,
            farm_task_created: self.dispatcher.create_task(FarmTask::ClearCacheItems {
                prefix: prefix.to_string(),
                case_sensitive,
            }),
        }
    }

    pub fn clear_full_page(&self) -> CacheOperation {
        let removed = self.caches.output.clear();
        CacheOperation {
            removed,
            farm_task_created: self.dispatcher.create_task(FarmTask::ClearFullPageCache),
        }
    }

    pub fn remove_persistent_key(&self, key: &str) -> CacheOperation {
        let removed = usize::from(self.caches.persistent.evict(key));
        CacheOperation {
            removed,
            farm_task_created: self
                .dispatcher
                .create_task(FarmTask::RemovePersistentStorageKey {
                    key: key.to_string(),
                }),
        }
    }
}
