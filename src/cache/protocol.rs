//! Cache API Protocol
//!
//! Endpoints and DTOs through which operators (or co-located applications)
//! invalidate caches across the farm.

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

pub const ENDPOINT_CACHE_TOUCH: &str = "/cache/touch";
pub const ENDPOINT_CACHE_REMOVE: &str = "/cache/remove";
pub const ENDPOINT_CACHE_CLEAR: &str = "/cache/clear";
pub const ENDPOINT_FULL_PAGE_CLEAR: &str = "/cache/fullpage/clear";
pub const ENDPOINT_PERSISTENT_REMOVE: &str = "/cache/persistent/remove";

// --- Data Transfer Objects ---

#[derive(Debug, Serialize, Deserialize)]
pub struct TouchRequest {
    pub keys: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveRequest {
    pub key: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearRequest {
    pub prefix: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PersistentKeyRequest {
    pub key: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CacheOperationResponse {
    /// Entries removed from this server's cache.
    pub removed: usize,
    /// Whether a web farm task was created for the other servers.
    pub farm_task_created: bool,
}
