use super::helper::{CacheHelper, CacheOperation};
use super::protocol::*;

use axum::{Extension, Json, http::StatusCode};
use std::sync::Arc;

fn respond(operation: CacheOperation) -> (StatusCode, Json<CacheOperationResponse>) {
    (
        StatusCode::OK,
        Json(CacheOperationResponse {
            removed: operation.removed,
            farm_task_created: operation.farm_task_created,
        }),
    )
}

pub async fn handle_touch(
    Extension(helper): Extension<Arc<CacheHelper>>,
    Json(req): Json<TouchRequest>,
) -> (StatusCode, Json<CacheOperationResponse>) {
    if req.keys.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(CacheOperationResponse {
                removed: 0,
                farm_task_created: false,
            }),
        );
    }

    tracing::info!("Touching {} cache key(s)", req.keys.len());
    respond(helper.touch_keys(req.keys))
}

pub async fn handle_remove(
    Extension(helper): Extension<Arc<CacheHelper>>,
    Json(req): Json<RemoveRequest>,
) -> (StatusCode, Json<CacheOperationResponse>) {
    tracing::info!("Removing cache item {}", req.key);
    respond(helper.remove(&req.key, req.case_sensitive))
}

pub async fn handle_clear(
    Extension(helper): Extension<Arc<CacheHelper>>,
    Json(req): Json<ClearRequest>,
) -> (StatusCode, Json<CacheOperationResponse>) {
    tracing::info!("Clearing cache items starting with {}", req.prefix);
    respond(helper.clear_prefix(&req.prefix, req.case_sensitive))
}

pub async fn handle_clear_full_page(
    Extension(helper): Extension<Arc<CacheHelper>>,
) -> (StatusCode, Json<CacheOperationResponse>) {
    tracing::info!("Clearing full-page cache");
    respond(helper.clear_full_page())
}

pub async fn handle_remove_persistent(
    Extension(helper): Extension<Arc<CacheHelper>>,
    Json(req): Json<PersistentKeyRequest>,
) -> (StatusCode, Json<CacheOperationResponse>) {
    tracing::info!("Evicting persistent storage key {}", req.key);
    respond(helper.remove_persistent_key(&req.key))
}
