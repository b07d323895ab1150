use super::outbox::TaskOutbox;
use super::protocol::*;
use crate::dispatcher::dispatcher::WebFarmDispatcher;
use crate::tasks::processor::TaskProcessor;

use axum::{Extension, Json, body::Bytes, http::StatusCode};
use std::sync::Arc;

pub async fn handle_receive_tasks(
    Extension(processor): Extension<Arc<TaskProcessor>>,
    body: Bytes,
) -> (StatusCode, Json<TaskBatchResponse>) {
    let batch = match TaskBatch::decode(&body) {
        Ok(batch) => batch,
        Err(e) => {
            tracing::error!("Failed to decode task batch: {}", e);
            return (StatusCode::BAD_REQUEST, Json(TaskBatchResponse::default()));
        }
    };

    tracing::debug!(
        "Received {} web farm task(s) from {}",
        batch.tasks.len(),
        batch.from
    );

    // Handlers may touch the disk
    let result = tokio::task::spawn_blocking(move || processor.process_batch(&batch.tasks)).await;

    match result {
        Ok(report) => (
            StatusCode::OK,
            Json(TaskBatchResponse {
                applied: report.applied,
                skipped: report.skipped,
                failed: report.failed,
            }),
        ),
        Err(e) => {
            tracing::error!("Task batch processing panicked: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TaskBatchResponse::default()),
            )
        }
    }
}

pub async fn handle_farm_status(
    Extension(dispatcher): Extension<Arc<WebFarmDispatcher>>,
    Extension(outbox): Extension<Arc<TaskOutbox>>,
) -> Json<FarmStatusResponse> {
    let roster = dispatcher.roster();

    Json(FarmStatusResponse {
        server_name: roster.local_server().to_string(),
        enabled: dispatcher.is_enabled(),
        peers: roster
            .peers()
            .into_iter()
            .map(|server| server.name.to_string())
            .collect(),
        registered_tasks: dispatcher.registry().list_tasks(),
        pending_tasks: outbox.total_pending(),
    })
}
