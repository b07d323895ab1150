use super::store::AttachmentStore;
use super::types::{DeleteAttachmentTask, UpdateAttachmentTask};
use crate::dispatcher::dispatcher::WebFarmDispatcher;
use crate::error::TaskResult;
use crate::tasks::registry::{TaskHandler, TaskRegistration, TaskRegistry};
use crate::tasks::types::{FarmTask, TaskKind, TaskPayload};

use std::sync::Arc;

pub struct UpdateAttachmentHandler {
    store: Arc<AttachmentStore>,
}

impl TaskHandler for UpdateAttachmentHandler {
    fn apply(&self, payload: &TaskPayload) -> TaskResult<()> {
        UpdateAttachmentTask::from_payload(payload)?.execute(&self.store)
    }
}

pub struct DeleteAttachmentHandler {
    store: Arc<AttachmentStore>,
}

impl TaskHandler for DeleteAttachmentHandler {
    fn apply(&self, payload: &TaskPayload) -> TaskResult<()> {
        DeleteAttachmentTask::from_payload(payload)?.execute(&self.store)
    }
}

/// Registers the attachment replication tasks. Both are I/O tasks gated on
/// the store's synchronization switch.
pub fn register_attachment_tasks(registry: &TaskRegistry, store: &Arc<AttachmentStore>) -> TaskResult<()> {
    let update_gate = store.clone();
    registry.register(
        TaskRegistration::new(
            TaskKind::UpdateAttachment,
            UpdateAttachmentHandler {
                store: store.clone(),
            },
        )
        .memory_task(false)
        .condition(move |payload| UpdateAttachmentTask::condition(payload, &update_gate)),
    )?;

    let delete_gate = store.clone();
    registry.register(
        TaskRegistration::new(
            TaskKind::DeleteAttachment,
            DeleteAttachmentHandler {
                store: store.clone(),
            },
        )
        .memory_task(false)
        .condition(move |payload| DeleteAttachmentTask::condition(payload, &delete_gate)),
    )?;

    Ok(())
}

/// Stores an attachment locally and replicates it to the peers.
/// Returns whether a web farm task was created.
pub fn save_attachment(
    store: &AttachmentStore,
    dispatcher: &WebFarmDispatcher,
    task: UpdateAttachmentTask,
) -> TaskResult<bool> {
    task.execute(store)?;
    Ok(dispatcher.create_task(FarmTask::UpdateAttachment(task)))
}

/// Deletes an attachment locally and on the peers.
pub fn delete_attachment(
    store: &AttachmentStore,
    dispatcher: &WebFarmDispatcher,
    task: DeleteAttachmentTask,
) -> TaskResult<bool> {
    task.execute(store)?;
    Ok(dispatcher.create_task(FarmTask::DeleteAttachment(task)))
}
