//! Inbound Task Processing
//!
//! Applies tasks received from other servers through the registry.
//!
//! ## Responsibilities
//! - **Boundary Resolution**: turning the wire task type into a registered `TaskKind`.
//! - **Execution Policy**: skipping own tasks and, on shared storage, I/O tasks.
//! - **Deduplication**: a redelivered task id is applied only once.
//! - **Error Isolation**: a failing task is logged and never aborts the rest of a batch.

use super::registry::TaskRegistry;
use super::types::*;
use crate::error::TaskResult;
use crate::membership::types::ServerName;

use dashmap::DashMap;
use std::sync::Arc;

const MAX_REMEMBERED_TASKS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Applied,
    /// The task id was already processed on this server.
    Duplicate,
    /// The task was created by this server.
    OwnTask,
    /// I/O task skipped because all servers share the same storage.
    SkippedSharedStorage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct TaskProcessor {
    registry: Arc<TaskRegistry>,
    local_server: ServerName,
    shared_storage: bool,
    processed: DashMap<TaskId, u64>,
}

impl TaskProcessor {
    pub fn new(registry: Arc<TaskRegistry>, local_server: ServerName, shared_storage: bool) -> Self {
        Self {
            registry,
            local_server,
            shared_storage,
            processed: DashMap::new(),
        }
    }

    fn should_process(&self, task_id: &TaskId) -> bool {
        if self.processed.contains_key(task_id) {
            return false;
        }
        if self.processed.len() > MAX_REMEMBERED_TASKS {
            self.processed.clear();
        }
        self.processed.insert(task_id.clone(), now_ms());
        true
    }

    /// Applies a single inbound task.
    pub fn process(&self, payload: &TaskPayload) -> TaskResult<ProcessOutcome> {
        if payload.origin == self.local_server {
            tracing::trace!("Ignoring own task {}", payload.task_id.0);
            return Ok(ProcessOutcome::OwnTask);
        }

        let registration = self.registry.resolve(&payload.task_type)?;

        if self.shared_storage && !registration.is_memory_task {
            tracing::debug!(
                "Skipping I/O task {} from {} (shared storage)",
                registration.kind,
                payload.origin
            );
            return Ok(ProcessOutcome::SkippedSharedStorage);
        }

        if !self.should_process(&payload.task_id) {
            tracing::debug!("Task {} already processed", payload.task_id.0);
            return Ok(ProcessOutcome::Duplicate);
        }

        if let Err(e) = registration.execute(payload) {
            // Let a corrected redelivery through
            self.processed.remove(&payload.task_id);
            return Err(e);
        }

        tracing::debug!(
            "Applied web farm task {} ({}) from {}",
            registration.kind,
            payload.task_id.0,
            payload.origin
        );
        Ok(ProcessOutcome::Applied)
    }

    /// Applies every task of a batch, logging failures instead of stopping.
    pub fn process_batch(&self, payloads: &[TaskPayload]) -> BatchReport {
        let mut report = BatchReport::default();

        for payload in payloads {
            match self.process(payload) {
                Ok(ProcessOutcome::Applied) => report.applied += 1,
                Ok(_) => report.skipped += 1,
                Err(e) => {
                    tracing::warn!(
                        "Web farm task {} ({}) from {} failed: {}",
                        payload.task_type,
                        payload.task_id.0,
                        payload.origin,
                        e
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }
}
