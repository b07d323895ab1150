//! Per-server outbound task queues.
//!
//! The dispatcher drops one copy of every created task into the queue of each
//! peer; the `TaskSender` drains them. Queues for `GroupData` tasks collapse
//! identical pending entries.

use crate::membership::types::ServerName;
use crate::tasks::types::{OptimizationType, TaskPayload};

use dashmap::DashMap;
use tokio::sync::Notify;

pub const DEFAULT_MAX_PENDING: usize = 10_000;

pub struct TaskOutbox {
    queues: DashMap<ServerName, Vec<TaskPayload>>,
    notify: Notify,
    max_pending: usize,
}

impl TaskOutbox {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_PENDING)
    }

    /// `max_pending` bounds each server's queue; the oldest task is dropped past it.
    pub fn with_capacity(max_pending: usize) -> Self {
        Self {
            queues: DashMap::new(),
            notify: Notify::new(),
            max_pending: max_pending.max(1),
        }
    }

    /// Queues a task for one server. Returns `false` if it was merged into an
    /// identical pending task.
    pub fn enqueue(
        &self,
        server: &ServerName,
        payload: TaskPayload,
        optimization: OptimizationType,
    ) -> bool {
        let queued = {
            let mut queue = self.queues.entry(server.clone()).or_default();

            if optimization == OptimizationType::GroupData
                && queue.iter().any(|pending| pending.same_data(&payload))
            {
                tracing::trace!("Coalesced {} for {}", payload.task_type, server);
                false
            } else {
                if queue.len() >= self.max_pending {
                    let dropped = queue.remove(0);
                    tracing::warn!(
                        "Outbox for {} is full, dropping oldest task {} ({})",
                        server,
                        dropped.task_id.0,
                        dropped.task_type
                    );
                }
                queue.push(payload);
                true
            }
        };

        if queued {
            self.notify.notify_one();
        }
        queued
    }

    /// Takes every pending task for `server`, in enqueue order.
    pub fn drain(&self, server: &ServerName) -> Vec<TaskPayload> {
        self.queues
            .get_mut(server)
            .map(|mut queue| std::mem::take(&mut *queue))
            .unwrap_or_default()
    }

    /// Servers that currently have pending tasks.
    pub fn pending_servers(&self) -> Vec<ServerName> {
        self.queues
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn pending_count(&self, server: &ServerName) -> usize {
        self.queues.get(server).map(|queue| queue.len()).unwrap_or(0)
    }

    pub fn total_pending(&self) -> usize {
        self.queues.iter().map(|entry| entry.value().len()).sum()
    }

    /// Forgets a server's queue, e.g. once it has left the farm.
    pub fn discard(&self, server: &ServerName) -> usize {
        self.queues
            .remove(server)
            .map(|(_, queue)| queue.len())
            .unwrap_or(0)
    }

    /// Resolves when a task is queued.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}

impl Default for TaskOutbox {
    fn default() -> Self {
        Self::new()
    }
}
