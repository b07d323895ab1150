//! Web Farm Task Dispatcher
//!
//! Entry point for every module that needs a change propagated to the other
//! servers of the farm.
//!
//! ## Responsibilities
//! - **Cost Avoidance**: nothing is built or queued while the farm is disabled.
//! - **Guarding**: a registered condition can suppress a task category.
//! - **Fan-out**: one copy of the task per peer in the current roster snapshot.
//!
//! The dispatcher never runs the handler on the calling server and never
//! waits on the network; delivery belongs to the transport.

use crate::membership::roster::ServerRoster;
use crate::tasks::registry::TaskRegistry;
use crate::tasks::types::*;
use crate::transport::outbox::TaskOutbox;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct WebFarmDispatcher {
    enabled: AtomicBool,
    registry: Arc<TaskRegistry>,
    roster: Arc<dyn ServerRoster>,
    outbox: Arc<TaskOutbox>,
}

impl WebFarmDispatcher {
    pub fn new(
        enabled: bool,
        registry: Arc<TaskRegistry>,
        roster: Arc<dyn ServerRoster>,
        outbox: Arc<TaskOutbox>,
    ) -> Arc<Self> {
        Arc::new(Self {
            enabled: AtomicBool::new(enabled),
            registry,
            roster,
            outbox,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
        tracing::info!("Web farm {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn roster(&self) -> &Arc<dyn ServerRoster> {
        &self.roster
    }

    /// Creates a typed task for delivery to all peers.
    ///
    /// Returns `true` when the task was created, `false` when the farm is
    /// disabled, the kind is not registered, or its condition rejected it.
    pub fn create_task(&self, task: FarmTask) -> bool {
        if !self.is_enabled() {
            tracing::trace!("Web farm disabled, not creating {}", task.kind());
            return false;
        }

        let payload = task.into_payload(self.roster.local_server().clone());
        self.submit(payload)
    }

    /// Creates a task from its wire representation.
    pub fn create_task_raw(
        &self,
        task_type: &str,
        target: Option<&str>,
        text_data: Vec<String>,
    ) -> bool {
        if !self.is_enabled() {
            return false;
        }

        if task_type.trim().is_empty() {
            tracing::warn!("Refusing to create a web farm task without a type");
            return false;
        }

        let payload = TaskPayload::new(self.roster.local_server().clone(), task_type, text_data)
            .with_target(target.map(str::to_string));
        self.submit(payload)
    }

    /// Creates a task that also carries a file path and its binary content.
    pub fn create_io_task(
        &self,
        task_type: &str,
        file_path: &str,
        binary_data: Vec<u8>,
        target: Option<&str>,
        text_data: Vec<String>,
    ) -> bool {
        if !self.is_enabled() {
            return false;
        }

        if task_type.trim().is_empty() {
            tracing::warn!("Refusing to create a web farm I/O task without a type");
            return false;
        }

        let payload = TaskPayload::new(self.roster.local_server().clone(), task_type, text_data)
            .with_target(target.map(str::to_string))
            .with_binary(Some(file_path.to_string()), Some(binary_data));
        self.submit(payload)
    }

    fn submit(&self, payload: TaskPayload) -> bool {
        let registration = match self.registry.resolve(&payload.task_type) {
            Ok(registration) => registration,
            Err(e) => {
                tracing::warn!("Cannot create web farm task: {}", e);
                return false;
            }
        };

        if !registration.allows(&payload) {
            tracing::debug!("Condition rejected web farm task {}", registration.kind);
            return false;
        }

        let peers = self.roster.peers();
        let mut queued = 0;
        for peer in &peers {
            if self
                .outbox
                .enqueue(&peer.name, payload.clone(), registration.optimization)
            {
                queued += 1;
            }
        }

        tracing::debug!(
            "Created web farm task {} ({}) for {} of {} peer(s)",
            registration.kind,
            payload.task_id.0,
            queued,
            peers.len()
        );
        true
    }
}
