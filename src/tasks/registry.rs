//! Web Farm Task Registry
//!
//! Maps each `TaskKind` to the handler that applies it on a receiving server,
//! together with its execution policy. Modules register their tasks once at
//! startup; afterwards the registry is only read.

use super::types::*;
use crate::error::{TaskError, TaskResult};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// Applies one kind of task on the local server.
///
/// Implementations must be idempotent: delivery carries no deduplication
/// guarantee across restarts.
pub trait TaskHandler: Send + Sync {
    fn apply(&self, payload: &TaskPayload) -> TaskResult<()>;
}

impl<F> TaskHandler for F
where
    F: Fn(&TaskPayload) -> TaskResult<()> + Send + Sync,
{
    fn apply(&self, payload: &TaskPayload) -> TaskResult<()> {
        self(payload)
    }
}

/// Guard evaluated before a task is created. Returning `false` suppresses it.
pub type ConditionFn = Arc<dyn Fn(&TaskPayload) -> bool + Send + Sync>;

/// Registration record: the handler and execution policy of one task kind.
#[derive(Clone)]
pub struct TaskRegistration {
    pub kind: TaskKind,
    pub handler: Arc<dyn TaskHandler>,
    /// True when the task only touches in-process memory (no disk I/O).
    pub is_memory_task: bool,
    pub optimization: OptimizationType,
    pub condition: Option<ConditionFn>,
}

impl TaskRegistration {
    pub fn new(kind: TaskKind, handler: impl TaskHandler + 'static) -> Self {
        Self {
            kind,
            handler: Arc::new(handler),
            is_memory_task: true,
            optimization: OptimizationType::None,
            condition: None,
        }
    }

    /// Registration backed by a plain closure.
    pub fn from_fn<F>(kind: TaskKind, handler: F) -> Self
    where
        F: Fn(&TaskPayload) -> TaskResult<()> + Send + Sync + 'static,
    {
        Self::new(kind, handler)
    }

    pub fn memory_task(mut self, is_memory_task: bool) -> Self {
        self.is_memory_task = is_memory_task;
        self
    }

    pub fn optimization(mut self, optimization: OptimizationType) -> Self {
        self.optimization = optimization;
        self
    }

    pub fn condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&TaskPayload) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Evaluates the guard; tasks without one always pass.
    pub fn allows(&self, payload: &TaskPayload) -> bool {
        self.condition
            .as_ref()
            .map(|condition| condition(payload))
            .unwrap_or(true)
    }

    /// Runs the handler on `payload`.
    pub fn execute(&self, payload: &TaskPayload) -> TaskResult<()> {
        tracing::debug!(
            "Executing web farm task {} (target: {:?}, {} text args, {} bytes)",
            self.kind,
            payload.target,
            payload.text_data.len(),
            payload.binary_data.as_ref().map(Vec::len).unwrap_or(0)
        );

        self.handler.apply(payload)
    }
}

impl std::fmt::Debug for TaskRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistration")
            .field("kind", &self.kind)
            .field("is_memory_task", &self.is_memory_task)
            .field("optimization", &self.optimization)
            .field("has_condition", &self.condition.is_some())
            .finish()
    }
}

/// Registry holding the mapping between task kinds and their implementation.
pub struct TaskRegistry {
    tasks: DashMap<TaskKind, Arc<TaskRegistration>>,
}

impl TaskRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a task kind.
    ///
    /// A kind can only be registered once; a second registration is rejected
    /// with `TaskError::DuplicateRegistration` and the first one stays active.
    pub fn register(&self, registration: TaskRegistration) -> TaskResult<()> {
        let kind = registration.kind;

        match self.tasks.entry(kind) {
            Entry::Occupied(_) => {
                tracing::error!("Web farm task {} registered twice", kind);
                Err(TaskError::DuplicateRegistration(kind.to_string()))
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(registration));
                tracing::info!("Registered web farm task: {}", kind);
                Ok(())
            }
        }
    }

    pub fn get(&self, kind: TaskKind) -> Option<Arc<TaskRegistration>> {
        self.tasks.get(&kind).map(|entry| entry.value().clone())
    }

    /// Resolves a wire task type to its registration.
    pub fn resolve(&self, task_type: &str) -> TaskResult<Arc<TaskRegistration>> {
        let kind: TaskKind = task_type.parse()?;
        self.get(kind)
            .ok_or_else(|| TaskError::NotRegistered(kind.to_string()))
    }

    /// Looks up the handler for the payload's type and applies it.
    pub fn execute(&self, payload: &TaskPayload) -> TaskResult<()> {
        self.resolve(&payload.task_type)?.execute(payload)
    }

    /// Returns the wire names of all registered tasks.
    pub fn list_tasks(&self) -> Vec<String> {
        let mut kinds: Vec<TaskKind> = self.tasks.iter().map(|entry| *entry.key()).collect();
        kinds.sort();
        kinds.into_iter().map(|kind| kind.to_string()).collect()
    }

    pub fn has_task(&self, kind: TaskKind) -> bool {
        self.tasks.contains_key(&kind)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self {
            tasks: DashMap::new(),
        }
    }
}
