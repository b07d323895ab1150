use crate::attachments::types::{DeleteAttachmentTask, UpdateAttachmentTask};
use crate::error::{TaskError, TaskResult};
use crate::membership::types::ServerName;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier of a created task instance.
///
/// Receivers remember processed ids so a redelivered batch is applied once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

/// Every kind of task the farm knows how to execute.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    TouchCacheItem,
    RemoveCacheItem,
    ClearCacheItems,
    ClearFullPageCache,
    RemovePersistentStorageKey,
    UpdateAttachment,
    DeleteAttachment,
}

impl TaskKind {
    pub const ALL: [TaskKind; 7] = [
        TaskKind::TouchCacheItem,
        TaskKind::RemoveCacheItem,
        TaskKind::ClearCacheItems,
        TaskKind::ClearFullPageCache,
        TaskKind::RemovePersistentStorageKey,
        TaskKind::UpdateAttachment,
        TaskKind::DeleteAttachment,
    ];

    /// The type string used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::TouchCacheItem => "TOUCHCACHEITEM",
            TaskKind::RemoveCacheItem => "REMOVECACHEITEM",
            TaskKind::ClearCacheItems => "CLEARCACHEITEMS",
            TaskKind::ClearFullPageCache => "CLEARFULLPAGECACHE",
            TaskKind::RemovePersistentStorageKey => "REMOVEPERSISTENTSTORAGEKEY",
            TaskKind::UpdateAttachment => "UPDATEATTACHMENT",
            TaskKind::DeleteAttachment => "DELETEATTACHMENT",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == upper)
            .ok_or_else(|| TaskError::UnknownTaskType(s.to_string()))
    }
}

/// Whether pending tasks of one kind may be coalesced before delivery.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum OptimizationType {
    #[default]
    None,
    /// Identical pending tasks (same type, target and data) collapse into one.
    GroupData,
}

/// A task instance as it travels between servers.
///
/// `text_data` is positional and only meaningful to the handler registered
/// for `task_type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskPayload {
    pub task_id: TaskId,
    pub task_type: String,
    pub target: Option<String>,
    pub text_data: Vec<String>,
    pub binary_data: Option<Vec<u8>>,
    pub file_path: Option<String>,
    pub origin: ServerName,
    pub created_at: u64,
}

impl TaskPayload {
    pub fn new(origin: ServerName, task_type: impl Into<String>, text_data: Vec<String>) -> Self {
        Self {
            task_id: TaskId::new(),
            task_type: task_type.into(),
            target: None,
            text_data,
            binary_data: None,
            file_path: None,
            origin,
            created_at: now_ms(),
        }
    }

    pub fn with_target(mut self, target: Option<String>) -> Self {
        self.target = target;
        self
    }

    pub fn with_binary(mut self, file_path: Option<String>, binary_data: Option<Vec<u8>>) -> Self {
        self.file_path = file_path;
        self.binary_data = binary_data;
        self
    }

    /// True when both payloads would have the same effect on a receiver.
    pub fn same_data(&self, other: &TaskPayload) -> bool {
        self.task_type == other.task_type
            && self.target == other.target
            && self.text_data == other.text_data
            && self.file_path == other.file_path
            && self.binary_data == other.binary_data
    }

    pub fn expect_arity(&self, expected: usize) -> TaskResult<()> {
        if self.text_data.len() != expected {
            return Err(TaskError::Arity {
                task_type: self.task_type.clone(),
                expected: expected.to_string(),
                actual: self.text_data.len(),
            });
        }
        Ok(())
    }

    pub fn expect_min_arity(&self, min: usize) -> TaskResult<()> {
        if self.text_data.len() < min {
            return Err(TaskError::Arity {
                task_type: self.task_type.clone(),
                expected: format!("at least {}", min),
                actual: self.text_data.len(),
            });
        }
        Ok(())
    }

    pub fn text(&self, index: usize) -> TaskResult<&str> {
        self.text_data
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| self.invalid(format!("missing text argument {}", index)))
    }

    pub fn bool_arg(&self, index: usize) -> TaskResult<bool> {
        let raw = self.text(index)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(self.invalid(format!(
                "text argument {} must be a boolean, got '{}'",
                index, raw
            ))),
        }
    }

    pub fn invalid(&self, message: impl Into<String>) -> TaskError {
        TaskError::InvalidArgument {
            task_type: self.task_type.clone(),
            message: message.into(),
        }
    }
}

/// Typed form of every task the farm creates.
///
/// `into_payload` is the single place where the positional text encoding is
/// produced; the matching handlers decode it on the receiving server.
#[derive(Debug, Clone, PartialEq)]
pub enum FarmTask {
    TouchCacheItem {
        keys: Vec<String>,
    },
    RemoveCacheItem {
        key: String,
        case_sensitive: bool,
    },
    ClearCacheItems {
        prefix: String,
        case_sensitive: bool,
    },
    ClearFullPageCache,
    RemovePersistentStorageKey {
        key: String,
    },
    UpdateAttachment(UpdateAttachmentTask),
    DeleteAttachment(DeleteAttachmentTask),
}

impl FarmTask {
    pub fn kind(&self) -> TaskKind {
        match self {
            FarmTask::TouchCacheItem { .. } => TaskKind::TouchCacheItem,
            FarmTask::RemoveCacheItem { .. } => TaskKind::RemoveCacheItem,
            FarmTask::ClearCacheItems { .. } => TaskKind::ClearCacheItems,
            FarmTask::ClearFullPageCache => TaskKind::ClearFullPageCache,
            FarmTask::RemovePersistentStorageKey { .. } => TaskKind::RemovePersistentStorageKey,
            FarmTask::UpdateAttachment(_) => TaskKind::UpdateAttachment,
            FarmTask::DeleteAttachment(_) => TaskKind::DeleteAttachment,
        }
    }

    pub fn into_payload(self, origin: ServerName) -> TaskPayload {
        let kind = self.kind();
        match self {
            FarmTask::TouchCacheItem { keys } => TaskPayload::new(origin, kind.as_str(), keys),
            FarmTask::RemoveCacheItem {
                key,
                case_sensitive,
            } => TaskPayload::new(origin, kind.as_str(), vec![case_sensitive.to_string(), key]),
            FarmTask::ClearCacheItems {
                prefix,
                case_sensitive,
            } => TaskPayload::new(
                origin,
                kind.as_str(),
                vec![case_sensitive.to_string(), prefix],
            ),
            FarmTask::ClearFullPageCache => TaskPayload::new(origin, kind.as_str(), Vec::new()),
            FarmTask::RemovePersistentStorageKey { key } => {
                TaskPayload::new(origin, kind.as_str(), vec![key])
            }
            FarmTask::UpdateAttachment(task) => task.into_payload(origin),
            FarmTask::DeleteAttachment(task) => task.into_payload(origin),
        }
    }
}

/// Helper to get the current system time in milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
