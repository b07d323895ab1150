//! Error types for web-farm task registration and execution.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    /// The text data handed to a handler does not have the expected length.
    #[error("Task {task_type} expects {expected} text argument(s), got {actual}")]
    Arity {
        task_type: String,
        expected: String,
        actual: usize,
    },
    #[error("Invalid argument for task {task_type}: {message}")]
    InvalidArgument { task_type: String, message: String },
    #[error("Unknown web farm task type: {0}")]
    UnknownTaskType(String),
    #[error("Web farm task {0} is already registered")]
    DuplicateRegistration(String),
    #[error("Web farm task {0} is not registered")]
    NotRegistered(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TaskError {
    fn from(error: serde_json::Error) -> Self {
        TaskError::Serialization(error.to_string())
    }
}

pub type TaskResult<T> = Result<T, TaskError>;
