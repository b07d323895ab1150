//! Web Farm Transport Protocol
//!
//! Tasks travel between servers as bincode-encoded batches posted over HTTP.
//! Bincode keeps binary attachment content compact; the response is JSON.

use crate::membership::types::ServerName;
use crate::tasks::types::TaskPayload;

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Internal endpoint receiving task batches from peer servers.
pub const ENDPOINT_WEBFARM_TASKS: &str = "/internal/webfarm/tasks";
/// Public endpoint reporting the farm state of this server.
pub const ENDPOINT_FARM_STATUS: &str = "/farm/status";

pub const BATCH_CONTENT_TYPE: &str = "application/octet-stream";

// --- Data Transfer Objects ---

/// A group of tasks sent from one server to another in a single request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskBatch {
    pub from: ServerName,
    pub tasks: Vec<TaskPayload>,
}

impl TaskBatch {
    pub fn encode(&self) -> anyhow::Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Outcome of applying a received batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskBatchResponse {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FarmStatusResponse {
    pub server_name: String,
    pub enabled: bool,
    pub peers: Vec<String>,
    pub registered_tasks: Vec<String>,
    pub pending_tasks: usize,
}
