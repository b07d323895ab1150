//! Outbound Delivery Loop
//!
//! Drains the `TaskOutbox` and posts each server's pending tasks as one batch.
//!
//! ## Delivery Guarantees
//! - **Best effort**: a batch is retried a few times with jittered backoff inside
//!   one delivery attempt, then dropped with a warning. There is no dead-letter queue.
//! - **Order**: tasks for one server are sent in the order they were queued;
//!   nothing is guaranteed across servers.
//! - **Departed servers**: queues of unknown or dead servers are discarded; a
//!   suspected server keeps its queue until it is alive again or declared dead.

use super::outbox::TaskOutbox;
use super::protocol::{BATCH_CONTENT_TYPE, ENDPOINT_WEBFARM_TASKS, TaskBatch, TaskBatchResponse};
use crate::membership::roster::ServerRoster;
use crate::membership::types::{NodeState, Server};
use crate::tasks::types::TaskPayload;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

pub struct TaskSender {
    outbox: Arc<TaskOutbox>,
    roster: Arc<dyn ServerRoster>,
    http_client: reqwest::Client,
    send_interval: Duration,
    request_timeout: Duration,
    attempts: usize,
}

impl TaskSender {
    pub fn new(
        outbox: Arc<TaskOutbox>,
        roster: Arc<dyn ServerRoster>,
        send_interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            outbox,
            roster,
            http_client: reqwest::Client::new(),
            send_interval,
            request_timeout: Duration::from_millis(2000),
            attempts: 3,
        })
    }

    /// Spawns the delivery loop and returns immediately.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tracing::info!(
            "Starting web farm task sender (interval {:?})",
            self.send_interval
        );

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = self.outbox.notified() => {}
                    _ = tokio::time::sleep(self.send_interval) => {}
                }

                self.flush().await;
            }
        })
    }

    /// Sends everything currently queued. Returns the number of delivered tasks.
    pub async fn flush(&self) -> usize {
        let mut deliveries = JoinSet::new();

        for name in self.outbox.pending_servers() {
            let server = match self.roster.get_server(&name) {
                Some(server) if server.is_alive() => server,
                Some(server) if server.state == NodeState::Suspect => {
                    tracing::debug!(
                        "Server {} is suspected, holding {} pending task(s)",
                        name,
                        self.outbox.pending_count(&name)
                    );
                    continue;
                }
                _ => {
                    let dropped = self.outbox.discard(&name);
                    tracing::warn!(
                        "Server {} left the farm, dropping {} pending task(s)",
                        name,
                        dropped
                    );
                    continue;
                }
            };

            let tasks = self.outbox.drain(&name);
            if tasks.is_empty() {
                continue;
            }

            let batch = TaskBatch {
                from: self.roster.local_server().clone(),
                tasks,
            };
            let client = self.http_client.clone();
            let timeout = self.request_timeout;
            let attempts = self.attempts;

            deliveries.spawn(async move {
                let count = batch.tasks.len();
                match send_batch(&client, &server, &batch, timeout, attempts).await {
                    Ok(response) => {
                        tracing::debug!(
                            "Delivered {} task(s) to {} (applied={}, skipped={}, failed={})",
                            count,
                            server.name,
                            response.applied,
                            response.skipped,
                            response.failed
                        );
                        count
                    }
                    Err(e) => {
                        log_dropped(&server, &batch.tasks, &e);
                        0
                    }
                }
            });
        }

        let mut delivered = 0;
        while let Some(result) = deliveries.join_next().await {
            match result {
                Ok(count) => delivered += count,
                Err(e) => tracing::error!("Task delivery panicked: {}", e),
            }
        }
        delivered
    }
}

fn log_dropped(server: &Server, tasks: &[TaskPayload], error: &anyhow::Error) {
    tracing::warn!(
        "Failed to deliver {} task(s) to {} at {}: {}",
        tasks.len(),
        server.name,
        server.http_addr,
        error
    );
}

async fn send_batch(
    client: &reqwest::Client,
    server: &Server,
    batch: &TaskBatch,
    timeout: Duration,
    attempts: usize,
) -> Result<TaskBatchResponse> {
    let url = format!("http://{}{}", server.http_addr, ENDPOINT_WEBFARM_TASKS);
    let body = batch.encode()?;

    let response = post_with_retry(client, url, body, timeout, attempts).await?;

    if !response.status().is_success() {
        return Err(anyhow::anyhow!("Task delivery failed: {}", response.status()));
    }

    Ok(response.json().await?)
}

async fn post_with_retry(
    client: &reqwest::Client,
    url: String,
    body: Vec<u8>,
    timeout: Duration,
    attempts: usize,
) -> Result<reqwest::Response> {
    let mut delay_ms = 150u64;

    for attempt in 0..attempts {
        let response = client
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, BATCH_CONTENT_TYPE)
            .body(body.clone())
            .timeout(timeout)
            .send()
            .await;

        match response {
            Ok(resp) => return Ok(resp),
            Err(e) => {
                if attempt + 1 == attempts {
                    return Err(anyhow::anyhow!(e));
                }
                // Jittered exponential backoff
                let jitter = rand::random::<u64>() % 50;
                tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                delay_ms = (delay_ms * 2).min(1200);
            }
        }
    }

    Err(anyhow::anyhow!("Retry attempts exhausted"))
}
