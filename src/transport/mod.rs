//! Web Farm Transport Module
//!
//! Moves created tasks from the dispatching server to its peers.
//!
//! ## Architecture Overview
//! 1. **Queueing**: The dispatcher places one copy of each task in the `TaskOutbox`
//!    queue of every peer.
//! 2. **Delivery**: The `TaskSender` loop wakes on new tasks (or on a timer), drains each
//!    queue and posts it as a single bincode batch.
//! 3. **Receipt**: The receiving server's HTTP handler decodes the batch and hands it to
//!    the `TaskProcessor`.
//!
//! ## Submodules
//! - **`outbox`**: Per-server queues with `GroupData` coalescing.
//! - **`sender`**: Background delivery loop with bounded retry.
//! - **`protocol`**: Endpoints and wire types.
//! - **`handlers`**: Axum handlers for receiving batches and reporting status.

pub mod handlers;
pub mod outbox;
pub mod protocol;
pub mod sender;
