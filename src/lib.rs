//! Web Farm Synchronization Library
//!
//! Keeps the independent in-memory caches of several identical servers coherent.
//! When one server changes data it creates a *web farm task*; every other server
//! of the farm receives it and applies the same invalidation locally. Coherence
//! is best-effort and eventually consistent.
//!
//! ## Architecture Modules
//! - **`tasks`**: Task kinds, payloads, the handler registry and inbound processing.
//! - **`dispatcher`**: Creates tasks, applying the farm switch and per-kind guard conditions.
//! - **`transport`**: Per-server outbox, background delivery over HTTP and the receiving endpoint.
//! - **`membership`**: The server roster, discovered by UDP gossip or configured statically.
//! - **`cache`**: Local cache layers and the invalidation task handlers.
//! - **`attachments`**: Replication of attachment files between servers' disks.
//! - **`node`**: Wiring of one server and its HTTP router.

pub mod attachments;
pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod membership;
pub mod node;
pub mod tasks;
pub mod transport;
