//! Attachment Replication Module
//!
//! Keeps attachment files stored on each server's local disk in step across the
//! farm. Saving or deleting an attachment on one server creates an I/O task that
//! carries the file content (or just its identity for deletes) to the peers.
//!
//! These tasks are skipped on servers configured with shared storage and are
//! only created while attachment synchronization is enabled.

pub mod store;
pub mod tasks;
pub mod types;

#[cfg(test)]
mod tests;
