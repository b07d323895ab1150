//! Web Farm Task Module
//!
//! Defines what a web farm task is and how a server applies one.
//!
//! ## Overview
//! 1. **Registration**: At startup every module registers its task kinds with the
//!    `TaskRegistry`, supplying a handler and an execution policy.
//! 2. **Encoding**: Callers build a typed `FarmTask`; it is encoded into a string-keyed
//!    `TaskPayload` only when it leaves the process.
//! 3. **Processing**: Payloads received from peers are resolved back to a registered kind
//!    by the `TaskProcessor` and handed to the handler.
//!
//! ## Submodules
//! - **`types`**: Task kinds, payloads and the typed `FarmTask` variants.
//! - **`registry`**: Maps task kinds to handlers and policies.
//! - **`processor`**: Applies inbound tasks with deduplication and policy checks.

pub mod processor;
pub mod registry;
pub mod types;

#[cfg(test)]
mod tests;
