//! Cache Invalidation Module
//!
//! The local cache layers of a server and the web farm tasks that invalidate them.
//!
//! ## Cache Layers
//! - **`store`**: In-memory data cache with touch-based dependency invalidation.
//! - **`output`**: Full-page output cache.
//! - **`persistent`**: File-backed storage with an in-memory index that can be evicted
//!   independently of the files.
//!
//! ## Farm Coherence
//! - **`tasks`**: Handlers applying TOUCHCACHEITEM, REMOVECACHEITEM, CLEARCACHEITEMS,
//!   CLEARFULLPAGECACHE and REMOVEPERSISTENTSTORAGEKEY on a receiving server.
//! - **`helper`**: Applies an operation locally and creates the matching task for the peers.
//! - **`handlers`** / **`protocol`**: HTTP surface of the helper.

pub mod handlers;
pub mod helper;
pub mod output;
pub mod persistent;
pub mod protocol;
pub mod store;
pub mod tasks;
