//! Server Roster & Discovery Module
//!
//! Tracks which servers of the web farm are eligible to receive tasks.
//! Servers discover each other with a gossip protocol (inspired by SWIM) or
//! are listed statically in configuration.
//!
//! ## Core Mechanisms
//! - **Gossip Protocol**: Servers periodically exchange pings via UDP to keep a consistent roster.
//! - **Failure Detection**: "Suspect" -> "Dead" transitions with timeouts remove crashed servers
//!   from the delivery targets.
//! - **Incarnation Numbers**: Resolve disputes when a server's state (Alive/Suspect) is contested.
//! - **Snapshot Semantics**: `ServerRoster::peers` is a point-in-time view; a broadcast may miss a
//!   server that joins mid-broadcast or target one that has just left.

pub mod roster;
pub mod service;
pub mod types;
