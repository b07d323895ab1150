use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

/// Unique name of a server participating in the web farm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerName(pub String);

impl ServerName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Generates a random name for servers started without an explicit one.
    pub fn generate() -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("server-{}", &id[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum NodeState {
    Alive,
    Suspect,
    Dead,
}

/// A single server of the farm.
///
/// `gossip_addr` carries membership traffic, `http_addr` receives web farm
/// tasks. The `incarnation` field is a logical clock used to order updates
/// and refute a false "Suspect" claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub name: ServerName,
    pub gossip_addr: SocketAddr,
    pub http_addr: SocketAddr,
    pub state: NodeState,
    pub incarnation: u64,

    #[serde(skip)]
    pub last_seen: Option<Instant>,
}

impl Server {
    pub fn new(name: ServerName, gossip_addr: SocketAddr, http_addr: SocketAddr) -> Self {
        Self {
            name,
            gossip_addr,
            http_addr,
            state: NodeState::Alive,
            incarnation: 1,
            last_seen: Some(Instant::now()),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state == NodeState::Alive
    }
}

/// The gossip wire protocol.
///
/// - `Ping/Ack`: liveness checks and roster synchronization.
/// - `Join`: sent by a starting server to the seed servers.
/// - `Suspect/Alive`: disseminate changes in server health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GossipMessage {
    Ping {
        from: ServerName,
        http_addr: SocketAddr,
        incarnation: u64,
    },

    Ack {
        from: ServerName,
        incarnation: u64,
        members: Vec<Server>,
    },

    Join {
        server: Server,
    },

    Suspect {
        name: ServerName,
        incarnation: u64,
    },

    Alive {
        name: ServerName,
        incarnation: u64,
    },
}
