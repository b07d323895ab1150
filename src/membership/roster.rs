//! Server roster abstraction.
//!
//! The dispatcher only needs a snapshot of the peers a task should be
//! delivered to. Two sources exist: the gossip `MembershipService` and a
//! `StaticRoster` built from configuration.

use super::types::{Server, ServerName};

use dashmap::DashMap;

pub trait ServerRoster: Send + Sync {
    /// Name of the server this process runs as.
    fn local_server(&self) -> &ServerName;

    /// Alive servers eligible to receive tasks, never including the local one.
    fn peers(&self) -> Vec<Server>;

    /// Looks up a single known server by name.
    fn get_server(&self, name: &ServerName) -> Option<Server>;
}

/// A fixed roster, for farms whose membership is configured up front.
pub struct StaticRoster {
    local: ServerName,
    servers: DashMap<ServerName, Server>,
}

impl StaticRoster {
    pub fn new(local: ServerName) -> Self {
        Self {
            local,
            servers: DashMap::new(),
        }
    }

    pub fn with_servers(local: ServerName, servers: impl IntoIterator<Item = Server>) -> Self {
        let roster = Self::new(local);
        for server in servers {
            roster.add_server(server);
        }
        roster
    }

    pub fn add_server(&self, server: Server) {
        self.servers.insert(server.name.clone(), server);
    }

    pub fn remove_server(&self, name: &ServerName) -> Option<Server> {
        self.servers.remove(name).map(|(_, server)| server)
    }
}

impl ServerRoster for StaticRoster {
    fn local_server(&self) -> &ServerName {
        &self.local
    }

    fn peers(&self) -> Vec<Server> {
        let mut peers: Vec<Server> = self
            .servers
            .iter()
            .filter(|entry| entry.key() != &self.local && entry.value().is_alive())
            .map(|entry| entry.value().clone())
            .collect();
        peers.sort_by(|a, b| a.name.cmp(&b.name));
        peers
    }

    fn get_server(&self, name: &ServerName) -> Option<Server> {
        self.servers.get(name).map(|entry| entry.value().clone())
    }
}
