use anyhow::Result;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use std::{net::SocketAddr, time::Duration};
use tokio::net::UdpSocket;
use tokio::sync::RwLock;
use tracing::info;

use super::roster::ServerRoster;
use super::types::{GossipMessage, NodeState, Server, ServerName};

const GOSSIP_INTERVAL: Duration = Duration::from_millis(500);
const FAILURE_DETECTION_INTERVAL: Duration = Duration::from_secs(2);
const SUSPECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEAD_TIMEOUT: Duration = Duration::from_secs(10);

pub struct MembershipService {
    pub local_server: Server,
    pub members: Arc<DashMap<ServerName, Server>>,
    socket: Arc<UdpSocket>,
    incarnation: Arc<RwLock<u64>>,
}

impl MembershipService {
    /// Binds the gossip socket and sends a join request to every seed.
    ///
    /// `http_port_offset` is added to the bound gossip port to obtain the
    /// port on which this server accepts web farm tasks.
    pub async fn new(
        name: ServerName,
        bind_addr: SocketAddr,
        http_port_offset: u16,
        seed_nodes: Vec<SocketAddr>,
    ) -> Result<Arc<Self>> {
        let socket = UdpSocket::bind(bind_addr).await?;
        let gossip_addr = socket.local_addr()?;
        let http_addr = SocketAddr::new(
            gossip_addr.ip(),
            gossip_addr.port().wrapping_add(http_port_offset),
        );

        let incarnation_counter = Arc::new(RwLock::new(1));
        let mut local_server = Server::new(name, gossip_addr, http_addr);
        local_server.incarnation = *incarnation_counter.read().await;

        let members = Arc::new(DashMap::new());
        members.insert(local_server.name.clone(), local_server.clone());

        if !seed_nodes.is_empty() {
            info!("Joining web farm via {} seed server(s)", seed_nodes.len());

            let msg = GossipMessage::Join {
                server: local_server.clone(),
            };
            let encoded = bincode::serialize(&msg)?;

            for seed_node in seed_nodes.iter() {
                socket.send_to(&encoded, seed_node).await?;
                info!("Sent join request to {}", seed_node);
            }
        }

        Ok(Arc::new(Self {
            local_server,
            members,
            socket: Arc::new(socket),
            incarnation: incarnation_counter,
        }))
    }

    pub async fn start(self: Arc<Self>) {
        tracing::info!("Starting membership service...");

        {
            let service = self.clone();
            tokio::spawn(async move {
                service.gossip_loop().await;
            });
        }

        {
            let service = self.clone();
            tokio::spawn(async move {
                service.receive_loop().await;
            });
        }

        {
            let service = self.clone();
            tokio::spawn(async move {
                service.failure_detection_loop().await;
            });
        }

        tracing::info!("All membership background tasks started");
    }

    pub fn get_alive_members(&self) -> Vec<Server> {
        self.members
            .iter()
            .filter(|entry| entry.value().is_alive())
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn get_member(&self, name: &ServerName) -> Option<Server> {
        self.members.get(name).map(|entry| entry.value().clone())
    }

    async fn gossip_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(GOSSIP_INTERVAL);

        loop {
            interval.tick().await;

            let peers = self.peers();
            if peers.is_empty() {
                continue;
            }

            let target = {
                use rand::Rng;
                let idx = rand::thread_rng().gen_range(0..peers.len());
                peers[idx].clone()
            };

            let incarnation = *self.incarnation.read().await;
            let msg = GossipMessage::Ping {
                from: self.local_server.name.clone(),
                http_addr: self.local_server.http_addr,
                incarnation,
            };

            match bincode::serialize(&msg) {
                Ok(encoded) => {
                    if let Err(e) = self.socket.send_to(&encoded, target.gossip_addr).await {
                        tracing::warn!("Failed to send ping to {}: {}", target.name, e);
                    } else {
                        tracing::trace!("Sent ping to {}", target.name);
                    }
                }
                Err(e) => tracing::error!("Failed to serialize GossipMessage::Ping: {}", e),
            }
        }
    }

    async fn receive_loop(self: Arc<Self>) {
        let mut buf = vec![0u8; 65536];

        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((len, src)) => match bincode::deserialize::<GossipMessage>(&buf[..len]) {
                    Ok(msg) => {
                        if let Err(e) = self.handle_message(msg, src).await {
                            tracing::error!("Error handling gossip from {}: {}", src, e);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to deserialize gossip from {}: {}", src, e);
                    }
                },
                Err(e) => {
                    tracing::error!("Failed to receive UDP packet: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    pub(crate) async fn handle_message(&self, msg: GossipMessage, src: SocketAddr) -> Result<()> {
        match msg {
            GossipMessage::Ping {
                from,
                http_addr,
                incarnation,
            } => {
                self.handle_ping(from, http_addr, incarnation, src).await?;
            }

            GossipMessage::Ack {
                from,
                incarnation,
                members,
            } => {
                self.handle_ack(from, incarnation, members).await;
            }

            GossipMessage::Join { server } => {
                self.handle_join(server);
            }

            GossipMessage::Suspect { name, incarnation } => {
                self.handle_suspect(name, incarnation).await;
            }

            GossipMessage::Alive { name, incarnation } => {
                self.handle_alive(name, incarnation);
            }
        }

        Ok(())
    }

    async fn handle_ping(
        &self,
        from: ServerName,
        http_addr: SocketAddr,
        from_incarnation: u64,
        src: SocketAddr,
    ) -> Result<()> {
        tracing::trace!("Received ping from {}", from);

        if let Some(mut member) = self.members.get_mut(&from) {
            member.http_addr = http_addr;
            if from_incarnation > member.incarnation {
                member.incarnation = from_incarnation;
            }
            mark_contacted(&mut member);
        } else {
            tracing::info!("Discovered new server via ping: {} at {}", from, src);

            let mut server = Server::new(from.clone(), src, http_addr);
            server.incarnation = from_incarnation;
            self.members.insert(from.clone(), server);
        }

        let all_members: Vec<Server> = self
            .members
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let my_incarnation = *self.incarnation.read().await;
        let reply = GossipMessage::Ack {
            from: self.local_server.name.clone(),
            incarnation: my_incarnation,
            members: all_members,
        };

        let encoded = bincode::serialize(&reply)?;
        self.socket.send_to(&encoded, src).await?;

        tracing::trace!("Sent ack to {} with {} members", from, self.members.len());

        Ok(())
    }

    async fn handle_ack(&self, from: ServerName, from_incarnation: u64, members: Vec<Server>) {
        tracing::trace!(
            "Received ack from {} (inc={}) with {} members",
            from,
            from_incarnation,
            members.len()
        );

        if let Some(mut member) = self.members.get_mut(&from) {
            if from_incarnation > member.incarnation {
                member.incarnation = from_incarnation;
            }
            mark_contacted(&mut member);
        }

        for member in members {
            if member.name == self.local_server.name {
                if member.state != NodeState::Alive {
                    self.refute_suspicion(member.incarnation).await;
                }
                continue;
            }
            self.merge_member(member);
        }
    }

    pub(crate) fn merge_member(&self, new_member: Server) {
        if new_member.name == self.local_server.name {
            return;
        }

        match self.members.get_mut(&new_member.name) {
            Some(mut existing) => {
                if new_member.incarnation > existing.incarnation {
                    tracing::debug!(
                        "Updating {}: inc {} -> {}",
                        new_member.name,
                        existing.incarnation,
                        new_member.incarnation,
                    );

                    existing.state = new_member.state;
                    existing.incarnation = new_member.incarnation;
                    existing.http_addr = new_member.http_addr;
                    existing.last_seen = Some(Instant::now());
                } else if new_member.incarnation == existing.incarnation
                    && new_member.state == NodeState::Alive
                    && existing.state == NodeState::Suspect
                {
                    tracing::info!("{} refuted suspicion", new_member.name);
                    existing.state = NodeState::Alive;
                    existing.last_seen = Some(Instant::now());
                }
            }
            None => {
                tracing::info!(
                    "Discovered new server: {} at {}",
                    new_member.name,
                    new_member.gossip_addr
                );

                let mut member_with_timestamp = new_member;
                member_with_timestamp.last_seen = Some(Instant::now());

                self.members
                    .insert(member_with_timestamp.name.clone(), member_with_timestamp);
            }
        }
    }

    /// Outbids a suspicion of the local server with a higher incarnation and
    /// announces it.
    pub(crate) async fn refute_suspicion(&self, suspected_incarnation: u64) {
        let my_incarnation = {
            let mut inc = self.incarnation.write().await;
            if suspected_incarnation < *inc {
                return;
            }
            *inc = suspected_incarnation + 1;
            *inc
        };

        tracing::info!("Refuting suspicion of local server (inc={})", my_incarnation);

        if let Some(mut local) = self.members.get_mut(&self.local_server.name) {
            local.incarnation = my_incarnation;
            local.state = NodeState::Alive;
        }

        self.broadcast_message(GossipMessage::Alive {
            name: self.local_server.name.clone(),
            incarnation: my_incarnation,
        })
        .await;
    }

    async fn handle_suspect(&self, name: ServerName, incarnation: u64) {
        if name == self.local_server.name {
            self.refute_suspicion(incarnation).await;
            return;
        }

        match self.members.get_mut(&name) {
            Some(mut existing) => {
                if incarnation >= existing.incarnation && existing.state == NodeState::Alive {
                    tracing::info!("Server {} at {} suspected", existing.name, existing.gossip_addr);
                    existing.state = NodeState::Suspect;
                    existing.incarnation = incarnation;
                }
            }
            None => {
                tracing::debug!("Suspected server {} doesn't exist", name);
            }
        }
    }

    pub(crate) fn handle_alive(&self, name: ServerName, incarnation: u64) {
        match self.members.get_mut(&name) {
            Some(mut existing) => {
                if incarnation > existing.incarnation {
                    tracing::info!(
                        "Server {} at {} is now Alive (inc={})",
                        existing.name,
                        existing.gossip_addr,
                        incarnation
                    );
                    existing.state = NodeState::Alive;
                    existing.incarnation = incarnation;
                    existing.last_seen = Some(Instant::now());
                } else if incarnation == existing.incarnation
                    && existing.state == NodeState::Suspect
                {
                    tracing::info!(
                        "Server {} at {} refuted suspicion",
                        existing.name,
                        existing.gossip_addr,
                    );
                    existing.state = NodeState::Alive;
                    existing.last_seen = Some(Instant::now());
                }
            }
            None => {
                tracing::debug!("Alive message for unknown server {}", name);
            }
        }
    }

    pub(crate) fn handle_join(&self, mut server: Server) {
        tracing::info!("Server {} joining farm at {}", server.name, server.gossip_addr);

        server.state = NodeState::Alive;
        server.last_seen = Some(Instant::now());

        self.members.insert(server.name.clone(), server);

        tracing::info!("Farm size now: {}", self.members.len());
    }

    async fn failure_detection_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(FAILURE_DETECTION_INTERVAL);

        loop {
            interval.tick().await;
            let messages_to_broadcast = self.detect_failures(Instant::now());

            for msg in messages_to_broadcast {
                // Suspected servers are not peers; tell them directly
                if let GossipMessage::Suspect { name, .. } = &msg
                    && let Some(suspect) = self.get_member(name)
                {
                    self.send_message(&msg, suspect.gossip_addr).await;
                }
                self.broadcast_message(msg).await;
            }
        }
    }

    /// Advances Alive -> Suspect -> Dead for members not heard from in time.
    /// Returns the suspicion messages to disseminate.
    pub(crate) fn detect_failures(&self, now: Instant) -> Vec<GossipMessage> {
        let mut messages = Vec::new();

        for mut entry in self.members.iter_mut() {
            let member = entry.value_mut();

            if member.name == self.local_server.name {
                continue;
            }

            let Some(last_seen) = member.last_seen else {
                member.last_seen = Some(now);
                continue;
            };
            let elapsed = now.saturating_duration_since(last_seen);

            match member.state {
                NodeState::Alive if elapsed > SUSPECT_TIMEOUT => {
                    tracing::warn!("Server {} suspected (no contact for {:?})", member.name, elapsed);

                    member.state = NodeState::Suspect;
                    messages.push(GossipMessage::Suspect {
                        name: member.name.clone(),
                        incarnation: member.incarnation,
                    });
                }
                NodeState::Suspect if elapsed > DEAD_TIMEOUT => {
                    tracing::warn!("Server {} declared dead (no contact for {:?})", member.name, elapsed);
                    member.state = NodeState::Dead;
                }
                _ => {}
            }
        }

        messages
    }

    async fn send_message(&self, msg: &GossipMessage, target: SocketAddr) {
        match bincode::serialize(msg) {
            Ok(encoded) => {
                if let Err(e) = self.socket.send_to(&encoded, target).await {
                    tracing::warn!("Failed to send gossip to {}: {}", target, e);
                }
            }
            Err(e) => tracing::error!("Failed to serialize gossip message: {}", e),
        }
    }

    async fn broadcast_message(&self, msg: GossipMessage) {
        let encoded = match bincode::serialize(&msg) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!("Failed to serialize gossip broadcast: {}", e);
                return;
            }
        };

        for member in self.peers() {
            if let Err(e) = self.socket.send_to(&encoded, member.gossip_addr).await {
                tracing::warn!("Failed to broadcast to {}: {}", member.name, e);
            }
        }
    }
}

/// Direct contact proves the member is alive, whatever gossip said before.
fn mark_contacted(member: &mut Server) {
    member.last_seen = Some(Instant::now());
    if member.state != NodeState::Alive {
        tracing::info!("Server {} at {} is reachable again", member.name, member.gossip_addr);
        member.state = NodeState::Alive;
    }
}

impl ServerRoster for MembershipService {
    fn local_server(&self) -> &ServerName {
        &self.local_server.name
    }

    fn peers(&self) -> Vec<Server> {
        self.members
            .iter()
            .filter(|entry| entry.key() != &self.local_server.name && entry.value().is_alive())
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn get_server(&self, name: &ServerName) -> Option<Server> {
        self.get_member(name)
    }
}
