//! Node configuration.
//!
//! Settings come from command-line flags, with `WEBFARM_ENABLED` and
//! `WEBFARM_SERVER_NAME` as environment fallbacks.

use crate::membership::types::{Server, ServerName};

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HTTP_PORT_OFFSET: u16 = 1000;
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_millis(500);

pub const USAGE: &str = "Usage: webfarm-node --bind <addr:port> [--name <server>] [--seed <addr:port>]... \
[--peer <name=addr:port>]... [--disabled] [--sync-attachments] [--shared-storage] \
[--attachments <dir>] [--persistent <dir>] [--send-interval-ms <ms>]";

#[derive(Debug, Clone)]
pub struct FarmSettings {
    /// Master switch: while false no task is ever created.
    pub enabled: bool,
    pub server_name: ServerName,
    /// Gossip (UDP) bind address; tasks are received on its port + `http_port_offset`.
    pub bind: SocketAddr,
    pub http_port_offset: u16,
    pub seeds: Vec<SocketAddr>,
    /// Static roster entries; when non-empty gossip is not used.
    pub peers: Vec<Server>,
    pub sync_attachments: bool,
    /// All servers read the same disk, so I/O tasks are not applied.
    pub shared_storage: bool,
    pub attachment_root: PathBuf,
    pub persistent_root: PathBuf,
    pub send_interval: Duration,
}

impl FarmSettings {
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            enabled: true,
            server_name: ServerName::generate(),
            bind,
            http_port_offset: DEFAULT_HTTP_PORT_OFFSET,
            seeds: Vec::new(),
            peers: Vec::new(),
            sync_attachments: false,
            shared_storage: false,
            attachment_root: PathBuf::from("data/attachments"),
            persistent_root: PathBuf::from("data/persistent"),
            send_interval: DEFAULT_SEND_INTERVAL,
        }
    }

    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(
            self.bind.ip(),
            self.bind.port().wrapping_add(self.http_port_offset),
        )
    }

    /// Parses `args` (without the program name).
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut bind: Option<SocketAddr> = None;
        let mut name: Option<ServerName> = std::env::var("WEBFARM_SERVER_NAME")
            .ok()
            .filter(|name| !name.trim().is_empty())
            .map(ServerName::new);
        let mut enabled = std::env::var("WEBFARM_ENABLED")
            .map(|value| parse_flag(&value))
            .unwrap_or(true);
        let mut seeds = Vec::new();
        let mut peer_entries = Vec::new();
        let mut sync_attachments = false;
        let mut shared_storage = false;
        let mut attachment_root = None;
        let mut persistent_root = None;
        let mut send_interval = DEFAULT_SEND_INTERVAL;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--bind" => {
                    bind = Some(value(args, i)?.parse().context("invalid --bind address")?);
                    i += 2;
                }
                "--seed" => {
                    seeds.push(value(args, i)?.parse().context("invalid --seed address")?);
                    i += 2;
                }
                "--name" => {
                    name = Some(ServerName::new(value(args, i)?));
                    i += 2;
                }
                "--peer" => {
                    peer_entries.push(value(args, i)?.to_string());
                    i += 2;
                }
                "--attachments" => {
                    attachment_root = Some(PathBuf::from(value(args, i)?));
                    i += 2;
                }
                "--persistent" => {
                    persistent_root = Some(PathBuf::from(value(args, i)?));
                    i += 2;
                }
                "--send-interval-ms" => {
                    let ms: u64 = value(args, i)?
                        .parse()
                        .context("invalid --send-interval-ms")?;
                    send_interval = Duration::from_millis(ms.max(1));
                    i += 2;
                }
                "--disabled" => {
                    enabled = false;
                    i += 1;
                }
                "--sync-attachments" => {
                    sync_attachments = true;
                    i += 1;
                }
                "--shared-storage" => {
                    shared_storage = true;
                    i += 1;
                }
                other => {
                    tracing::warn!("Ignoring unknown argument {}", other);
                    i += 1;
                }
            }
        }

        let bind = bind.ok_or_else(|| anyhow::anyhow!("--bind is required"))?;
        let mut settings = Self::new(bind);
        settings.enabled = enabled;
        if let Some(name) = name {
            settings.server_name = name;
        }
        settings.seeds = seeds;
        settings.sync_attachments = sync_attachments;
        settings.shared_storage = shared_storage;
        settings.send_interval = send_interval;
        if let Some(root) = attachment_root {
            settings.attachment_root = root;
        }
        if let Some(root) = persistent_root {
            settings.persistent_root = root;
        }
        settings.peers = peer_entries
            .iter()
            .map(|entry| parse_peer(entry, settings.http_port_offset))
            .collect::<Result<_>>()?;

        Ok(settings)
    }
}

fn value(args: &[String], i: usize) -> Result<&str> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("{} requires a value", args[i]))
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

/// Parses `name=addr:port` where the address is the peer's gossip address.
fn parse_peer(entry: &str, http_port_offset: u16) -> Result<Server> {
    let (name, addr) = entry
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("--peer expects name=addr:port, got '{}'", entry))?;
    let gossip_addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid peer address '{}'", addr))?;
    let http_addr = SocketAddr::new(
        gossip_addr.ip(),
        gossip_addr.port().wrapping_add(http_port_offset),
    );
    Ok(Server::new(ServerName::new(name.trim()), gossip_addr, http_addr))
}
