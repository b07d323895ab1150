use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use webfarm_sync::config::{FarmSettings, USAGE};
use webfarm_sync::membership::roster::{ServerRoster, StaticRoster};
use webfarm_sync::membership::service::MembershipService;
use webfarm_sync::node::FarmNode;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{}", USAGE);
        eprintln!("Example: webfarm-node --bind 127.0.0.1:5000 --name web-01");
        eprintln!("Example: webfarm-node --bind 127.0.0.1:5001 --name web-02 --seed 127.0.0.1:5000");
        std::process::exit(1);
    }

    let settings = FarmSettings::from_args(&args)?;

    tracing::info!(
        "Starting server {} on {} (web farm {})",
        settings.server_name,
        settings.bind,
        if settings.enabled { "enabled" } else { "disabled" }
    );

    // 1. Roster: static peers from configuration, gossip otherwise
    let (roster, http_addr): (Arc<dyn ServerRoster>, SocketAddr) = if settings.peers.is_empty() {
        if settings.seeds.is_empty() {
            tracing::info!("Starting as seed server");
        } else {
            tracing::info!("Seed servers: {:?}", settings.seeds);
        }

        let membership = MembershipService::new(
            settings.server_name.clone(),
            settings.bind,
            settings.http_port_offset,
            settings.seeds.clone(),
        )
        .await?;
        let http_addr = membership.local_server.http_addr;

        let service = membership.clone();
        tokio::spawn(async move {
            service.start().await;
        });

        (membership as Arc<dyn ServerRoster>, http_addr)
    } else {
        tracing::info!("Using static roster of {} peer(s)", settings.peers.len());
        let roster = StaticRoster::with_servers(settings.server_name.clone(), settings.peers.clone());
        (Arc::new(roster) as Arc<dyn ServerRoster>, settings.http_addr())
    };

    // 2. Registry, dispatcher, processor, caches
    let node = FarmNode::new(&settings, roster.clone())?;

    // 3. Outbound delivery
    node.sender.clone().start();

    // 4. Roster reporter
    let stats_roster = roster.clone();
    let stats_outbox = node.outbox.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));

        loop {
            interval.tick().await;
            let peers = stats_roster.peers();
            tracing::info!(
                "Farm stats: {} peer(s), {} pending task(s)",
                peers.len(),
                stats_outbox.total_pending()
            );
            for peer in peers {
                tracing::debug!(
                    "  - {} gossip={} http={} (inc={})",
                    peer.name,
                    peer.gossip_addr,
                    peer.http_addr,
                    peer.incarnation
                );
            }
        }
    });

    // 5. HTTP server
    tracing::info!("HTTP server listening on {}", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    axum::serve(listener, node.router()).await?;

    Ok(())
}
