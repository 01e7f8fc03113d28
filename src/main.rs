use clap::Parser;
use quorum_kv::config::{Args, NodeConfig};
use quorum_kv::coordinator::{Coordinator, HttpPeerClient, router};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = NodeConfig::from_args(args)?;

    tracing::info!(
        "Starting node {} ({:?})",
        config.local_node,
        config.local_node.id()
    );
    tracing::info!(
        "Cluster: {} node(s), replication factor {}, {} virtual nodes each",
        config.nodes.len(),
        config.replicas,
        config.virtual_nodes
    );

    // 1. Coordinator with its HTTP peer client:
    let client = Arc::new(HttpPeerClient::new(config.peer_timeout));
    let coordinator = Arc::new(Coordinator::new(&config, client));

    // 2. HTTP Router:
    let app = router(coordinator.clone());

    // 3. Spawn stats reporter:
    let stats = coordinator.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));

        loop {
            interval.tick().await;
            let health = stats.health();
            tracing::info!(
                "Node stats: {} key(s), {} virtual nodes, R={} W={}",
                health.keys,
                health.virtual_nodes,
                health.read_quorum,
                health.write_quorum
            );
            for node in health.nodes {
                tracing::debug!("  - {} ({:?})", node, node.id());
            }
        }
    });

    // 4. Start HTTP server:
    let listener =
        tokio::net::TcpListener::bind((config.local_node.host.as_str(), config.local_node.port))
            .await?;

    tracing::info!("HTTP server listening on {}", config.local_node);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app).await?;

    Ok(())
}
