use anyhow::Context;
use clap::Parser;
use ledger_node::{api, p2p, Args, Node, NodeConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = NodeConfig::from(&args);
    info!(
        difficulty = config.chain.difficulty,
        reward = config.chain.mining_reward,
        "Starting ledger node"
    );
    let node = Node::new(config);

    p2p::spawn_listener(node.clone(), args.p2p_addr)
        .await
        .with_context(|| format!("binding p2p listener on {}", args.p2p_addr))?;

    for peer in &args.peers {
        match p2p::connect(&node, peer).await {
            Ok(addr) => info!(%addr, "Connected to initial peer"),
            Err(e) => warn!(error = %e, "Initial peer unavailable"),
        }
    }

    let app = api::router(node);
    let listener = tokio::net::TcpListener::bind(args.http_addr)
        .await
        .with_context(|| format!("binding http listener on {}", args.http_addr))?;
    info!("ledger-node listening on http://{}", args.http_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Listening for shutdown signal failed");
    }
    info!("Shutting down");
}
