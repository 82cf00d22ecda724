#![allow(dead_code)]

use ledger_core::{ChainConfig, MinerConfig, QueryAllTarget, SyncConfig};
use ledger_node::{p2p, Node, NodeConfig};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

pub fn test_config(difficulty: usize) -> NodeConfig {
    NodeConfig {
        chain: ChainConfig {
            difficulty,
            mining_reward: 100,
        },
        sync: SyncConfig {
            query_all_target: QueryAllTarget::Broadcast,
        },
        miner: MinerConfig::default(),
        connect_timeout: Duration::from_secs(2),
    }
}

/// A node listening for peers on an ephemeral loopback port.
pub async fn spawn_node(difficulty: usize) -> (Arc<Node>, SocketAddr) {
    let node = Node::new(test_config(difficulty));
    let addr = p2p::spawn_listener(node.clone(), SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("bind p2p listener");
    (node, addr)
}

/// Poll `check` until it holds or five seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
