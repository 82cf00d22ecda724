use crate::constants::{DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_HTTP_ADDR, DEFAULT_P2P_ADDR};
use clap::{Parser, ValueEnum};
use ledger_core::constants::{DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD};
use ledger_core::{ChainConfig, MinerConfig, QueryAllTarget, SyncConfig};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "ledger-node")]
#[command(about = "Proof-of-work ledger node with peer synchronization")]
pub struct Args {
    /// Address for the administrative HTTP API
    #[arg(long, env = "HTTP_ADDR", default_value = DEFAULT_HTTP_ADDR)]
    pub http_addr: SocketAddr,

    /// Address for peer connections
    #[arg(long, env = "P2P_ADDR", default_value = DEFAULT_P2P_ADDR)]
    pub p2p_addr: SocketAddr,

    /// Peers to dial at startup, e.g. 127.0.0.1:6002,127.0.0.1:6003
    #[arg(long, env = "PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// Leading zero hex digits required of a block hash
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
    pub difficulty: usize,

    /// Amount paid to the miner of each block
    #[arg(long, default_value_t = DEFAULT_MINING_REWARD)]
    pub mining_reward: u64,

    /// Search nonces on all cores
    #[arg(long)]
    pub parallel_mining: bool,

    /// Who to ask for full chains when an announced block does not link
    #[arg(long, value_enum, default_value_t = QueryAllTargetArg::Broadcast)]
    pub query_all_target: QueryAllTargetArg,

    /// Give up dialing a peer after this many milliseconds
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum QueryAllTargetArg {
    Broadcast,
    Sender,
}

impl From<QueryAllTargetArg> for QueryAllTarget {
    fn from(arg: QueryAllTargetArg) -> Self {
        match arg {
            QueryAllTargetArg::Broadcast => QueryAllTarget::Broadcast,
            QueryAllTargetArg::Sender => QueryAllTarget::Sender,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct NodeConfig {
    pub chain: ChainConfig,
    pub sync: SyncConfig,
    pub miner: MinerConfig,
    pub connect_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            chain: ChainConfig::default(),
            sync: SyncConfig::default(),
            miner: MinerConfig::default(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }
}

impl From<&Args> for NodeConfig {
    fn from(args: &Args) -> Self {
        Self {
            chain: ChainConfig {
                difficulty: args.difficulty,
                mining_reward: args.mining_reward,
            },
            sync: SyncConfig {
                query_all_target: args.query_all_target.into(),
            },
            miner: MinerConfig {
                parallel: args.parallel_mining,
            },
            connect_timeout: Duration::from_millis(args.connect_timeout_ms),
        }
    }
}
