pub mod api;
pub mod config;
mod constants;
pub mod node;
pub mod p2p;
pub mod peers;

pub use config::{Args, NodeConfig};
pub use node::Node;
pub use peers::{PeerId, PeerRegistry};
