//! Registry of connected peers.
//!
//! Each peer is represented by the sending half of its connection's bounded
//! outbound queue; the connection task owns the socket. A peer whose queue is
//! full is not keeping up and is dropped.

use crate::constants::PEER_QUEUE_CAPACITY;
use ledger_core::{LedgerError, Message};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

pub type PeerId = u64;

#[derive(Debug)]
struct PeerHandle {
    addr: SocketAddr,
    outbound: mpsc::Sender<Message>,
}

#[derive(Debug)]
pub struct PeerRegistry {
    next_id: AtomicU64,
    peers: RwLock<HashMap<PeerId, PeerHandle>>,
    queue_capacity: usize,
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::with_queue_capacity(PEER_QUEUE_CAPACITY)
    }
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose peers may each have at most `capacity` queued messages.
    pub fn with_queue_capacity(capacity: usize) -> Self {
        Self {
            next_id: AtomicU64::new(0),
            peers: RwLock::new(HashMap::new()),
            queue_capacity: capacity.max(1),
        }
    }

    /// Register a connection and return its id and outbound queue.
    pub fn add(&self, addr: SocketAddr) -> (PeerId, mpsc::Receiver<Message>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (outbound, receiver) = mpsc::channel(self.queue_capacity);
        self.peers.write().insert(id, PeerHandle { addr, outbound });
        info!(peer = id, %addr, "Peer connected");
        (id, receiver)
    }

    pub fn remove(&self, id: PeerId) -> bool {
        match self.peers.write().remove(&id) {
            Some(handle) => {
                info!(peer = id, addr = %handle.addr, "Peer removed");
                true
            }
            None => false,
        }
    }

    /// Queue `message` for one peer. A peer whose connection is gone or whose
    /// queue is full is dropped from the registry.
    pub fn send(&self, id: PeerId, message: Message) -> Result<(), LedgerError> {
        let outbound = self.peers.read().get(&id).map(|h| (h.addr, h.outbound.clone()));
        let Some((addr, outbound)) = outbound else {
            return Err(LedgerError::PeerUnreachable {
                peer: id.to_string(),
                reason: "not connected".to_string(),
            });
        };
        outbound.try_send(message).map_err(|e| {
            self.remove(id);
            let reason = match e {
                TrySendError::Full(_) => "outbound queue full",
                TrySendError::Closed(_) => "connection closed",
            };
            LedgerError::PeerUnreachable {
                peer: addr.to_string(),
                reason: reason.to_string(),
            }
        })
    }

    /// Queue `message` for every peer. Returns how many peers accepted it.
    pub fn broadcast(&self, message: &Message) -> usize {
        let snapshot: Vec<(PeerId, mpsc::Sender<Message>)> = self
            .peers
            .read()
            .iter()
            .map(|(id, h)| (*id, h.outbound.clone()))
            .collect();

        let mut delivered = 0;
        for (id, outbound) in snapshot {
            match outbound.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(peer = id, "Peer is not reading; dropping it");
                    self.remove(id);
                }
                Err(TrySendError::Closed(_)) => {
                    self.remove(id);
                }
            }
        }
        debug!(kind = message.kind(), delivered, "Broadcast");
        delivered
    }

    pub fn addresses(&self) -> Vec<SocketAddr> {
        let mut addrs: Vec<SocketAddr> = self.peers.read().values().map(|h| h.addr).collect();
        addrs.sort();
        addrs
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}
