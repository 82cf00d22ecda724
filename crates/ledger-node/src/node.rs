//! The node controller: sole owner of the ledger, the peer registry and the
//! mining job. Every mutation of chain or pool goes through here.

use crate::config::NodeConfig;
use crate::peers::{PeerId, PeerRegistry};
use ledger_core::{
    Block, ConsensusSync, Ledger, LedgerError, Message, Miner, Outbound, Result, Transaction,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct Node {
    ledger: Mutex<Ledger>,
    sync: ConsensusSync,
    miner: Miner,
    peers: PeerRegistry,
    mining: Mutex<Option<CancellationToken>>,
    config: NodeConfig,
}

/// Clears the mining slot however the mining future ends. A future dropped
/// mid-search also cancels the token so the blocking search stops.
struct MiningSlot<'a>(&'a Mutex<Option<CancellationToken>>);

impl Drop for MiningSlot<'_> {
    fn drop(&mut self) {
        if let Some(token) = self.0.lock().take() {
            token.cancel();
        }
    }
}

impl Node {
    pub fn new(config: NodeConfig) -> Arc<Self> {
        Arc::new(Self {
            ledger: Mutex::new(Ledger::new(config.chain)),
            sync: ConsensusSync::new(config.sync),
            miner: Miner::new(config.miner),
            peers: PeerRegistry::new(),
            mining: Mutex::new(None),
            config,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.ledger.lock().blocks()
    }

    pub fn latest_block(&self) -> Block {
        self.ledger.lock().latest_block().clone()
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.ledger.lock().pool().pending().to_vec()
    }

    /// `(confirmed, pending)` balance of `address`.
    pub fn balance_of(&self, address: &str) -> (i128, i128) {
        let ledger = self.ledger.lock();
        (ledger.balance_of(address), ledger.pending_balance_of(address))
    }

    pub fn is_mining(&self) -> bool {
        self.mining.lock().is_some()
    }

    /// Signal the running mining job, if any, to stop.
    pub fn cancel_mining(&self) -> bool {
        match self.mining.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Add to the pool and gossip it.
    pub fn submit_transaction(&self, tx: Transaction) {
        self.ledger.lock().submit_transaction(tx.clone());
        self.peers.broadcast(&Message::NewTransaction(tx));
    }

    /// Mine the current pool on a blocking thread, append the result and
    /// announce it. The ledger stays available to peers while the search
    /// runs; if the head moves meanwhile the job is cancelled.
    ///
    /// The job is registered and its candidate built under one ledger lock,
    /// so a head change either precedes the candidate or cancels the job.
    /// Lock order is ledger, then mining slot.
    pub async fn mine(&self, reward_address: &str) -> Result<Block> {
        let (token, job) = {
            let ledger = self.ledger.lock();
            let mut slot = self.mining.lock();
            if slot.is_some() {
                return Err(LedgerError::MiningInProgress);
            }
            let token = CancellationToken::new();
            *slot = Some(token.clone());
            (token, ledger.prepare_candidate())
        };
        let _slot = MiningSlot(&self.mining);
        let mined_count = job.mined_count;
        let miner = self.miner;
        info!(
            index = job.candidate.index,
            transactions = mined_count,
            difficulty = job.difficulty,
            "Mining started"
        );

        let searched = tokio::task::spawn_blocking(move || {
            miner.mine_until(job.candidate, job.difficulty, || token.is_cancelled())
        })
        .await;

        let block = match searched {
            Ok(Some(block)) => block,
            Ok(None) => return Err(LedgerError::MiningCancelled),
            Err(e) => {
                warn!(error = %e, "Mining task failed");
                return Err(LedgerError::MiningCancelled);
            }
        };

        let block = self.ledger.lock().seal(block, mined_count, reward_address)?;
        self.peers.broadcast(&Message::LatestBlock(block.clone()));
        Ok(block)
    }

    /// Greet a newly connected peer so chains start reconciling.
    pub fn on_peer_connected(&self, peer: PeerId) {
        if let Err(e) = self.peers.send(peer, self.sync.handshake()) {
            warn!(peer, error = %e, "Handshake failed");
        }
    }

    pub fn handle_peer_message(&self, peer: PeerId, message: Message) {
        let outcome = {
            let mut ledger = self.ledger.lock();
            self.sync.handle(&mut ledger, message)
        };
        if outcome.head_changed && self.cancel_mining() {
            info!("Head moved; cancelled in-flight mining");
        }
        for outbound in outcome.outbound {
            match outbound {
                Outbound::Reply(message) => {
                    if let Err(e) = self.peers.send(peer, message) {
                        warn!(peer, error = %e, "Reply failed");
                    }
                }
                Outbound::Broadcast(message) => {
                    self.peers.broadcast(&message);
                }
            }
        }
    }
}
