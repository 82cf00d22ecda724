//! The state one node owns: its chain, its pool and the rules binding them.
//!
//! Mining is split in two so the expensive search can run without holding
//! the ledger: [`Ledger::prepare_candidate`] snapshots the pool, and
//! [`Ledger::seal`] appends the result and reseeds the pool.

use crate::chain::{Chain, ChainConfig};
use crate::error::{LedgerError, Result};
use crate::mine::Miner;
use crate::pool::TransactionPool;
use crate::pow::build_candidate;
use crate::{now_millis, Block, Transaction};
use tracing::{info, warn};

/// A candidate block plus the number of pool entries it consumed.
#[derive(Clone, Debug)]
pub struct MiningJob {
    pub candidate: Block,
    pub mined_count: usize,
    pub difficulty: usize,
}

#[derive(Clone, Debug)]
pub struct Ledger {
    chain: Chain,
    pool: TransactionPool,
    config: ChainConfig,
}

impl Ledger {
    pub fn new(config: ChainConfig) -> Self {
        Self {
            chain: Chain::new(config.difficulty),
            pool: TransactionPool::new(),
            config,
        }
    }

    pub fn config(&self) -> ChainConfig {
        self.config
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn pool(&self) -> &TransactionPool {
        &self.pool
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.chain.blocks().to_vec()
    }

    pub fn latest_block(&self) -> &Block {
        self.chain.head()
    }

    pub fn submit_transaction(&mut self, tx: Transaction) {
        self.pool.submit(tx);
    }

    /// Balance recorded in mined blocks.
    pub fn balance_of(&self, address: &str) -> i128 {
        self.chain.balance_of(address)
    }

    /// Confirmed balance plus the effect of pending transactions, including
    /// a reward that has been granted but not yet mined.
    pub fn pending_balance_of(&self, address: &str) -> i128 {
        self.chain.balance_of(address) + self.pool.pending_delta_for(address)
    }

    pub fn append_block(&mut self, block: Block) -> Result<()> {
        self.chain.append(block)
    }

    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<bool> {
        self.chain.replace_with(candidate)
    }

    /// Snapshot the pool into a candidate block on top of the current head.
    pub fn prepare_candidate(&self) -> MiningJob {
        let pending = self.pool.pending();
        MiningJob {
            candidate: build_candidate(pending, self.chain.head(), now_millis()),
            mined_count: pending.len(),
            difficulty: self.config.difficulty,
        }
    }

    /// Append a block sealed from a [`MiningJob`] and reward `reward_address`.
    /// If the head moved while mining, the block is discarded with
    /// [`LedgerError::StaleBlock`] and nothing changes.
    pub fn seal(&mut self, block: Block, mined_count: usize, reward_address: &str) -> Result<Block> {
        if block.previous_hash != self.chain.head().hash {
            warn!(index = block.index, "Discarding stale mined block");
            return Err(LedgerError::StaleBlock { index: block.index });
        }
        self.chain.append(block.clone())?;
        self.pool
            .drain_mined_and_reward(mined_count, reward_address, self.config.mining_reward);
        info!(
            index = block.index,
            hash = %block.hash_hex(),
            reward_to = reward_address,
            "Block successfully mined"
        );
        Ok(block)
    }

    /// Mine the whole pool in place, without cancellation.
    pub fn mine_pending(&mut self, reward_address: &str, miner: &Miner) -> Result<Block> {
        let job = self.prepare_candidate();
        let block = miner
            .mine_until(job.candidate, job.difficulty, || false)
            .ok_or(LedgerError::MiningCancelled)?;
        self.seal(block, job.mined_count, reward_address)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(ChainConfig::default())
    }
}
