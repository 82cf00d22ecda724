use crate::constants::{DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD, GENESIS_TIMESTAMP};
use crate::error::{LedgerError, Result};
use crate::pow::{count_leading_zero_nibbles, meets_difficulty};
use crate::Block;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainConfig {
    /// Leading zero hex digits required of every mined block hash.
    pub difficulty: usize,
    pub mining_reward: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            mining_reward: DEFAULT_MINING_REWARD,
        }
    }
}

/// The fixed first block: no transactions, zeroed previous hash, nonce 0.
pub fn genesis_block() -> Block {
    Block::new(0, GENESIS_TIMESTAMP, vec![], [0u8; 32])
}

/// Check that `block` may follow `previous` at the given difficulty.
fn check_successor(previous: &Block, block: &Block, difficulty: usize) -> Result<()> {
    if block.index != previous.index + 1 {
        return Err(LedgerError::invalid_block(
            block.index,
            format!("expected index {}", previous.index + 1),
        ));
    }
    if block.previous_hash != previous.hash {
        return Err(LedgerError::invalid_block(
            block.index,
            "previous hash does not match the preceding block",
        ));
    }
    if !block.has_valid_hash() {
        return Err(LedgerError::invalid_block(
            block.index,
            "stored hash does not match its contents",
        ));
    }
    if !meets_difficulty(&block.hash, difficulty) {
        return Err(LedgerError::invalid_block(
            block.index,
            format!(
                "hash has {} leading zero digits, {} required",
                count_leading_zero_nibbles(&block.hash),
                difficulty
            ),
        ));
    }
    Ok(())
}

/// Validate a full sequence of blocks, starting from genesis.
pub fn validate_blocks(blocks: &[Block], difficulty: usize) -> Result<()> {
    let Some(first) = blocks.first() else {
        return Err(LedgerError::invalid_block(0, "chain is empty"));
    };
    if *first != genesis_block() {
        return Err(LedgerError::invalid_block(0, "genesis block mismatch"));
    }
    for pair in blocks.windows(2) {
        check_successor(&pair[0], &pair[1], difficulty)?;
    }
    Ok(())
}

/// Ordered, hash-linked blocks held by one node. Blocks are never mutated
/// once appended.
#[derive(Clone, Debug)]
pub struct Chain {
    blocks: Vec<Block>,
    difficulty: usize,
}

impl Chain {
    /// A chain holding only the genesis block.
    pub fn new(difficulty: usize) -> Self {
        Self {
            blocks: vec![genesis_block()],
            difficulty,
        }
    }

    pub fn from_blocks(blocks: Vec<Block>, difficulty: usize) -> Result<Self> {
        validate_blocks(&blocks, difficulty)?;
        Ok(Self { blocks, difficulty })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: a chain holds at least its genesis block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn head(&self) -> &Block {
        // `blocks` always holds at least the genesis block.
        &self.blocks[self.blocks.len() - 1]
    }

    /// Append `block` if it links to the head, hashes correctly and meets
    /// the difficulty.
    pub fn append(&mut self, block: Block) -> Result<()> {
        check_successor(self.head(), &block, self.difficulty)?;
        debug!(index = block.index, hash = %block.hash_hex(), "Block appended");
        self.blocks.push(block);
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        validate_blocks(&self.blocks, self.difficulty).is_ok()
    }

    /// Longest valid chain wins. Returns `Ok(true)` when `candidate` was
    /// adopted, `Ok(false)` when it is not strictly longer, and the
    /// validation error when it is longer but invalid. Ties keep the current
    /// chain.
    pub fn replace_with(&mut self, candidate: Vec<Block>) -> Result<bool> {
        if candidate.len() <= self.blocks.len() {
            return Ok(false);
        }
        validate_blocks(&candidate, self.difficulty)?;
        info!(
            old_len = self.blocks.len(),
            new_len = candidate.len(),
            "Replacing chain with longer valid chain"
        );
        self.blocks = candidate;
        Ok(true)
    }

    /// Sum of all credits minus all debits for `address`.
    pub fn balance_of(&self, address: &str) -> i128 {
        self.blocks
            .iter()
            .flat_map(|block| block.transactions.iter())
            .map(|tx| tx.delta_for(address))
            .sum()
    }
}
