//! Sequential proof-of-work search.

use crate::constants::MINING_CHECK_INTERVAL;
use crate::{digest_with_nonce, Block, Hash, Transaction};
use tracing::info;

/// Number of leading `0` hex digits in the hash.
pub fn count_leading_zero_nibbles(hash: &Hash) -> usize {
    let mut total = 0usize;
    for b in hash {
        if *b == 0 {
            total += 2;
        } else {
            if b >> 4 == 0 {
                total += 1;
            }
            break;
        }
    }
    total
}

pub fn meets_difficulty(hash: &Hash, difficulty: usize) -> bool {
    count_leading_zero_nibbles(hash) >= difficulty
}

/// Candidate block extending `previous` with the given pending transactions.
pub fn build_candidate(pool: &[Transaction], previous: &Block, timestamp: u64) -> Block {
    Block::new(
        previous.index + 1,
        timestamp,
        pool.to_vec(),
        previous.hash,
    )
}

/// Mine the block by incrementing nonce until the hash has at least
/// `difficulty` leading zero hex digits. Never gives up.
pub fn mine(mut block: Block, difficulty: usize) -> Block {
    let prefix = block.preimage_prefix();
    block.hash = digest_with_nonce(&prefix, block.nonce);
    while !meets_difficulty(&block.hash, difficulty) {
        block.nonce = block.nonce.wrapping_add(1);
        block.hash = digest_with_nonce(&prefix, block.nonce);
    }
    info!(index = block.index, nonce = block.nonce, hash = %block.hash_hex(), "Block mined");
    block
}

/// Same search as [`mine`], but polls `should_abort` every
/// `MINING_CHECK_INTERVAL` nonces and returns `None` once it reports true.
pub fn mine_until<F>(mut block: Block, difficulty: usize, should_abort: F) -> Option<Block>
where
    F: Fn() -> bool,
{
    let prefix = block.preimage_prefix();
    block.hash = digest_with_nonce(&prefix, block.nonce);
    while !meets_difficulty(&block.hash, difficulty) {
        block.nonce = block.nonce.wrapping_add(1);
        if block.nonce % MINING_CHECK_INTERVAL == 0 && should_abort() {
            info!(index = block.index, nonce = block.nonce, "Mining aborted");
            return None;
        }
        block.hash = digest_with_nonce(&prefix, block.nonce);
    }
    info!(index = block.index, nonce = block.nonce, hash = %block.hash_hex(), "Block mined");
    Some(block)
}

/// Build a candidate on top of `previous` from `pool` and mine it.
pub fn mine_block(pool: &[Transaction], previous: &Block, difficulty: usize) -> Block {
    mine(build_candidate(pool, previous, crate::now_millis()), difficulty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::genesis_block;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn leading_zero_nibbles_examples() {
        let mut h = [0u8; 32];
        assert_eq!(count_leading_zero_nibbles(&h), 64);
        h[0] = 0x0F;
        assert_eq!(count_leading_zero_nibbles(&h), 1);
        h[0] = 0x10;
        assert_eq!(count_leading_zero_nibbles(&h), 0);
        h = [0u8; 32];
        h[1] = 0x80;
        assert_eq!(count_leading_zero_nibbles(&h), 2);
        h[1] = 0x01;
        assert_eq!(count_leading_zero_nibbles(&h), 3);
    }

    #[test]
    fn leading_zero_nibbles_agree_with_hex() {
        let mut h = [0xffu8; 32];
        h[0] = 0x00;
        h[1] = 0x0a;
        let hex = hex::encode(h);
        let from_hex = hex.chars().take_while(|c| *c == '0').count();
        assert_eq!(count_leading_zero_nibbles(&h), from_hex);
    }

    #[test]
    fn mine_block_example() {
        let genesis = genesis_block();
        let pool = vec![Transaction::new("Alice", "Bob", 10)];
        let mined = mine_block(&pool, &genesis, 3);
        assert!(mined.hash_hex().starts_with("000"));
        assert!(mined.has_valid_hash());
        assert_eq!(mined.index, 1);
        assert_eq!(mined.previous_hash, genesis.hash);
        assert_eq!(mined.transactions, pool);
    }

    #[test]
    fn mine_with_zero_difficulty_keeps_nonce() {
        let candidate = build_candidate(&[], &genesis_block(), 1_000);
        let mined = mine(candidate, 0);
        assert_eq!(mined.nonce, 0);
        assert!(mined.has_valid_hash());
    }

    #[test]
    fn mine_until_finds_same_block_as_mine() {
        let candidate = build_candidate(&[], &genesis_block(), 1_000);
        let a = mine(candidate.clone(), 2);
        let b = mine_until(candidate, 2, || false).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn mine_until_stops_when_aborted() {
        let checks = AtomicUsize::new(0);
        let candidate = build_candidate(&[], &genesis_block(), 1_000);
        // 64 zero digits is unreachable, so only the abort can end the search.
        let result = mine_until(candidate, 64, || {
            checks.fetch_add(1, Ordering::SeqCst) >= 2
        });
        assert!(result.is_none());
        assert_eq!(checks.load(Ordering::SeqCst), 3);
    }
}
