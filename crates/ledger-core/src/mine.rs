use crate::constants::MINING_CHECK_INTERVAL;
use crate::pow::{self, meets_difficulty};
use crate::{digest_with_nonce, Block};
use rayon::prelude::*;
use tracing::info;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MinerConfig {
    /// Spread the nonce search across the rayon thread pool.
    pub parallel: bool,
}

/// Runs the proof-of-work search with the configured strategy.
#[derive(Clone, Copy, Debug, Default)]
pub struct Miner {
    config: MinerConfig,
}

impl Miner {
    pub fn new(config: MinerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> MinerConfig {
        self.config
    }

    /// Seal `candidate`, returning `None` if `should_abort` fired first.
    pub fn mine_until<F>(&self, candidate: Block, difficulty: usize, should_abort: F) -> Option<Block>
    where
        F: Fn() -> bool + Sync,
    {
        if self.config.parallel {
            mine_parallel_until(candidate, difficulty, should_abort)
        } else {
            pow::mine_until(candidate, difficulty, should_abort)
        }
    }
}

/// Searches nonces in parallel until a hash has at least `difficulty` leading
/// zero hex digits. The winning nonce is whichever thread finds one first, not
/// necessarily the smallest.
pub fn mine_parallel_until<F>(candidate: Block, difficulty: usize, should_abort: F) -> Option<Block>
where
    F: Fn() -> bool + Sync,
{
    let prefix = candidate.preimage_prefix();

    // Parallel search over the entire u64 range. Rayon will split this range across threads.
    let found = (0u64..u64::MAX)
        .into_par_iter()
        .find_map_any(|nonce| {
            if nonce % MINING_CHECK_INTERVAL == 0 && should_abort() {
                return Some(None);
            }
            let hash = digest_with_nonce(&prefix, nonce);
            meets_difficulty(&hash, difficulty).then_some(Some((nonce, hash)))
        })
        .flatten();

    let Some((nonce, hash)) = found else {
        info!(index = candidate.index, "Parallel mining aborted");
        return None;
    };

    info!(index = candidate.index, nonce, hash = %hex::encode(hash), "Block mined in parallel");

    Some(Block {
        nonce,
        hash,
        ..candidate
    })
}
