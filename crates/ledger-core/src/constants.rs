pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// 2018-01-01T00:00:00Z in milliseconds.
pub const GENESIS_TIMESTAMP: u64 = 1_514_764_800_000;
pub const DEFAULT_DIFFICULTY: usize = 2;
pub const DEFAULT_MINING_REWARD: u64 = 100;
/// Nonces tried between two checks of the abort signal.
pub const MINING_CHECK_INTERVAL: u64 = 4_096;
