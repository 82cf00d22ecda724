use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod chain;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod message;
pub mod mine;
pub mod pool;
pub mod pow;
pub mod sync;

pub use chain::{genesis_block, Chain, ChainConfig};
pub use error::{LedgerError, Result};
pub use ledger::{Ledger, MiningJob};
pub use message::Message;
pub use mine::{Miner, MinerConfig};
pub use pool::TransactionPool;
pub use sync::{ConsensusSync, Outbound, QueryAllTarget, SyncConfig, SyncOutcome};

pub type Hash = [u8; 32];

/// Milliseconds since the Unix epoch, 0 if the clock is before it.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A transfer between two addresses. `from == None` marks a mining reward.
///
/// Field order is part of the block hash preimage and must not change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: Option<String>,
    pub to: String,
    pub amount: u64,
}

impl Transaction {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: u64) -> Self {
        Self {
            from: Some(from.into()),
            to: to.into(),
            amount,
        }
    }

    pub fn reward(to: impl Into<String>, amount: u64) -> Self {
        Self {
            from: None,
            to: to.into(),
            amount,
        }
    }

    pub fn is_reward(&self) -> bool {
        self.from.is_none()
    }

    /// Signed effect of this transaction on `address`.
    pub fn delta_for(&self, address: &str) -> i128 {
        let mut delta = 0i128;
        if self.from.as_deref() == Some(address) {
            delta -= i128::from(self.amount);
        }
        if self.to == address {
            delta += i128::from(self.amount);
        }
        delta
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    #[serde(with = "hex_hash")]
    pub previous_hash: Hash,
    #[serde(with = "hex_hash")]
    pub hash: Hash,
    pub nonce: u64,
}

impl Block {
    /// Build an unmined block with `nonce = 0` and its initial hash.
    pub fn new(
        index: u64,
        timestamp: u64,
        transactions: Vec<Transaction>,
        previous_hash: Hash,
    ) -> Self {
        let hash = compute_hash(index, &previous_hash, timestamp, &transactions, 0);
        Self {
            index,
            timestamp,
            transactions,
            previous_hash,
            hash,
            nonce: 0,
        }
    }

    /// Everything in the hash preimage except the trailing nonce.
    pub fn preimage_prefix(&self) -> String {
        preimage_prefix(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.transactions,
        )
    }

    pub fn compute_hash(&self) -> Hash {
        compute_hash(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.transactions,
            self.nonce,
        )
    }

    /// True when the stored hash matches the recomputed digest.
    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

fn preimage_prefix(
    index: u64,
    previous_hash: &Hash,
    timestamp: u64,
    transactions: &[Transaction],
) -> String {
    // Plain strings and integers always serialize.
    let txs = serde_json::to_string(transactions).unwrap_or_default();
    format!(
        "{index}{previous}{timestamp}{txs}",
        previous = hex::encode(previous_hash)
    )
}

/// SHA-256 over `prefix ‖ nonce`.
pub fn digest_with_nonce(prefix: &str, nonce: u64) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(nonce.to_string().as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

/// `SHA-256(index ‖ hex(previous_hash) ‖ timestamp ‖ json(transactions) ‖ nonce)`,
/// numbers rendered in decimal and transactions as compact JSON.
pub fn compute_hash(
    index: u64,
    previous_hash: &Hash,
    timestamp: u64,
    transactions: &[Transaction],
    nonce: u64,
) -> Hash {
    let prefix = preimage_prefix(index, previous_hash, timestamp, transactions);
    digest_with_nonce(&prefix, nonce)
}

mod hex_hash {
    use super::Hash;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let text = String::deserialize(deserializer)?;
        let mut out = [0u8; 32];
        hex::decode_to_slice(&text, &mut out).map_err(D::Error::custom)?;
        Ok(out)
    }
}
