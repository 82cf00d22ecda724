use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid block {index}: {reason}")]
    InvalidBlock { index: u64, reason: String },

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },

    #[error("mined block {index} no longer extends the chain head")]
    StaleBlock { index: u64 },

    #[error("mining was cancelled")]
    MiningCancelled,

    #[error("a mining job is already running")]
    MiningInProgress,

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LedgerError {
    pub(crate) fn invalid_block(index: u64, reason: impl Into<String>) -> Self {
        Self::InvalidBlock {
            index,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
