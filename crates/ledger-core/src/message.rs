//! Peer wire messages.
//!
//! Each message is one JSON object `{"type": ..., "data": ...}`; variants
//! without a payload omit `data`.

use crate::error::{LedgerError, Result};
use crate::{Block, Transaction};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Message {
    /// Ask for the sender's head block.
    QueryLatest,
    /// Ask for the sender's whole chain.
    QueryAll,
    /// The sender's current head.
    LatestBlock(Block),
    /// The sender's whole chain, genesis first.
    FullChain(Vec<Block>),
    /// A transaction to add to the pool.
    NewTransaction(Transaction),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::QueryLatest => "query_latest",
            Message::QueryAll => "query_all",
            Message::LatestBlock(_) => "latest_block",
            Message::FullChain(_) => "full_chain",
            Message::NewTransaction(_) => "new_transaction",
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse one wire message. Unknown tags and payloads of the wrong shape
    /// are reported as [`LedgerError::MalformedMessage`].
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| LedgerError::MalformedMessage(e.to_string()))
    }

    /// Parse one raw frame; invalid UTF-8 is malformed like bad JSON.
    pub fn decode_bytes(frame: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(frame)
            .map_err(|e| LedgerError::MalformedMessage(e.to_string()))?;
        Self::decode(text.trim_end_matches('\r'))
    }
}
