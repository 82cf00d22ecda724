//! Stateless-per-message gossip that keeps a node's chain in line with its
//! peers. Handling a message never touches the network directly: it returns
//! the messages to send and whether the local head moved.

use crate::ledger::Ledger;
use crate::message::Message;
use crate::Block;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Who is asked for full chains when an announced head does not link to ours.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryAllTarget {
    /// Every connected peer.
    #[default]
    Broadcast,
    /// Only the peer that announced the block.
    Sender,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncConfig {
    pub query_all_target: QueryAllTarget,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    /// Send back to the peer the message came from.
    Reply(Message),
    /// Send to every connected peer.
    Broadcast(Message),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub outbound: Vec<Outbound>,
    /// The local head changed; in-flight mining is now stale.
    pub head_changed: bool,
}

impl SyncOutcome {
    fn none() -> Self {
        Self::default()
    }

    fn reply(message: Message) -> Self {
        Self {
            outbound: vec![Outbound::Reply(message)],
            head_changed: false,
        }
    }

    fn broadcast(message: Message) -> Self {
        Self {
            outbound: vec![Outbound::Broadcast(message)],
            head_changed: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ConsensusSync {
    config: SyncConfig,
}

impl ConsensusSync {
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> SyncConfig {
        self.config
    }

    /// First message sent to a freshly connected peer.
    pub fn handshake(&self) -> Message {
        Message::QueryLatest
    }

    pub fn announce_head(&self, ledger: &Ledger) -> Message {
        Message::LatestBlock(ledger.latest_block().clone())
    }

    pub fn handle(&self, ledger: &mut Ledger, message: Message) -> SyncOutcome {
        debug!(kind = message.kind(), "Handling peer message");
        match message {
            Message::QueryLatest => SyncOutcome::reply(self.announce_head(ledger)),
            Message::QueryAll => SyncOutcome::reply(Message::FullChain(ledger.blocks())),
            Message::LatestBlock(block) => self.on_latest_block(ledger, block),
            Message::FullChain(blocks) => self.on_full_chain(ledger, blocks),
            Message::NewTransaction(tx) => {
                ledger.submit_transaction(tx);
                SyncOutcome::none()
            }
        }
    }

    fn on_latest_block(&self, ledger: &mut Ledger, received: Block) -> SyncOutcome {
        let held = ledger.latest_block();
        if received.index <= held.index {
            debug!(
                held = held.index,
                received = received.index,
                "Received head is not ahead of ours"
            );
            return SyncOutcome::none();
        }

        info!(
            held = held.index,
            received = received.index,
            "Chain possibly behind"
        );

        if received.previous_hash == held.hash {
            return match ledger.append_block(received.clone()) {
                Ok(()) => SyncOutcome {
                    outbound: vec![Outbound::Broadcast(Message::LatestBlock(received))],
                    head_changed: true,
                },
                Err(e) => {
                    warn!(error = %e, "Discarding announced block");
                    SyncOutcome::none()
                }
            };
        }

        match self.config.query_all_target {
            QueryAllTarget::Broadcast => SyncOutcome::broadcast(Message::QueryAll),
            QueryAllTarget::Sender => SyncOutcome::reply(Message::QueryAll),
        }
    }

    fn on_full_chain(&self, ledger: &mut Ledger, blocks: Vec<Block>) -> SyncOutcome {
        if blocks.len() <= 1 {
            debug!("Ignoring genesis-only chain");
            return SyncOutcome::none();
        }
        match ledger.replace_chain(blocks) {
            Ok(true) => SyncOutcome {
                outbound: vec![Outbound::Broadcast(self.announce_head(ledger))],
                head_changed: true,
            },
            Ok(false) => {
                debug!("Received chain is not longer than ours");
                SyncOutcome::none()
            }
            Err(e) => {
                warn!(error = %e, "Discarding received chain");
                SyncOutcome::none()
            }
        }
    }
}
