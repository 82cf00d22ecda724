//! Peer transport: one TCP stream per peer carrying newline-delimited JSON
//! messages. Inbound and outbound connections are handled identically.
//!
//! Frames are split on raw bytes so a frame that is not UTF-8 is dropped as
//! malformed instead of ending the connection.

use crate::constants::MAX_LINE_LENGTH;
use crate::node::Node;
use crate::peers::PeerId;
use futures::{SinkExt, StreamExt};
use ledger_core::{LedgerError, Message};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::codec::{AnyDelimiterCodec, Framed};
use tracing::{debug, info, warn};

/// Bind the peer listener and accept connections in the background.
/// Returns the bound address.
pub async fn spawn_listener(node: Arc<Node>, addr: SocketAddr) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!(addr = %local, "P2P listener started");
    tokio::spawn(accept_loop(node, listener));
    Ok(local)
}

async fn accept_loop(node: Arc<Node>, listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((stream, remote)) => {
                let (peer, outbound) = node.peers().add(remote);
                tokio::spawn(run_connection(node.clone(), stream, peer, outbound));
            }
            Err(e) => warn!(error = %e, "Accepting peer failed"),
        }
    }
}

/// Dial `peer` (`host:port`) and start exchanging messages with it.
pub async fn connect(node: &Arc<Node>, peer: &str) -> Result<SocketAddr, LedgerError> {
    let unreachable_err = |reason: String| LedgerError::PeerUnreachable {
        peer: peer.to_string(),
        reason,
    };

    let stream = timeout(node.config().connect_timeout, TcpStream::connect(peer))
        .await
        .map_err(|_| unreachable_err("connection timed out".to_string()))?
        .map_err(|e| unreachable_err(e.to_string()))?;
    let remote = stream.peer_addr().map_err(|e| unreachable_err(e.to_string()))?;

    let (id, outbound) = node.peers().add(remote);
    tokio::spawn(run_connection(node.clone(), stream, id, outbound));
    Ok(remote)
}

async fn run_connection(
    node: Arc<Node>,
    stream: TcpStream,
    peer: PeerId,
    mut outbound: mpsc::Receiver<Message>,
) {
    let codec = AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\n".to_vec(), MAX_LINE_LENGTH);
    let (mut sink, mut frames) = Framed::new(stream, codec).split();

    let writer_node = node.clone();
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let line = match message.encode() {
                Ok(line) => line,
                Err(e) => {
                    warn!(peer, error = %e, "Encoding message failed");
                    continue;
                }
            };
            if let Err(e) = sink.send(line).await {
                warn!(peer, error = %e, "Sending to peer failed");
                break;
            }
        }
        writer_node.peers().remove(peer);
    });

    node.on_peer_connected(peer);

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(frame) => match Message::decode_bytes(&frame) {
                Ok(message) => {
                    debug!(peer, kind = message.kind(), "Received message");
                    node.handle_peer_message(peer, message);
                }
                Err(e) => warn!(peer, error = %e, "Dropping malformed message"),
            },
            Err(e) => {
                warn!(peer, error = %e, "Peer connection failed");
                break;
            }
        }
    }

    node.peers().remove(peer);
    writer.abort();
    info!(peer, "Peer disconnected");
}
