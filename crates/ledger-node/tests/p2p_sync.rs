mod helpers;

use helpers::{eventually, spawn_node};
use ledger_core::{LedgerError, Transaction};
use ledger_node::p2p;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn new_peer_catches_up_through_full_chain() -> anyhow::Result<()> {
    let (a, _) = spawn_node(2).await;
    let (b, b_addr) = spawn_node(2).await;

    a.mine("miner-a").await?;
    a.mine("miner-a").await?;
    a.mine("miner-a").await?;

    // b sees a head three blocks ahead that does not link, asks for the
    // chain and adopts it.
    p2p::connect(&a, &b_addr.to_string()).await?;
    let synced = eventually(|| {
        let (a, b) = (a.clone(), b.clone());
        async move { b.blocks() == a.blocks() }
    })
    .await;
    assert!(synced, "b never adopted a's chain");
    assert_eq!(b.blocks().len(), 4);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mined_block_propagates_to_connected_peer() -> anyhow::Result<()> {
    let (a, _) = spawn_node(2).await;
    let (b, b_addr) = spawn_node(2).await;
    p2p::connect(&a, &b_addr.to_string()).await?;
    assert!(eventually(|| { let b = b.clone(); async move { b.peers().len() == 1 } }).await);

    let block = a.mine("miner-a").await?;

    let appended = eventually(|| {
        let (b, block) = (b.clone(), block.clone());
        async move { b.latest_block() == block }
    })
    .await;
    assert!(appended, "b never appended the announced block");
    assert_eq!(b.blocks().len(), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn transactions_are_gossiped() -> anyhow::Result<()> {
    let (a, _) = spawn_node(1).await;
    let (b, b_addr) = spawn_node(1).await;
    p2p::connect(&a, &b_addr.to_string()).await?;
    assert!(eventually(|| { let b = b.clone(); async move { b.peers().len() == 1 } }).await);

    let tx = Transaction::new("A", "B", 10);
    a.submit_transaction(tx.clone());

    let received = eventually(|| {
        let (b, tx) = (b.clone(), tx.clone());
        async move { b.pending_transactions() == vec![tx] }
    })
    .await;
    assert!(received);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_lines_do_not_drop_the_connection() -> anyhow::Result<()> {
    let (node, addr) = spawn_node(1).await;

    let reply = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        let mut stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;
        let mut reader = BufReader::new(stream.try_clone()?);

        // The node greets every new connection with a query for our head.
        let mut greeting = String::new();
        reader.read_line(&mut greeting)?;
        assert_eq!(greeting.trim_end(), r#"{"type":"query_latest"}"#);

        stream.write_all(b"this is not json\n")?;
        stream.write_all(b"{\"type\":\"unknown\"}\n")?;
        stream.write_all(b"\xff\xfe\n")?;
        stream.write_all(b"{\"type\":\"query_\xff\xfe\"}\n")?;
        stream.write_all(b"{\"type\":\"query_latest\"}\n")?;

        let mut reply = String::new();
        reader.read_line(&mut reply)?;
        Ok(reply)
    })
    .await??;

    let message = ledger_core::Message::decode(reply.trim_end())?;
    assert_eq!(message, ledger_core::Message::LatestBlock(node.latest_block()));
    assert_eq!(node.peers().len(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn disconnected_peer_is_removed() -> anyhow::Result<()> {
    let (node, addr) = spawn_node(1).await;
    let stream = tokio::net::TcpStream::connect(addr).await?;
    assert!(eventually(|| { let node = node.clone(); async move { node.peers().len() == 1 } }).await);

    drop(stream);
    assert!(eventually(|| { let node = node.clone(); async move { node.peers().is_empty() } }).await);
    Ok(())
}

#[tokio::test]
async fn unreachable_peer_is_reported() {
    let (node, _) = spawn_node(1).await;
    // Bind and drop to get a port nothing listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let err = p2p::connect(&node, &format!("127.0.0.1:{port}")).await.unwrap_err();
    assert!(matches!(err, LedgerError::PeerUnreachable { .. }));
    assert!(node.peers().is_empty());
}
