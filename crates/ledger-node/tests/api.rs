mod helpers;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use helpers::{eventually, test_config};
use ledger_core::{Block, Transaction};
use ledger_node::api::{router, Balance};
use ledger_node::Node;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn call(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("request failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let app = router(Node::new(test_config(1)));
    let (status, body) = call(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn blocks_lists_genesis() {
    let app = router(Node::new(test_config(1)));
    let (status, body) = call(app, get("/blocks")).await;
    assert_eq!(status, StatusCode::OK);
    let blocks: Vec<Block> = serde_json::from_value(body).unwrap();
    assert_eq!(blocks, vec![ledger_core::genesis_block()]);
}

#[tokio::test]
async fn submit_then_mine_through_api() {
    let node = Node::new(test_config(2));
    let app = router(node.clone());

    let (status, _) = call(
        app.clone(),
        post(
            "/transactions",
            json!({ "fromAddress": "A", "toAddress": "B", "amount": 10 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(node.pending_transactions(), vec![Transaction::new("A", "B", 10)]);

    let (status, body) = call(app.clone(), post("/mine", json!({ "address": "C" }))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["mining"], true);

    let mined = eventually(|| {
        let node = node.clone();
        async move { node.blocks().len() == 2 }
    })
    .await;
    assert!(mined, "mining never finished");

    assert_eq!(node.blocks()[1].transactions, vec![Transaction::new("A", "B", 10)]);
    assert_eq!(node.pending_transactions(), vec![Transaction::reward("C", 100)]);

    let (status, body) = call(app, get("/balance/C")).await;
    assert_eq!(status, StatusCode::OK);
    let balance: Balance = serde_json::from_value(body).unwrap();
    assert_eq!(
        balance,
        Balance {
            address: "C".to_string(),
            confirmed: 0,
            pending: 100,
        }
    );
}

#[tokio::test]
async fn reward_transaction_can_be_submitted_without_sender() {
    let node = Node::new(test_config(1));
    let app = router(node.clone());
    let (status, body) = call(app, post("/transactions", json!({ "to": "B", "amount": 3 }))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["tx"]["from"], Value::Null);
    assert_eq!(node.pending_transactions(), vec![Transaction::reward("B", 3)]);
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let app = router(Node::new(test_config(1)));

    let (status, body) = call(app.clone(), post("/mine", json!({ "address": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("address"));

    let (status, _) = call(
        app.clone(),
        post("/transactions", json!({ "from": "A", "to": "B", "amount": -1 })),
    )
    .await;
    assert!(status.is_client_error());

    let (status, _) = call(app, post("/peers", json!({ "peer": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mine_conflicts_while_running() {
    // Unreachable difficulty keeps the first job running.
    let node = Node::new(test_config(64));
    let app = router(node.clone());

    let (status, _) = call(app.clone(), post("/mine", json!({ "address": "A" }))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(eventually(|| { let node = node.clone(); async move { node.is_mining() } }).await);

    let (status, body) = call(app, post("/mine", json!({ "address": "B" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    node.cancel_mining();
    assert!(eventually(|| { let node = node.clone(); async move { !node.is_mining() } }).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn add_peer_connects_in_background() {
    let (other, other_addr) = helpers::spawn_node(1).await;
    let node = Node::new(test_config(1));
    let app = router(node.clone());

    let (status, _) = call(app.clone(), post("/peers", json!({ "peer": other_addr.to_string() }))).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    assert!(eventually(|| { let node = node.clone(); async move { node.peers().len() == 1 } }).await);
    assert!(eventually(|| { let other = other.clone(); async move { other.peers().len() == 1 } }).await);

    let (status, body) = call(app, get("/peers")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([other_addr.to_string()]));
}
