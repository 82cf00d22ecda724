//! Administrative HTTP API: a thin shim over [`Node`].
//!
//! Actions that touch the network (mining, dialing a peer) are started in the
//! background and acknowledged with `202 Accepted`.

use crate::node::Node;
use crate::p2p;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{Block, LedgerError, Transaction};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub node: Arc<Node>,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct MineRequest {
    pub address: String,
}

#[derive(Deserialize)]
pub struct PeerRequest {
    pub peer: String,
}

#[derive(Deserialize)]
pub struct TxIn {
    #[serde(default, alias = "fromAddress")]
    pub from: Option<String>,
    #[serde(alias = "toAddress")]
    pub to: String,
    pub amount: u64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Balance {
    pub address: String,
    pub confirmed: i128,
    pub pending: i128,
}

pub enum ApiError {
    BadRequest(String),
    Ledger(LedgerError),
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError::Ledger(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Ledger(e) => {
                let status = match e {
                    LedgerError::MiningInProgress => StatusCode::CONFLICT,
                    LedgerError::PeerUnreachable { .. } => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, e.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub fn router(node: Arc<Node>) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/blocks", get(list_blocks))
        .route("/mine", post(mine))
        .route("/peers", get(list_peers).post(add_peer))
        .route("/transactions", get(list_pending).post(submit_transaction))
        .route("/balance/{address}", get(balance))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { node })
}

async fn list_blocks(State(state): State<AppState>) -> Json<Vec<Block>> {
    Json(state.node.blocks())
}

async fn mine(
    State(state): State<AppState>,
    Json(req): Json<MineRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.address.trim().is_empty() {
        return Err(ApiError::BadRequest("reward address is required".to_string()));
    }
    if state.node.is_mining() {
        return Err(LedgerError::MiningInProgress.into());
    }

    let node = state.node.clone();
    let address = req.address.clone();
    tokio::spawn(async move {
        match node.mine(&address).await {
            Ok(block) => info!(index = block.index, reward_to = %address, "Mining finished"),
            Err(e) => warn!(error = %e, "Mining did not produce a block"),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "mining": true, "address": req.address })),
    ))
}

async fn list_peers(State(state): State<AppState>) -> Json<Vec<SocketAddr>> {
    Json(state.node.peers().addresses())
}

async fn add_peer(
    State(state): State<AppState>,
    Json(req): Json<PeerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.peer.trim().is_empty() {
        return Err(ApiError::BadRequest("peer address is required".to_string()));
    }

    let node = state.node.clone();
    let peer = req.peer.clone();
    tokio::spawn(async move {
        if let Err(e) = p2p::connect(&node, &peer).await {
            warn!(error = %e, "Adding peer failed");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "connecting": req.peer })),
    ))
}

async fn list_pending(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    Json(state.node.pending_transactions())
}

async fn submit_transaction(
    State(state): State<AppState>,
    Json(tx): Json<TxIn>,
) -> Result<impl IntoResponse, ApiError> {
    if tx.to.trim().is_empty() {
        return Err(ApiError::BadRequest("recipient is required".to_string()));
    }
    let tx = Transaction {
        from: tx.from,
        to: tx.to,
        amount: tx.amount,
    };
    state.node.submit_transaction(tx.clone());
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "accepted": true, "tx": tx })),
    ))
}

async fn balance(State(state): State<AppState>, Path(address): Path<String>) -> Json<Balance> {
    let (confirmed, pending) = state.node.balance_of(&address);
    Json(Balance {
        address,
        confirmed,
        pending,
    })
}
