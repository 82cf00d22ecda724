use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the ledger node's admin API")]
struct Cli {
    /// Node base URL
    #[arg(long, global = true, env = "LEDGER_NODE", default_value = "http://127.0.0.1:3001")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every block of the node's chain
    Blocks,
    /// Mine the pending transactions, rewarding `address`
    Mine {
        #[arg(long)]
        address: String,
    },
    /// List connected peers
    Peers,
    /// Connect the node to another peer (host:port)
    AddPeer {
        #[arg(long)]
        peer: String,
    },
    /// Submit a transaction; omit --from for a reward transaction
    Submit {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u64,
    },
    /// Show the confirmed and pending balance of an address
    Balance {
        #[arg(long)]
        address: String,
    },
}

#[derive(Serialize)]
struct Tx {
    from: Option<String>,
    to: String,
    amount: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let node = cli.node.trim_end_matches('/');

    let request = match cli.cmd {
        Command::Blocks => client.get(format!("{node}/blocks")),
        Command::Mine { address } => client
            .post(format!("{node}/mine"))
            .json(&serde_json::json!({ "address": address })),
        Command::Peers => client.get(format!("{node}/peers")),
        Command::AddPeer { peer } => client
            .post(format!("{node}/peers"))
            .json(&serde_json::json!({ "peer": peer })),
        Command::Submit { from, to, amount } => client
            .post(format!("{node}/transactions"))
            .json(&Tx { from, to, amount }),
        Command::Balance { address } => client.get(format!("{node}/balance/{address}")),
    };

    let res = request.send().await?;
    let status = res.status();
    debug!(%status, "Node responded");
    let body = res.text().await?;
    let pretty = serde_json::from_str::<Value>(&body)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .unwrap_or(body);

    if !status.is_success() {
        bail!("node returned {status}: {pretty}");
    }
    println!("{pretty}");
    Ok(())
}
