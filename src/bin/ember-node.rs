#![forbid(unsafe_code)]
//! Demo node for emberchain: reads payloads from stdin, feeds them to the
//! engine as signed transactions, and logs what the node would broadcast.
//! The actual peer transport stays external; this front end stands in for
//! it on both sides of the queues.

use clap::Parser;
use emberchain::config::load_config;
use emberchain::crypto::KeyPair;
use emberchain::node::Node;
use emberchain::pow::pow_prefix;
use emberchain::transaction::Transaction;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Hex-encoded secret key for a stable node identity. Omit to generate
    /// a fresh key under the configured key difficulty.
    #[arg(long)]
    key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;

    let keypair = match &cli.key {
        Some(hex_key) => KeyPair::from_secret_bytes(&hex::decode(hex_key)?)?,
        None => KeyPair::generate_with_pow(&pow_prefix(
            config.pow.prefix_byte,
            config.pow.key_complexity,
        ))?,
    };
    info!("node identity {}", hex::encode(keypair.public_key_bytes()));

    let transaction_pow = pow_prefix(config.pow.prefix_byte, config.pow.transaction_complexity);
    let mut node = Node::start(&config, keypair);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("type a payload per line to submit transactions");

    loop {
        tokio::select! {
            maybe_line = lines.next_line() => {
                match maybe_line? {
                    Some(line) if !line.trim().is_empty() => {
                        let payload = line.into_bytes();
                        let mut transaction = Transaction::new(
                            node.keypair.public_key_bytes().to_vec(),
                            Vec::new(),
                            payload,
                        );
                        transaction.generate_nonce(&transaction_pow);
                        transaction.sign(&node.keypair)?;
                        info!("submitting transaction {}", hex::encode(transaction.hash()));
                        node.transactions.send(transaction).await?;
                    }
                    Some(_) => {}
                    None => break,
                }
            }
            Some(message) = node.outbound.recv() => {
                info!(
                    "would broadcast {:?} ({} bytes)",
                    message.kind,
                    message.data.len()
                );
            }
        }
    }

    info!("stdin closed, shutting down");
    node.shutdown();
    Ok(())
}
