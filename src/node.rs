//! Node wiring: queues, the miner, and the ledger loop.
//!
//! Everything a node's tasks touch is created here and handed over
//! explicitly; there are no globals, so several nodes can share a process
//! (which is how the integration tests exercise reconciliation).

use crate::block::Block;
use crate::blockchain::Ledger;
use crate::config::Config;
use crate::crypto::KeyPair;
use crate::mempool::TransactionPool;
use crate::miner::Miner;
use crate::pow::pow_prefix;
use crate::transaction::Transaction;
use crate::wire::Message;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

/// A running node: the ledger loop and its miner, plus the queue endpoints
/// the outside world talks through.
///
/// `transactions` and `blocks` are the inbound queues a transport layer
/// (or a local front end) feeds; `outbound` carries the messages the node
/// wants broadcast to peers.
pub struct Node {
    pub keypair: KeyPair,
    pub transactions: mpsc::Sender<Transaction>,
    pub blocks: mpsc::Sender<Block>,
    pub outbound: mpsc::Receiver<Message>,
    ledger_task: JoinHandle<()>,
    miner_task: JoinHandle<()>,
}

impl Node {
    /// Wire up the channels and spawn the ledger and miner loops.
    pub fn start(config: &Config, keypair: KeyPair) -> Node {
        let depth = config.node.queue_depth;
        let (transactions_tx, transactions_rx) = mpsc::channel(depth);
        let (blocks_tx, blocks_rx) = mpsc::channel(depth);
        let (outbound_tx, outbound_rx) = mpsc::channel(depth);

        let origin = keypair.public_key_bytes().to_vec();

        // The initial directive is an empty assembly, so the miner parks
        // until the first transaction lands
        let placeholder = Block::new(origin.clone(), [0u8; 32], TransactionPool::new());
        let (directive_tx, directive_rx) = watch::channel(placeholder);

        let ledger = Ledger::new(
            origin,
            config,
            transactions_rx,
            blocks_rx,
            outbound_tx,
            directive_tx,
        );
        let miner = Miner::new(
            keypair.clone(),
            pow_prefix(config.pow.prefix_byte, config.pow.block_complexity),
            Duration::from_secs(config.miner.idle_wake_secs),
            directive_rx,
            // Completed blocks join the same inbound queue as peer blocks
            blocks_tx.clone(),
        );

        let ledger_task = tokio::spawn(ledger.run());
        let miner_task = tokio::spawn(miner.run());
        info!(
            "node started (block difficulty {}, transaction difficulty {})",
            config.pow.block_complexity, config.pow.transaction_complexity
        );

        Node {
            keypair,
            transactions: transactions_tx,
            blocks: blocks_tx,
            outbound: outbound_rx,
            ledger_task,
            miner_task,
        }
    }

    /// Tear both loops down. Queued work is abandoned.
    pub fn shutdown(self) {
        self.ledger_task.abort();
        self.miner_task.abort();
    }
}
