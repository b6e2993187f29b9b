//! The mining worker: one cancellable nonce search at a time.
//!
//! The ledger hands the worker blocks over a `watch` channel, so only the
//! newest directive survives; an unread predecessor is overwritten, never
//! queued. The search itself runs in bounded chunks with a supersede check
//! between chunks, which keeps cancellation prompt without an await per
//! nonce.

use crate::block::{Block, BlockHeader};
use crate::crypto::KeyPair;
use crate::pow;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Nonces tried between cancellation checks.
const NONCE_CHUNK: u32 = 2048;

/// Advance the nonce up to `budget` times, returning true once the header
/// hash carries the prefix. On a miss the nonce is left at the next
/// candidate, so a repeated call resumes the same search.
pub fn search_nonce(header: &mut BlockHeader, prefix: &[u8], budget: u32) -> bool {
    for _ in 0..budget {
        if pow::satisfies_proof_of_work(prefix, &header.hash()) {
            return true;
        }
        header.nonce = header.nonce.wrapping_add(1);
    }
    false
}

enum Search {
    Found,
    Superseded,
    Closed,
}

pub struct Miner {
    keypair: KeyPair,
    block_pow: Vec<u8>,
    idle_wake: Duration,
    directives: watch::Receiver<Block>,
    completed: mpsc::Sender<Block>,
}

impl Miner {
    /// `directives` carries the block to mine; `completed` feeds finished
    /// blocks back into the ledger's inbound block queue.
    pub fn new(
        keypair: KeyPair,
        block_pow: Vec<u8>,
        idle_wake: Duration,
        directives: watch::Receiver<Block>,
        completed: mpsc::Sender<Block>,
    ) -> Self {
        Self {
            keypair,
            block_pow,
            idle_wake,
            directives,
            completed,
        }
    }

    /// Drive mining until the directive channel closes.
    pub async fn run(mut self) {
        info!("miner ready");
        loop {
            let mut block = self.directives.borrow_and_update().clone();

            // An empty pool has no Merkle root and nothing worth a block;
            // suspend instead of spinning
            let root = match block.compute_merkle_root() {
                Some(root) => root,
                None => {
                    if !self.wait_while_idle().await {
                        break;
                    }
                    continue;
                }
            };

            // A fresh search commits to the pool snapshot, restarts the
            // nonce space, and restamps the clock
            block.header.merkle_root = root;
            block.header.nonce = 0;
            block.header.timestamp = chrono::Utc::now().timestamp() as u32;

            match self.search(&mut block.header).await {
                Search::Found => {
                    if let Err(err) = block.sign(&self.keypair) {
                        warn!("Could not sign mined block: {}", err);
                        continue;
                    }
                    info!(
                        "Mined block {} (nonce {}, {} transactions)",
                        hex::encode(block.hash()),
                        block.header.nonce,
                        block.transactions.len()
                    );
                    if self.completed.send(block).await.is_err() {
                        break;
                    }
                    // Park until the ledger reacts with a new directive
                    if self.directives.changed().await.is_err() {
                        break;
                    }
                }
                Search::Superseded => {
                    debug!("mining target superseded, restarting");
                }
                Search::Closed => break,
            }
        }
        info!("miner stopped");
    }

    async fn search(&mut self, header: &mut BlockHeader) -> Search {
        loop {
            if search_nonce(header, &self.block_pow, NONCE_CHUNK) {
                return Search::Found;
            }
            match self.directives.has_changed() {
                Ok(true) => return Search::Superseded,
                Ok(false) => {}
                Err(_) => return Search::Closed,
            }
            tokio::task::yield_now().await;
        }
    }

    /// Park on the directive channel, waking periodically while the pool
    /// stays empty. Returns false once the ledger side is gone.
    async fn wait_while_idle(&mut self) -> bool {
        match tokio::time::timeout(self.idle_wake, self.directives.changed()).await {
            Ok(Ok(())) => true,
            Ok(Err(_)) => false,
            Err(_) => {
                debug!("miner idle, pool empty");
                true
            }
        }
    }
}
