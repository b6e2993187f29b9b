//! The chain and the event loop that reconciles it.
//!
//! [`Ledger`] is the single owner of the finalized chain and of the block
//! currently being assembled. It consumes two inbound queues, transactions
//! and blocks, in arrival order per queue; locally mined blocks arrive on
//! the same block queue as peer blocks and take the same path. Everything
//! the loop touches is passed in at construction, so two ledgers in one
//! process never share state.

use crate::block::Block;
use crate::config::Config;
use crate::crypto::Hash;
use crate::error::{ChainError, Result};
use crate::mempool::TransactionPool;
use crate::pow::pow_prefix;
use crate::transaction::Transaction;
use crate::wire::{Message, MessageKind};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Append-only run of accepted blocks.
#[derive(Debug, Clone, Default)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Hash of the newest block; the zero hash anchors an empty chain.
    pub fn tip_hash(&self) -> Hash {
        self.blocks.last().map(|b| b.hash()).unwrap_or([0u8; 32])
    }

    /// Membership by signature, scanning newest first: an incoming
    /// duplicate is overwhelmingly a recent block echoed back.
    pub fn contains(&self, block: &Block) -> bool {
        self.blocks
            .iter()
            .rev()
            .any(|b| b.signature == block.signature)
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }
}

/// The reconciliation loop around a [`Chain`].
pub struct Ledger {
    chain: Chain,
    current: Block,
    origin: Vec<u8>,
    transaction_pow: Vec<u8>,
    block_pow: Vec<u8>,
    broadcast_throttle: Duration,
    transactions_rx: mpsc::Receiver<Transaction>,
    blocks_rx: mpsc::Receiver<Block>,
    outbound: mpsc::Sender<Message>,
    directives: watch::Sender<Block>,
}

impl Ledger {
    /// `origin` is the public key new blocks are assembled under.
    /// `directives` is the miner's single-slot mailbox; sends overwrite.
    pub fn new(
        origin: Vec<u8>,
        config: &Config,
        transactions_rx: mpsc::Receiver<Transaction>,
        blocks_rx: mpsc::Receiver<Block>,
        outbound: mpsc::Sender<Message>,
        directives: watch::Sender<Block>,
    ) -> Self {
        let chain = Chain::new();
        let current = Block::new(origin.clone(), chain.tip_hash(), TransactionPool::new());
        Self {
            chain,
            current,
            origin,
            transaction_pow: pow_prefix(config.pow.prefix_byte, config.pow.transaction_complexity),
            block_pow: pow_prefix(config.pow.prefix_byte, config.pow.block_complexity),
            broadcast_throttle: Duration::from_millis(config.node.broadcast_throttle_ms),
            transactions_rx,
            blocks_rx,
            outbound,
            directives,
        }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn current(&self) -> &Block {
        &self.current
    }

    /// Consume both queues until they close. Whichever queue is ready
    /// first wins; order within a queue is arrival order.
    pub async fn run(mut self) {
        info!("ledger loop started");
        loop {
            tokio::select! {
                Some(transaction) = self.transactions_rx.recv() => {
                    if let Err(err) = self.handle_transaction(transaction).await {
                        warn!("Transaction rejected: {}", err);
                    }
                }
                Some(block) = self.blocks_rx.recv() => {
                    if let Err(err) = self.handle_block(block).await {
                        warn!("Block rejected: {}", err);
                    }
                }
                else => break,
            }
        }
        info!("ledger loop stopped, queues closed");
    }

    /// Ingest one pending transaction: dedupe, verify, ordered insert,
    /// refresh the mining target, then broadcast.
    async fn handle_transaction(&mut self, transaction: Transaction) -> Result<()> {
        if self.current.transactions.contains(&transaction) {
            debug!("transaction already pooled, dropped");
            return Ok(());
        }
        transaction.verify(&self.transaction_pow)?;

        self.current.transactions.insert(transaction.clone());
        debug!(
            "transaction pooled ({} pending)",
            self.current.transactions.len()
        );
        self.dispatch_mining_target();

        // Deliberate serializing pause between pool mutation and fan-out;
        // the interval is configurable
        tokio::time::sleep(self.broadcast_throttle).await;
        self.broadcast(MessageKind::SendTransaction, transaction.encode())
            .await;
        Ok(())
    }

    /// Ingest one block, locally mined or from a peer: dedupe, verify,
    /// then either extend the chain or report the gap.
    async fn handle_block(&mut self, block: Block) -> Result<()> {
        if self.chain.contains(&block) {
            debug!("block already chained, dropped");
            return Ok(());
        }
        block.verify(&self.block_pow)?;

        let tip = self.chain.tip_hash();
        if block.header.prev_block != tip {
            // Out-of-sequence block. Reported only: requesting the missing
            // range from peers needs a backfill protocol this engine does
            // not speak yet.
            return Err(ChainError::ChainGap {
                expected: tip,
                got: block.header.prev_block,
            });
        }

        // Pending transactions the accepted block did not cover carry over
        // into the next assembly
        let carried = if block.header.merkle_root != self.current.header.merkle_root {
            self.current.transactions.diff(&block.transactions)
        } else {
            TransactionPool::new()
        };

        let encoded = block.encode();
        let new_tip = block.hash();
        info!(
            "Block accepted at height {}: {} ({} carried forward)",
            self.chain.len() + 1,
            hex::encode(new_tip),
            carried.len()
        );
        self.chain.push(block);
        self.broadcast(MessageKind::SendBlock, encoded).await;

        self.current = Block::new(self.origin.clone(), new_tip, carried);
        self.dispatch_mining_target();
        Ok(())
    }

    /// Hand the miner the current assembly. The watch slot keeps only the
    /// newest block, which is exactly the supersede semantics mining needs.
    fn dispatch_mining_target(&self) {
        if self.directives.send(self.current.clone()).is_err() {
            debug!("miner gone, directive dropped");
        }
    }

    async fn broadcast(&self, kind: MessageKind, data: Vec<u8>) {
        if self.outbound.send(Message::new(kind, data)).await.is_err() {
            debug!("outbound queue closed, broadcast dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::miner::search_nonce;

    /// A ledger with a trivial transaction difficulty, a one-byte block
    /// difficulty, and no throttle, plus the far ends of its queues.
    fn test_ledger(
        keypair: &KeyPair,
    ) -> (
        Ledger,
        mpsc::Receiver<Message>,
        watch::Receiver<Block>,
    ) {
        let mut config = Config::default();
        config.pow.transaction_complexity = 0;
        config.pow.block_complexity = 1;
        config.node.broadcast_throttle_ms = 0;

        let (_transactions_tx, transactions_rx) = mpsc::channel(8);
        let (_blocks_tx, blocks_rx) = mpsc::channel(8);
        let (outbound_tx, outbound_rx) = mpsc::channel(8);
        let genesis = Block::new(
            keypair.public_key_bytes().to_vec(),
            [0u8; 32],
            TransactionPool::new(),
        );
        let (directive_tx, directive_rx) = watch::channel(genesis);

        let ledger = Ledger::new(
            keypair.public_key_bytes().to_vec(),
            &config,
            transactions_rx,
            blocks_rx,
            outbound_tx,
            directive_tx,
        );
        (ledger, outbound_rx, directive_rx)
    }

    fn signed_transaction(keypair: &KeyPair, timestamp: u32) -> Transaction {
        let mut transaction = Transaction::new(
            keypair.public_key_bytes().to_vec(),
            Vec::new(),
            timestamp.to_le_bytes().to_vec(),
        );
        transaction.header.timestamp = timestamp;
        transaction.sign(keypair).unwrap();
        transaction
    }

    /// Mine and sign a block over `entries` extending `prev`.
    fn mined_block(keypair: &KeyPair, prev: Hash, entries: Vec<Transaction>) -> Block {
        let mut block = Block::new(
            keypair.public_key_bytes().to_vec(),
            prev,
            TransactionPool::from_entries(entries),
        );
        block.header.merkle_root = block.compute_merkle_root().unwrap();
        assert!(search_nonce(&mut block.header, &[0], u32::MAX));
        block.sign(keypair).unwrap();
        block
    }

    #[test]
    fn test_empty_chain_anchors_at_the_zero_hash() {
        let chain = Chain::new();
        assert_eq!(chain.tip_hash(), [0u8; 32]);
        assert!(chain.is_empty());
    }

    #[tokio::test]
    async fn test_transactions_pool_in_timestamp_order() {
        let keypair = KeyPair::generate().unwrap();
        let (mut ledger, _outbound, _directives) = test_ledger(&keypair);

        for timestamp in [5, 1, 3] {
            ledger
                .handle_transaction(signed_transaction(&keypair, timestamp))
                .await
                .unwrap();
        }

        let pooled: Vec<u32> = ledger
            .current()
            .transactions
            .entries()
            .iter()
            .map(|t| t.header.timestamp)
            .collect();
        assert_eq!(pooled, vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn test_duplicate_transaction_dropped() {
        let keypair = KeyPair::generate().unwrap();
        let (mut ledger, mut outbound, _directives) = test_ledger(&keypair);

        let transaction = signed_transaction(&keypair, 1);
        ledger
            .handle_transaction(transaction.clone())
            .await
            .unwrap();
        ledger.handle_transaction(transaction).await.unwrap();

        assert_eq!(ledger.current().transactions.len(), 1);
        // Only the first ingest broadcast
        assert!(outbound.try_recv().is_ok());
        assert!(outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_invalid_transaction_rejected_without_mutation() {
        let keypair = KeyPair::generate().unwrap();
        let (mut ledger, mut outbound, _directives) = test_ledger(&keypair);

        let mut transaction = signed_transaction(&keypair, 1);
        transaction.payload = b"tampered".to_vec();

        assert_eq!(
            ledger.handle_transaction(transaction).await,
            Err(ChainError::PayloadHashMismatch)
        );
        assert!(ledger.current().transactions.is_empty());
        assert!(outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_accepted_transaction_updates_miner_and_broadcasts() {
        let keypair = KeyPair::generate().unwrap();
        let (mut ledger, mut outbound, mut directives) = test_ledger(&keypair);

        let transaction = signed_transaction(&keypair, 1);
        ledger
            .handle_transaction(transaction.clone())
            .await
            .unwrap();

        assert!(directives.has_changed().unwrap());
        assert_eq!(directives.borrow_and_update().transactions.len(), 1);

        let message = outbound.try_recv().unwrap();
        assert_eq!(message.kind, MessageKind::SendTransaction);
        assert_eq!(message.data, transaction.encode());
    }

    #[tokio::test]
    async fn test_accepted_block_extends_chain_and_rebases_pool() {
        let keypair = KeyPair::generate().unwrap();
        let (mut ledger, mut outbound, mut directives) = test_ledger(&keypair);

        // Two pending transactions, then a peer block covering only one
        let covered = signed_transaction(&keypair, 1);
        let pending = signed_transaction(&keypair, 2);
        ledger.handle_transaction(covered.clone()).await.unwrap();
        ledger.handle_transaction(pending.clone()).await.unwrap();

        let block = mined_block(&keypair, [0u8; 32], vec![covered]);
        let block_hash = block.hash();
        ledger.handle_block(block).await.unwrap();

        assert_eq!(ledger.chain().len(), 1);
        assert_eq!(ledger.chain().tip_hash(), block_hash);

        // The uncovered transaction carries into the fresh assembly
        assert_eq!(ledger.current().header.prev_block, block_hash);
        assert_eq!(ledger.current().transactions.len(), 1);
        assert_eq!(
            ledger.current().transactions.entries()[0].signature,
            pending.signature
        );

        // Broadcasts: two SEND_TRANSACTION, then the SEND_BLOCK
        let mut kinds = Vec::new();
        while let Ok(message) = outbound.try_recv() {
            kinds.push(message.kind);
        }
        assert_eq!(
            kinds,
            vec![
                MessageKind::SendTransaction,
                MessageKind::SendTransaction,
                MessageKind::SendBlock
            ]
        );

        // The miner directive now targets the new tip
        let directive = directives.borrow_and_update().clone();
        assert_eq!(directive.header.prev_block, block_hash);
    }

    #[tokio::test]
    async fn test_duplicate_block_dropped_and_chain_unchanged() {
        let keypair = KeyPair::generate().unwrap();
        let (mut ledger, _outbound, _directives) = test_ledger(&keypair);

        let block = mined_block(
            &keypair,
            [0u8; 32],
            vec![signed_transaction(&keypair, 1)],
        );
        ledger.handle_block(block.clone()).await.unwrap();
        assert_eq!(ledger.chain().len(), 1);

        // Same block echoed back: silently dropped
        ledger.handle_block(block).await.unwrap();
        assert_eq!(ledger.chain().len(), 1);
    }

    #[tokio::test]
    async fn test_gap_block_reported_without_mutation() {
        let keypair = KeyPair::generate().unwrap();
        let (mut ledger, mut outbound, _directives) = test_ledger(&keypair);

        let orphan = mined_block(
            &keypair,
            [7u8; 32],
            vec![signed_transaction(&keypair, 1)],
        );
        let before = ledger.current().clone();

        let err = ledger.handle_block(orphan).await.unwrap_err();
        assert_eq!(
            err,
            ChainError::ChainGap {
                expected: [0u8; 32],
                got: [7u8; 32]
            }
        );
        assert!(ledger.chain().is_empty());
        assert_eq!(ledger.current(), &before);
        assert!(outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_invalid_block_rejected() {
        let keypair = KeyPair::generate().unwrap();
        let (mut ledger, _outbound, _directives) = test_ledger(&keypair);

        let mut block = mined_block(
            &keypair,
            [0u8; 32],
            vec![signed_transaction(&keypair, 1)],
        );
        block.header.merkle_root = [9u8; 32];
        assert!(search_nonce(&mut block.header, &[0], u32::MAX));
        block.sign(&keypair).unwrap();

        assert_eq!(
            ledger.handle_block(block).await,
            Err(ChainError::MerkleMismatch)
        );
        assert!(ledger.chain().is_empty());
    }
}
