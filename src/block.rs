//! Blocks: header codec, hashing, signing, and full verification.
//!
//! A block frame is the 152-byte header, an 80-byte signature slot, then
//! the embedded transaction list. Verification recomputes the Merkle root
//! over the embedded list, checks the proof-of-work prefix on the header
//! hash, and checks the origin signature, in that order.

use crate::crypto::{self, sha256, Hash, KeyPair};
use crate::error::{ChainError, Result};
use crate::mempool::TransactionPool;
use crate::merkle::merkle_root;
use crate::pow;
use crate::wire::{self, BLOCK_HEADER_SIZE, BLOCK_MIN_SIZE};
use secp256k1::constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub origin: Vec<u8>,
    pub timestamp: u32,
    pub prev_block: Hash,
    pub merkle_root: Hash,
    pub nonce: u32,
}

impl BlockHeader {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(BLOCK_HEADER_SIZE);
        wire::put_field(&mut out, &self.origin);
        wire::put_u32(&mut out, self.timestamp);
        out.extend_from_slice(&self.prev_block);
        out.extend_from_slice(&self.merkle_root);
        wire::put_u32(&mut out, self.nonce);
        out
    }

    pub fn decode(input: &mut &[u8]) -> Result<Self> {
        let origin = wire::take_field(input, PUBLIC_KEY_SIZE)?;
        let timestamp = wire::take_u32(input)?;
        let prev_block = wire::take_hash(input)?;
        let merkle_root = wire::take_hash(input)?;
        let nonce = wire::take_u32(input)?;
        Ok(Self {
            origin,
            timestamp,
            prev_block,
            merkle_root,
            nonce,
        })
    }

    /// The block's identity and proof-of-work subject: the hash of the
    /// encoded header.
    pub fn hash(&self) -> Hash {
        sha256(&self.encode())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub signature: Vec<u8>,
    pub transactions: TransactionPool,
}

impl Block {
    /// A fresh unsigned block extending `prev_block`, seeded with
    /// `transactions`. The Merkle root stays zeroed until mining commits
    /// to a pool snapshot.
    pub fn new(origin: Vec<u8>, prev_block: Hash, transactions: TransactionPool) -> Self {
        Self {
            header: BlockHeader {
                origin,
                timestamp: chrono::Utc::now().timestamp() as u32,
                prev_block,
                merkle_root: [0u8; 32],
                nonce: 0,
            },
            signature: Vec::new(),
            transactions,
        }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Root over the embedded transaction hashes; `None` for an empty list.
    pub fn compute_merkle_root(&self) -> Option<Hash> {
        merkle_root(&self.transactions.hashes())
    }

    /// Sign the header hash, storing the compact signature. The header must
    /// be final: mining and signing never interleave.
    pub fn sign(&mut self, keypair: &KeyPair) -> Result<()> {
        self.signature = keypair.sign(&self.header.hash())?;
        Ok(())
    }

    /// Full verification: Merkle equality, proof of work, origin signature.
    /// An empty block has no recomputable root and never verifies.
    pub fn verify(&self, pow_prefix: &[u8]) -> Result<()> {
        match self.compute_merkle_root() {
            Some(root) if root == self.header.merkle_root => {}
            _ => return Err(ChainError::MerkleMismatch),
        }
        if !pow::satisfies_proof_of_work(pow_prefix, &self.header.hash()) {
            return Err(ChainError::InvalidProofOfWork);
        }
        crypto::verify_signature(&self.header.origin, &self.header.hash(), &self.signature)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.header.encode();
        wire::put_field(&mut out, &self.signature);
        out.extend_from_slice(&self.transactions.encode());
        out
    }

    /// Decode a whole block frame, e.g. a SEND_BLOCK payload. The
    /// transaction list runs to the end of the frame; a trailing fragment
    /// shorter than a minimal transaction is discarded.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < BLOCK_MIN_SIZE {
            return Err(ChainError::ShortFrame {
                expected: BLOCK_MIN_SIZE,
                actual: bytes.len(),
            });
        }
        let mut cursor = bytes;
        let header = BlockHeader::decode(&mut cursor)?;
        let signature = wire::take_field(&mut cursor, COMPACT_SIGNATURE_SIZE)?;
        let transactions = TransactionPool::decode(cursor)?;
        Ok(Self {
            header,
            signature,
            transactions,
        })
    }
}
