//! The ordered, duplicate-free transaction pool.
//!
//! One pool type serves two roles: the live set of pending transactions a
//! node is mining over, and the transaction list embedded in a block. In
//! both roles the entries are kept non-decreasing by timestamp, and entry
//! identity is the signature, compared byte for byte.

use crate::crypto::Hash;
use crate::error::Result;
use crate::transaction::Transaction;
use crate::wire::TRANSACTION_MIN_SIZE;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionPool {
    entries: Vec<Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already timestamp-ordered list, e.g. one decoded off the
    /// wire. Wire order is authoritative: re-sorting here would change the
    /// Merkle leaves a peer's block commits to.
    pub fn from_entries(entries: Vec<Transaction>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Transaction] {
        &self.entries
    }

    /// Membership by signature.
    pub fn contains(&self, transaction: &Transaction) -> bool {
        self.entries
            .iter()
            .any(|t| t.signature == transaction.signature)
    }

    /// Ordered insert: the transaction lands immediately before the first
    /// entry whose timestamp is greater than or equal to its own, keeping
    /// timestamps non-decreasing. On a tie the incoming entry goes first.
    pub fn insert(&mut self, transaction: Transaction) {
        let at = self
            .entries
            .iter()
            .position(|t| t.header.timestamp >= transaction.header.timestamp)
            .unwrap_or(self.entries.len());
        self.entries.insert(at, transaction);
    }

    /// The transactions of `self` absent from `other` by signature, in
    /// `self`'s order.
    ///
    /// Both pools must be timestamp-sorted: the scan of `other` only moves
    /// forward, resuming from the index of the previous match, so matches
    /// behind the cursor are invisible. That precondition holds for every
    /// pool this engine builds.
    pub fn diff(&self, other: &TransactionPool) -> TransactionPool {
        let mut missing = Vec::new();
        let mut last_match = 0;
        for transaction in &self.entries {
            let mut found = false;
            for (index, candidate) in other.entries.iter().enumerate().skip(last_match) {
                if candidate.signature == transaction.signature {
                    found = true;
                    last_match = index;
                    break;
                }
            }
            if !found {
                missing.push(transaction.clone());
            }
        }
        TransactionPool::from_entries(missing)
    }

    /// Header hashes in pool order: the Merkle leaf list.
    pub fn hashes(&self) -> Vec<Hash> {
        self.entries.iter().map(|t| t.header.hash()).collect()
    }

    /// Concatenate the entry frames with no delimiter.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for transaction in &self.entries {
            out.extend_from_slice(&transaction.encode());
        }
        out
    }

    /// Decode concatenated frames in wire order, consuming whole
    /// transactions while at least a minimal frame remains. A shorter tail
    /// is discarded, not an error; a malformed frame is.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = bytes;
        let mut entries = Vec::new();
        while cursor.len() >= TRANSACTION_MIN_SIZE {
            entries.push(Transaction::decode(&mut cursor)?);
        }
        Ok(Self::from_entries(entries))
    }
}
