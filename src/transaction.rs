//! Transactions: canonical encoding, hashing, and verification.
//!
//! A transaction frame is the 204-byte header, an 80-byte signature slot,
//! then the payload, whose length the header declares. The header hash is
//! the transaction's identity for mining and Merkle purposes; the signature
//! is its identity for pool membership.

use crate::crypto::{self, sha256, Hash, KeyPair};
use crate::error::{ChainError, Result};
use crate::pow;
use crate::wire::{self, TRANSACTION_HEADER_SIZE, TRANSACTION_MIN_SIZE};
use secp256k1::constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionHeader {
    pub from: Vec<u8>,
    pub to: Vec<u8>,
    pub timestamp: u32,
    pub payload_hash: Hash,
    pub payload_length: u32,
    pub nonce: u32,
}

impl TransactionHeader {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(TRANSACTION_HEADER_SIZE);
        wire::put_field(&mut out, &self.from);
        wire::put_field(&mut out, &self.to);
        wire::put_u32(&mut out, self.timestamp);
        out.extend_from_slice(&self.payload_hash);
        wire::put_u32(&mut out, self.payload_length);
        wire::put_u32(&mut out, self.nonce);
        out
    }

    pub fn decode(input: &mut &[u8]) -> Result<Self> {
        let from = wire::take_field(input, PUBLIC_KEY_SIZE)?;
        let to = wire::take_field(input, PUBLIC_KEY_SIZE)?;
        let timestamp = wire::take_u32(input)?;
        let payload_hash = wire::take_hash(input)?;
        let payload_length = wire::take_u32(input)?;
        let nonce = wire::take_u32(input)?;
        Ok(Self {
            from,
            to,
            timestamp,
            payload_hash,
            payload_length,
            nonce,
        })
    }

    /// Canonical identity of the transaction: the hash of its encoded header.
    pub fn hash(&self) -> Hash {
        sha256(&self.encode())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub header: TransactionHeader,
    pub signature: Vec<u8>,
    pub payload: Vec<u8>,
}

impl Transaction {
    /// An unsigned transaction stamped with the current time. The nonce
    /// starts at zero; callers mine it with [`Transaction::generate_nonce`]
    /// before signing.
    pub fn new(from: Vec<u8>, to: Vec<u8>, payload: Vec<u8>) -> Self {
        let header = TransactionHeader {
            from,
            to,
            timestamp: chrono::Utc::now().timestamp() as u32,
            payload_hash: sha256(&payload),
            payload_length: payload.len() as u32,
            nonce: 0,
        };
        Self {
            header,
            signature: Vec::new(),
            payload,
        }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Restart the nonce and advance it until the header hash carries the
    /// given proof-of-work prefix.
    pub fn generate_nonce(&mut self, prefix: &[u8]) {
        self.header.nonce = 0;
        while !pow::satisfies_proof_of_work(prefix, &self.header.hash()) {
            self.header.nonce = self.header.nonce.wrapping_add(1);
        }
    }

    /// Sign the header hash, storing the compact signature. Any nonce
    /// search must happen first; the signature covers the final header.
    pub fn sign(&mut self, keypair: &KeyPair) -> Result<()> {
        self.signature = keypair.sign(&self.header.hash())?;
        Ok(())
    }

    /// Check payload integrity, the proof-of-work prefix, and the origin
    /// signature, in that order.
    pub fn verify(&self, pow_prefix: &[u8]) -> Result<()> {
        if sha256(&self.payload) != self.header.payload_hash {
            return Err(ChainError::PayloadHashMismatch);
        }
        if !pow::satisfies_proof_of_work(pow_prefix, &self.header.hash()) {
            return Err(ChainError::InvalidProofOfWork);
        }
        crypto::verify_signature(&self.header.from, &self.header.hash(), &self.signature)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.header.encode();
        wire::put_field(&mut out, &self.signature);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Decode one transaction off the front of the cursor, consuming the
    /// header, the signature slot, and exactly the declared payload bytes.
    pub fn decode(input: &mut &[u8]) -> Result<Self> {
        if input.len() < TRANSACTION_MIN_SIZE {
            return Err(ChainError::ShortFrame {
                expected: TRANSACTION_MIN_SIZE,
                actual: input.len(),
            });
        }
        let header = TransactionHeader::decode(input)?;
        let signature = wire::take_field(input, COMPACT_SIGNATURE_SIZE)?;

        let declared = header.payload_length as usize;
        if declared > input.len() {
            return Err(ChainError::PayloadLength {
                declared,
                remaining: input.len(),
            });
        }
        let payload = wire::take(input, declared)?.to_vec();
        Ok(Self {
            header,
            signature,
            payload,
        })
    }

    /// Decode a standalone frame, e.g. a SEND_TRANSACTION payload.
    /// Trailing bytes past the declared payload are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = bytes;
        Self::decode(&mut cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::KEY_FIELD;

    fn signed_transaction(payload: &[u8]) -> (Transaction, KeyPair) {
        let keypair = KeyPair::generate().unwrap();
        let mut transaction = Transaction::new(
            keypair.public_key_bytes().to_vec(),
            keypair.public_key_bytes().to_vec(),
            payload.to_vec(),
        );
        transaction.generate_nonce(&[0]);
        transaction.sign(&keypair).unwrap();
        (transaction, keypair)
    }

    #[test]
    fn test_header_encodes_to_fixed_size() {
        let (transaction, _) = signed_transaction(b"hello");
        assert_eq!(transaction.header.encode().len(), TRANSACTION_HEADER_SIZE);
    }

    #[test]
    fn test_transaction_round_trip() {
        let (transaction, _) = signed_transaction(b"ledger entry");
        let encoded = transaction.encode();
        assert_eq!(
            encoded.len(),
            TRANSACTION_MIN_SIZE + transaction.payload.len()
        );

        let decoded = Transaction::from_bytes(&encoded).unwrap();
        assert_eq!(decoded, transaction);
    }

    #[test]
    fn test_empty_payload_round_trip() {
        let (transaction, _) = signed_transaction(b"");
        let decoded = Transaction::from_bytes(&transaction.encode()).unwrap();
        assert_eq!(decoded, transaction);
    }

    #[test]
    fn test_short_frame_rejected() {
        let err = Transaction::from_bytes(&[0u8; TRANSACTION_MIN_SIZE - 1]).unwrap_err();
        assert_eq!(
            err,
            ChainError::ShortFrame {
                expected: TRANSACTION_MIN_SIZE,
                actual: TRANSACTION_MIN_SIZE - 1
            }
        );
    }

    #[test]
    fn test_declared_payload_longer_than_frame_rejected() {
        let (mut transaction, keypair) = signed_transaction(b"abc");
        transaction.header.payload_length = 1000;
        transaction.sign(&keypair).unwrap();

        let err = Transaction::from_bytes(&transaction.encode()).unwrap_err();
        assert_eq!(
            err,
            ChainError::PayloadLength {
                declared: 1000,
                remaining: 3
            }
        );
    }

    #[test]
    fn test_verify_accepts_valid_transaction() {
        let (transaction, _) = signed_transaction(b"valid");
        assert!(transaction.verify(&[0]).is_ok());
    }

    #[test]
    fn test_verify_catches_tampered_payload() {
        let (mut transaction, _) = signed_transaction(b"original");
        transaction.payload = b"tampered".to_vec();
        assert_eq!(
            transaction.verify(&[]),
            Err(ChainError::PayloadHashMismatch)
        );
    }

    #[test]
    fn test_verify_catches_missing_proof_of_work() {
        let keypair = KeyPair::generate().unwrap();
        let mut transaction = Transaction::new(
            keypair.public_key_bytes().to_vec(),
            Vec::new(),
            b"x".to_vec(),
        );
        // Find a nonce that does NOT satisfy the one-byte prefix
        while pow::satisfies_proof_of_work(&[0], &transaction.header.hash()) {
            transaction.header.nonce = transaction.header.nonce.wrapping_add(1);
        }
        transaction.sign(&keypair).unwrap();
        assert_eq!(
            transaction.verify(&[0]),
            Err(ChainError::InvalidProofOfWork)
        );
    }

    #[test]
    fn test_verify_catches_foreign_signature() {
        let (mut transaction, _) = signed_transaction(b"mine");
        let other = KeyPair::generate().unwrap();
        transaction.sign(&other).unwrap();
        assert_eq!(transaction.verify(&[0]), Err(ChainError::InvalidSignature));
    }

    #[test]
    fn test_generate_nonce_satisfies_prefix() {
        let keypair = KeyPair::generate().unwrap();
        let mut transaction = Transaction::new(
            keypair.public_key_bytes().to_vec(),
            Vec::new(),
            b"payload".to_vec(),
        );
        transaction.generate_nonce(&[0]);
        assert!(pow::satisfies_proof_of_work(
            &[0],
            &transaction.header.hash()
        ));
    }

    #[test]
    fn test_oversized_keys_are_clamped_to_the_slot() {
        // A from field wider than the slot encodes as its first KEY_FIELD bytes
        let transaction = Transaction::new(vec![5u8; KEY_FIELD + 7], Vec::new(), Vec::new());
        let encoded = transaction.header.encode();
        assert_eq!(encoded.len(), TRANSACTION_HEADER_SIZE);
        assert!(encoded[..KEY_FIELD].iter().all(|b| *b == 5));
    }
}
