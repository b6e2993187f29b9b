//! Error types for emberchain

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    // Format errors: the frame cannot be decoded at all.
    #[error("Insufficient bytes: need {expected}, got {actual}")]
    ShortFrame { expected: usize, actual: usize },
    #[error("Declared payload length {declared} exceeds the {remaining} remaining bytes")]
    PayloadLength { declared: usize, remaining: usize },
    #[error("Unknown message tag {0}")]
    UnknownMessage(u8),

    // Validation errors: the entity decoded but cannot be accepted.
    #[error("Invalid Merkle root")]
    MerkleMismatch,
    #[error("Invalid proof of work")]
    InvalidProofOfWork,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Payload hash does not match payload")]
    PayloadHashMismatch,

    // Reconciliation: the block is valid but does not extend the local tip.
    #[error("Chain gap: block links to {} but local tip is {}", hex::encode(.got), hex::encode(.expected))]
    ChainGap { expected: [u8; 32], got: [u8; 32] },

    #[error("Cryptographic error: {0}")]
    CryptoError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
