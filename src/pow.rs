//! Proof-of-work as a required hash prefix.
//!
//! Difficulty is a byte count: a hash satisfies complexity `n` when its
//! first `n` bytes all equal the configured prefix byte. Each entity class
//! carries its own complexity.

/// Default prefix bytes required on a transaction header hash.
pub const TRANSACTION_POW_COMPLEXITY: usize = 1;

/// Default prefix bytes required on a block header hash.
pub const BLOCK_POW_COMPLEXITY: usize = 2;

/// Default prefix bytes required on a public key hash.
pub const KEY_POW_COMPLEXITY: usize = 0;

/// Byte value the prefix repeats.
pub const POW_PREFIX_BYTE: u8 = 0;

/// The required prefix for a difficulty of `complexity` bytes.
pub fn pow_prefix(prefix_byte: u8, complexity: usize) -> Vec<u8> {
    vec![prefix_byte; complexity]
}

/// A hash satisfies a prefix when it begins with every prefix byte.
/// The empty prefix (complexity zero) is satisfied by every hash.
pub fn satisfies_proof_of_work(prefix: &[u8], hash: &[u8]) -> bool {
    hash.len() >= prefix.len() && hash[..prefix.len()] == *prefix
}
