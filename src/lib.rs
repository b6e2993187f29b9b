//! Emberchain - a minimal peer-to-peer ledger engine
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - The chain and the reconciliation loop
//! - [`block`] - Block structure, codec, and verification
//! - [`transaction`] - Transaction structure, codec, and verification
//! - [`mempool`] - The ordered transaction pool
//!
//! ## Consensus & Mining
//! - [`merkle`] - Ordered Merkle roots
//! - [`pow`] - Proof-of-work prefixes
//! - [`miner`] - The cancellable mining worker
//!
//! ## Cryptography
//! - [`crypto`] - Keys, signatures, and hashing (secp256k1 + SHA-256)
//!
//! ## Wire Format
//! - [`wire`] - Field codec primitives and peer messages
//!
//! ## Node Runtime
//! - [`node`] - Channel wiring and task startup
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod block;
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod merkle;
pub mod miner;
pub mod pow;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Wire Format
// ============================================================================
pub mod wire;

// ============================================================================
// Node Runtime
// ============================================================================
pub mod node;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
