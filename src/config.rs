//! Configuration management for emberchain

use crate::error::{ChainError, Result};
use crate::pow;
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pow: PowConfig,
    #[serde(default)]
    pub miner: MinerConfig,
    #[serde(default)]
    pub node: NodeConfig,
}

/// Per-entity-class proof-of-work difficulty, in required prefix bytes.
#[derive(Debug, Clone, Deserialize)]
pub struct PowConfig {
    #[serde(default = "default_transaction_complexity")]
    pub transaction_complexity: usize,
    #[serde(default = "default_block_complexity")]
    pub block_complexity: usize,
    #[serde(default = "default_key_complexity")]
    pub key_complexity: usize,
    #[serde(default = "default_prefix_byte")]
    pub prefix_byte: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinerConfig {
    /// How often an idle miner wakes to re-check its directive.
    #[serde(default = "default_idle_wake_secs")]
    pub idle_wake_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Pause between pooling a transaction and broadcasting it.
    #[serde(default = "default_broadcast_throttle_ms")]
    pub broadcast_throttle_ms: u64,
    /// Capacity of the inbound and outbound queues.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pow: PowConfig::default(),
            miner: MinerConfig::default(),
            node: NodeConfig::default(),
        }
    }
}

impl Default for PowConfig {
    fn default() -> Self {
        Self {
            transaction_complexity: default_transaction_complexity(),
            block_complexity: default_block_complexity(),
            key_complexity: default_key_complexity(),
            prefix_byte: default_prefix_byte(),
        }
    }
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            idle_wake_secs: default_idle_wake_secs(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            broadcast_throttle_ms: default_broadcast_throttle_ms(),
            queue_depth: default_queue_depth(),
        }
    }
}

fn default_transaction_complexity() -> usize {
    pow::TRANSACTION_POW_COMPLEXITY
}

fn default_block_complexity() -> usize {
    pow::BLOCK_POW_COMPLEXITY
}

fn default_key_complexity() -> usize {
    pow::KEY_POW_COMPLEXITY
}

fn default_prefix_byte() -> u8 {
    pow::POW_PREFIX_BYTE
}

fn default_idle_wake_secs() -> u64 {
    30
}

fn default_broadcast_throttle_ms() -> u64 {
    300
}

fn default_queue_depth() -> usize {
    64
}

impl Config {
    /// Reject values the engine cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.pow.transaction_complexity > 32
            || self.pow.block_complexity > 32
            || self.pow.key_complexity > 32
        {
            return Err(ChainError::ConfigError(
                "pow complexity cannot exceed the 32-byte hash width".to_string(),
            ));
        }
        if self.node.queue_depth == 0 {
            return Err(ChainError::ConfigError(
                "node.queue_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load and validate the configuration at `path`. A missing or empty file
/// yields the built-in defaults; a malformed one is an error.
pub fn load_config(path: &str) -> Result<Config> {
    let raw = fs::read_to_string(path).unwrap_or_default();
    let config: Config = if raw.is_empty() {
        Config::default()
    } else {
        toml::from_str(&raw)
            .map_err(|e| ChainError::ConfigError(format!("{}: {}", path, e)))?
    };
    config.validate()?;
    Ok(config)
}
