//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the transfer
//! pipeline. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TransferConfig {
    /// Target chain and node endpoint.
    pub chain: ChainConfig,

    /// Remote signing service.
    pub signer: SignerConfig,

    /// Gas price policy.
    pub gas: GasConfig,

    /// Confirmation tracking after a successful broadcast.
    pub confirmation: ConfirmationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Blockchain node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Chain ID (e.g., 1 for Ethereum mainnet, 11155111 for Sepolia).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Decimal exponent of the native unit (18 for ether/wei).
    pub decimals: u8,

    /// Compare `eth_chainId` against `chain_id` before the first transfer.
    pub verify_chain_id: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
            chain_id: 11_155_111,
            rpc_timeout_secs: 15,
            decimals: 18,
            verify_chain_id: true,
        }
    }
}

/// Remote signer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Full URL of the signing endpoint.
    pub endpoint: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/sign".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Where the gas price of a transfer comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GasPricePolicy {
    /// Ask the node (`eth_gasPrice`), refusing anything above `max_gwei`.
    Node { max_gwei: u64 },
    /// Use a constant price in wei.
    Fixed { wei: u64 },
}

impl Default for GasPricePolicy {
    fn default() -> Self {
        GasPricePolicy::Node { max_gwei: 500 }
    }
}

/// Gas configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GasConfig {
    pub price: GasPricePolicy,
}

/// Confirmation tracking configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Number of blocks (including the inclusion block) required for finality.
    pub confirmation_blocks: u32,

    /// Receipt polling interval in seconds.
    pub poll_interval_secs: u64,

    /// Give up waiting after this many seconds.
    pub timeout_secs: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            confirmation_blocks: 1,
            poll_interval_secs: 2,
            timeout_secs: 120,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
