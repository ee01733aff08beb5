//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! ChainConfig (RPC URL, chain id, timeout)
//!     → client.rs (alloy provider calls, one attempt each, bounded by timeout)
//!     → rpc.rs (provider error → ChainError)
//!     → units.rs (exact decimal ↔ smallest-unit conversion)
//!     → confirmation.rs (receipt polling after broadcast)
//! ```
//!
//! # Constraints
//! - No private keys ever pass through this module
//! - All RPC calls have configurable timeouts
//! - JSON-RPC error messages are preserved verbatim

pub mod client;
pub mod confirmation;
pub mod rpc;
pub mod types;
pub mod units;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{verify_chain_id, ChainClient, JsonRpcClient, ReceiptSummary};
pub use confirmation::ConfirmationTracker;
pub use types::{parse_address, ChainError, ChainId, ChainResult, ConfirmationStatus};
pub use units::{format_units, parse_units, AmountError, ETHER_DECIMALS};
