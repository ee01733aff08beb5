//! Chain-specific types and error definitions.

use alloy::primitives::Address;
use thiserror::Error;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur while talking to the blockchain node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Connection refused, reset, DNS failure or a gateway error.
    #[error("Node unreachable: {0}")]
    NodeUnreachable(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Address text is not a 20-byte hex address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The node could not estimate gas (reverting call, insufficient funds).
    #[error("Gas estimation failed: {0}")]
    EstimationFailed(String),

    /// The node answered with a JSON-RPC error object.
    #[error("Node error {code}: {message}")]
    Node { code: i64, message: String },

    /// The node answered but the payload could not be interpreted.
    #[error("Malformed node response: {0}")]
    MalformedResponse(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// Transaction was not confirmed within expected time.
    #[error("Transaction not confirmed to depth {0} before deadline")]
    ConfirmationTimeout(u32),
}

impl ChainError {
    /// True when the request may never have reached the node.
    pub fn is_transport(&self) -> bool {
        matches!(self, ChainError::NodeUnreachable(_) | ChainError::Timeout(_))
    }
}

/// Result type for blockchain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Parse a `0x`-prefixed 20-byte hex address.
///
/// Mixed-case input must carry a valid EIP-55 checksum; all-lowercase or
/// all-uppercase input is accepted as is.
pub fn parse_address(raw: &str) -> ChainResult<Address> {
    let invalid = || ChainError::InvalidAddress(raw.to_string());

    let hex_part = raw.strip_prefix("0x").ok_or_else(invalid)?;
    if hex_part.len() != 40 || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let has_lower = hex_part.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = hex_part.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(raw, None).map_err(|_| invalid());
    }

    raw.parse::<Address>().map_err(|_| invalid())
}

/// Transaction confirmation status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Transaction is pending in mempool.
    Pending,
    /// Transaction has been mined but not enough confirmations.
    Confirming { current: u32, required: u32 },
    /// Transaction is confirmed with required block depth.
    Confirmed { block_number: u64 },
    /// Transaction failed or was dropped.
    Failed(String),
}
