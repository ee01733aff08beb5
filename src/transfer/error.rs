//! Error taxonomy for the transfer pipeline.

use alloy::primitives::U256;
use thiserror::Error;
use uuid::Uuid;

use crate::blockchain::ChainError;
use crate::transfer::pipeline::PipelineState;

/// The intent is malformed. Never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid sender address '{0}'")]
    InvalidSender(String),

    #[error("invalid recipient address '{0}'")]
    InvalidRecipient(String),

    #[error("amount '{0}' is not a plain decimal number")]
    InvalidAmount(String),

    #[error("amount '{0}' must be greater than zero")]
    AmountNotPositive(String),

    #[error("amount '{amount}' has {digits} fractional digits, at most {max} are representable")]
    PrecisionLoss { amount: String, digits: usize, max: u8 },

    #[error("key belongs to {owner}, not to sender {sender}")]
    KeyOwnerMismatch { sender: String, owner: String },
}

/// The remote signer did not produce a usable envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    /// Network failure or timeout before the signer answered.
    #[error("signer unreachable: {0}")]
    SignerUnreachable(String),

    /// The signer answered and declined (unknown key, policy, stale nonce).
    #[error("signer rejected request (HTTP {status}): {message}")]
    SignerRejected { status: u16, message: String },

    /// The signer answered with something that is not a signed transaction.
    #[error("malformed signer response: {0}")]
    MalformedResponse(String),
}

/// Any failure a transfer can end in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("chain read failed: {0}")]
    ChainRead(#[from] ChainError),

    #[error("gas price {current_wei} wei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_wei: U256, max_gwei: u64 },

    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error("broadcast rejected: {0}")]
    BroadcastRejected(String),

    #[error("broadcast failed transiently: {0}")]
    BroadcastTransient(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl TransferError {
    /// Only a transient broadcast failure may be retried with the same signed envelope.
    pub fn is_resubmittable(&self) -> bool {
        matches!(self, TransferError::BroadcastTransient(_))
    }

    /// A fresh pipeline invocation (re-read nonce, re-sign) is the way forward.
    pub fn requires_rebuild(&self) -> bool {
        !matches!(
            self,
            TransferError::BroadcastTransient(_) | TransferError::Configuration(_)
        )
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TransferError::Validation(_) => "validation",
            TransferError::ChainRead(_) => "chain_read",
            TransferError::GasPriceTooHigh { .. } => "gas_price",
            TransferError::Signing(_) => "signing",
            TransferError::BroadcastRejected(_) => "broadcast_rejected",
            TransferError::BroadcastTransient(_) => "broadcast_transient",
            TransferError::Configuration(_) => "configuration",
        }
    }
}

/// A pipeline invocation that stopped before broadcast, with the stage it stopped at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transfer {invocation_id} failed at {stage}: {error}")]
pub struct PipelineError {
    pub invocation_id: Uuid,
    pub stage: PipelineState,
    #[source]
    pub error: TransferError,
}
