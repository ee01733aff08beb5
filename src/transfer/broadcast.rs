//! Submission of signed envelopes and classification of the node's answer.

use std::sync::Arc;

use crate::blockchain::{ChainClient, ChainError};
use crate::observability::metrics;
use crate::transfer::types::{BroadcastOutcome, SignedTransactionEnvelope};

/// Common reasons a node refuses a transaction, recognised from its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// The nonce was already used; rebuild with a fresh nonce.
    NonceTooLow,
    /// The node already has this exact transaction.
    AlreadyKnown,
    /// Gas price too low to replace or enter the pool.
    Underpriced,
    InsufficientFunds,
    Other,
}

impl RejectionKind {
    pub fn classify(reason: &str) -> Self {
        let reason = reason.to_lowercase();
        if reason.contains("nonce too low") {
            RejectionKind::NonceTooLow
        } else if reason.contains("already known") {
            RejectionKind::AlreadyKnown
        } else if reason.contains("underpriced") {
            RejectionKind::Underpriced
        } else if reason.contains("insufficient funds") {
            RejectionKind::InsufficientFunds
        } else {
            RejectionKind::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::NonceTooLow => "nonce_too_low",
            RejectionKind::AlreadyKnown => "already_known",
            RejectionKind::Underpriced => "underpriced",
            RejectionKind::InsufficientFunds => "insufficient_funds",
            RejectionKind::Other => "other",
        }
    }
}

/// Hands signed envelopes to the node, one submission per call.
#[derive(Clone)]
pub struct BroadcastCoordinator {
    client: Arc<dyn ChainClient>,
}

impl BroadcastCoordinator {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }

    /// Submit `envelope` once and classify the result.
    ///
    /// A JSON-RPC error object is the node's verdict and becomes `Rejected`
    /// with the message kept verbatim. Anything that leaves acceptance
    /// unknown becomes `TransientFailure` and hands the envelope back.
    pub async fn broadcast(&self, envelope: SignedTransactionEnvelope) -> BroadcastOutcome {
        let outcome = match self.client.submit_raw_transaction(envelope.normalized()).await {
            Ok(tx_hash) => {
                tracing::info!(tx_hash = %tx_hash, "Transaction submitted");
                BroadcastOutcome::Submitted { tx_hash }
            }
            Err(ChainError::Node { code, message }) => {
                let kind = RejectionKind::classify(&message);
                tracing::warn!(code, reason = %message, kind = kind.as_str(), "Node rejected transaction");
                BroadcastOutcome::Rejected { reason: message }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Broadcast outcome unknown");
                BroadcastOutcome::TransientFailure {
                    reason: e.to_string(),
                    envelope,
                }
            }
        };

        metrics::record_broadcast(outcome.label());
        outcome
    }
}
