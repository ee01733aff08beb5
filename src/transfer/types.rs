//! Values handed from stage to stage of a transfer.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use std::fmt;

/// What the caller wants to happen: move `amount` from `sender` to `recipient`.
///
/// Addresses and amount are kept as the caller typed them. Interpreting them
/// is the builder's job, so a malformed intent fails before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferIntent {
    sender: String,
    recipient: String,
    amount: String,
}

impl TransferIntent {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount: amount.into(),
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Decimal amount in the chain's native unit, e.g. `"0.01"`.
    pub fn amount(&self) -> &str {
        &self.amount
    }
}

/// Handle to a custodial key held by the remote signer.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyReference {
    key_id: String,
    owner: Address,
}

impl KeyReference {
    pub fn new(key_id: impl Into<String>, owner: Address) -> Self {
        Self {
            key_id: key_id.into(),
            owner,
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Key id shortened for logs.
    pub fn redacted_id(&self) -> String {
        let prefix: String = self.key_id.chars().take(8).collect();
        if prefix.len() < self.key_id.len() {
            format!("{}…", prefix)
        } else {
            prefix
        }
    }
}

impl fmt::Debug for KeyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyReference")
            .field("key_id", &self.redacted_id())
            .field("owner", &self.owner)
            .finish()
    }
}

/// Canonical legacy (EIP-155) transaction, ready to be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransactionDescriptor {
    pub from: Address,
    pub to: Address,
    pub nonce: u64,
    pub value_wei: U256,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub data: Bytes,
    pub chain_id: u64,
}

/// Signed transaction exactly as the signer returned it.
///
/// Not `Clone`. The pipeline submits an envelope at most once and only hands
/// it back to the caller after a transient failure.
#[derive(PartialEq, Eq)]
pub struct SignedTransactionEnvelope {
    raw: String,
}

impl SignedTransactionEnvelope {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Payload as returned by the signer, prefix included if it had one.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Payload with one leading `0x` removed.
    pub fn normalized(&self) -> &str {
        strip_hex_prefix(&self.raw)
    }
}

impl fmt::Debug for SignedTransactionEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedTransactionEnvelope")
            .field("hex_len", &self.normalized().len())
            .finish()
    }
}

/// Remove exactly one leading `0x` marker. Input without the marker is returned unchanged.
pub fn strip_hex_prefix(payload: &str) -> &str {
    payload.strip_prefix("0x").unwrap_or(payload)
}

/// Result of handing a signed envelope to the node.
#[derive(Debug, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// The node accepted the transaction into its pool.
    Submitted { tx_hash: TxHash },
    /// The node validated and refused the transaction. Do not resubmit.
    Rejected { reason: String },
    /// The node never gave a verdict. The same envelope may be resubmitted.
    TransientFailure {
        reason: String,
        envelope: SignedTransactionEnvelope,
    },
}

impl BroadcastOutcome {
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            BroadcastOutcome::Submitted { tx_hash } => Some(*tx_hash),
            _ => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            BroadcastOutcome::Submitted { .. } => "submitted",
            BroadcastOutcome::Rejected { .. } => "rejected",
            BroadcastOutcome::TransientFailure { .. } => "transient_failure",
        }
    }
}
