//! Transaction parameter assembly.
//!
//! Everything here is pure: the builder never performs I/O. Chain-observed
//! values (nonce, gas) are read by the pipeline and passed in.

use alloy::network::TransactionBuilder as _;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;

use crate::blockchain::{parse_address, parse_units, AmountError};
use crate::transfer::error::ValidationError;
use crate::transfer::types::{TransferIntent, UnsignedTransactionDescriptor};

/// An intent whose addresses and amount have been interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransfer {
    pub from: Address,
    pub to: Address,
    pub value_wei: U256,
}

/// Values read from the chain right before building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainObservations {
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: U256,
}

/// Builds unsigned plain-transfer descriptors for one chain.
#[derive(Debug, Clone, Copy)]
pub struct TransactionBuilder {
    chain_id: u64,
    decimals: u8,
}

impl TransactionBuilder {
    pub fn new(chain_id: u64, decimals: u8) -> Self {
        Self { chain_id, decimals }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Interpret the intent's addresses and amount.
    pub fn validate(&self, intent: &TransferIntent) -> Result<ValidatedTransfer, ValidationError> {
        let from = parse_address(intent.sender())
            .map_err(|_| ValidationError::InvalidSender(intent.sender().to_string()))?;
        let to = parse_address(intent.recipient())
            .map_err(|_| ValidationError::InvalidRecipient(intent.recipient().to_string()))?;

        let value_wei = parse_units(intent.amount(), self.decimals).map_err(|e| match e {
            AmountError::Invalid(amount) => ValidationError::InvalidAmount(amount),
            AmountError::NotPositive(amount) => ValidationError::AmountNotPositive(amount),
            AmountError::PrecisionLoss { amount, digits, max } => {
                ValidationError::PrecisionLoss { amount, digits, max }
            }
        })?;

        Ok(ValidatedTransfer { from, to, value_wei })
    }

    /// Call description for `eth_estimateGas`: the descriptor without nonce or gas.
    pub fn estimate_request(&self, transfer: &ValidatedTransfer) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(transfer.from)
            .with_to(transfer.to)
            .with_value(transfer.value_wei)
            .with_input(Bytes::new())
    }

    /// Combine a validated transfer with chain observations.
    pub fn assemble(
        &self,
        transfer: ValidatedTransfer,
        observed: ChainObservations,
    ) -> UnsignedTransactionDescriptor {
        UnsignedTransactionDescriptor {
            from: transfer.from,
            to: transfer.to,
            nonce: observed.nonce,
            value_wei: transfer.value_wei,
            gas_limit: observed.gas_limit,
            gas_price: observed.gas_price,
            data: Bytes::new(),
            chain_id: self.chain_id,
        }
    }

    /// Validate and assemble in one step.
    pub fn build(
        &self,
        intent: &TransferIntent,
        observed: ChainObservations,
    ) -> Result<UnsignedTransactionDescriptor, ValidationError> {
        let transfer = self.validate(intent)?;
        Ok(self.assemble(transfer, observed))
    }
}
