//! Confirmation monitoring for submitted transactions.
//!
//! # Responsibilities
//! - Poll the node for a receipt after a successful broadcast
//! - Report reverted transactions
//! - Count block depth until the configured number of confirmations

use alloy::primitives::TxHash;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout};

use crate::blockchain::client::ChainClient;
use crate::blockchain::types::{ChainError, ChainResult, ConfirmationStatus};
use crate::config::ConfirmationConfig;

/// Tracks a submitted transaction until it reaches the required depth.
pub struct ConfirmationTracker {
    client: Arc<dyn ChainClient>,
    required: u32,
    poll_interval: Duration,
}

impl ConfirmationTracker {
    pub fn new(client: Arc<dyn ChainClient>, config: &ConfirmationConfig) -> Self {
        Self {
            client,
            required: config.confirmation_blocks,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        }
    }

    /// Override the polling interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Number of blocks required for finality. The inclusion block counts as one.
    pub fn required_confirmations(&self) -> u32 {
        self.required
    }

    /// Inspect the transaction once.
    pub async fn check(&self, tx_hash: TxHash) -> ChainResult<ConfirmationStatus> {
        let receipt = match self.client.get_transaction_receipt(tx_hash).await? {
            Some(r) => r,
            None => return Ok(ConfirmationStatus::Pending),
        };

        if !receipt.succeeded() {
            return Ok(ConfirmationStatus::Failed("Transaction reverted".to_string()));
        }

        let tx_block = match receipt.block_number {
            Some(n) => n,
            None => return Ok(ConfirmationStatus::Pending),
        };

        let current_block = self.client.block_number().await?;
        let depth = current_block.saturating_sub(tx_block).saturating_add(1);
        let confirmations = u32::try_from(depth).unwrap_or(u32::MAX);

        if confirmations >= self.required {
            Ok(ConfirmationStatus::Confirmed {
                block_number: tx_block,
            })
        } else {
            Ok(ConfirmationStatus::Confirming {
                current: confirmations,
                required: self.required,
            })
        }
    }

    /// Poll until the transaction is confirmed, reverted, or `deadline` passes.
    pub async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        deadline: Duration,
    ) -> ChainResult<ConfirmationStatus> {
        let result = timeout(deadline, async {
            let mut ticker = interval(self.poll_interval);

            loop {
                ticker.tick().await;

                match self.check(tx_hash).await? {
                    ConfirmationStatus::Pending => {
                        tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                    }
                    ConfirmationStatus::Confirming { current, required } => {
                        tracing::debug!(
                            tx_hash = %tx_hash,
                            confirmations = current,
                            required = required,
                            "Waiting for confirmations"
                        );
                    }
                    done => return Ok(done),
                }
            }
        })
        .await;

        match result {
            Ok(status) => status,
            Err(_) => Err(ChainError::ConfirmationTimeout(self.required)),
        }
    }
}
