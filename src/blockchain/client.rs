//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Speak JSON-RPC to a single node endpoint through an alloy provider
//! - Query chain state (balance, nonce, gas, receipts, head block)
//! - Submit raw signed transactions
//! - Bound every call with the configured timeout
//!
//! Every method is a single attempt. Retrying is a caller decision.

use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::TransportResult;
use async_trait::async_trait;
use std::future::IntoFuture;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::rpc::map_rpc_error;
use crate::blockchain::types::{ChainError, ChainResult};
use crate::config::ChainConfig;
use crate::observability::metrics;

/// Minimal receipt fields needed for confirmation tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub transaction_hash: TxHash,
    /// `None` while the node reports the receipt without a block.
    pub block_number: Option<u64>,
    pub success: bool,
}

impl ReceiptSummary {
    pub fn succeeded(&self) -> bool {
        self.success
    }
}

/// Read and write access to a blockchain node.
///
/// The pipeline depends on this trait rather than on the HTTP client so tests
/// can substitute an in-memory node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Balance of `address` in smallest units.
    async fn get_balance(&self, address: Address) -> ChainResult<U256>;

    /// Next nonce for `address`, counting pending transactions.
    async fn get_transaction_count(&self, address: Address) -> ChainResult<u64>;

    /// Gas limit the node expects `request` to need.
    async fn estimate_gas(&self, request: &TransactionRequest) -> ChainResult<u64>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> ChainResult<U256>;

    /// Chain id reported by the node.
    async fn chain_id(&self) -> ChainResult<u64>;

    /// Submit a raw signed transaction, passing `raw_hex` through unchanged.
    async fn submit_raw_transaction(&self, raw_hex: &str) -> ChainResult<TxHash>;

    /// Receipt for `tx_hash`, `None` while pending or unknown.
    async fn get_transaction_receipt(&self, tx_hash: TxHash) -> ChainResult<Option<ReceiptSummary>>;

    /// Latest block number.
    async fn block_number(&self) -> ChainResult<u64>;
}

/// JSON-RPC over HTTP implementation of [`ChainClient`].
pub struct JsonRpcClient {
    provider: DynProvider,
    url: url::Url,
    timeout_duration: Duration,
}

impl JsonRpcClient {
    /// Create a client for the configured endpoint.
    ///
    /// No network traffic happens here; use [`verify_chain_id`] to check the
    /// endpoint before the first transfer.
    pub fn new(config: &ChainConfig) -> ChainResult<Self> {
        let url: url::Url = config.rpc_url.parse().map_err(|e| {
            ChainError::NodeUnreachable(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        let provider = ProviderBuilder::new().connect_http(url.clone()).erased();

        tracing::debug!(rpc_url = %url, chain_id = config.chain_id, "JSON-RPC client created");

        Ok(Self {
            provider,
            url,
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
        })
    }

    async fn call<T, F>(&self, method: &'static str, request: F) -> ChainResult<T>
    where
        F: IntoFuture<Output = TransportResult<T>> + Send,
        F::IntoFuture: Send,
        T: Send,
    {
        let result = match timeout(self.timeout_duration, request.into_future()).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(map_rpc_error(e)),
            Err(_) => Err(ChainError::Timeout(self.timeout_duration.as_secs())),
        };

        match &result {
            Ok(_) => metrics::record_rpc(method, "ok"),
            Err(e) => {
                tracing::warn!(method, error = %e, "RPC call failed");
                metrics::record_rpc(method, if e.is_transport() { "transport" } else { "error" });
            }
        }
        result
    }
}

#[async_trait]
impl ChainClient for JsonRpcClient {
    async fn get_balance(&self, address: Address) -> ChainResult<U256> {
        self.call("eth_getBalance", self.provider.get_balance(address)).await
    }

    async fn get_transaction_count(&self, address: Address) -> ChainResult<u64> {
        self.call(
            "eth_getTransactionCount",
            self.provider.get_transaction_count(address).pending(),
        )
        .await
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> ChainResult<u64> {
        self.call("eth_estimateGas", self.provider.estimate_gas(request.clone()))
            .await
            .map_err(|e| match e {
                ChainError::Node { message, .. } => ChainError::EstimationFailed(message),
                other => other,
            })
    }

    async fn gas_price(&self) -> ChainResult<U256> {
        let price = self.call("eth_gasPrice", self.provider.get_gas_price()).await?;
        Ok(U256::from(price))
    }

    async fn chain_id(&self) -> ChainResult<u64> {
        self.call("eth_chainId", self.provider.get_chain_id()).await
    }

    async fn submit_raw_transaction(&self, raw_hex: &str) -> ChainResult<TxHash> {
        // Sent verbatim; the provider's typed send would add a 0x marker.
        let params = [raw_hex.to_string()];
        self.call(
            "eth_sendRawTransaction",
            self.provider
                .raw_request::<_, TxHash>("eth_sendRawTransaction".into(), params),
        )
        .await
    }

    async fn get_transaction_receipt(&self, tx_hash: TxHash) -> ChainResult<Option<ReceiptSummary>> {
        let receipt = self
            .call(
                "eth_getTransactionReceipt",
                self.provider.get_transaction_receipt(tx_hash),
            )
            .await?;
        Ok(receipt.map(|r| ReceiptSummary {
            transaction_hash: ReceiptResponse::transaction_hash(&r),
            block_number: ReceiptResponse::block_number(&r),
            success: ReceiptResponse::status(&r),
        }))
    }

    async fn block_number(&self) -> ChainResult<u64> {
        self.call("eth_blockNumber", self.provider.get_block_number()).await
    }
}

impl std::fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("rpc_url", &self.url.as_str())
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}

/// Verify the connected chain ID matches configuration.
pub async fn verify_chain_id(client: &dyn ChainClient, expected: u64) -> ChainResult<()> {
    let actual = client.chain_id().await?;
    if actual != expected {
        return Err(ChainError::ChainMismatch { expected, actual });
    }
    tracing::info!(chain_id = actual, "Chain ID verified");
    Ok(())
}
