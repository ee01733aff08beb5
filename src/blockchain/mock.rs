//! In-memory node used by unit tests.

use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::blockchain::client::{ChainClient, ReceiptSummary};
use crate::blockchain::types::{ChainError, ChainResult};

pub(crate) struct MockChain {
    pub nonce: ChainResult<u64>,
    pub gas_estimate: ChainResult<u64>,
    pub gas_price: ChainResult<U256>,
    pub chain_id: u64,
    pub balance: U256,
    pub submit_result: ChainResult<TxHash>,
    pub head: u64,
    pub receipts: Mutex<VecDeque<Option<ReceiptSummary>>>,
    pub submitted: Mutex<Vec<String>>,
    pub calls: Mutex<Vec<&'static str>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            nonce: Ok(5),
            gas_estimate: Ok(21_000),
            gas_price: Ok(U256::from(1_000_000_000u64)),
            chain_id: 11_155_111,
            balance: U256::ZERO,
            submit_result: Ok(TxHash::repeat_byte(0xde)),
            head: 0,
            receipts: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_submit_result(mut self, result: ChainResult<TxHash>) -> Self {
        self.submit_result = result;
        self
    }

    pub fn with_receipts(self, receipts: Vec<Option<ReceiptSummary>>, head: u64) -> Self {
        *self.receipts.lock().unwrap() = receipts.into();
        Self { head, ..self }
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str) {
        self.calls.lock().unwrap().push(method);
    }
}

pub(crate) fn receipt(block: u64, success: bool) -> ReceiptSummary {
    ReceiptSummary {
        transaction_hash: TxHash::repeat_byte(0xde),
        block_number: Some(block),
        success,
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_balance(&self, _address: Address) -> ChainResult<U256> {
        self.record("eth_getBalance");
        Ok(self.balance)
    }

    async fn get_transaction_count(&self, _address: Address) -> ChainResult<u64> {
        self.record("eth_getTransactionCount");
        self.nonce.clone()
    }

    async fn estimate_gas(&self, _request: &TransactionRequest) -> ChainResult<u64> {
        self.record("eth_estimateGas");
        self.gas_estimate.clone()
    }

    async fn gas_price(&self) -> ChainResult<U256> {
        self.record("eth_gasPrice");
        self.gas_price.clone()
    }

    async fn chain_id(&self) -> ChainResult<u64> {
        self.record("eth_chainId");
        Ok(self.chain_id)
    }

    async fn submit_raw_transaction(&self, raw_hex: &str) -> ChainResult<TxHash> {
        self.record("eth_sendRawTransaction");
        self.submitted.lock().unwrap().push(raw_hex.to_string());
        self.submit_result.clone()
    }

    async fn get_transaction_receipt(&self, _tx_hash: TxHash) -> ChainResult<Option<ReceiptSummary>> {
        self.record("eth_getTransactionReceipt");
        let mut receipts = self.receipts.lock().unwrap();
        // The last queued answer repeats once the queue drains.
        match receipts.len() {
            0 => Err(ChainError::MalformedResponse("no receipt scripted".into())),
            1 => Ok(receipts[0].clone()),
            _ => Ok(receipts.pop_front().flatten()),
        }
    }

    async fn block_number(&self) -> ChainResult<u64> {
        self.record("eth_blockNumber");
        Ok(self.head)
    }
}
