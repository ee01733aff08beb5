//! Single-shot transfer pipeline: build, sign, broadcast.
//!
//! # State Machine
//! ```text
//! Building ──▶ Built ──▶ Signing ──▶ Signed ──▶ Broadcasting ──▶ Submitted
//!    │                      │                        ├──────────▶ Rejected
//!    ▼                      ▼                        └──────────▶ TransientFailure
//! BuilderFailed        SigningFailed
//! ```
//!
//! No state is entered twice and there is no retry loop. A caller that
//! wants another attempt starts a new invocation, which re-reads the nonce.
//! Dropping the future of an in-flight invocation drops its signed envelope.

use alloy::primitives::U256;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::blockchain::{verify_chain_id, ChainClient, ChainError, JsonRpcClient};
use crate::config::{GasPricePolicy, TransferConfig};
use crate::observability::metrics;
use crate::transfer::broadcast::BroadcastCoordinator;
use crate::transfer::builder::{ChainObservations, TransactionBuilder};
use crate::transfer::error::{PipelineError, TransferError, ValidationError};
use crate::transfer::signer::{HttpSigner, Signer};
use crate::transfer::types::{
    BroadcastOutcome, KeyReference, SignedTransactionEnvelope, TransferIntent,
    UnsignedTransactionDescriptor,
};

const WEI_PER_GWEI: u64 = 1_000_000_000;

/// Where an invocation is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Building,
    Built,
    Signing,
    Signed,
    Broadcasting,
    Submitted,
    Rejected,
    TransientFailure,
    BuilderFailed,
    SigningFailed,
}

impl PipelineState {
    /// Whether `next` may follow `self`.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Building, Built)
                | (Building, BuilderFailed)
                | (Built, Signing)
                | (Signing, Signed)
                | (Signing, SigningFailed)
                | (Signed, Broadcasting)
                | (Broadcasting, Submitted)
                | (Broadcasting, Rejected)
                | (Broadcasting, TransientFailure)
        )
    }

    pub fn is_terminal(self) -> bool {
        use PipelineState::*;
        matches!(
            self,
            Submitted | Rejected | TransientFailure | BuilderFailed | SigningFailed
        )
    }

    fn from_outcome(outcome: &BroadcastOutcome) -> Self {
        match outcome {
            BroadcastOutcome::Submitted { .. } => PipelineState::Submitted,
            BroadcastOutcome::Rejected { .. } => PipelineState::Rejected,
            BroadcastOutcome::TransientFailure { .. } => PipelineState::TransientFailure,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a completed invocation produced.
#[derive(Debug)]
pub struct TransferReceipt {
    pub invocation_id: Uuid,
    pub descriptor: UnsignedTransactionDescriptor,
    pub outcome: BroadcastOutcome,
    pub state: PipelineState,
}

impl TransferReceipt {
    /// Collapse the outcome into a result, dropping any returned envelope.
    pub fn into_result(self) -> Result<alloy::primitives::TxHash, TransferError> {
        match self.outcome {
            BroadcastOutcome::Submitted { tx_hash } => Ok(tx_hash),
            BroadcastOutcome::Rejected { reason } => Err(TransferError::BroadcastRejected(reason)),
            BroadcastOutcome::TransientFailure { reason, .. } => {
                Err(TransferError::BroadcastTransient(reason))
            }
        }
    }
}

struct Run {
    id: Uuid,
    state: PipelineState,
    started: Instant,
}

impl Run {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: PipelineState::Building,
            started: Instant::now(),
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal pipeline transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(from = %self.state, to = %next, "Pipeline state change");
        self.state = next;
        if next.is_terminal() {
            metrics::record_pipeline_finished(next, self.started.elapsed());
        }
    }

    fn fail(mut self, next: PipelineState, error: TransferError) -> PipelineError {
        self.advance(next);
        tracing::warn!(stage = %next, kind = error.kind(), error = %error, "Transfer failed");
        PipelineError {
            invocation_id: self.id,
            stage: next,
            error,
        }
    }
}

/// Orchestrates builder, signer and broadcaster for one transfer at a time.
///
/// The pipeline holds no per-transfer state between invocations and takes no
/// locks. Serializing transfers per sender is the caller's job, see
/// [`SenderGate`](crate::transfer::SenderGate).
#[derive(Clone)]
pub struct TransactionPipeline {
    client: Arc<dyn ChainClient>,
    signer: Arc<dyn Signer>,
    builder: TransactionBuilder,
    coordinator: BroadcastCoordinator,
    gas_policy: GasPricePolicy,
}

impl TransactionPipeline {
    pub fn new(
        client: Arc<dyn ChainClient>,
        signer: Arc<dyn Signer>,
        builder: TransactionBuilder,
        gas_policy: GasPricePolicy,
    ) -> Self {
        Self {
            coordinator: BroadcastCoordinator::new(client.clone()),
            client,
            signer,
            builder,
            gas_policy,
        }
    }

    /// Wire the HTTP node client and HTTP signer from configuration.
    pub fn from_config(config: &TransferConfig) -> Result<Self, TransferError> {
        let client = JsonRpcClient::new(&config.chain)
            .map_err(|e| TransferError::Configuration(e.to_string()))?;
        let signer = HttpSigner::new(&config.signer)
            .map_err(|e| TransferError::Configuration(e.to_string()))?;

        Ok(Self::new(
            Arc::new(client),
            Arc::new(signer),
            TransactionBuilder::new(config.chain.chain_id, config.chain.decimals),
            config.gas.price,
        ))
    }

    /// Check that the node serves the configured chain.
    ///
    /// A mismatch is a configuration error; an unreachable node is a chain read error.
    pub async fn verify_chain(&self) -> Result<(), TransferError> {
        verify_chain_id(self.client.as_ref(), self.builder.chain_id())
            .await
            .map_err(|e| {
                if matches!(e, ChainError::ChainMismatch { .. }) {
                    TransferError::Configuration(e.to_string())
                } else {
                    TransferError::ChainRead(e)
                }
            })
    }

    pub fn client(&self) -> Arc<dyn ChainClient> {
        self.client.clone()
    }

    pub fn builder(&self) -> &TransactionBuilder {
        &self.builder
    }

    /// Run one transfer attempt end to end.
    ///
    /// Returns `Err` if the attempt stopped before broadcast. Once an envelope
    /// reaches the node the attempt always returns `Ok` with the node's
    /// verdict in [`TransferReceipt::outcome`].
    pub async fn execute_transfer(
        &self,
        intent: TransferIntent,
        key: &KeyReference,
    ) -> Result<TransferReceipt, PipelineError> {
        let run = Run::new();
        let span = tracing::info_span!(
            "transfer",
            invocation_id = %run.id,
            from = %intent.sender(),
            to = %intent.recipient(),
            key = %key.redacted_id(),
        );
        self.run(run, intent, key).instrument(span).await
    }

    async fn run(
        &self,
        mut run: Run,
        intent: TransferIntent,
        key: &KeyReference,
    ) -> Result<TransferReceipt, PipelineError> {
        let descriptor = match self.build(&intent, key).await {
            Ok(d) => d,
            Err(e) => return Err(run.fail(PipelineState::BuilderFailed, e)),
        };
        run.advance(PipelineState::Built);
        tracing::info!(
            nonce = descriptor.nonce,
            value_wei = %descriptor.value_wei,
            gas_limit = descriptor.gas_limit,
            gas_price = %descriptor.gas_price,
            "Transaction built"
        );

        run.advance(PipelineState::Signing);
        let envelope = match self.signer.sign(&descriptor, key).await {
            Ok(envelope) => envelope,
            Err(e) => return Err(run.fail(PipelineState::SigningFailed, e.into())),
        };
        run.advance(PipelineState::Signed);

        run.advance(PipelineState::Broadcasting);
        let outcome = self.coordinator.broadcast(envelope).await;
        let state = PipelineState::from_outcome(&outcome);
        run.advance(state);

        tracing::info!(outcome = outcome.label(), "Transfer finished");
        Ok(TransferReceipt {
            invocation_id: run.id,
            descriptor,
            outcome,
            state,
        })
    }

    /// Validation, gas, then nonce last so the nonce is as fresh as possible.
    async fn build(
        &self,
        intent: &TransferIntent,
        key: &KeyReference,
    ) -> Result<UnsignedTransactionDescriptor, TransferError> {
        let transfer = self.builder.validate(intent)?;
        if transfer.from != key.owner() {
            return Err(ValidationError::KeyOwnerMismatch {
                sender: intent.sender().to_string(),
                owner: key.owner().to_string(),
            }
            .into());
        }

        let gas_limit = self
            .client
            .estimate_gas(&self.builder.estimate_request(&transfer))
            .await?;
        let gas_price = self.resolve_gas_price().await?;
        let nonce = self.client.get_transaction_count(transfer.from).await?;

        Ok(self.builder.assemble(
            transfer,
            ChainObservations {
                nonce,
                gas_limit,
                gas_price,
            },
        ))
    }

    async fn resolve_gas_price(&self) -> Result<U256, TransferError> {
        match self.gas_policy {
            GasPricePolicy::Fixed { wei } => Ok(U256::from(wei)),
            GasPricePolicy::Node { max_gwei } => {
                let price = self.client.gas_price().await?;
                let ceiling = U256::from(max_gwei).saturating_mul(U256::from(WEI_PER_GWEI));
                if price > ceiling {
                    return Err(TransferError::GasPriceTooHigh {
                        current_wei: price,
                        max_gwei,
                    });
                }
                Ok(price)
            }
        }
    }

    /// Submit an envelope returned by a transient failure, unchanged.
    pub async fn resubmit(&self, envelope: SignedTransactionEnvelope) -> BroadcastOutcome {
        tracing::info!("Resubmitting signed envelope after transient failure");
        self.coordinator.broadcast(envelope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::mock::MockChain;
    use crate::transfer::error::SigningError;
    use alloy::primitives::{Address, TxHash};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const SENDER: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const RECIPIENT: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    struct FakeSigner {
        response: Result<&'static str, SigningError>,
        seen: Mutex<Vec<UnsignedTransactionDescriptor>>,
    }

    impl FakeSigner {
        fn returning(response: Result<&'static str, SigningError>) -> Self {
            Self {
                response,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Signer for FakeSigner {
        async fn sign(
            &self,
            descriptor: &UnsignedTransactionDescriptor,
            _key: &KeyReference,
        ) -> Result<SignedTransactionEnvelope, SigningError> {
            self.seen.lock().unwrap().push(descriptor.clone());
            self.response.clone().map(|raw| SignedTransactionEnvelope::new(raw))
        }
    }

    fn key() -> KeyReference {
        KeyReference::new("kms-key-1", SENDER.parse::<Address>().unwrap())
    }

    fn intent(amount: &str) -> TransferIntent {
        TransferIntent::new(SENDER, RECIPIENT, amount)
    }

    fn pipeline(
        chain: &Arc<MockChain>,
        signer: &Arc<FakeSigner>,
        policy: GasPricePolicy,
    ) -> TransactionPipeline {
        TransactionPipeline::new(
            chain.clone(),
            signer.clone(),
            TransactionBuilder::new(11_155_111, 18),
            policy,
        )
    }

    fn fixed_gwei() -> GasPricePolicy {
        GasPricePolicy::Fixed { wei: 1_000_000_000 }
    }

    #[tokio::test]
    async fn test_submitted_scenario() {
        let hash = TxHash::repeat_byte(0xde);
        let chain = Arc::new(MockChain::new().with_submit_result(Ok(hash)));
        let signer = Arc::new(FakeSigner::returning(Ok("0xf86c05")));

        let receipt = pipeline(&chain, &signer, fixed_gwei())
            .execute_transfer(intent("0.01"), &key())
            .await
            .unwrap();

        assert_eq!(receipt.state, PipelineState::Submitted);
        assert_eq!(receipt.outcome, BroadcastOutcome::Submitted { tx_hash: hash });
        assert_eq!(receipt.descriptor.value_wei.to_string(), "10000000000000000");
        assert_eq!(receipt.descriptor.nonce, 5);
        assert_eq!(receipt.descriptor.gas_limit, 21_000);
        assert_eq!(receipt.descriptor.chain_id, 11_155_111);
        assert_eq!(signer.seen.lock().unwrap().len(), 1);
        // The receipt carries the same descriptor the signer signed.
        assert_eq!(signer.seen.lock().unwrap()[0], receipt.descriptor);
        assert_eq!(chain.submitted(), vec!["f86c05".to_string()]);
    }

    #[tokio::test]
    async fn test_rejected_scenario() {
        let chain = Arc::new(MockChain::new().with_submit_result(Err(ChainError::Node {
            code: -32000,
            message: "nonce too low".to_string(),
        })));
        let signer = Arc::new(FakeSigner::returning(Ok("0xf86c05")));

        let receipt = pipeline(&chain, &signer, fixed_gwei())
            .execute_transfer(intent("0.01"), &key())
            .await
            .unwrap();

        assert_eq!(receipt.state, PipelineState::Rejected);
        assert_eq!(
            receipt.into_result().unwrap_err(),
            TransferError::BroadcastRejected("nonce too low".to_string())
        );
    }

    #[tokio::test]
    async fn test_signer_timeout_never_broadcasts() {
        let chain = Arc::new(MockChain::new());
        let signer = Arc::new(FakeSigner::returning(Err(SigningError::SignerUnreachable(
            "no response within 15 seconds".to_string(),
        ))));

        let err = pipeline(&chain, &signer, fixed_gwei())
            .execute_transfer(intent("0.01"), &key())
            .await
            .unwrap_err();

        assert_eq!(err.stage, PipelineState::SigningFailed);
        assert!(matches!(err.error, TransferError::Signing(SigningError::SignerUnreachable(_))));
        assert!(!chain.calls().contains(&"eth_sendRawTransaction"));
        assert!(chain.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_validation_failure_never_touches_network() {
        let chain = Arc::new(MockChain::new());
        let signer = Arc::new(FakeSigner::returning(Ok("0xf86c05")));

        let err = pipeline(&chain, &signer, fixed_gwei())
            .execute_transfer(intent("0.0000000000000000001"), &key())
            .await
            .unwrap_err();

        assert_eq!(err.stage, PipelineState::BuilderFailed);
        assert!(matches!(
            err.error,
            TransferError::Validation(ValidationError::PrecisionLoss { .. })
        ));
        assert!(chain.calls().is_empty());
        assert!(signer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_key_owner_mismatch() {
        let chain = Arc::new(MockChain::new());
        let signer = Arc::new(FakeSigner::returning(Ok("0xf86c05")));
        let other_key = KeyReference::new("kms-key-2", RECIPIENT.parse::<Address>().unwrap());

        let err = pipeline(&chain, &signer, fixed_gwei())
            .execute_transfer(intent("1"), &other_key)
            .await
            .unwrap_err();

        assert!(matches!(
            err.error,
            TransferError::Validation(ValidationError::KeyOwnerMismatch { .. })
        ));
        assert!(chain.calls().is_empty());
    }

    #[tokio::test]
    async fn test_estimation_failure_is_not_defaulted() {
        let mut mock = MockChain::new();
        mock.gas_estimate = Err(ChainError::EstimationFailed("insufficient funds".to_string()));
        let chain = Arc::new(mock);
        let signer = Arc::new(FakeSigner::returning(Ok("0xf86c05")));

        let err = pipeline(&chain, &signer, fixed_gwei())
            .execute_transfer(intent("1"), &key())
            .await
            .unwrap_err();

        assert_eq!(err.stage, PipelineState::BuilderFailed);
        assert_eq!(
            err.error,
            TransferError::ChainRead(ChainError::EstimationFailed("insufficient funds".to_string()))
        );
        assert!(signer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nonce_read_last() {
        let chain = Arc::new(MockChain::new());
        let signer = Arc::new(FakeSigner::returning(Ok("0xf86c05")));

        pipeline(&chain, &signer, GasPricePolicy::Node { max_gwei: 100 })
            .execute_transfer(intent("1"), &key())
            .await
            .unwrap();

        assert_eq!(
            chain.calls(),
            vec![
                "eth_estimateGas",
                "eth_gasPrice",
                "eth_getTransactionCount",
                "eth_sendRawTransaction"
            ]
        );
    }

    #[tokio::test]
    async fn test_gas_price_ceiling() {
        let mut mock = MockChain::new();
        mock.gas_price = Ok(U256::from(101u64) * U256::from(WEI_PER_GWEI));
        let chain = Arc::new(mock);
        let signer = Arc::new(FakeSigner::returning(Ok("0xf86c05")));

        let err = pipeline(&chain, &signer, GasPricePolicy::Node { max_gwei: 100 })
            .execute_transfer(intent("1"), &key())
            .await
            .unwrap_err();

        assert_eq!(err.stage, PipelineState::BuilderFailed);
        assert!(matches!(err.error, TransferError::GasPriceTooHigh { max_gwei: 100, .. }));
    }

    #[tokio::test]
    async fn test_transient_failure_can_be_resubmitted() {
        let chain = Arc::new(MockChain::new().with_submit_result(Err(ChainError::Timeout(15))));
        let signer = Arc::new(FakeSigner::returning(Ok("0xf86c05")));
        let pipeline = pipeline(&chain, &signer, fixed_gwei());

        let receipt = pipeline.execute_transfer(intent("0.5"), &key()).await.unwrap();
        assert_eq!(receipt.state, PipelineState::TransientFailure);

        let envelope = match receipt.outcome {
            BroadcastOutcome::TransientFailure { envelope, .. } => envelope,
            other => panic!("expected transient failure, got {:?}", other),
        };
        let _ = pipeline.resubmit(envelope).await;

        // Same payload twice, signer asked only once.
        assert_eq!(chain.submitted(), vec!["f86c05".to_string(), "f86c05".to_string()]);
        assert_eq!(signer.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_chain_mismatch_is_configuration_error() {
        let mut mock = MockChain::new();
        mock.chain_id = 1;
        let chain = Arc::new(mock);
        let signer = Arc::new(FakeSigner::returning(Ok("0xf86c05")));

        let err = pipeline(&chain, &signer, fixed_gwei())
            .verify_chain()
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Configuration(_)));
    }

    #[test]
    fn test_transition_table() {
        use PipelineState::*;
        assert!(Building.can_transition_to(Built));
        assert!(Signing.can_transition_to(SigningFailed));
        assert!(Broadcasting.can_transition_to(TransientFailure));
        assert!(!Built.can_transition_to(Broadcasting));
        assert!(!Signed.can_transition_to(Signing));
        assert!(!Submitted.can_transition_to(Broadcasting));
        assert!(!Broadcasting.can_transition_to(SigningFailed));
        for terminal in [Submitted, Rejected, TransientFailure, BuilderFailed, SigningFailed] {
            assert!(terminal.is_terminal());
        }
    }
}
