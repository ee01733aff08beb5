//! Custodial transfer pipeline.
//!
//! # Data Flow
//! ```text
//! TransferIntent + KeyReference
//!     → builder.rs (validate, then assemble with nonce/gas read from the chain)
//!     → UnsignedTransactionDescriptor
//!     → signer.rs (remote signer, key id only)
//!     → SignedTransactionEnvelope
//!     → broadcast.rs (eth_sendRawTransaction, verdict classification)
//!     → BroadcastOutcome
//! ```
//!
//! pipeline.rs runs the stages in order for one invocation. gate.rs is the
//! caller-side per-sender serialization the pipeline itself does not do.

pub mod broadcast;
pub mod builder;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod signer;
pub mod types;

pub use broadcast::{BroadcastCoordinator, RejectionKind};
pub use builder::{ChainObservations, TransactionBuilder, ValidatedTransfer};
pub use error::{PipelineError, SigningError, TransferError, ValidationError};
pub use gate::{SenderGate, SenderPermit};
pub use pipeline::{PipelineState, TransactionPipeline, TransferReceipt};
pub use signer::{HttpSigner, SignRequest, Signer};
pub use types::{
    strip_hex_prefix, BroadcastOutcome, KeyReference, SignedTransactionEnvelope, TransferIntent,
    UnsignedTransactionDescriptor,
};
