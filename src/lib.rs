//! Custodial transfer library.
//!
//! Builds, remotely signs and broadcasts native-asset transfers for
//! custodial wallets without ever holding key material.

pub mod blockchain;
pub mod config;
pub mod observability;
pub mod transfer;

pub use config::TransferConfig;
pub use transfer::{
    BroadcastOutcome, KeyReference, SenderGate, TransactionPipeline, TransferIntent,
};
