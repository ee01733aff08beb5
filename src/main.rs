//! Custodial transfer CLI.
//!
//! # Architecture Overview
//!
//! ```text
//!   custody-transfer send ──▶ SenderGate ──▶ TransactionPipeline
//!                                               │
//!                  ┌────────────────────────────┼─────────────────────┐
//!                  ▼                            ▼                     ▼
//!          TransactionBuilder              HttpSigner         BroadcastCoordinator
//!          (JsonRpcClient reads)         (remote signer)     (eth_sendRawTransaction)
//!                                                                     │
//!                                                                     ▼
//!                                                          ConfirmationTracker (--wait)
//! ```
//!
//! Results are printed to stdout as JSON. Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use alloy::primitives::TxHash;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use custody_transfer::blockchain::{
    format_units, parse_address, ConfirmationStatus, ConfirmationTracker,
};
use custody_transfer::config::{load_config, load_from_env, TransferConfig};
use custody_transfer::observability::{logging, metrics};
use custody_transfer::transfer::{
    BroadcastOutcome, KeyReference, SenderGate, TransactionPipeline, TransferIntent,
};

/// Exit code for outcomes where the node may or may not have the transaction.
const EXIT_TRANSIENT: u8 = 75;

#[derive(Parser)]
#[command(name = "custody-transfer")]
#[command(about = "Build, remotely sign and broadcast custodial transfers", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults plus environment overrides when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the node serves the configured chain
    Check,
    /// Show the balance of an address
    Balance { address: String },
    /// Show the next nonce of an address, counting pending transactions
    Nonce { address: String },
    /// Run one transfer: build, sign, broadcast
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Decimal amount in whole units, e.g. 0.01
        #[arg(long)]
        amount: String,
        /// Custodial key identifier understood by the signer
        #[arg(long)]
        key_id: String,
        /// Wait for the configured number of confirmations after submission
        #[arg(long)]
        wait: bool,
    },
    /// Report the confirmation status of a submitted transaction
    Confirm {
        tx_hash: String,
        /// Poll until confirmed, reverted or timed out
        #[arg(long)]
        wait: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    logging::init_logging(&config.observability);
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    tracing::info!(
        rpc_url = %config.chain.rpc_url,
        chain_id = config.chain.chain_id,
        signer = %config.signer.endpoint,
        "Configuration loaded"
    );

    let pipeline = TransactionPipeline::from_config(&config)?;

    match cli.command {
        Commands::Check => {
            pipeline.verify_chain().await?;
            let head = pipeline.client().block_number().await?;
            print_json(&json!({
                "chain_id": config.chain.chain_id,
                "block_number": head,
                "status": "ok",
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Balance { address } => {
            let address = parse_address(&address)?;
            let balance = pipeline.client().get_balance(address).await?;
            print_json(&json!({
                "address": address.to_string(),
                "balance_wei": balance.to_string(),
                "balance": format_units(balance, config.chain.decimals),
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Nonce { address } => {
            let address = parse_address(&address)?;
            let nonce = pipeline.client().get_transaction_count(address).await?;
            print_json(&json!({
                "address": address.to_string(),
                "nonce": nonce,
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Send {
            from,
            to,
            amount,
            key_id,
            wait,
        } => send(&config, &pipeline, from, to, amount, key_id, wait).await,
        Commands::Confirm { tx_hash, wait } => {
            let tx_hash: TxHash = tx_hash.parse()?;
            let tracker = ConfirmationTracker::new(pipeline.client(), &config.confirmation);
            let status = if wait {
                tracker
                    .wait_for_confirmation(tx_hash, Duration::from_secs(config.confirmation.timeout_secs))
                    .await?
            } else {
                tracker.check(tx_hash).await?
            };
            let code = status_exit_code(&status);
            print_json(&json!({
                "tx_hash": tx_hash.to_string(),
                "confirmation": status_json(&status),
            }))?;
            Ok(code)
        }
    }
}

async fn send(
    config: &TransferConfig,
    pipeline: &TransactionPipeline,
    from: String,
    to: String,
    amount: String,
    key_id: String,
    wait: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if config.chain.verify_chain_id {
        pipeline.verify_chain().await?;
    }

    let sender = parse_address(&from)?;
    let key = KeyReference::new(key_id, sender);
    let gate = SenderGate::new();
    let permit = gate.acquire(sender).await;

    let receipt = match pipeline
        .execute_transfer(TransferIntent::new(from, to, amount), &key)
        .await
    {
        Ok(receipt) => receipt,
        Err(e) => {
            print_json(&json!({
                "invocation_id": e.invocation_id.to_string(),
                "state": e.stage.to_string(),
                "error_kind": e.error.kind(),
                "error": e.error.to_string(),
                "requires_rebuild": e.error.requires_rebuild(),
            }))?;
            return Ok(ExitCode::FAILURE);
        }
    };
    drop(permit);

    let mut report = json!({
        "invocation_id": receipt.invocation_id.to_string(),
        "state": receipt.state.to_string(),
        "nonce": receipt.descriptor.nonce,
        "value_wei": receipt.descriptor.value_wei.to_string(),
        "gas_limit": receipt.descriptor.gas_limit,
        "gas_price": receipt.descriptor.gas_price.to_string(),
    });

    let code = match &receipt.outcome {
        BroadcastOutcome::Submitted { tx_hash } => {
            report["tx_hash"] = json!(tx_hash.to_string());
            if wait {
                let tracker = ConfirmationTracker::new(pipeline.client(), &config.confirmation);
                let deadline = Duration::from_secs(config.confirmation.timeout_secs);
                match tracker.wait_for_confirmation(*tx_hash, deadline).await {
                    Ok(status) => {
                        report["confirmation"] = status_json(&status);
                        status_exit_code(&status)
                    }
                    Err(e) => {
                        report["confirmation"] = json!({ "status": "unknown", "error": e.to_string() });
                        ExitCode::from(EXIT_TRANSIENT)
                    }
                }
            } else {
                ExitCode::SUCCESS
            }
        }
        BroadcastOutcome::Rejected { reason } => {
            report["reason"] = json!(reason);
            ExitCode::FAILURE
        }
        BroadcastOutcome::TransientFailure { reason, .. } => {
            // The envelope is dropped here; a later run rebuilds with a fresh nonce.
            report["reason"] = json!(reason);
            ExitCode::from(EXIT_TRANSIENT)
        }
    };

    print_json(&report)?;
    Ok(code)
}

fn status_json(status: &ConfirmationStatus) -> Value {
    match status {
        ConfirmationStatus::Pending => json!({ "status": "pending" }),
        ConfirmationStatus::Confirming { current, required } => json!({
            "status": "confirming",
            "confirmations": current,
            "required": required,
        }),
        ConfirmationStatus::Confirmed { block_number } => json!({
            "status": "confirmed",
            "block_number": block_number,
        }),
        ConfirmationStatus::Failed(reason) => json!({ "status": "failed", "reason": reason }),
    }
}

fn status_exit_code(status: &ConfirmationStatus) -> ExitCode {
    match status {
        ConfirmationStatus::Confirmed { .. } => ExitCode::SUCCESS,
        ConfirmationStatus::Failed(_) => ExitCode::FAILURE,
        ConfirmationStatus::Pending | ConfirmationStatus::Confirming { .. } => {
            ExitCode::from(EXIT_TRANSIENT)
        }
    }
}

fn print_json(value: &Value) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
