//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate endpoints are absolute http(s) URLs
//! - Validate value ranges (timeouts > 0, chain id > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TransferConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{GasPricePolicy, TransferConfig};

/// Largest decimal exponent for which 10^decimals still fits in a U256.
pub const MAX_DECIMALS: u8 = 77;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid URL '{value}': {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("chain.decimals {0} exceeds maximum {max}", max = MAX_DECIMALS)]
    DecimalsOutOfRange(u8),

    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Check a loaded configuration, collecting every problem found.
pub fn validate_config(config: &TransferConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url("chain.rpc_url", &config.chain.rpc_url, &mut errors);
    check_url("signer.endpoint", &config.signer.endpoint, &mut errors);

    if config.chain.chain_id == 0 {
        errors.push(ValidationError::Zero("chain.chain_id"));
    }
    if config.chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::Zero("chain.rpc_timeout_secs"));
    }
    if config.signer.timeout_secs == 0 {
        errors.push(ValidationError::Zero("signer.timeout_secs"));
    }
    if config.chain.decimals > MAX_DECIMALS {
        errors.push(ValidationError::DecimalsOutOfRange(config.chain.decimals));
    }

    match config.gas.price {
        GasPricePolicy::Fixed { wei: 0 } => errors.push(ValidationError::Zero("gas.price.wei")),
        GasPricePolicy::Node { max_gwei: 0 } => {
            errors.push(ValidationError::Zero("gas.price.max_gwei"))
        }
        _ => {}
    }

    if config.confirmation.confirmation_blocks == 0 {
        errors.push(ValidationError::Zero("confirmation.confirmation_blocks"));
    }
    if config.confirmation.poll_interval_secs == 0 {
        errors.push(ValidationError::Zero("confirmation.poll_interval_secs"));
    }
    if config.confirmation.timeout_secs == 0 {
        errors.push(ValidationError::Zero("confirmation.timeout_secs"));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::Invalid {
            field: "observability.metrics_address",
            reason: format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(parsed) => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        }),
        Err(e) => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        }),
    }
}
