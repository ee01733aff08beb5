//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::TransferConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides the node endpoint.
pub const RPC_URL_ENV_VAR: &str = "CUSTODY_RPC_URL";
/// Overrides the signer endpoint.
pub const SIGNER_URL_ENV_VAR: &str = "CUSTODY_SIGNER_URL";
/// Overrides the chain id.
pub const CHAIN_ID_ENV_VAR: &str = "CUSTODY_CHAIN_ID";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<TransferConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: TransferConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;
    finalize(config, |key| std::env::var(key).ok())
}

/// Build configuration from defaults plus environment overrides.
pub fn load_from_env() -> Result<TransferConfig, ConfigError> {
    finalize(TransferConfig::default(), |key| std::env::var(key).ok())
}

fn finalize<F>(mut config: TransferConfig, env: F) -> Result<TransferConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    apply_overrides(&mut config, env).map_err(|e| ConfigError::Validation(vec![e]))?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn apply_overrides<F>(config: &mut TransferConfig, env: F) -> Result<(), ValidationError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env(RPC_URL_ENV_VAR) {
        tracing::debug!(var = RPC_URL_ENV_VAR, "Overriding chain.rpc_url from environment");
        config.chain.rpc_url = url;
    }
    if let Some(url) = env(SIGNER_URL_ENV_VAR) {
        tracing::debug!(var = SIGNER_URL_ENV_VAR, "Overriding signer.endpoint from environment");
        config.signer.endpoint = url;
    }
    if let Some(raw) = env(CHAIN_ID_ENV_VAR) {
        config.chain.chain_id = raw.trim().parse().map_err(|_| ValidationError::Invalid {
            field: "chain.chain_id",
            reason: format!("{} is not an integer: '{}'", CHAIN_ID_ENV_VAR, raw),
        })?;
    }
    Ok(())
}
