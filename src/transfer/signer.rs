//! Delegated signing through a remote key-management service.
//!
//! # Security
//! - Key material never leaves the signer; only the key id is sent
//! - Key ids and signed payloads are never logged in full
//!
//! # Wire contract
//! Request (`POST`, JSON): `walletAddress, keyId, nonce, to, value, gasLimit,
//! gasPrice, data, chainId`. Integers except `chainId` travel as decimal
//! strings. Response: `{"signedTransaction": "0x…"}`. Some signers prefix an
//! already-prefixed hex string and answer `"0x0x…"`; that doubled marker is
//! collapsed to one before the envelope leaves this module.
//!
//! A gateway status (502, 503, 504) or an empty 5xx means the signer never
//! saw the request and is reported as unreachable. Any other non-2xx answer
//! is the signer declining.

use alloy::primitives::{hex, Address};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

use crate::config::SignerConfig;
use crate::observability::metrics;
use crate::transfer::error::SigningError;
use crate::transfer::types::{
    strip_hex_prefix, KeyReference, SignedTransactionEnvelope, UnsignedTransactionDescriptor,
};

/// Capability to turn an unsigned descriptor into a signed envelope.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign `descriptor` with the key behind `key`. One attempt, no retries.
    async fn sign(
        &self,
        descriptor: &UnsignedTransactionDescriptor,
        key: &KeyReference,
    ) -> Result<SignedTransactionEnvelope, SigningError>;
}

/// Body of a signing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub wallet_address: String,
    pub key_id: String,
    pub nonce: String,
    pub to: String,
    pub value: String,
    pub gas_limit: String,
    pub gas_price: String,
    pub data: String,
    pub chain_id: u64,
}

impl SignRequest {
    pub fn new(descriptor: &UnsignedTransactionDescriptor, key: &KeyReference) -> Self {
        Self {
            wallet_address: lower_hex_address(descriptor.from),
            key_id: key.key_id().to_string(),
            nonce: descriptor.nonce.to_string(),
            to: lower_hex_address(descriptor.to),
            value: descriptor.value_wei.to_string(),
            gas_limit: descriptor.gas_limit.to_string(),
            gas_price: descriptor.gas_price.to_string(),
            data: format!("0x{}", hex::encode(&descriptor.data)),
            chain_id: descriptor.chain_id,
        }
    }
}

// Signers compare addresses textually, so send the lowercase form.
fn lower_hex_address(address: Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignResponse {
    signed_transaction: Option<String>,
}

/// Validate a signer response body and extract the envelope.
///
/// The field must be present, and after removing one optional `0x` it must
/// be a non-empty, even-length hex string. A doubled `0x0x` marker is
/// collapsed to a single `0x` first.
pub fn parse_sign_response(body: &str) -> Result<SignedTransactionEnvelope, SigningError> {
    let response: SignResponse = serde_json::from_str(body)
        .map_err(|e| SigningError::MalformedResponse(format!("body is not a JSON object: {}", e)))?;

    let raw = response
        .signed_transaction
        .map(|s| s.trim().to_string())
        .ok_or_else(|| SigningError::MalformedResponse("missing signedTransaction".to_string()))?;

    let raw = match raw.strip_prefix("0x0x") {
        Some(rest) => format!("0x{}", rest),
        None => raw,
    };

    let payload = strip_hex_prefix(&raw);
    if payload.is_empty() {
        return Err(SigningError::MalformedResponse("empty signedTransaction".to_string()));
    }
    if payload.len() % 2 != 0 || !payload.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(SigningError::MalformedResponse(
            "signedTransaction is not a hex string".to_string(),
        ));
    }

    Ok(SignedTransactionEnvelope::new(raw))
}

fn is_gateway_failure(status: u16, body: &str) -> bool {
    matches!(status, 502..=504) || (status >= 500 && body.trim().is_empty())
}

/// [`Signer`] backed by an HTTP signing service.
pub struct HttpSigner {
    http: reqwest::Client,
    endpoint: url::Url,
    timeout_duration: Duration,
}

impl HttpSigner {
    pub fn new(config: &SignerConfig) -> Result<Self, SigningError> {
        let endpoint: url::Url = config.endpoint.parse().map_err(|e| {
            SigningError::SignerUnreachable(format!(
                "invalid signer endpoint '{}': {}",
                config.endpoint, e
            ))
        })?;
        let timeout_duration = Duration::from_secs(config.timeout_secs);

        let http = reqwest::Client::builder()
            .connect_timeout(timeout_duration)
            .build()
            .map_err(|e| SigningError::SignerUnreachable(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            timeout_duration,
        })
    }

    async fn exchange(&self, request: &SignRequest) -> Result<SignedTransactionEnvelope, SigningError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| SigningError::SignerUnreachable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SigningError::SignerUnreachable(e.to_string()))?;

        if is_gateway_failure(status.as_u16(), &body) {
            return Err(SigningError::SignerUnreachable(format!(
                "HTTP {} from signer endpoint",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(SigningError::SignerRejected {
                status: status.as_u16(),
                message: body.trim().to_string(),
            });
        }

        parse_sign_response(&body)
    }
}

#[async_trait]
impl Signer for HttpSigner {
    async fn sign(
        &self,
        descriptor: &UnsignedTransactionDescriptor,
        key: &KeyReference,
    ) -> Result<SignedTransactionEnvelope, SigningError> {
        let request = SignRequest::new(descriptor, key);

        tracing::debug!(
            key = %key.redacted_id(),
            nonce = descriptor.nonce,
            chain_id = descriptor.chain_id,
            "Requesting remote signature"
        );

        let result = match timeout(self.timeout_duration, self.exchange(&request)).await {
            Ok(result) => result,
            Err(_) => Err(SigningError::SignerUnreachable(format!(
                "no response within {} seconds",
                self.timeout_duration.as_secs()
            ))),
        };

        let label = match &result {
            Ok(_) => "ok",
            Err(SigningError::SignerUnreachable(_)) => "unreachable",
            Err(SigningError::SignerRejected { .. }) => "rejected",
            Err(SigningError::MalformedResponse(_)) => "malformed",
        };
        metrics::record_signer(label);

        if let Err(e) = &result {
            tracing::warn!(key = %key.redacted_id(), error = %e, "Remote signing failed");
        }
        result
    }
}

impl std::fmt::Debug for HttpSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSigner")
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}
