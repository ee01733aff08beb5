//! Translation of provider errors into [`ChainError`].
//!
//! A JSON-RPC error object is the node's verdict and keeps its message
//! verbatim. A 5xx from whatever sits in front of the node is a transport
//! problem, as is any failure before a reply arrived.

use alloy::transports::{RpcError, TransportError, TransportErrorKind};

use crate::blockchain::types::ChainError;

pub fn map_rpc_error(error: TransportError) -> ChainError {
    match error {
        RpcError::ErrorResp(payload) => ChainError::Node {
            code: payload.code,
            message: payload.message.to_string(),
        },
        RpcError::Transport(TransportErrorKind::HttpError(http)) if http.status >= 500 => {
            ChainError::NodeUnreachable(format!("HTTP {} from node endpoint", http.status))
        }
        RpcError::Transport(TransportErrorKind::HttpError(http)) => {
            ChainError::MalformedResponse(format!("HTTP {}: {}", http.status, http.body))
        }
        RpcError::Transport(kind) => ChainError::NodeUnreachable(kind.to_string()),
        RpcError::DeserError { err, .. } => ChainError::MalformedResponse(err.to_string()),
        other => ChainError::MalformedResponse(other.to_string()),
    }
}
