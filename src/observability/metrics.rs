//! Metrics collection and exposition.
//!
//! # Metrics
//! - `transfer_outcomes_total` (counter): finished invocations by final state
//! - `transfer_duration_seconds` (histogram): invocation latency by final state
//! - `rpc_requests_total` (counter): node calls by method and result
//! - `signer_requests_total` (counter): signing calls by result
//! - `broadcast_outcomes_total` (counter): submissions by outcome

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

use crate::transfer::PipelineState;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics exporter"),
    }
}

pub fn record_rpc(method: &'static str, result: &'static str) {
    metrics::counter!("rpc_requests_total", "method" => method, "result" => result).increment(1);
}

pub fn record_signer(result: &'static str) {
    metrics::counter!("signer_requests_total", "result" => result).increment(1);
}

pub fn record_broadcast(outcome: &'static str) {
    metrics::counter!("broadcast_outcomes_total", "outcome" => outcome).increment(1);
}

pub fn record_pipeline_finished(state: PipelineState, elapsed: Duration) {
    let state = state_label(state);
    metrics::counter!("transfer_outcomes_total", "state" => state).increment(1);
    metrics::histogram!("transfer_duration_seconds", "state" => state).record(elapsed.as_secs_f64());
}

fn state_label(state: PipelineState) -> &'static str {
    match state {
        PipelineState::Building => "building",
        PipelineState::Built => "built",
        PipelineState::Signing => "signing",
        PipelineState::Signed => "signed",
        PipelineState::Broadcasting => "broadcasting",
        PipelineState::Submitted => "submitted",
        PipelineState::Rejected => "rejected",
        PipelineState::TransientFailure => "transient_failure",
        PipelineState::BuilderFailed => "builder_failed",
        PipelineState::SigningFailed => "signing_failed",
    }
}
