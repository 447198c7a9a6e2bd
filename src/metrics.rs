//! Prometheus metrics for payload admission.

use std::time::Duration;

use reth_metrics::metrics::{self, Counter, Histogram};

use crate::engine::{error::EngineApiError, status::PayloadStatusKind};

/// `newPayload` latency plus outcome counters.
#[derive(Debug, Clone)]
pub struct AdmissionMetrics {
    new_payload_latency: Histogram,
    valid: Counter,
    invalid: Counter,
    invalid_block_hash: Counter,
    syncing: Counter,
    accepted: Counter,
    protocol_errors: Counter,
    internal_errors: Counter,
}

impl AdmissionMetrics {
    pub fn new() -> Self {
        Self {
            new_payload_latency: metrics::histogram!(
                "newpayload_gate_new_payload_duration_seconds",
                "stage" => "newPayload"
            ),
            valid: metrics::counter!("newpayload_gate_payloads_total", "status" => "VALID"),
            invalid: metrics::counter!("newpayload_gate_payloads_total", "status" => "INVALID"),
            invalid_block_hash: metrics::counter!(
                "newpayload_gate_payloads_total",
                "status" => "INVALID_BLOCK_HASH"
            ),
            syncing: metrics::counter!("newpayload_gate_payloads_total", "status" => "SYNCING"),
            accepted: metrics::counter!("newpayload_gate_payloads_total", "status" => "ACCEPTED"),
            protocol_errors: metrics::counter!("newpayload_gate_protocol_errors_total"),
            internal_errors: metrics::counter!("newpayload_gate_internal_errors_total"),
        }
    }

    pub fn record_new_payload(&self, duration: Duration) {
        self.new_payload_latency.record(duration.as_secs_f64());
    }

    pub fn record_status(&self, status: PayloadStatusKind) {
        let counter = match status {
            PayloadStatusKind::Valid => &self.valid,
            PayloadStatusKind::Invalid => &self.invalid,
            PayloadStatusKind::InvalidBlockHash => &self.invalid_block_hash,
            PayloadStatusKind::Syncing => &self.syncing,
            PayloadStatusKind::Accepted => &self.accepted,
        };
        counter.increment(1);
    }

    pub fn record_error(&self, error: &EngineApiError) {
        match error {
            EngineApiError::Internal(_) => self.internal_errors.increment(1),
            _ => self.protocol_errors.increment(1),
        }
    }
}

impl Default for AdmissionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Background sender recovery outcomes.
#[derive(Debug, Clone)]
pub struct SenderRecoveryMetrics {
    recovered: Counter,
    failures: Counter,
}

impl SenderRecoveryMetrics {
    pub fn new() -> Self {
        Self {
            recovered: metrics::counter!("newpayload_gate_sender_recovery_total"),
            failures: metrics::counter!("newpayload_gate_sender_recovery_failures_total"),
        }
    }

    pub fn record_recovered(&self) {
        self.recovered.increment(1);
    }

    pub fn record_failure(&self) {
        self.failures.increment(1);
    }
}

impl Default for SenderRecoveryMetrics {
    fn default() -> Self {
        Self::new()
    }
}
