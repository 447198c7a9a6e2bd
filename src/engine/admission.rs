//! The `newPayload` admission pipeline.
//!
//! Gates run in a fixed order and the first one that reaches a verdict ends the
//! call:
//!
//! 1. fork gate and parameter checks of the method version
//! 2. structural gate (withdrawals and request queues)
//! 3. node syncing
//! 4. expected versioned hashes
//! 5. transaction decoding, then background sender recovery
//! 6. header reconstruction and block hash integrity
//! 7. blob rules
//! 8. duplicate and condemned block hashes
//! 9. timestamp monotonicity against a known parent
//! 10. ancestry (sync enqueue or pending ancestor)
//! 11. execution
//!
//! Engine API calls are serialized by the consensus client, so the pipeline takes
//! `&mut self` and keeps its log throttle without synchronization. A concurrent
//! caller must wrap it in a lock.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use alloy_primitives::B256;
use tracing::{debug, info, warn};

use crate::{
    chainspec::AdmissionChainSpec,
    config::AdmissionConfig,
    engine::{
        ancestry::{check_submission, resolve_ancestry, AncestryState, SubmissionState},
        blobs::{extract_versioned_hashes, validate_blobs},
        block::CandidateBlock,
        error::EngineApiError,
        header::{reconstruct_header, verify_block_hash, PayloadBodyRefs},
        payload::{NewPayloadRequest, PayloadParameter},
        senders::SenderRecovery,
        status::{PayloadStatus, PayloadStatusKind},
        validator::validate_structure,
        version::{NewPayloadV1, NewPayloadV2, NewPayloadV3, NewPayloadV4, NewPayloadVersion},
    },
    metrics::AdmissionMetrics,
    provider::{no_peers, BlockExecutor, ChainView, PayloadSync, PeerCountProbe},
    transaction::decode_transactions,
};

/// Rate limit for WARN logs of rejected payloads.
///
/// Not synchronized: the owner must be driven by one caller at a time.
#[derive(Debug, Clone)]
pub struct InvalidPayloadLogThrottle {
    interval: Duration,
    last_warn: Option<Instant>,
}

impl InvalidPayloadLogThrottle {
    pub const fn new(interval: Duration) -> Self {
        Self { interval, last_warn: None }
    }

    /// Returns true, and restarts the interval, when a WARN may be emitted at `now`.
    pub fn should_warn(&mut self, now: Instant) -> bool {
        match self.last_warn {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_warn = Some(now);
                true
            }
        }
    }
}

/// Admits execution payloads proposed by the consensus client.
pub struct PayloadAdmission<C, S, E> {
    chain_spec: Arc<AdmissionChainSpec>,
    chain: C,
    sync: S,
    executor: E,
    senders: SenderRecovery,
    peer_count: PeerCountProbe,
    throttle: InvalidPayloadLogThrottle,
    metrics: AdmissionMetrics,
}

impl<C, S, E> PayloadAdmission<C, S, E>
where
    C: ChainView,
    S: PayloadSync,
    E: BlockExecutor,
{
    pub fn new(
        chain_spec: Arc<AdmissionChainSpec>,
        chain: C,
        sync: S,
        executor: E,
        senders: SenderRecovery,
        config: &AdmissionConfig,
    ) -> Self {
        Self {
            chain_spec,
            chain,
            sync,
            executor,
            senders,
            peer_count: no_peers(),
            throttle: InvalidPayloadLogThrottle::new(config.invalid_warn_interval),
            metrics: AdmissionMetrics::default(),
        }
    }

    /// Sets the probe reported as `peers` in import summaries.
    pub fn with_peer_count(mut self, probe: PeerCountProbe) -> Self {
        self.peer_count = probe;
        self
    }

    pub const fn chain_spec(&self) -> &Arc<AdmissionChainSpec> {
        &self.chain_spec
    }

    pub const fn chain(&self) -> &C {
        &self.chain
    }

    pub const fn sync(&self) -> &S {
        &self.sync
    }

    pub const fn executor(&self) -> &E {
        &self.executor
    }

    pub const fn senders(&self) -> &SenderRecovery {
        &self.senders
    }

    pub fn new_payload_v1(
        &mut self,
        payload: PayloadParameter,
    ) -> Result<PayloadStatus, EngineApiError> {
        self.new_payload(&NewPayloadV1, NewPayloadRequest::v1(payload))
    }

    pub fn new_payload_v2(
        &mut self,
        payload: PayloadParameter,
    ) -> Result<PayloadStatus, EngineApiError> {
        self.new_payload(&NewPayloadV2, NewPayloadRequest::v1(payload))
    }

    pub fn new_payload_v3(
        &mut self,
        payload: PayloadParameter,
        versioned_hashes: Vec<B256>,
        parent_beacon_block_root: B256,
    ) -> Result<PayloadStatus, EngineApiError> {
        let request = NewPayloadRequest::v3(payload, versioned_hashes, parent_beacon_block_root);
        self.new_payload(&NewPayloadV3, request)
    }

    pub fn new_payload_v4(
        &mut self,
        payload: PayloadParameter,
        versioned_hashes: Vec<B256>,
        parent_beacon_block_root: B256,
    ) -> Result<PayloadStatus, EngineApiError> {
        let request = NewPayloadRequest::v3(payload, versioned_hashes, parent_beacon_block_root);
        self.new_payload(&NewPayloadV4, request)
    }

    /// Runs the full pipeline for one call of the given method version.
    pub fn new_payload(
        &mut self,
        version: &dyn NewPayloadVersion,
        request: NewPayloadRequest,
    ) -> Result<PayloadStatus, EngineApiError> {
        let started = Instant::now();
        let result = self.admit(version, request).map(|status| version.build_response(status));
        self.metrics.record_new_payload(started.elapsed());
        match &result {
            Ok(status) => self.metrics.record_status(status.status()),
            Err(err) => {
                self.metrics.record_error(err);
                debug!(
                    target: "newpayload_gate::engine",
                    method = version.method(),
                    code = err.code(),
                    %err,
                    "newPayload rejected with protocol error"
                );
            }
        }
        result
    }

    fn admit(
        &mut self,
        version: &dyn NewPayloadVersion,
        request: NewPayloadRequest,
    ) -> Result<PayloadStatus, EngineApiError> {
        version.validate_fork_supported(&self.chain_spec, request.timestamp())?;
        version.validate_parameters(&request)?;

        let (payload, versioned_hashes, parent_beacon_block_root) = request.into_parts();
        let collections = validate_structure(&self.chain_spec, &payload)?;

        if self.chain.is_syncing() {
            debug!(target: "newpayload_gate::engine", "We are syncing");
            return Ok(self.respond(&payload, PayloadStatus::syncing()))
        }

        let expected_hashes = match extract_versioned_hashes(versioned_hashes.as_deref()) {
            Ok(hashes) => hashes,
            Err(err) => {
                debug!(target: "newpayload_gate::engine", %err, "Rejecting versioned hash");
                let ancestor = self.chain.latest_valid_ancestor(payload.parent_hash);
                return Ok(self.respond_invalid(
                    &payload,
                    PayloadStatusKind::Invalid,
                    ancestor,
                    "Invalid versionedHash",
                ))
            }
        };

        let parent = self.chain.header_by_hash(payload.parent_hash);

        let transactions = match decode_transactions(&payload.transactions) {
            Ok(transactions) => transactions,
            Err(err) => {
                debug!(
                    target: "newpayload_gate::engine",
                    %err,
                    "Failed to decode payload transaction"
                );
                let ancestor = self.chain.latest_valid_ancestor(payload.parent_hash);
                return Ok(self.respond_invalid(
                    &payload,
                    PayloadStatusKind::Invalid,
                    ancestor,
                    "Failed to decode transactions from block parameter",
                ))
            }
        };
        self.senders.schedule(&transactions);

        let Some(extra_data) = payload.extra_data.clone() else {
            let ancestor = self.chain.latest_valid_ancestor(payload.parent_hash);
            return Ok(self.respond_invalid(
                &payload,
                PayloadStatusKind::Invalid,
                ancestor,
                "Field extraData must not be null",
            ))
        };

        let body = PayloadBodyRefs {
            transactions: &transactions,
            withdrawals: collections.withdrawals.as_deref(),
            requests: collections.requests.as_deref(),
        };
        let header = reconstruct_header(&payload, extra_data, body, parent_beacon_block_root);

        if let Err(mismatch) = verify_block_hash(&header, payload.block_hash) {
            return Ok(self.respond_invalid(
                &payload,
                version.invalid_block_hash_status(),
                None,
                mismatch.to_string(),
            ))
        }

        let schedule = self.chain_spec.blob_schedule_at(payload.timestamp);
        let blob_count = match validate_blobs(
            &transactions,
            header.header(),
            parent.as_ref(),
            expected_hashes.as_deref(),
            &schedule,
        ) {
            Ok(count) => count,
            Err(err) => {
                let ancestor = self.chain.latest_valid_ancestor(payload.parent_hash);
                return Ok(self.respond_invalid(
                    &payload,
                    version.blob_failure_status(),
                    ancestor,
                    err.to_string(),
                ))
            }
        };

        match check_submission(&self.chain, header.hash()) {
            SubmissionState::Fresh => {}
            SubmissionState::Duplicate => {
                debug!(
                    target: "newpayload_gate::engine",
                    hash = %header.hash(),
                    "Block already present"
                );
                return Ok(self.respond(&payload, PayloadStatus::valid(header.hash())))
            }
            SubmissionState::Condemned { latest_valid_hash } => {
                return Ok(self.respond_invalid(
                    &payload,
                    PayloadStatusKind::Invalid,
                    Some(latest_valid_hash),
                    "Block already present in bad block manager.",
                ))
            }
        }

        if let Some(parent) = &parent {
            if parent.timestamp >= payload.timestamp {
                let ancestor = self.chain.latest_valid_ancestor(payload.parent_hash);
                return Ok(self.respond_invalid(
                    &payload,
                    PayloadStatusKind::Invalid,
                    ancestor,
                    "block timestamp not greater than parent",
                ))
            }
        }

        let block = CandidateBlock::new(
            header,
            transactions,
            collections.withdrawals,
            collections.requests,
        );

        let ancestry = resolve_ancestry(&self.chain, parent.as_ref(), block.header());
        let latest_valid_ancestor = match ancestry {
            AncestryState::Unknown => {
                debug!(
                    target: "newpayload_gate::engine",
                    %block,
                    parent_hash = %block.parent_hash(),
                    "Parent of block is not present, append it to backward sync"
                );
                self.sync.enqueue(block);
                return Ok(self.respond(&payload, PayloadStatus::syncing()))
            }
            AncestryState::KnownNoValidAncestor => {
                return Ok(self.respond(&payload, PayloadStatus::accepted()))
            }
            AncestryState::KnownWithAncestor(ancestor) => ancestor,
        };

        let started = Instant::now();
        match self.executor.execute(&block, self.senders.cache()) {
            Ok(()) => {
                self.log_imported_block(&block, blob_count, started.elapsed());
                Ok(self.respond(&payload, PayloadStatus::valid(block.hash())))
            }
            Err(failure) if failure.is_internal() => {
                warn!(
                    target: "newpayload_gate::engine",
                    %block,
                    cause = ?failure.cause,
                    %failure,
                    "Internal failure while executing payload"
                );
                Err(EngineApiError::internal(failure))
            }
            Err(failure) => {
                debug!(target: "newpayload_gate::engine", %failure, "New payload is invalid");
                Ok(self.respond_invalid(
                    &payload,
                    PayloadStatusKind::Invalid,
                    Some(latest_valid_ancestor),
                    failure.message,
                ))
            }
        }
    }

    fn respond(&self, payload: &PayloadParameter, status: PayloadStatus) -> PayloadStatus {
        debug!(
            target: "newpayload_gate::engine",
            number = payload.block_number,
            hash = %payload.block_hash,
            parent_hash = %payload.parent_hash,
            latest_valid_hash = ?status.latest_valid_hash(),
            status = %status.status(),
            "New payload"
        );
        status
    }

    fn respond_invalid(
        &mut self,
        payload: &PayloadParameter,
        kind: PayloadStatusKind,
        latest_valid_hash: Option<B256>,
        validation_error: impl Into<String>,
    ) -> PayloadStatus {
        let status = PayloadStatus::invalid(kind, latest_valid_hash, validation_error);
        let validation_error = status.validation_error().unwrap_or_default();

        debug!(
            target: "newpayload_gate::engine",
            number = payload.block_number,
            hash = %payload.block_hash,
            parent_hash = %payload.parent_hash,
            latest_valid_hash = ?latest_valid_hash,
            status = %kind,
            validation_error,
            "Invalid new payload"
        );
        if self.throttle.should_warn(Instant::now()) {
            warn!(
                target: "newpayload_gate::engine",
                number = payload.block_number,
                hash = %payload.block_hash,
                parent_hash = %payload.parent_hash,
                latest_valid_hash = ?latest_valid_hash,
                status = %kind,
                validation_error,
                "Invalid new payload"
            );
        }
        status
    }

    fn log_imported_block(&self, block: &CandidateBlock, blob_count: usize, elapsed: Duration) {
        let header = block.header();
        let gas_utilization = if header.gas_limit == 0 {
            0.0
        } else {
            header.gas_used as f64 * 100.0 / header.gas_limit as f64
        };
        info!(
            target: "newpayload_gate::engine",
            number = header.number,
            txs = block.transactions().len(),
            withdrawals = ?block.withdrawals().map(<[_]>::len),
            requests = ?block.requests().map(<[_]>::len),
            blobs = blob_count,
            base_fee = ?header.base_fee_per_gas,
            gas_used = header.gas_used,
            gas_utilization = %format!("{gas_utilization:.1}%"),
            hash = %block.hash(),
            elapsed = %format!("{:.3}s", elapsed.as_secs_f64()),
            peers = (self.peer_count)(),
            "Imported block"
        );
    }
}

impl<C, S, E> std::fmt::Debug for PayloadAdmission<C, S, E>
where
    C: std::fmt::Debug,
    S: std::fmt::Debug,
    E: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadAdmission")
            .field("chain", &self.chain)
            .field("sync", &self.sync)
            .field("executor", &self.executor)
            .field("senders", &self.senders)
            .field("throttle", &self.throttle)
            .finish_non_exhaustive()
    }
}
