//! `engine_newPayloadV1..V4` variants.
//!
//! The variants share one pipeline and differ only in which forks they serve,
//! which call parameters they require, and how a block hash mismatch is
//! reported. The RPC router picks the variant; the pipeline never inspects
//! method names.

use std::fmt;

use reth_chainspec::{EthereumHardfork, EthereumHardforks};

use crate::{
    chainspec::AdmissionChainSpec,
    engine::{
        error::EngineApiError,
        payload::NewPayloadRequest,
        status::{PayloadStatus, PayloadStatusKind},
    },
};

/// Capabilities that vary between `newPayload` method versions.
pub trait NewPayloadVersion: fmt::Debug + Send + Sync {
    /// Method name, for logs and error messages.
    fn method(&self) -> &'static str;

    /// Rejects timestamps this method version does not serve.
    fn validate_fork_supported(
        &self,
        chain_spec: &AdmissionChainSpec,
        timestamp: u64,
    ) -> Result<(), EngineApiError>;

    /// Checks which optional call parameters must be present.
    fn validate_parameters(&self, request: &NewPayloadRequest) -> Result<(), EngineApiError>;

    /// Status reported when the computed block hash differs from the claimed one.
    fn invalid_block_hash_status(&self) -> PayloadStatusKind {
        PayloadStatusKind::Invalid
    }

    /// Status reported when the blob rules reject a payload.
    ///
    /// Follows the hash mismatch status even though the block hash has already
    /// been confirmed by then.
    fn blob_failure_status(&self) -> PayloadStatusKind {
        self.invalid_block_hash_status()
    }

    /// Final shaping of a status before it leaves the pipeline.
    fn build_response(&self, status: PayloadStatus) -> PayloadStatus {
        status
    }
}

/// `engine_newPayloadV1`: Paris payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NewPayloadV1;

/// `engine_newPayloadV2`: Paris and Shanghai payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NewPayloadV2;

/// `engine_newPayloadV3`: Cancun payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NewPayloadV3;

/// `engine_newPayloadV4`: Prague payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NewPayloadV4;

impl NewPayloadVersion for NewPayloadV1 {
    fn method(&self) -> &'static str {
        "engine_newPayloadV1"
    }

    fn validate_fork_supported(
        &self,
        chain_spec: &AdmissionChainSpec,
        timestamp: u64,
    ) -> Result<(), EngineApiError> {
        reject_if_active(self, chain_spec, EthereumHardfork::Shanghai, timestamp)
    }

    fn validate_parameters(&self, request: &NewPayloadRequest) -> Result<(), EngineApiError> {
        ensure_pre_cancun_parameters(request)
    }

    fn invalid_block_hash_status(&self) -> PayloadStatusKind {
        PayloadStatusKind::InvalidBlockHash
    }
}

impl NewPayloadVersion for NewPayloadV2 {
    fn method(&self) -> &'static str {
        "engine_newPayloadV2"
    }

    fn validate_fork_supported(
        &self,
        chain_spec: &AdmissionChainSpec,
        timestamp: u64,
    ) -> Result<(), EngineApiError> {
        reject_if_active(self, chain_spec, EthereumHardfork::Cancun, timestamp)
    }

    fn validate_parameters(&self, request: &NewPayloadRequest) -> Result<(), EngineApiError> {
        ensure_pre_cancun_parameters(request)
    }
}

impl NewPayloadVersion for NewPayloadV3 {
    fn method(&self) -> &'static str {
        "engine_newPayloadV3"
    }

    fn validate_fork_supported(
        &self,
        chain_spec: &AdmissionChainSpec,
        timestamp: u64,
    ) -> Result<(), EngineApiError> {
        require_active(self, chain_spec, EthereumHardfork::Cancun, timestamp)?;
        reject_if_active(self, chain_spec, EthereumHardfork::Prague, timestamp)
    }

    fn validate_parameters(&self, request: &NewPayloadRequest) -> Result<(), EngineApiError> {
        ensure_cancun_parameters(request)
    }
}

impl NewPayloadVersion for NewPayloadV4 {
    fn method(&self) -> &'static str {
        "engine_newPayloadV4"
    }

    fn validate_fork_supported(
        &self,
        chain_spec: &AdmissionChainSpec,
        timestamp: u64,
    ) -> Result<(), EngineApiError> {
        require_active(self, chain_spec, EthereumHardfork::Prague, timestamp)?;
        reject_if_active(self, chain_spec, EthereumHardfork::Osaka, timestamp)
    }

    fn validate_parameters(&self, request: &NewPayloadRequest) -> Result<(), EngineApiError> {
        ensure_cancun_parameters(request)
    }
}

/// Looks up a variant by its version number.
pub fn by_number(version: u8) -> Option<&'static dyn NewPayloadVersion> {
    match version {
        1 => Some(&NewPayloadV1),
        2 => Some(&NewPayloadV2),
        3 => Some(&NewPayloadV3),
        4 => Some(&NewPayloadV4),
        _ => None,
    }
}

fn reject_if_active(
    version: &dyn NewPayloadVersion,
    chain_spec: &AdmissionChainSpec,
    fork: EthereumHardfork,
    timestamp: u64,
) -> Result<(), EngineApiError> {
    if chain_spec.ethereum_fork_activation(fork).active_at_timestamp(timestamp) {
        return Err(EngineApiError::unsupported_fork(format!(
            "{} does not serve {fork} payloads (timestamp {timestamp})",
            version.method()
        )))
    }
    Ok(())
}

fn require_active(
    version: &dyn NewPayloadVersion,
    chain_spec: &AdmissionChainSpec,
    fork: EthereumHardfork,
    timestamp: u64,
) -> Result<(), EngineApiError> {
    match chain_spec.fork_timestamp(fork) {
        None => Err(EngineApiError::unsupported_fork(format!(
            "{} requires {fork}, which is not scheduled",
            version.method()
        ))),
        Some(activation) if timestamp < activation => {
            Err(EngineApiError::unsupported_fork(format!(
                "{} requires {fork}, active from {activation} (timestamp {timestamp})",
                version.method()
            )))
        }
        Some(_) => Ok(()),
    }
}

fn ensure_pre_cancun_parameters(request: &NewPayloadRequest) -> Result<(), EngineApiError> {
    let payload = &request.payload;
    if payload.blob_gas_used.is_some() {
        return Err(EngineApiError::invalid_params("non-null BlobGasUsed pre-cancun"))
    }
    if payload.excess_blob_gas.is_some() {
        return Err(EngineApiError::invalid_params("non-null ExcessBlobGas pre-cancun"))
    }
    if request.versioned_hashes.is_some() {
        return Err(EngineApiError::invalid_params("non-null versioned hashes pre-cancun"))
    }
    if request.parent_beacon_block_root.is_some() {
        return Err(EngineApiError::invalid_params("non-null parent beacon block root pre-cancun"))
    }
    Ok(())
}

fn ensure_cancun_parameters(request: &NewPayloadRequest) -> Result<(), EngineApiError> {
    let payload = &request.payload;
    if payload.blob_gas_used.is_none() {
        return Err(EngineApiError::invalid_params("Missing blob gas used field"))
    }
    if payload.excess_blob_gas.is_none() {
        return Err(EngineApiError::invalid_params("Missing excess blob gas field"))
    }
    if request.versioned_hashes.is_none() {
        return Err(EngineApiError::invalid_params("Missing versioned hashes field"))
    }
    if request.parent_beacon_block_root.is_none() {
        return Err(EngineApiError::invalid_params("Missing parent beacon block root field"))
    }
    Ok(())
}
