//! Header reconstruction and block hash integrity.
//!
//! The consensus client claims a block hash; we rebuild the full header from the
//! payload fields and compare. Post-merge constants fill the fields the payload
//! does not carry.

use alloy_consensus::{
    constants::EMPTY_OMMER_ROOT_HASH,
    proofs::{calculate_transaction_root, calculate_withdrawals_root},
    Header,
};
use alloy_eips::eip4895::Withdrawal;
use alloy_primitives::{Bytes, B256, B64, U256};
use reth_primitives_traits::SealedHeader;
use thiserror::Error;

use crate::{
    engine::{
        payload::{NewPayloadRequest, PayloadParameter},
        requests::{combine_requests, requests_root, ExecutionRequest},
    },
    primitives::SealedPayloadHeader,
    transaction::{decode_transactions, SignedTransaction, TransactionDecodeError},
};

/// Decoded body parts that feed header commitments.
#[derive(Debug, Clone, Copy)]
pub struct PayloadBodyRefs<'a> {
    pub transactions: &'a [SignedTransaction],
    pub withdrawals: Option<&'a [Withdrawal]>,
    pub requests: Option<&'a [ExecutionRequest]>,
}

/// Builds and seals the header a payload describes.
pub fn reconstruct_header(
    payload: &PayloadParameter,
    extra_data: Bytes,
    body: PayloadBodyRefs<'_>,
    parent_beacon_block_root: Option<B256>,
) -> SealedPayloadHeader {
    let header = Header {
        parent_hash: payload.parent_hash,
        ommers_hash: EMPTY_OMMER_ROOT_HASH,
        beneficiary: payload.fee_recipient,
        state_root: payload.state_root,
        transactions_root: calculate_transaction_root(body.transactions),
        receipts_root: payload.receipts_root,
        logs_bloom: payload.logs_bloom,
        difficulty: U256::ZERO,
        number: payload.block_number,
        gas_limit: payload.gas_limit,
        gas_used: payload.gas_used,
        timestamp: payload.timestamp,
        extra_data,
        mix_hash: payload.prev_randao,
        nonce: B64::ZERO,
        base_fee_per_gas: Some(payload.base_fee_per_gas),
        withdrawals_root: body.withdrawals.map(calculate_withdrawals_root),
        blob_gas_used: payload.blob_gas_used,
        excess_blob_gas: payload.excess_blob_gas,
        parent_beacon_block_root,
        requests_hash: body.requests.map(requests_root),
    };
    SealedHeader::seal_slow(header)
}

/// Computed hash disagrees with the hash the caller claimed.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("Computed block hash {computed} does not match block hash parameter {claimed}")]
pub struct BlockHashMismatch {
    pub computed: B256,
    pub claimed: B256,
}

pub fn verify_block_hash(
    header: &SealedPayloadHeader,
    claimed: B256,
) -> Result<(), BlockHashMismatch> {
    let computed = header.hash();
    if computed != claimed {
        return Err(BlockHashMismatch { computed, claimed })
    }
    Ok(())
}

/// Why a standalone header computation failed.
#[derive(Debug, Error)]
pub enum HeaderComputationError {
    #[error("Field extraData must not be null")]
    MissingExtraData,
    #[error(transparent)]
    Transactions(#[from] TransactionDecodeError),
}

/// Reconstructs the header of a request without running any gate.
///
/// Used to compute the hash a well-formed payload should claim.
pub fn compute_payload_header(
    request: &NewPayloadRequest,
) -> Result<SealedPayloadHeader, HeaderComputationError> {
    let payload = &request.payload;
    let extra_data =
        payload.extra_data.clone().ok_or(HeaderComputationError::MissingExtraData)?;
    let transactions = decode_transactions(&payload.transactions)?;
    let requests = combine_requests(
        payload.deposit_requests.clone(),
        payload.withdrawal_requests.clone(),
        payload.consolidation_requests.clone(),
    );

    let body = PayloadBodyRefs {
        transactions: &transactions,
        withdrawals: payload.withdrawals.as_deref(),
        requests: requests.as_deref(),
    };
    Ok(reconstruct_header(payload, extra_data, body, request.parent_beacon_block_root))
}
