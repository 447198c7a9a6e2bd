//! Wire-level `newPayload` parameters.
//!
//! Every field the client sends is kept as received: `extraData` stays optional so
//! the pipeline can reject a null value with a status instead of a decode error,
//! and the request lists stay optional so the structural gate can tell an absent
//! list from an empty one.

use alloy_eips::eip4895::Withdrawal;
use alloy_primitives::{Address, Bloom, Bytes, B256, U256};
use alloy_rpc_types_engine::{ExecutionPayloadV1, ExecutionPayloadV2, ExecutionPayloadV3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::requests::{
    ConsolidationRequestParameter, DepositRequestParameter, WithdrawalRequestParameter,
};

/// Execution payload as supplied by the consensus client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadParameter {
    pub parent_hash: B256,
    pub fee_recipient: Address,
    pub state_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub prev_randao: B256,
    #[serde(with = "alloy_serde::quantity")]
    pub block_number: u64,
    #[serde(with = "alloy_serde::quantity")]
    pub gas_limit: u64,
    #[serde(with = "alloy_serde::quantity")]
    pub gas_used: u64,
    #[serde(with = "alloy_serde::quantity")]
    pub timestamp: u64,
    #[serde(default)]
    pub extra_data: Option<Bytes>,
    #[serde(with = "alloy_serde::quantity")]
    pub base_fee_per_gas: u64,
    pub block_hash: B256,
    #[serde(default)]
    pub transactions: Vec<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals: Option<Vec<Withdrawal>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "alloy_serde::quantity::opt")]
    pub blob_gas_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "alloy_serde::quantity::opt")]
    pub excess_blob_gas: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_requests: Option<Vec<DepositRequestParameter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawal_requests: Option<Vec<WithdrawalRequestParameter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consolidation_requests: Option<Vec<ConsolidationRequestParameter>>,
}

/// Errors converting typed alloy payloads into [`PayloadParameter`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadConversionError {
    #[error("base fee per gas {0} does not fit in 64 bits")]
    BaseFeeOverflow(U256),
}

impl TryFrom<ExecutionPayloadV1> for PayloadParameter {
    type Error = PayloadConversionError;

    fn try_from(payload: ExecutionPayloadV1) -> Result<Self, Self::Error> {
        let base_fee_per_gas = u64::try_from(payload.base_fee_per_gas)
            .map_err(|_| PayloadConversionError::BaseFeeOverflow(payload.base_fee_per_gas))?;
        Ok(Self {
            parent_hash: payload.parent_hash,
            fee_recipient: payload.fee_recipient,
            state_root: payload.state_root,
            receipts_root: payload.receipts_root,
            logs_bloom: payload.logs_bloom,
            prev_randao: payload.prev_randao,
            block_number: payload.block_number,
            gas_limit: payload.gas_limit,
            gas_used: payload.gas_used,
            timestamp: payload.timestamp,
            extra_data: Some(payload.extra_data),
            base_fee_per_gas,
            block_hash: payload.block_hash,
            transactions: payload.transactions,
            withdrawals: None,
            blob_gas_used: None,
            excess_blob_gas: None,
            deposit_requests: None,
            withdrawal_requests: None,
            consolidation_requests: None,
        })
    }
}

impl TryFrom<ExecutionPayloadV2> for PayloadParameter {
    type Error = PayloadConversionError;

    fn try_from(payload: ExecutionPayloadV2) -> Result<Self, Self::Error> {
        let mut parameter = Self::try_from(payload.payload_inner)?;
        parameter.withdrawals = Some(payload.withdrawals);
        Ok(parameter)
    }
}

impl TryFrom<ExecutionPayloadV3> for PayloadParameter {
    type Error = PayloadConversionError;

    fn try_from(payload: ExecutionPayloadV3) -> Result<Self, Self::Error> {
        let mut parameter = Self::try_from(payload.payload_inner)?;
        parameter.blob_gas_used = Some(payload.blob_gas_used);
        parameter.excess_blob_gas = Some(payload.excess_blob_gas);
        Ok(parameter)
    }
}

/// Everything a single `newPayload` call carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayloadRequest {
    pub payload: PayloadParameter,
    /// Blob versioned hashes the consensus layer expects, in transaction order.
    pub versioned_hashes: Option<Vec<B256>>,
    pub parent_beacon_block_root: Option<B256>,
}

impl NewPayloadRequest {
    /// Request shape used by V1 and V2 calls.
    pub const fn v1(payload: PayloadParameter) -> Self {
        Self { payload, versioned_hashes: None, parent_beacon_block_root: None }
    }

    /// Request shape used by V3 and V4 calls.
    pub const fn v3(
        payload: PayloadParameter,
        versioned_hashes: Vec<B256>,
        parent_beacon_block_root: B256,
    ) -> Self {
        Self {
            payload,
            versioned_hashes: Some(versioned_hashes),
            parent_beacon_block_root: Some(parent_beacon_block_root),
        }
    }

    pub fn into_parts(self) -> (PayloadParameter, Option<Vec<B256>>, Option<B256>) {
        (self.payload, self.versioned_hashes, self.parent_beacon_block_root)
    }

    pub const fn timestamp(&self) -> u64 {
        self.payload.timestamp
    }
}
