//! Execution-layer request queues carried by Prague payloads.
//!
//! The three queues are validated independently and then combined into a single
//! ordered list: deposits, then withdrawal requests, then consolidations. That
//! order feeds the requests commitment in the header, so it must never change.

use alloy_eips::eip7685::Requests;
use alloy_primitives::{Address, Bytes, FixedBytes, B256};
use serde::{Deserialize, Serialize};

/// EIP-6110 request type byte.
pub const DEPOSIT_REQUEST_TYPE: u8 = 0x00;
/// EIP-7002 request type byte.
pub const WITHDRAWAL_REQUEST_TYPE: u8 = 0x01;
/// EIP-7251 request type byte.
pub const CONSOLIDATION_REQUEST_TYPE: u8 = 0x02;

/// Deposit observed in the deposit contract logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequestParameter {
    pub pubkey: FixedBytes<48>,
    pub withdrawal_credentials: B256,
    #[serde(with = "alloy_serde::quantity")]
    pub amount: u64,
    pub signature: FixedBytes<96>,
    #[serde(with = "alloy_serde::quantity")]
    pub index: u64,
}

impl DepositRequestParameter {
    /// 192-byte request body; amount and index are little-endian as in the deposit log.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(192);
        out.extend_from_slice(self.pubkey.as_slice());
        out.extend_from_slice(self.withdrawal_credentials.as_slice());
        out.extend_from_slice(&self.amount.to_le_bytes());
        out.extend_from_slice(self.signature.as_slice());
        out.extend_from_slice(&self.index.to_le_bytes());
        out
    }
}

/// Withdrawal triggered from the execution layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequestParameter {
    pub source_address: Address,
    pub validator_pubkey: FixedBytes<48>,
    #[serde(with = "alloy_serde::quantity")]
    pub amount: u64,
}

impl WithdrawalRequestParameter {
    /// 76-byte request body with a big-endian amount.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(76);
        out.extend_from_slice(self.source_address.as_slice());
        out.extend_from_slice(self.validator_pubkey.as_slice());
        out.extend_from_slice(&self.amount.to_be_bytes());
        out
    }
}

/// Validator consolidation triggered from the execution layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationRequestParameter {
    pub source_address: Address,
    pub source_pubkey: FixedBytes<48>,
    pub target_pubkey: FixedBytes<48>,
}

impl ConsolidationRequestParameter {
    /// 116-byte request body.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(116);
        out.extend_from_slice(self.source_address.as_slice());
        out.extend_from_slice(self.source_pubkey.as_slice());
        out.extend_from_slice(self.target_pubkey.as_slice());
        out
    }
}

/// One entry of the combined request list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionRequest {
    Deposit(DepositRequestParameter),
    Withdrawal(WithdrawalRequestParameter),
    Consolidation(ConsolidationRequestParameter),
}

impl ExecutionRequest {
    pub const fn request_type(&self) -> u8 {
        match self {
            Self::Deposit(_) => DEPOSIT_REQUEST_TYPE,
            Self::Withdrawal(_) => WITHDRAWAL_REQUEST_TYPE,
            Self::Consolidation(_) => CONSOLIDATION_REQUEST_TYPE,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Deposit(request) => request.encode(),
            Self::Withdrawal(request) => request.encode(),
            Self::Consolidation(request) => request.encode(),
        }
    }
}

/// Concatenates the three queues in protocol order.
///
/// Returns `None` only when none of the queues was supplied.
pub fn combine_requests(
    deposits: Option<Vec<DepositRequestParameter>>,
    withdrawals: Option<Vec<WithdrawalRequestParameter>>,
    consolidations: Option<Vec<ConsolidationRequestParameter>>,
) -> Option<Vec<ExecutionRequest>> {
    if deposits.is_none() && withdrawals.is_none() && consolidations.is_none() {
        return None
    }

    let mut combined = Vec::new();
    combined.extend(deposits.into_iter().flatten().map(ExecutionRequest::Deposit));
    combined.extend(withdrawals.into_iter().flatten().map(ExecutionRequest::Withdrawal));
    combined.extend(consolidations.into_iter().flatten().map(ExecutionRequest::Consolidation));
    Some(combined)
}

/// Groups an ordered request list into EIP-7685 form: one `type || data...` entry per
/// run of the same type, skipping types with no requests.
pub fn to_eip7685(requests: &[ExecutionRequest]) -> Requests {
    let mut grouped: Vec<Bytes> = Vec::new();
    let mut current: Option<(u8, Vec<u8>)> = None;

    for request in requests {
        match current.as_mut() {
            Some((ty, data)) if *ty == request.request_type() => data.extend(request.encode()),
            _ => {
                if let Some((ty, data)) = current.take() {
                    grouped.push(flatten_entry(ty, data));
                }
                current = Some((request.request_type(), request.encode()));
            }
        }
    }
    if let Some((ty, data)) = current {
        grouped.push(flatten_entry(ty, data));
    }

    Requests::new(grouped)
}

fn flatten_entry(ty: u8, data: Vec<u8>) -> Bytes {
    let mut entry = Vec::with_capacity(data.len() + 1);
    entry.push(ty);
    entry.extend(data);
    entry.into()
}

/// Requests commitment stored in the header.
pub fn requests_root(requests: &[ExecutionRequest]) -> B256 {
    to_eip7685(requests).requests_hash()
}
