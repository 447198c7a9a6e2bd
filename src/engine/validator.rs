//! Structural gate: optional payload collections versus the active fork.
//!
//! Withdrawals exist from Shanghai on and the three request queues from Prague
//! on. Each collection must be present exactly when the fork at the payload
//! timestamp mandates it.

use alloy_eips::eip4895::Withdrawal;

use crate::{
    chainspec::AdmissionChainSpec,
    engine::{
        error::EngineApiError,
        payload::PayloadParameter,
        requests::{combine_requests, ExecutionRequest},
    },
};

/// Optional collections that passed the structural gate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadCollections {
    pub withdrawals: Option<Vec<Withdrawal>>,
    /// Deposits, withdrawal requests and consolidations, in that order.
    pub requests: Option<Vec<ExecutionRequest>>,
}

/// Validates presence of every optional collection and combines the request queues.
pub fn validate_structure(
    chain_spec: &AdmissionChainSpec,
    payload: &PayloadParameter,
) -> Result<PayloadCollections, EngineApiError> {
    let version = chain_spec.protocol_version_at(payload.timestamp);

    ensure_presence(
        payload.withdrawals.is_some(),
        version.requires_withdrawals(),
        "Invalid withdrawals",
    )?;

    let requests_required = version.requires_requests();
    ensure_presence(
        payload.deposit_requests.is_some(),
        requests_required,
        "Invalid deposit request",
    )?;
    ensure_presence(
        payload.withdrawal_requests.is_some(),
        requests_required,
        "Invalid withdrawal request",
    )?;
    ensure_presence(
        payload.consolidation_requests.is_some(),
        requests_required,
        "Invalid consolidation request",
    )?;

    Ok(PayloadCollections {
        withdrawals: payload.withdrawals.clone(),
        requests: combine_requests(
            payload.deposit_requests.clone(),
            payload.withdrawal_requests.clone(),
            payload.consolidation_requests.clone(),
        ),
    })
}

fn ensure_presence(present: bool, required: bool, message: &str) -> Result<(), EngineApiError> {
    if present != required {
        return Err(EngineApiError::invalid_params(message))
    }
    Ok(())
}
