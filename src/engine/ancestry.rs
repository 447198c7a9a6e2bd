//! Ancestry resolution against local chain state.
//!
//! Two questions are asked at different points of admission: whether the
//! submitted hash is already known (stored or condemned), and, once the block is
//! fully validated, whether its parent and a valid ancestor are available.

use alloy_primitives::B256;

use crate::{
    primitives::{PayloadHeader, SealedPayloadHeader},
    provider::ChainView,
};

/// What the chain already knows about a submitted block hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    /// Not seen before.
    Fresh,
    /// Already stored; it is not executed again.
    Duplicate,
    /// Rejected before. Carries the recorded latest valid hash, zero when none was recorded.
    Condemned { latest_valid_hash: B256 },
}

/// Where a validated block stands relative to the local chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AncestryState {
    /// Parent is not stored locally; the block goes to sync.
    Unknown,
    /// Parent stored and the latest valid ancestor is known.
    KnownWithAncestor(B256),
    /// Parent stored but an ancestor is still pending validation.
    KnownNoValidAncestor,
}

pub fn check_submission<C>(chain: &C, block_hash: B256) -> SubmissionState
where
    C: ChainView + ?Sized,
{
    if chain.contains_block(block_hash) {
        return SubmissionState::Duplicate
    }
    if chain.is_bad_block(block_hash) {
        let latest_valid_hash =
            chain.latest_valid_hash_of_bad_block(block_hash).unwrap_or(B256::ZERO);
        return SubmissionState::Condemned { latest_valid_hash }
    }
    SubmissionState::Fresh
}

pub fn resolve_ancestry<C>(
    chain: &C,
    parent: Option<&PayloadHeader>,
    header: &SealedPayloadHeader,
) -> AncestryState
where
    C: ChainView + ?Sized,
{
    if parent.is_none() {
        return AncestryState::Unknown
    }
    match chain.latest_valid_ancestor_of(header) {
        Some(ancestor) => AncestryState::KnownWithAncestor(ancestor),
        None => AncestryState::KnownNoValidAncestor,
    }
}
