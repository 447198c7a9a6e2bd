//! Collaborators the admission pipeline consults.
//!
//! Chain storage, the backward sync pipeline and block execution live outside
//! this crate. The pipeline only sees them through these traits.

use std::sync::Arc;

use alloy_primitives::B256;
use thiserror::Error;
use tracing::debug;

use crate::{
    engine::{block::CandidateBlock, senders::SenderCache},
    primitives::{PayloadHeader, SealedPayloadHeader},
};

/// Read access to local chain state.
pub trait ChainView: Send + Sync {
    /// Whether the node is still catching up with the network.
    fn is_syncing(&self) -> bool;

    fn header_by_hash(&self, hash: B256) -> Option<PayloadHeader>;

    /// Whether a full block with this hash is stored.
    fn contains_block(&self, hash: B256) -> bool;

    /// Whether this hash was rejected before.
    fn is_bad_block(&self, hash: B256) -> bool;

    /// Latest valid hash recorded when the bad block was rejected.
    fn latest_valid_hash_of_bad_block(&self, hash: B256) -> Option<B256>;

    /// Latest valid block on the chain ending at `parent_hash`.
    fn latest_valid_ancestor(&self, parent_hash: B256) -> Option<B256>;

    /// Latest valid ancestor of a header whose parent is stored, or `None` while an
    /// ancestor is still pending validation.
    fn latest_valid_ancestor_of(&self, header: &SealedPayloadHeader) -> Option<B256>;
}

/// Backward sync entry point for blocks whose parent is missing.
pub trait PayloadSync: Send + Sync {
    /// Takes ownership of the block; the caller does not wait for the outcome.
    fn enqueue(&self, block: CandidateBlock);
}

/// Root cause attached to an execution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// The node's own database failed.
    Storage,
    /// State trie inconsistency.
    MerkleTrie,
    Other,
}

/// A block execution that did not succeed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct BlockExecutionFailure {
    pub message: String,
    pub cause: Option<FailureCause>,
}

impl BlockExecutionFailure {
    /// The payload itself is at fault.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self { message: message.into(), cause: None }
    }

    pub fn with_cause(message: impl Into<String>, cause: FailureCause) -> Self {
        Self { message: message.into(), cause: Some(cause) }
    }

    /// Whether the failure points at local state instead of the payload.
    pub const fn is_internal(&self) -> bool {
        matches!(self.cause, Some(FailureCause::Storage | FailureCause::MerkleTrie))
    }
}

/// Executes candidate blocks and persists the ones that pass.
pub trait BlockExecutor: Send + Sync {
    /// `senders` holds the senders recovered in the background so far; see
    /// [`CandidateBlock::try_into_recovered`].
    fn execute(
        &self,
        block: &CandidateBlock,
        senders: &SenderCache,
    ) -> Result<(), BlockExecutionFailure>;
}

/// Connected peer count, reported in import summaries.
pub type PeerCountProbe = Arc<dyn Fn() -> usize + Send + Sync>;

/// A probe that always reports zero peers.
pub fn no_peers() -> PeerCountProbe {
    Arc::new(|| 0)
}

/// A chain with nothing stored. Every payload ends up waiting for sync.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyChain;

impl ChainView for EmptyChain {
    fn is_syncing(&self) -> bool {
        false
    }

    fn header_by_hash(&self, _hash: B256) -> Option<PayloadHeader> {
        None
    }

    fn contains_block(&self, _hash: B256) -> bool {
        false
    }

    fn is_bad_block(&self, _hash: B256) -> bool {
        false
    }

    fn latest_valid_hash_of_bad_block(&self, _hash: B256) -> Option<B256> {
        None
    }

    fn latest_valid_ancestor(&self, _parent_hash: B256) -> Option<B256> {
        None
    }

    fn latest_valid_ancestor_of(&self, _header: &SealedPayloadHeader) -> Option<B256> {
        None
    }
}

/// Drops every enqueued block.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSync;

impl PayloadSync for DiscardSync {
    fn enqueue(&self, block: CandidateBlock) {
        debug!(target: "newpayload_gate::engine", %block, "Discarding block queued for sync");
    }
}

/// Refuses to execute anything.
#[derive(Debug, Clone, Default)]
pub struct RejectingExecutor {
    reason: Option<String>,
}

impl RejectingExecutor {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: Some(reason.into()) }
    }
}

impl BlockExecutor for RejectingExecutor {
    fn execute(
        &self,
        _block: &CandidateBlock,
        _senders: &SenderCache,
    ) -> Result<(), BlockExecutionFailure> {
        let reason = self.reason.as_deref().unwrap_or("block execution is not available");
        Err(BlockExecutionFailure::invalid(reason))
    }
}
