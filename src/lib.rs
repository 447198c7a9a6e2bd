//! newpayload-gate: the admission boundary for Engine API `newPayload` calls.
//!
//! The consensus client proposes an execution payload; this crate rebuilds the
//! block header from it, checks the claimed block hash, applies the fork,
//! structural and blob rules, resolves ancestry against local chain state and
//! finally hands the block to execution. Every call ends in exactly one wire
//! status or one JSON-RPC error.
//!
//! ## Architecture
//!
//! Chain storage, backward sync and block execution are collaborators reached
//! through the traits in [`provider`]. The pipeline itself,
//! [`engine::PayloadAdmission`], is synchronous and owned by a single caller.
//! Sender recovery is the only work that leaves the calling thread.
//!
//! ## Method versions
//!
//! | Method | Serves | Blob parameters | Hash mismatch status |
//! |--------|--------|-----------------|----------------------|
//! | `engine_newPayloadV1` | Paris | absent | `INVALID_BLOCK_HASH` |
//! | `engine_newPayloadV2` | Paris, Shanghai | absent | `INVALID` |
//! | `engine_newPayloadV3` | Cancun | required | `INVALID` |
//! | `engine_newPayloadV4` | Prague | required | `INVALID` |
//!
//! ## Usage
//!
//! ```bash
//! # Compute the block hash a payload should claim
//! newpayload-gate hash --payload payload.json
//!
//! # Run a payload through the gates against an empty chain
//! newpayload-gate check --chain mainnet --version v3 \
//!   --payload payload.json --versioned-hashes hashes.json \
//!   --parent-beacon-block-root 0x...
//! ```

pub mod chainspec;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod primitives;
pub mod provider;
pub mod transaction;
pub mod version;

pub use chainspec::{AdmissionChainSpec, BlobSchedule, ProtocolVersion};
pub use config::AdmissionConfig;
pub use engine::{
    CandidateBlock, EngineApiError, NewPayloadRequest, PayloadAdmission, PayloadParameter,
    PayloadStatus, PayloadStatusKind,
};
pub use provider::{
    BlockExecutionFailure, BlockExecutor, ChainView, FailureCause, PayloadSync, PeerCountProbe,
};
