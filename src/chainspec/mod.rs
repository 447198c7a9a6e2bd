//! Protocol schedule used by the admission pipeline.
//!
//! We wrap `reth`'s `ChainSpec` so every gate asks the same type which fork is
//! active at a payload timestamp and which blob parameters apply to it. Only
//! post-merge chains are accepted: the pipeline never sees proof-of-work
//! payloads.

use std::{fmt, path::Path, sync::Arc};

use alloy_consensus::BlockHeader as _;
use alloy_eips::{eip4844::DATA_GAS_PER_BLOB, eip7840::BlobParams};
use alloy_genesis::Genesis;
use alloy_primitives::U256;
use derive_more::{Constructor, Into};
use eyre::Context;
use reth_chainspec::{
    ChainSpec, EthChainSpec, EthereumHardfork, EthereumHardforks, ForkCondition, HOLESKY, HOODI,
    MAINNET, SEPOLIA,
};
use tracing::{debug, info};

use crate::primitives::PayloadHeader;

/// Chain specification consulted by the admission gates.
#[derive(Debug, Clone, Into, Constructor, PartialEq, Eq)]
pub struct AdmissionChainSpec {
    /// The underlying reth chain specification.
    pub inner: ChainSpec,
}

impl AdmissionChainSpec {
    /// Create an admission chain spec from a genesis configuration.
    pub fn from_genesis(mut genesis: Genesis) -> eyre::Result<Self> {
        info!(chain_id = genesis.config.chain_id, "Creating admission chain spec from genesis");

        Self::validate_genesis(&mut genesis).context("Genesis validation failed")?;

        let inner: ChainSpec = genesis.into();
        info!(
            chain_id = inner.chain.id(),
            genesis_hash = ?inner.genesis_hash(),
            "Admission chain spec created"
        );
        Ok(Self { inner })
    }

    /// Parse a built-in network name or a path to a genesis JSON file.
    pub fn parse(s: &str) -> eyre::Result<Arc<Self>> {
        let inner = match s {
            "mainnet" => (**MAINNET).clone(),
            "sepolia" => (**SEPOLIA).clone(),
            "holesky" => (**HOLESKY).clone(),
            "hoodi" => (**HOODI).clone(),
            path => {
                info!(path, "Parsing chain spec from genesis file");
                let raw = std::fs::read_to_string(Path::new(path))
                    .with_context(|| format!("Failed to read genesis from {path}"))?;
                let genesis: Genesis = serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse genesis from {path}"))?;
                return Ok(Arc::new(Self::from_genesis(genesis)?))
            }
        };
        info!(chain = s, "Using built-in chain spec");
        Ok(Arc::new(Self { inner }))
    }

    /// Post-merge guardrails plus ordering of the timestamp forks the gates care about.
    fn validate_genesis(genesis: &mut Genesis) -> eyre::Result<()> {
        // Merge-at-genesis when the config does not say otherwise.
        if genesis.config.terminal_total_difficulty.is_none() {
            genesis.config.terminal_total_difficulty = Some(U256::ZERO);
            genesis.config.terminal_total_difficulty_passed = true;
        }

        let forks = [
            ("shanghai", genesis.config.shanghai_time),
            ("cancun", genesis.config.cancun_time),
            ("prague", genesis.config.prague_time),
            ("osaka", genesis.config.osaka_time),
        ];

        let mut previous: Option<(&str, u64)> = None;
        for (name, time) in forks {
            let Some(time) = time else { continue };
            if let Some((prev_name, prev_time)) = previous {
                if time < prev_time {
                    eyre::bail!(
                        "{name} activation ({time}) must not precede {prev_name} activation ({prev_time})"
                    );
                }
            }
            previous = Some((name, time));
        }

        debug!("Genesis validation passed");
        Ok(())
    }

    /// Returns the latest protocol version active at `timestamp`.
    pub fn protocol_version_at(&self, timestamp: u64) -> ProtocolVersion {
        if self.is_osaka_active_at_timestamp(timestamp) {
            ProtocolVersion::Osaka
        } else if self.is_prague_active_at_timestamp(timestamp) {
            ProtocolVersion::Prague
        } else if self.is_cancun_active_at_timestamp(timestamp) {
            ProtocolVersion::Cancun
        } else if self.is_shanghai_active_at_timestamp(timestamp) {
            ProtocolVersion::Shanghai
        } else {
            ProtocolVersion::Paris
        }
    }

    /// Activation timestamp of `fork`, or `None` when the schedule never activates it.
    pub fn fork_timestamp(&self, fork: EthereumHardfork) -> Option<u64> {
        match self.ethereum_fork_activation(fork) {
            ForkCondition::Timestamp(time) => Some(time),
            _ => None,
        }
    }

    /// Blob gas arithmetic for a header with the given timestamp.
    pub fn blob_schedule_at(&self, timestamp: u64) -> BlobSchedule {
        BlobSchedule::new(self.inner.blob_params_at_timestamp(timestamp))
    }
}

impl EthereumHardforks for AdmissionChainSpec {
    fn ethereum_fork_activation(&self, fork: EthereumHardfork) -> ForkCondition {
        self.inner.ethereum_fork_activation(fork)
    }
}

impl Default for AdmissionChainSpec {
    fn default() -> Self {
        Self { inner: (**MAINNET).clone() }
    }
}

/// Protocol versions the Engine API distinguishes for `newPayload`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtocolVersion {
    Paris,
    Shanghai,
    Cancun,
    Prague,
    Osaka,
}

impl ProtocolVersion {
    /// Withdrawals are part of the block body from Shanghai on.
    pub const fn requires_withdrawals(self) -> bool {
        matches!(self, Self::Shanghai | Self::Cancun | Self::Prague | Self::Osaka)
    }

    /// Execution requests are part of the payload from Prague on.
    pub const fn requires_requests(self) -> bool {
        matches!(self, Self::Prague | Self::Osaka)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Paris => "Paris",
            Self::Shanghai => "Shanghai",
            Self::Cancun => "Cancun",
            Self::Prague => "Prague",
            Self::Osaka => "Osaka",
        };
        f.write_str(name)
    }
}

/// Blob gas cost, per-block ceiling and excess recurrence for one fork.
///
/// Before Cancun there are no blob parameters: every cost ceiling is zero and the
/// expected excess blob gas is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobSchedule {
    params: Option<BlobParams>,
}

impl BlobSchedule {
    pub const fn new(params: Option<BlobParams>) -> Self {
        Self { params }
    }

    /// Gas charged for `blob_count` blobs.
    pub const fn blob_gas_cost(&self, blob_count: usize) -> u64 {
        (blob_count as u64).saturating_mul(DATA_GAS_PER_BLOB)
    }

    /// Upper bound on blob gas a single block may consume.
    pub fn max_blob_gas_per_block(&self) -> u64 {
        self.params.map(|params| params.max_blob_gas_per_block()).unwrap_or_default()
    }

    /// Excess blob gas a child of `parent` must declare.
    ///
    /// A parent without blob accounting counts as zero excess and zero usage.
    pub fn next_excess_blob_gas(&self, parent: &PayloadHeader) -> u64 {
        let Some(params) = self.params else { return 0 };
        parent
            .maybe_next_block_excess_blob_gas(Some(params))
            .unwrap_or_else(|| params.next_block_excess_blob_gas(0, 0))
    }
}
