//! Blob admission rules.
//!
//! Checks the blob transactions of a payload against the versioned hashes the
//! consensus layer expects and against the blob gas accounting in the header.
//! Rules run in a fixed order and the first failure is reported.

use alloy_eips::eip4844::VERSIONED_HASH_VERSION_KZG;
use alloy_primitives::B256;
use derive_more::{Deref, Display};
use thiserror::Error;

use crate::{
    chainspec::BlobSchedule,
    primitives::PayloadHeader,
    transaction::{blob_versioned_hashes, SignedTransaction},
};

/// A blob commitment hash whose first byte is the KZG version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deref, Display)]
pub struct VersionedHash(B256);

impl VersionedHash {
    pub const fn into_inner(self) -> B256 {
        self.0
    }
}

/// A supplied versioned hash carries an unknown version byte.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("Invalid versionedHash {hash}: unsupported version {version:#04x}")]
pub struct InvalidVersionedHash {
    pub hash: B256,
    pub version: u8,
}

impl TryFrom<B256> for VersionedHash {
    type Error = InvalidVersionedHash;

    fn try_from(hash: B256) -> Result<Self, Self::Error> {
        let version = hash[0];
        if version != VERSIONED_HASH_VERSION_KZG {
            return Err(InvalidVersionedHash { hash, version })
        }
        Ok(Self(hash))
    }
}

/// Validates the caller's expected hash list, keeping absence distinct from empty.
pub fn extract_versioned_hashes(
    raw: Option<&[B256]>,
) -> Result<Option<Vec<VersionedHash>>, InvalidVersionedHash> {
    raw.map(|hashes| hashes.iter().copied().map(VersionedHash::try_from).collect()).transpose()
}

/// First blob rule a payload broke.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlobValidationError {
    #[error("There must be at least one blob")]
    NoBlobs,
    #[error("Payload must contain versioned hashes for transactions")]
    MissingVersionedHashes,
    #[error("Versioned hashes from blob transactions do not match expected values")]
    VersionedHashMismatch,
    #[error("Payload excessBlobGas does not match calculated excessBlobGas")]
    ExcessBlobGasMismatch { expected: u64, declared: u64 },
    #[error("Payload BlobGasUsed does not match calculated BlobGasUsed")]
    BlobGasUsedMismatch { expected: u64, declared: u64 },
    #[error("Invalid Blob Count: {0}")]
    TooManyBlobs(usize),
}

/// Runs the blob rules and returns the number of blobs the payload carries.
///
/// `parent` is only consulted for the excess blob gas recurrence; when it is not
/// known locally that rule is skipped. Absent header values count as zero.
pub fn validate_blobs(
    transactions: &[SignedTransaction],
    header: &PayloadHeader,
    parent: Option<&PayloadHeader>,
    expected: Option<&[VersionedHash]>,
    schedule: &BlobSchedule,
) -> Result<usize, BlobValidationError> {
    let mut tx_hashes: Vec<B256> = Vec::new();
    for hashes in transactions.iter().filter_map(blob_versioned_hashes) {
        if hashes.is_empty() {
            return Err(BlobValidationError::NoBlobs)
        }
        tx_hashes.extend_from_slice(hashes);
    }

    match expected {
        None if !tx_hashes.is_empty() => return Err(BlobValidationError::MissingVersionedHashes),
        Some(expected) if !expected.iter().map(|hash| **hash).eq(tx_hashes.iter().copied()) => {
            return Err(BlobValidationError::VersionedHashMismatch)
        }
        _ => {}
    }

    if let Some(parent) = parent {
        let expected_excess = schedule.next_excess_blob_gas(parent);
        let declared = header.excess_blob_gas.unwrap_or_default();
        if declared != expected_excess {
            return Err(BlobValidationError::ExcessBlobGasMismatch {
                expected: expected_excess,
                declared,
            })
        }
    }

    if let (Some(declared), Some(expected)) = (header.blob_gas_used, expected) {
        let expected_used = schedule.blob_gas_cost(expected.len());
        if declared != expected_used {
            return Err(BlobValidationError::BlobGasUsedMismatch {
                expected: expected_used,
                declared,
            })
        }
    }

    if schedule.blob_gas_cost(tx_hashes.len()) > schedule.max_blob_gas_per_block() {
        return Err(BlobValidationError::TooManyBlobs(tx_hashes.len()))
    }

    Ok(tx_hashes.len())
}
