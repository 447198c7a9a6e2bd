//! Response body of a `newPayload` call.

use std::fmt;

use alloy_primitives::B256;
use serde::Serialize;

/// Status kinds a `newPayload` call can report.
///
/// `INVALID_BLOCK_HASH` is only produced by the V1 method; later versions fold a
/// hash mismatch into `INVALID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayloadStatusKind {
    Valid,
    Invalid,
    InvalidBlockHash,
    Syncing,
    Accepted,
}

impl PayloadStatusKind {
    pub const fn is_invalid(self) -> bool {
        matches!(self, Self::Invalid | Self::InvalidBlockHash)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Invalid => "INVALID",
            Self::InvalidBlockHash => "INVALID_BLOCK_HASH",
            Self::Syncing => "SYNCING",
            Self::Accepted => "ACCEPTED",
        }
    }
}

impl fmt::Display for PayloadStatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{status, latestValidHash, validationError}` as sent on the wire.
///
/// A validation error is present exactly when the status is an invalid kind. The
/// constructors enforce that, so the fields are read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadStatus {
    status: PayloadStatusKind,
    latest_valid_hash: Option<B256>,
    validation_error: Option<String>,
}

impl PayloadStatus {
    /// Non-invalid status. Panics when given an invalid kind.
    pub fn new(status: PayloadStatusKind, latest_valid_hash: Option<B256>) -> Self {
        assert!(!status.is_invalid(), "{status} requires a validation error");
        Self { status, latest_valid_hash, validation_error: None }
    }

    /// Invalid status with its reason. Panics when given a non-invalid kind.
    pub fn invalid(
        status: PayloadStatusKind,
        latest_valid_hash: Option<B256>,
        validation_error: impl Into<String>,
    ) -> Self {
        assert!(status.is_invalid(), "{status} cannot carry a validation error");
        Self { status, latest_valid_hash, validation_error: Some(validation_error.into()) }
    }

    pub fn valid(block_hash: B256) -> Self {
        Self::new(PayloadStatusKind::Valid, Some(block_hash))
    }

    pub fn syncing() -> Self {
        Self::new(PayloadStatusKind::Syncing, None)
    }

    pub fn accepted() -> Self {
        Self::new(PayloadStatusKind::Accepted, None)
    }

    pub const fn status(&self) -> PayloadStatusKind {
        self.status
    }

    pub const fn latest_valid_hash(&self) -> Option<B256> {
        self.latest_valid_hash
    }

    pub fn validation_error(&self) -> Option<&str> {
        self.validation_error.as_deref()
    }

    pub const fn is_invalid(&self) -> bool {
        self.status.is_invalid()
    }
}
