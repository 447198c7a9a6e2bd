//! Protocol-level errors of the `newPayload` methods.
//!
//! These are answered with a JSON-RPC error object instead of a payload status.

use serde::Serialize;
use thiserror::Error;

/// The payload timestamp falls outside the forks the method version serves.
pub const UNSUPPORTED_FORK_CODE: i32 = -38005;
/// JSON-RPC invalid params.
pub const INVALID_PARAMS_CODE: i32 = -32602;
/// JSON-RPC internal error.
pub const INTERNAL_ERROR_CODE: i32 = -32603;

/// Error answered instead of a `PayloadStatus`.
#[derive(Debug, Error)]
pub enum EngineApiError {
    #[error("Unsupported fork: {0}")]
    UnsupportedFork(String),
    #[error("Invalid params: {0}")]
    InvalidParams(String),
    #[error("Internal error: {0}")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl EngineApiError {
    pub fn unsupported_fork(reason: impl Into<String>) -> Self {
        Self::UnsupportedFork(reason.into())
    }

    pub fn invalid_params(reason: impl Into<String>) -> Self {
        Self::InvalidParams(reason.into())
    }

    pub fn internal(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Internal(err.into())
    }

    pub const fn code(&self) -> i32 {
        match self {
            Self::UnsupportedFork(_) => UNSUPPORTED_FORK_CODE,
            Self::InvalidParams(_) => INVALID_PARAMS_CODE,
            Self::Internal(_) => INTERNAL_ERROR_CODE,
        }
    }

    /// JSON-RPC error object for this error.
    pub fn to_error_object(&self) -> RpcErrorObject {
        RpcErrorObject { code: self.code(), message: self.to_string() }
    }
}

/// `{code, message}` error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcErrorObject {
    pub code: i32,
    pub message: String,
}
