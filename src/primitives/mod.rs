//! Primitive type aliases used across the admission pipeline.
//!
//! Candidate blocks are plain Ethereum blocks. Centralising the aliases here
//! keeps the gates independent of where the concrete types live upstream.

use alloy_consensus::Header;
use reth_ethereum_primitives::{BlockBody, TransactionSigned};
use reth_primitives_traits::SealedHeader;

/// Signed transaction envelope as carried in a block body.
pub type PayloadTransaction = TransactionSigned;
/// Block body assembled from payload fields.
pub type PayloadBlockBody = BlockBody;
/// Block header type reconstructed from payload fields.
pub type PayloadHeader = Header;
/// Header together with its canonical hash.
pub type SealedPayloadHeader = SealedHeader<Header>;
