//! Transaction helpers for payload admission.
//!
//! Payload transactions arrive as opaque EIP-2718 byte strings. They are decoded
//! into the standard Ethereum envelopes; a single malformed entry rejects the
//! whole payload.

use alloy_consensus::Transaction as _;
use alloy_eips::{
    eip2718::{Decodable2718, Eip2718Error},
    Typed2718,
};
use alloy_primitives::{Bytes, B256};
use thiserror::Error;

/// Re-export the signed envelope carried by payloads.
pub use crate::primitives::PayloadTransaction as SignedTransaction;

/// Why a raw payload transaction could not be turned into an envelope.
#[derive(Debug, Error)]
pub enum TransactionDecodeError {
    #[error("transaction {index} is empty")]
    Empty { index: usize },
    #[error("transaction {index} is malformed: {source}")]
    Malformed {
        index: usize,
        #[source]
        source: Eip2718Error,
    },
    #[error("transaction {index} has {remaining} trailing bytes")]
    TrailingBytes { index: usize, remaining: usize },
}

/// Decodes every raw transaction in payload order.
pub fn decode_transactions(raw: &[Bytes]) -> Result<Vec<SignedTransaction>, TransactionDecodeError> {
    raw.iter().enumerate().map(|(index, bytes)| decode_transaction(index, bytes)).collect()
}

fn decode_transaction(index: usize, bytes: &[u8]) -> Result<SignedTransaction, TransactionDecodeError> {
    if bytes.is_empty() {
        return Err(TransactionDecodeError::Empty { index })
    }
    let mut buf = bytes;
    let tx = SignedTransaction::decode_2718(&mut buf)
        .map_err(|source| TransactionDecodeError::Malformed { index, source })?;
    if !buf.is_empty() {
        return Err(TransactionDecodeError::TrailingBytes { index, remaining: buf.len() })
    }
    Ok(tx)
}

/// Versioned hashes of a blob-carrying transaction, `None` for every other type.
///
/// A blob transaction with an empty list yields `Some(&[])`; the blob gate rejects it.
pub fn blob_versioned_hashes(tx: &SignedTransaction) -> Option<&[B256]> {
    if !tx.is_eip4844() {
        return None
    }
    Some(tx.blob_versioned_hashes().unwrap_or_default())
}

/// Returns the number of blob versioned hashes carried by a signed transaction.
pub fn blob_count(tx: &SignedTransaction) -> usize {
    blob_versioned_hashes(tx).map(|hashes| hashes.len()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use alloy_consensus::{SignableTransaction, TxEip1559, TxEip4844};
    use alloy_eips::eip2718::Encodable2718;
    use alloy_primitives::{Address, Signature, U256};

    use super::*;

    fn dummy_signature() -> Signature {
        Signature::new(U256::from(1u64), U256::from(1u64), false)
    }

    fn eip1559() -> SignedTransaction {
        let tx = TxEip1559 { chain_id: 1, nonce: 3, gas_limit: 21_000, ..Default::default() };
        SignedTransaction::Eip1559(tx.into_signed(dummy_signature()))
    }

    fn eip4844(hashes: Vec<B256>) -> SignedTransaction {
        let tx = TxEip4844 {
            chain_id: 1,
            to: Address::repeat_byte(0x11),
            blob_versioned_hashes: hashes,
            ..Default::default()
        };
        SignedTransaction::Eip4844(tx.into_signed(dummy_signature()))
    }

    #[test]
    fn decodes_in_order() {
        let first = eip1559();
        let second = eip4844(vec![B256::repeat_byte(0x01)]);
        let raw: Vec<Bytes> =
            vec![first.encoded_2718().into(), second.encoded_2718().into()];

        let decoded = decode_transactions(&raw).unwrap();
        assert_eq!(decoded, vec![first, second]);
    }

    #[test]
    fn rejects_empty_and_garbage() {
        let err = decode_transactions(&[Bytes::new()]).unwrap_err();
        assert!(matches!(err, TransactionDecodeError::Empty { index: 0 }));

        let good: Bytes = eip1559().encoded_2718().into();
        let err = decode_transactions(&[good, Bytes::from_static(&[0x02, 0xff])]).unwrap_err();
        assert!(matches!(err, TransactionDecodeError::Malformed { index: 1, .. }));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut raw = eip1559().encoded_2718();
        raw.push(0x00);
        let err = decode_transactions(&[raw.into()]).unwrap_err();
        assert!(matches!(err, TransactionDecodeError::TrailingBytes { index: 0, remaining: 1 }));
    }

    #[test]
    fn blob_hashes_only_for_blob_transactions() {
        assert_eq!(blob_versioned_hashes(&eip1559()), None);
        assert_eq!(blob_count(&eip1559()), 0);

        let hashes = vec![B256::repeat_byte(0x01), B256::repeat_byte(0x02)];
        let blob_tx = eip4844(hashes.clone());
        assert_eq!(blob_versioned_hashes(&blob_tx), Some(hashes.as_slice()));
        assert_eq!(blob_count(&blob_tx), 2);

        let empty = eip4844(Vec::new());
        assert_eq!(blob_versioned_hashes(&empty), Some(&[][..]));
    }
}
