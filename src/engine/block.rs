//! Candidate block assembled from an admitted payload.

use std::fmt;

use alloy_consensus::{crypto::RecoveryError, transaction::SignerRecoverable};
use alloy_eips::eip4895::{Withdrawal, Withdrawals};
use alloy_primitives::{Address, B256};
use reth_ethereum_primitives::Block;
use reth_primitives_traits::{RecoveredBlock, SealedBlock};

use crate::{
    engine::{requests::ExecutionRequest, senders::SenderCache},
    primitives::{PayloadBlockBody, SealedPayloadHeader},
    transaction::{blob_count, SignedTransaction},
};

/// Header plus body of a payload that passed the integrity and blob gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateBlock {
    header: SealedPayloadHeader,
    body: PayloadBlockBody,
    requests: Option<Vec<ExecutionRequest>>,
}

impl CandidateBlock {
    pub fn new(
        header: SealedPayloadHeader,
        transactions: Vec<SignedTransaction>,
        withdrawals: Option<Vec<Withdrawal>>,
        requests: Option<Vec<ExecutionRequest>>,
    ) -> Self {
        let body = PayloadBlockBody {
            transactions,
            ommers: Vec::new(),
            withdrawals: withdrawals.map(Withdrawals::new),
        };
        Self { header, body, requests }
    }

    pub const fn header(&self) -> &SealedPayloadHeader {
        &self.header
    }

    pub fn hash(&self) -> B256 {
        self.header.hash()
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn parent_hash(&self) -> B256 {
        self.header.parent_hash
    }

    pub fn transactions(&self) -> &[SignedTransaction] {
        &self.body.transactions
    }

    pub fn withdrawals(&self) -> Option<&[Withdrawal]> {
        self.body.withdrawals.as_ref().map(|withdrawals| withdrawals.as_slice())
    }

    pub fn requests(&self) -> Option<&[ExecutionRequest]> {
        self.requests.as_deref()
    }

    /// Total versioned hashes across blob transactions.
    pub fn blob_count(&self) -> usize {
        self.transactions().iter().map(blob_count).sum()
    }

    /// Senders of every transaction, in order.
    ///
    /// Uses senders recovered in the background when available and recovers the
    /// rest here; an unrecoverable signature surfaces as an error at this point.
    pub fn senders(&self, cache: &SenderCache) -> Result<Vec<Address>, RecoveryError> {
        self.transactions()
            .iter()
            .map(|tx| match cache.get(tx.tx_hash()) {
                Some(sender) => Ok(sender),
                None => {
                    let sender = tx.recover_signer()?;
                    cache.insert(*tx.tx_hash(), sender);
                    Ok(sender)
                }
            })
            .collect()
    }

    pub fn into_sealed_block(self) -> SealedBlock<Block> {
        SealedBlock::from_sealed_parts(self.header, self.body)
    }

    /// Converts into the sender-annotated block the execution layer consumes.
    pub fn try_into_recovered(
        self,
        cache: &SenderCache,
    ) -> Result<RecoveredBlock<Block>, RecoveryError> {
        let senders = self.senders(cache)?;
        Ok(RecoveredBlock::new_sealed(self.into_sealed_block(), senders))
    }
}

impl fmt::Display for CandidateBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.number(), self.hash())
    }
}

#[cfg(test)]
mod tests {
    use alloy_consensus::{SignableTransaction, TxEip1559, TxEip4844};
    use alloy_primitives::{Signature, U256};
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;
    use reth_primitives_traits::SealedHeader;

    use super::*;
    use crate::primitives::PayloadHeader;

    fn header() -> SealedPayloadHeader {
        SealedHeader::seal_slow(PayloadHeader { number: 42, ..Default::default() })
    }

    fn signed(signer: &PrivateKeySigner, nonce: u64) -> SignedTransaction {
        let tx = TxEip1559 { chain_id: 1, nonce, gas_limit: 21_000, ..Default::default() };
        let signature = signer.sign_hash_sync(&tx.signature_hash()).unwrap();
        SignedTransaction::Eip1559(tx.into_signed(signature))
    }

    #[test]
    fn exposes_body_parts() {
        let blob_tx = TxEip4844 {
            blob_versioned_hashes: vec![B256::repeat_byte(1), B256::repeat_byte(2)],
            ..Default::default()
        }
        .into_signed(Signature::new(U256::from(1u64), U256::from(1u64), false));
        let block = CandidateBlock::new(
            header(),
            vec![SignedTransaction::Eip4844(blob_tx)],
            Some(vec![Withdrawal::default()]),
            None,
        );

        assert_eq!(block.number(), 42);
        assert_eq!(block.blob_count(), 2);
        assert_eq!(block.withdrawals().map(<[_]>::len), Some(1));
        assert_eq!(block.requests(), None);
        assert_eq!(block.to_string(), format!("#42 ({})", block.hash()));

        let sealed = block.clone().into_sealed_block();
        assert_eq!(sealed.hash(), block.hash());
    }

    #[test]
    fn recovered_block_keeps_hash_and_senders() {
        let signer = PrivateKeySigner::random();
        let block = CandidateBlock::new(header(), vec![signed(&signer, 0)], None, None);
        let hash = block.hash();

        let recovered = block.try_into_recovered(&SenderCache::new(8)).unwrap();
        assert_eq!(recovered.hash(), hash);
        assert_eq!(recovered.senders(), &[signer.address()]);
    }

    #[test]
    fn senders_use_cache_then_recover() {
        let signer = PrivateKeySigner::random();
        let first = signed(&signer, 0);
        let second = signed(&signer, 1);
        let cache = SenderCache::new(8);
        let cached = Address::repeat_byte(0x77);
        cache.insert(*first.tx_hash(), cached);

        let block = CandidateBlock::new(header(), vec![first, second.clone()], None, None);
        let senders = block.senders(&cache).unwrap();
        assert_eq!(senders, vec![cached, signer.address()]);
        assert_eq!(cache.get(second.tx_hash()), Some(signer.address()));
    }

    #[test]
    fn unrecoverable_sender_surfaces_at_execution() {
        let tx = TxEip1559::default().into_signed(Signature::new(U256::ZERO, U256::ZERO, false));
        let block =
            CandidateBlock::new(header(), vec![SignedTransaction::Eip1559(tx)], None, None);
        assert!(block.senders(&SenderCache::new(8)).is_err());
    }
}
