#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use alloy_consensus::{constants::EMPTY_WITHDRAWALS, Header, SignableTransaction, TxEip1559, TxEip4844};
use alloy_eips::{
    eip2718::Encodable2718,
    eip4844::{DATA_GAS_PER_BLOB, VERSIONED_HASH_VERSION_KZG},
    eip7685::EMPTY_REQUESTS_HASH,
};
use alloy_genesis::Genesis;
use alloy_primitives::{Address, Bloom, Bytes, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use newpayload_gate::{
    chainspec::AdmissionChainSpec,
    config::AdmissionConfig,
    engine::{
        header::compute_payload_header,
        senders::{SenderCache, SenderRecovery},
        CandidateBlock, NewPayloadRequest, PayloadAdmission, PayloadParameter,
    },
    primitives::{PayloadHeader, SealedPayloadHeader},
    provider::{BlockExecutionFailure, BlockExecutor, ChainView, PayloadSync},
    transaction::SignedTransaction,
};
use parking_lot::Mutex;
use reth_primitives_traits::SealedHeader;

pub(crate) const CHAIN_ID: u64 = 1337;
/// Prague activation on the dev chain; Shanghai and Cancun are active from genesis.
pub(crate) const PRAGUE_TIME: u64 = 1_000_000;
/// Parent timestamp for Cancun payloads.
pub(crate) const CANCUN_PARENT_TIME: u64 = 1_000;
pub(crate) const SLOT_SECONDS: u64 = 12;

pub(crate) type TestAdmission = PayloadAdmission<MemoryChain, RecordingSync, RecordingExecutor>;

fn genesis(shanghai: Option<u64>, cancun: Option<u64>, prague: Option<u64>) -> Genesis {
    let mut genesis = Genesis::default();
    genesis.config.chain_id = CHAIN_ID;
    genesis.config.london_block = Some(0);
    genesis.config.terminal_total_difficulty = Some(U256::ZERO);
    genesis.config.terminal_total_difficulty_passed = true;
    genesis.config.shanghai_time = shanghai;
    genesis.config.cancun_time = cancun;
    genesis.config.prague_time = prague;
    genesis
}

/// Shanghai and Cancun at genesis, Prague at [`PRAGUE_TIME`].
pub(crate) fn dev_chain_spec() -> Arc<AdmissionChainSpec> {
    let genesis = genesis(Some(0), Some(0), Some(PRAGUE_TIME));
    Arc::new(AdmissionChainSpec::from_genesis(genesis).expect("valid dev genesis"))
}

/// A merged chain that never leaves Paris.
pub(crate) fn paris_chain_spec() -> Arc<AdmissionChainSpec> {
    let genesis = genesis(None, None, None);
    Arc::new(AdmissionChainSpec::from_genesis(genesis).expect("valid paris genesis"))
}

/// Deterministic signer for transaction fixtures.
pub(crate) fn test_signer() -> PrivateKeySigner {
    PrivateKeySigner::from_bytes(&B256::repeat_byte(0x42)).expect("valid private key")
}

pub(crate) fn beacon_root() -> B256 {
    B256::repeat_byte(0xbe)
}

pub(crate) fn blob_hash(seed: u8) -> B256 {
    let mut hash = B256::repeat_byte(seed);
    hash[0] = VERSIONED_HASH_VERSION_KZG;
    hash
}

pub(crate) fn transfer(signer: &PrivateKeySigner, nonce: u64) -> SignedTransaction {
    let tx = TxEip1559 {
        chain_id: CHAIN_ID,
        nonce,
        gas_limit: 21_000,
        max_fee_per_gas: 20_000_000_000,
        max_priority_fee_per_gas: 1_000_000_000,
        to: Address::repeat_byte(0x22).into(),
        value: U256::from(1u64),
        ..Default::default()
    };
    let signature = signer.sign_hash_sync(&tx.signature_hash()).expect("signing succeeds");
    SignedTransaction::Eip1559(tx.into_signed(signature))
}

pub(crate) fn blob_transaction(
    signer: &PrivateKeySigner,
    nonce: u64,
    blob_versioned_hashes: Vec<B256>,
) -> SignedTransaction {
    let tx = TxEip4844 {
        chain_id: CHAIN_ID,
        nonce,
        gas_limit: 21_000,
        max_fee_per_gas: 20_000_000_000,
        max_priority_fee_per_gas: 1_000_000_000,
        max_fee_per_blob_gas: 1,
        to: Address::repeat_byte(0x33),
        blob_versioned_hashes,
        ..Default::default()
    };
    let signature = signer.sign_hash_sync(&tx.signature_hash()).expect("signing succeeds");
    SignedTransaction::Eip4844(tx.into_signed(signature))
}

/// A transaction whose signature cannot be recovered.
pub(crate) fn unrecoverable_transfer() -> SignedTransaction {
    let tx = TxEip1559 { chain_id: CHAIN_ID, gas_limit: 21_000, ..Default::default() };
    SignedTransaction::Eip1559(
        tx.into_signed(alloy_primitives::Signature::new(U256::ZERO, U256::ZERO, false)),
    )
}

pub(crate) fn encode(transactions: &[SignedTransaction]) -> Vec<Bytes> {
    transactions.iter().map(|tx| tx.encoded_2718().into()).collect()
}

/// Post-Cancun parent header with empty blob accounting.
pub(crate) fn parent_header(timestamp: u64) -> SealedPayloadHeader {
    SealedHeader::seal_slow(Header {
        number: 100,
        timestamp,
        gas_limit: 30_000_000,
        base_fee_per_gas: Some(7),
        withdrawals_root: Some(EMPTY_WITHDRAWALS),
        blob_gas_used: Some(0),
        excess_blob_gas: Some(0),
        parent_beacon_block_root: Some(B256::ZERO),
        ..Default::default()
    })
}

/// Cancun parent with the given blob accounting.
pub(crate) fn blob_parent_header(excess_blob_gas: u64, blob_gas_used: u64) -> SealedPayloadHeader {
    let mut header = parent_header(CANCUN_PARENT_TIME).unseal();
    header.excess_blob_gas = Some(excess_blob_gas);
    header.blob_gas_used = Some(blob_gas_used);
    SealedHeader::seal_slow(header)
}

pub(crate) fn prague_parent_header() -> SealedPayloadHeader {
    let mut header = parent_header(PRAGUE_TIME).unseal();
    header.requests_hash = Some(EMPTY_REQUESTS_HASH);
    SealedHeader::seal_slow(header)
}

pub(crate) fn paris_parent_header() -> SealedPayloadHeader {
    SealedHeader::seal_slow(Header {
        number: 100,
        timestamp: CANCUN_PARENT_TIME,
        gas_limit: 30_000_000,
        base_fee_per_gas: Some(7),
        ..Default::default()
    })
}

/// Shanghai-shaped payload on top of `parent`, without a valid block hash yet.
fn base_payload(parent: &SealedPayloadHeader, transactions: Vec<Bytes>) -> PayloadParameter {
    PayloadParameter {
        parent_hash: parent.hash(),
        fee_recipient: Address::repeat_byte(0xfe),
        state_root: B256::repeat_byte(0x01),
        receipts_root: B256::repeat_byte(0x02),
        logs_bloom: Bloom::default(),
        prev_randao: B256::repeat_byte(0x03),
        block_number: parent.number + 1,
        gas_limit: 30_000_000,
        gas_used: 21_000,
        timestamp: parent.timestamp + SLOT_SECONDS,
        extra_data: Some(Bytes::from_static(b"newpayload-gate")),
        base_fee_per_gas: 7,
        block_hash: B256::ZERO,
        transactions,
        withdrawals: Some(vec![]),
        blob_gas_used: None,
        excess_blob_gas: None,
        deposit_requests: None,
        withdrawal_requests: None,
        consolidation_requests: None,
    }
}

pub(crate) fn paris_payload(parent: &SealedPayloadHeader, transactions: Vec<Bytes>) -> PayloadParameter {
    let mut payload = base_payload(parent, transactions);
    payload.withdrawals = None;
    seal(payload, None)
}

/// Cancun payload declaring `blob_count` blobs, sealed with [`beacon_root`].
pub(crate) fn cancun_payload(
    parent: &SealedPayloadHeader,
    transactions: Vec<Bytes>,
    blob_count: usize,
) -> PayloadParameter {
    let mut payload = base_payload(parent, transactions);
    payload.blob_gas_used = Some(blob_count as u64 * DATA_GAS_PER_BLOB);
    payload.excess_blob_gas = Some(0);
    seal(payload, Some(beacon_root()))
}

/// Prague payload with empty request queues, sealed with [`beacon_root`].
pub(crate) fn prague_payload(parent: &SealedPayloadHeader, transactions: Vec<Bytes>) -> PayloadParameter {
    let mut payload = base_payload(parent, transactions);
    payload.blob_gas_used = Some(0);
    payload.excess_blob_gas = Some(0);
    payload.deposit_requests = Some(vec![]);
    payload.withdrawal_requests = Some(vec![]);
    payload.consolidation_requests = Some(vec![]);
    seal(payload, Some(beacon_root()))
}

/// Sets the block hash to the one the payload contents produce.
pub(crate) fn seal(mut payload: PayloadParameter, parent_beacon_block_root: Option<B256>) -> PayloadParameter {
    let request = NewPayloadRequest {
        payload: payload.clone(),
        versioned_hashes: None,
        parent_beacon_block_root,
    };
    payload.block_hash =
        compute_payload_header(&request).expect("fixture payload reconstructs").hash();
    payload
}

pub(crate) fn admission(chain_spec: Arc<AdmissionChainSpec>, chain: MemoryChain) -> TestAdmission {
    let config = AdmissionConfig { invalid_warn_interval: Duration::ZERO, sender_cache_size: 64 };
    let senders = SenderRecovery::inline(SenderCache::new(config.sender_cache_size));
    PayloadAdmission::new(
        chain_spec,
        chain,
        RecordingSync::default(),
        RecordingExecutor::default(),
        senders,
        &config,
    )
}

#[derive(Debug, Default)]
struct ChainState {
    syncing: bool,
    pending_validation: bool,
    headers: HashMap<B256, PayloadHeader>,
    blocks: HashSet<B256>,
    bad: HashMap<B256, Option<B256>>,
}

/// In-memory chain where every stored header is considered valid.
#[derive(Debug, Default)]
pub(crate) struct MemoryChain {
    state: Mutex<ChainState>,
}

impl MemoryChain {
    pub(crate) fn with_parent(parent: &SealedPayloadHeader) -> Self {
        let chain = Self::default();
        chain.insert_header(parent);
        chain
    }

    pub(crate) fn insert_header(&self, header: &SealedPayloadHeader) {
        let mut state = self.state.lock();
        state.headers.insert(header.hash(), header.header().clone());
        state.blocks.insert(header.hash());
    }

    pub(crate) fn insert_block(&self, hash: B256) {
        self.state.lock().blocks.insert(hash);
    }

    pub(crate) fn set_syncing(&self, syncing: bool) {
        self.state.lock().syncing = syncing;
    }

    /// Ancestors exist but are not validated yet.
    pub(crate) fn set_pending_validation(&self, pending: bool) {
        self.state.lock().pending_validation = pending;
    }

    pub(crate) fn mark_bad(&self, hash: B256, latest_valid_hash: Option<B256>) {
        self.state.lock().bad.insert(hash, latest_valid_hash);
    }
}

impl ChainView for MemoryChain {
    fn is_syncing(&self) -> bool {
        self.state.lock().syncing
    }

    fn header_by_hash(&self, hash: B256) -> Option<PayloadHeader> {
        self.state.lock().headers.get(&hash).cloned()
    }

    fn contains_block(&self, hash: B256) -> bool {
        self.state.lock().blocks.contains(&hash)
    }

    fn is_bad_block(&self, hash: B256) -> bool {
        self.state.lock().bad.contains_key(&hash)
    }

    fn latest_valid_hash_of_bad_block(&self, hash: B256) -> Option<B256> {
        self.state.lock().bad.get(&hash).copied().flatten()
    }

    fn latest_valid_ancestor(&self, parent_hash: B256) -> Option<B256> {
        self.state.lock().headers.contains_key(&parent_hash).then_some(parent_hash)
    }

    fn latest_valid_ancestor_of(&self, header: &SealedPayloadHeader) -> Option<B256> {
        let state = self.state.lock();
        if state.pending_validation {
            return None
        }
        state.headers.contains_key(&header.parent_hash).then_some(header.parent_hash)
    }
}

/// Records every block handed to backward sync.
#[derive(Debug, Default)]
pub(crate) struct RecordingSync {
    enqueued: Mutex<Vec<CandidateBlock>>,
}

impl RecordingSync {
    pub(crate) fn enqueued(&self) -> Vec<CandidateBlock> {
        self.enqueued.lock().clone()
    }
}

impl PayloadSync for RecordingSync {
    fn enqueue(&self, block: CandidateBlock) {
        self.enqueued.lock().push(block);
    }
}

/// Records executed blocks, resolves their senders through the shared cache and
/// answers with a configurable outcome.
#[derive(Debug)]
pub(crate) struct RecordingExecutor {
    outcome: Mutex<Result<(), BlockExecutionFailure>>,
    executed: Mutex<Vec<CandidateBlock>>,
    senders: Mutex<Vec<Vec<Address>>>,
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self {
            outcome: Mutex::new(Ok(())),
            executed: Mutex::new(Vec::new()),
            senders: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingExecutor {
    pub(crate) fn fail_with(&self, failure: BlockExecutionFailure) {
        *self.outcome.lock() = Err(failure);
    }

    pub(crate) fn executed(&self) -> Vec<CandidateBlock> {
        self.executed.lock().clone()
    }

    /// Senders of each executed block whose signatures all recovered.
    pub(crate) fn senders(&self) -> Vec<Vec<Address>> {
        self.senders.lock().clone()
    }
}

impl BlockExecutor for RecordingExecutor {
    fn execute(
        &self,
        block: &CandidateBlock,
        senders: &SenderCache,
    ) -> Result<(), BlockExecutionFailure> {
        self.executed.lock().push(block.clone());
        let recovered = block
            .clone()
            .try_into_recovered(senders)
            .map_err(|err| BlockExecutionFailure::invalid(err.to_string()))?;
        self.senders.lock().push(recovered.senders().to_vec());
        self.outcome.lock().clone()
    }
}
