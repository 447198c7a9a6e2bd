//! Background sender recovery.
//!
//! Signature recovery is the most expensive per-transaction step of execution.
//! Admission starts it early on a worker pool and stores the results in a shared
//! cache keyed by transaction hash. Nothing here reports back to the pipeline:
//! failures are logged and left for execution to rediscover.

use std::{
    fmt,
    num::NonZeroUsize,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use alloy_consensus::transaction::SignerRecoverable;
use alloy_primitives::{Address, TxHash};
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{metrics::SenderRecoveryMetrics, transaction::SignedTransaction};

/// Fallback when a zero capacity is configured.
const MIN_CACHE_CAPACITY: NonZeroUsize = NonZeroUsize::MIN;

/// A unit of fire-and-forget work.
pub type TxJob = Box<dyn FnOnce() + Send + 'static>;

/// Pool that runs sender recovery jobs off the admission thread.
pub trait TxWorkerPool: Send + Sync {
    fn submit(&self, job: TxJob);
}

impl TxWorkerPool for tokio::runtime::Handle {
    fn submit(&self, job: TxJob) {
        // The join handle is dropped: jobs are never awaited.
        drop(self.spawn_blocking(job));
    }
}

/// Runs every job on the submitting thread. Used when no runtime is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineWorkerPool;

impl TxWorkerPool for InlineWorkerPool {
    fn submit(&self, job: TxJob) {
        job()
    }
}

/// Bounded map from transaction hash to recovered sender.
#[derive(Clone)]
pub struct SenderCache {
    inner: Arc<Mutex<LruCache<TxHash, Address>>>,
}

impl SenderCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(MIN_CACHE_CAPACITY);
        Self { inner: Arc::new(Mutex::new(LruCache::new(capacity))) }
    }

    pub fn get(&self, hash: &TxHash) -> Option<Address> {
        self.inner.lock().get(hash).copied()
    }

    pub fn contains(&self, hash: &TxHash) -> bool {
        self.inner.lock().contains(hash)
    }

    pub fn insert(&self, hash: TxHash, sender: Address) {
        self.inner.lock().put(hash, sender);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }
}

impl fmt::Debug for SenderCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Schedules sender recovery for decoded payload transactions.
#[derive(Clone)]
pub struct SenderRecovery {
    pool: Arc<dyn TxWorkerPool>,
    cache: SenderCache,
    metrics: SenderRecoveryMetrics,
}

impl SenderRecovery {
    pub fn new(pool: Arc<dyn TxWorkerPool>, cache: SenderCache) -> Self {
        Self { pool, cache, metrics: SenderRecoveryMetrics::default() }
    }

    /// Recovery on the calling thread, for tools without a runtime.
    pub fn inline(cache: SenderCache) -> Self {
        Self::new(Arc::new(InlineWorkerPool), cache)
    }

    pub const fn cache(&self) -> &SenderCache {
        &self.cache
    }

    /// Submits one job per transaction and returns without waiting.
    pub fn schedule(&self, transactions: &[SignedTransaction]) {
        for tx in transactions {
            let tx = tx.clone();
            let cache = self.cache.clone();
            let metrics = self.metrics.clone();
            self.pool.submit(Box::new(move || {
                let hash = *tx.tx_hash();
                let outcome = catch_unwind(AssertUnwindSafe(|| recover_into(&tx, &cache, &metrics)));
                if outcome.is_err() {
                    metrics.record_failure();
                    warn!(
                        target: "newpayload_gate::senders",
                        %hash,
                        "Sender recovery job panicked"
                    );
                }
            }));
        }
    }
}

fn recover_into(tx: &SignedTransaction, cache: &SenderCache, metrics: &SenderRecoveryMetrics) {
    let hash = *tx.tx_hash();
    if cache.contains(&hash) {
        return
    }
    match tx.recover_signer() {
        Ok(sender) => {
            cache.insert(hash, sender);
            metrics.record_recovered();
            trace!(target: "newpayload_gate::senders", %hash, %sender, "Recovered transaction sender");
        }
        Err(err) => {
            metrics.record_failure();
            debug!(
                target: "newpayload_gate::senders",
                %hash,
                %err,
                "Sender recovery failed, execution will report it"
            );
        }
    }
}

impl fmt::Debug for SenderRecovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderRecovery").field("cache", &self.cache).finish_non_exhaustive()
    }
}
