//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Barrier;

use turnstile_core::config::EngineConfig;
use turnstile_core::error::AppError;
use turnstile_core::result::AppResult;
use turnstile_core::traits::{
    CommitOutcome, CommitRequest, DocumentStore, ManualClock, SnapshotView,
};
use turnstile_engine::Engines;
use turnstile_store::MemoryDocumentStore;

/// Engines over a fresh in-memory store with a pinned clock.
pub struct TestApp {
    /// All engines, sharing one runner
    pub engines: Engines,
    /// The store behind them, for inspecting stats
    pub store: MemoryDocumentStore,
    /// Gate the engines' snapshots pass through
    pub lockstep: Arc<LockstepStore>,
    /// Clock handle the engines read from
    pub clock: ManualClock,
}

impl TestApp {
    /// Create a new test application
    pub fn new() -> Self {
        Self::with_callers(1)
    }

    /// Create a test application whose store can hold `callers` concurrent
    /// first attempts on one snapshot version, see [`LockstepStore::arm`].
    pub fn with_callers(callers: usize) -> Self {
        let mut config = EngineConfig::default();
        // Heavy contention in the tests must never exhaust the budget.
        config.transaction.max_retries = 10_000;
        config.transaction.initial_backoff_ms = 1;
        config.transaction.max_backoff_ms = 4;

        let store = MemoryDocumentStore::new();
        let lockstep = Arc::new(LockstepStore::new(store.clone(), callers));
        let clock = ManualClock::new(start());
        let engines = Engines::new(lockstep.clone(), &config, Arc::new(clock.clone()));
        Self {
            engines,
            store,
            lockstep,
            clock,
        }
    }
}

/// Store wrapper that parks snapshot takers on a barrier.
///
/// Once armed, the next `parties` snapshots each wait until all of them
/// have been taken, so every caller starts from the same version and all
/// but the first to commit are rejected and must retry. Later snapshots
/// pass straight through.
#[derive(Debug)]
pub struct LockstepStore {
    inner: MemoryDocumentStore,
    gate: Barrier,
    parties: usize,
    pending: AtomicUsize,
}

impl LockstepStore {
    fn new(inner: MemoryDocumentStore, parties: usize) -> Self {
        Self {
            inner,
            gate: Barrier::new(parties),
            parties,
            pending: AtomicUsize::new(0),
        }
    }

    /// Hold the next `parties` snapshots until all of them are taken.
    pub fn arm(&self) {
        self.pending.store(self.parties, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for LockstepStore {
    async fn snapshot(&self) -> AppResult<Arc<dyn SnapshotView>> {
        let snapshot = self.inner.snapshot().await?;
        let gated = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if gated {
            self.gate.wait().await;
        }
        Ok(snapshot)
    }

    async fn commit(&self, request: CommitRequest) -> AppResult<CommitOutcome> {
        self.inner.commit(request).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}

/// The instant every test clock starts at.
pub fn start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
}

/// Await every spawned task and unwrap the join result.
pub async fn join<T>(
    tasks: Vec<tokio::task::JoinHandle<Result<T, AppError>>>,
) -> Vec<Result<T, AppError>> {
    futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect()
}
