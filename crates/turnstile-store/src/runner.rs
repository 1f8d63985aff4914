//! The `transact` helper: run a transaction body against a fresh snapshot,
//! commit it, and re-run it from scratch when a concurrent writer won.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use turnstile_core::config::transaction::TransactionConfig;
use turnstile_core::error::AppError;
use turnstile_core::result::AppResult;
use turnstile_core::traits::{CommitOutcome, DocumentStore, SnapshotView};

use crate::transaction::Transaction;

/// Executes transaction bodies with optimistic retry.
///
/// The body is invoked once per attempt with a new [`Transaction`] over the
/// latest snapshot. It may run many times, so it must not cause effects
/// other than through the transaction.
///
/// - `Ok` with no buffered writes returns immediately; the snapshot was
///   consistent, so there is nothing to validate.
/// - `Err` returns the error unchanged without committing.
/// - A commit conflict sleeps with capped exponential backoff and full
///   jitter, then re-runs the body. After `max_retries` re-runs the call
///   fails with `TransactionAborted`.
#[derive(Debug, Clone)]
pub struct TransactionRunner {
    store: Arc<dyn DocumentStore>,
    config: TransactionConfig,
}

impl TransactionRunner {
    /// Creates a runner over `store`.
    pub fn new(store: Arc<dyn DocumentStore>, config: TransactionConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// The retry configuration.
    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    /// Take a snapshot for read-only queries.
    pub async fn snapshot(&self) -> AppResult<Arc<dyn SnapshotView>> {
        self.store.snapshot().await
    }

    /// Run `body` until it commits, fails, or exhausts the retry budget.
    ///
    /// `label` names the operation in logs and in the abort message.
    pub async fn transact<R, F>(&self, label: &'static str, mut body: F) -> AppResult<R>
    where
        F: FnMut(&mut Transaction) -> AppResult<R> + Send,
        R: Send,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            let mut txn = Transaction::new(self.store.snapshot().await?);
            let output = body(&mut txn)?;
            if txn.is_read_only() {
                return Ok(output);
            }

            let snapshot_version = txn.snapshot_version();
            let writes = txn.pending_writes();
            match self.store.commit(txn.into_commit_request()).await? {
                CommitOutcome::Committed { version } => {
                    debug!(
                        operation = label,
                        attempt,
                        snapshot_version,
                        version,
                        writes,
                        "Transaction committed"
                    );
                    return Ok(output);
                }
                CommitOutcome::Conflict { key } => {
                    if attempt > self.config.max_retries {
                        warn!(
                            operation = label,
                            attempts = attempt,
                            key = %key,
                            "Transaction retry budget exhausted"
                        );
                        return Err(AppError::transaction_aborted(format!(
                            "{label}: gave up after {attempt} attempts, last conflict on '{key}'"
                        )));
                    }
                    debug!(
                        operation = label,
                        attempt,
                        snapshot_version,
                        key = %key,
                        "Transaction conflict, retrying"
                    );
                    self.backoff(attempt).await;
                }
            }
        }
    }

    async fn backoff(&self, attempt: u32) {
        let ceiling = self.config.backoff_ceiling(attempt);
        if ceiling.is_zero() {
            tokio::task::yield_now().await;
            return;
        }
        let ceiling_micros = u64::try_from(ceiling.as_micros()).unwrap_or(u64::MAX);
        let jitter = rand::random::<u64>() % ceiling_micros.saturating_add(1);
        tokio::time::sleep(Duration::from_micros(jitter)).await;
    }
}
