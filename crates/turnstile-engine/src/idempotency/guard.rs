//! Idempotency guard.
//!
//! The record under a key and the operation it guards are written in the
//! same commit. Two callers racing on one key both read the record as
//! absent; the first to commit wins and the other's commit conflicts on
//! the record key, so its retry finds the winner's record and returns the
//! same result id.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use turnstile_core::config::idempotency::IdempotencyConfig;
use turnstile_core::error::AppError;
use turnstile_core::result::AppResult;
use turnstile_core::traits::Clock;
use turnstile_core::types::ResultId;
use turnstile_entity::idempotency::{
    Fingerprint, GuardedOperation, IdempotencyKey, IdempotencyRecord, OperationPayload,
    OperationStatus,
};
use turnstile_entity::keys;
use turnstile_store::TransactionRunner;

/// Result of [`IdempotencyGuard::run_once`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOnce {
    /// The record produced under the key, shared by every caller.
    pub result_id: ResultId,
    /// Whether this call created it.
    pub created: bool,
}

/// Runs keyed operations at most once.
#[derive(Debug, Clone)]
pub struct IdempotencyGuard {
    runner: Arc<TransactionRunner>,
    clock: Arc<dyn Clock>,
    config: IdempotencyConfig,
}

impl IdempotencyGuard {
    /// Creates a new guard.
    pub fn new(
        runner: Arc<TransactionRunner>,
        clock: Arc<dyn Clock>,
        config: IdempotencyConfig,
    ) -> Self {
        Self {
            runner,
            clock,
            config,
        }
    }

    /// Derive the key for `fingerprint` in the current time bucket.
    pub fn derive_key(&self, fingerprint: &Fingerprint) -> IdempotencyKey {
        IdempotencyKey::derive(
            fingerprint,
            self.config.time_bucket_seconds,
            self.clock.now(),
        )
    }

    /// Create the operation guarded by `key`, or return the one already
    /// created under it.
    pub async fn run_once(
        &self,
        key: &IdempotencyKey,
        payload: OperationPayload,
    ) -> AppResult<RunOnce> {
        if payload.kind.trim().is_empty() {
            return Err(AppError::validation("Operation kind must not be empty"));
        }
        let candidate = ResultId::new_ordered();
        let now = self.clock.now();

        let outcome = self
            .runner
            .transact("run_once", |txn| {
                let record_key = keys::idempotency_record(key);
                if let Some(record) = txn.get::<IdempotencyRecord>(&record_key)? {
                    return Ok(RunOnce {
                        result_id: record.result_id,
                        created: false,
                    });
                }

                txn.put(
                    keys::guarded_operation(candidate),
                    &GuardedOperation {
                        id: candidate,
                        kind: payload.kind.clone(),
                        idempotency_key: key.clone(),
                        payload: payload.body.clone(),
                        status: OperationStatus::Pending,
                        created_at: now,
                    },
                )?;
                txn.put(
                    record_key,
                    &IdempotencyRecord {
                        key: key.clone(),
                        result_id: candidate,
                        created_at: now,
                    },
                )?;
                Ok(RunOnce {
                    result_id: candidate,
                    created: true,
                })
            })
            .await?;

        if outcome.created {
            info!(
                key = %key,
                result_id = %outcome.result_id,
                kind = %payload.kind,
                "Guarded operation created"
            );
        } else {
            debug!(key = %key, result_id = %outcome.result_id, "Duplicate operation suppressed");
        }
        Ok(outcome)
    }

    /// The record stored under `key`, if any.
    pub async fn record(&self, key: &IdempotencyKey) -> AppResult<Option<IdempotencyRecord>> {
        self.runner
            .transact("get_idempotency_record", |txn| {
                txn.get(&keys::idempotency_record(key))
            })
            .await
    }

    /// The guarded operation with id `result_id`, if any.
    pub async fn operation(&self, result_id: ResultId) -> AppResult<Option<GuardedOperation>> {
        result_id.ensure_valid()?;
        self.runner
            .transact("get_guarded_operation", |txn| {
                txn.get(&keys::guarded_operation(result_id))
            })
            .await
    }
}
