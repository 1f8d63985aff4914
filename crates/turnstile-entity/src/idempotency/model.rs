//! Idempotency record and guarded operation document models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use turnstile_core::types::ResultId;

use super::key::IdempotencyKey;

/// Proof that the operation behind a key has already produced `result_id`.
///
/// Created exactly once per key in the same transaction as the guarded
/// record. Never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    /// The guarding key.
    pub key: IdempotencyKey,
    /// The record produced under this key.
    pub result_id: ResultId,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

/// Processing status of a guarded operation.
///
/// The guard only ever creates `Pending` records; downstream processors
/// own the later transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Created, not yet processed.
    Pending,
    /// Processed successfully.
    Completed,
    /// Processing failed.
    Failed,
}

/// What the caller wants recorded when the guarded operation first runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationPayload {
    /// Operation type, e.g. `"payment"`.
    pub kind: String,
    /// Opaque operation body.
    pub body: serde_json::Value,
}

impl OperationPayload {
    /// Create a payload.
    pub fn new(kind: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            body,
        }
    }
}

/// The side-effecting record an idempotency key guards (e.g. a payment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardedOperation {
    /// Result identity handed back to every caller with the same key.
    pub id: ResultId,
    /// Operation type.
    pub kind: String,
    /// The key this record was created under.
    pub idempotency_key: IdempotencyKey,
    /// Operation body as supplied by the first caller.
    pub payload: serde_json::Value,
    /// Processing status.
    pub status: OperationStatus,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}
