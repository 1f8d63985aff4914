//! Transaction context for optimistic concurrency control.
//!
//! A [`Transaction`] reads from one immutable snapshot and buffers its
//! writes. Nothing reaches the store until the runner hands the read and
//! write sets to `DocumentStore::commit`, so dropping a transaction at any
//! point leaves no trace.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use turnstile_core::error::{AppError, ErrorKind};
use turnstile_core::result::AppResult;
use turnstile_core::traits::{CommitRequest, DocumentKey, SnapshotView, WriteOp};

/// Read/write-set tracking over a single snapshot.
///
/// Reads see this transaction's own buffered writes first, then the
/// snapshot. Every key read from the snapshot joins the read set, including
/// keys that turned out to be absent, so a concurrent insert of a key we
/// saw missing is detected at commit.
#[derive(Debug)]
pub struct Transaction {
    snapshot: Arc<dyn SnapshotView>,
    read_set: BTreeSet<DocumentKey>,
    writes: BTreeMap<DocumentKey, WriteOp>,
}

impl Transaction {
    /// Start a transaction over `snapshot`.
    pub fn new(snapshot: Arc<dyn SnapshotView>) -> Self {
        Self {
            snapshot,
            read_set: BTreeSet::new(),
            writes: BTreeMap::new(),
        }
    }

    /// Version of the snapshot this transaction reads from.
    pub fn snapshot_version(&self) -> u64 {
        self.snapshot.version()
    }

    /// Read and decode a document.
    pub fn get<T: DeserializeOwned>(&mut self, key: &DocumentKey) -> AppResult<Option<T>> {
        if let Some(op) = self.writes.get(key) {
            return match op {
                WriteOp::Put(body) => decode(key, body.clone()).map(Some),
                WriteOp::Delete => Ok(None),
            };
        }

        self.read_set.insert(key.clone());
        match self.snapshot.get(key)? {
            Some(doc) => decode(key, doc.body).map(Some),
            None => Ok(None),
        }
    }

    /// Read a document that must exist.
    pub fn require<T: DeserializeOwned>(&mut self, key: &DocumentKey) -> AppResult<T> {
        self.get(key)?
            .ok_or_else(|| AppError::not_found(format!("Document '{key}' does not exist")))
    }

    /// Buffer an insert or replace.
    pub fn put<T: Serialize>(&mut self, key: DocumentKey, value: &T) -> AppResult<()> {
        let body = serde_json::to_value(value).map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                format!("Failed to encode document '{key}': {e}"),
                e,
            )
        })?;
        self.writes.insert(key, WriteOp::Put(body));
        Ok(())
    }

    /// Buffer a delete.
    pub fn delete(&mut self, key: DocumentKey) {
        self.writes.insert(key, WriteOp::Delete);
    }

    /// Whether the body buffered no writes.
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }

    /// Number of buffered writes.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Consume the transaction into a commit request.
    pub fn into_commit_request(self) -> CommitRequest {
        CommitRequest {
            snapshot_version: self.snapshot.version(),
            read_set: self.read_set.into_iter().collect(),
            writes: self.writes.into_iter().collect(),
        }
    }
}

fn decode<T: DeserializeOwned>(key: &DocumentKey, body: serde_json::Value) -> AppResult<T> {
    serde_json::from_value(body).map_err(|e| {
        AppError::with_source(
            ErrorKind::Serialization,
            format!("Failed to decode document '{key}': {e}"),
            e,
        )
    })
}
