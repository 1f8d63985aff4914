//! In-memory document store for single-process deployments and tests.
//!
//! Committed state is an immutable map shared by `Arc`. Snapshots clone the
//! `Arc`; commits copy the map on write when snapshots are still alive, so
//! a snapshot never observes a later commit.
//!
//! # Limits
//!
//! This is a reference store, not a database:
//!
//! - Tombstones are never reclaimed. Every deleted key (a promoted or
//!   withdrawn waitlist entry, for instance) keeps a versioned entry for
//!   the life of the store. [`StoreStats::tombstones`] reports how many.
//!   A commit request carries only a snapshot version, not a handle on the
//!   snapshot, so there is no safe point at which to prune them.
//! - A commit made while any snapshot is alive clones the whole map, so
//!   commit cost grows with the number of stored keys under contention.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use turnstile_core::result::AppResult;
use turnstile_core::traits::{
    CommitOutcome, CommitRequest, DocumentKey, DocumentStore, SnapshotView, VersionedDocument,
    WriteOp,
};

/// A stored document or tombstone.
///
/// Deletes keep the key with the deleting commit's version so that a
/// transaction which saw the document (or saw it absent) still conflicts.
#[derive(Debug, Clone)]
struct StoredDocument {
    version: u64,
    body: Option<serde_json::Value>,
}

type DocumentMap = HashMap<DocumentKey, StoredDocument>;

/// Committed state guarded by the store lock.
#[derive(Debug, Default)]
struct Inner {
    /// Version of the latest commit.
    version: u64,
    documents: Arc<DocumentMap>,
}

/// Running totals kept for diagnostics.
#[derive(Debug, Default)]
struct Counters {
    commits: AtomicU64,
    conflicts: AtomicU64,
}

/// Point-in-time statistics of a [`MemoryDocumentStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Version of the latest commit.
    pub version: u64,
    /// Live (non-deleted) documents.
    pub documents: usize,
    /// Deleted keys still held to detect conflicts.
    pub tombstones: usize,
    /// Accepted commits that wrote at least one document.
    pub commits: u64,
    /// Commits rejected because of a conflicting writer.
    pub conflicts: u64,
}

/// In-memory versioned document store.
///
/// Cloning yields another handle to the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<RwLock<Inner>>,
    counters: Arc<Counters>,
}

impl MemoryDocumentStore {
    /// Creates an empty store at version 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns current statistics.
    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.read();
        let documents = inner
            .documents
            .values()
            .filter(|doc| doc.body.is_some())
            .count();
        StoreStats {
            version: inner.version,
            documents,
            tombstones: inner.documents.len() - documents,
            commits: self.counters.commits.load(Ordering::Relaxed),
            conflicts: self.counters.conflicts.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn snapshot(&self) -> AppResult<Arc<dyn SnapshotView>> {
        let inner = self.inner.read();
        Ok(Arc::new(MemorySnapshot {
            version: inner.version,
            documents: Arc::clone(&inner.documents),
        }))
    }

    async fn commit(&self, request: CommitRequest) -> AppResult<CommitOutcome> {
        let mut inner = self.inner.write();

        let touched = request
            .read_set
            .iter()
            .chain(request.writes.iter().map(|(key, _)| key));
        for key in touched {
            let current = inner.documents.get(key).map_or(0, |doc| doc.version);
            if current > request.snapshot_version {
                self.counters.conflicts.fetch_add(1, Ordering::Relaxed);
                debug!(
                    key = %key,
                    snapshot_version = request.snapshot_version,
                    current_version = current,
                    "Commit rejected, key changed after snapshot"
                );
                return Ok(CommitOutcome::Conflict { key: key.clone() });
            }
        }

        if request.writes.is_empty() {
            return Ok(CommitOutcome::Committed {
                version: inner.version,
            });
        }

        let version = inner.version + 1;
        let write_count = request.writes.len();
        let documents = Arc::make_mut(&mut inner.documents);
        for (key, op) in request.writes {
            let body = match op {
                WriteOp::Put(body) => Some(body),
                WriteOp::Delete => None,
            };
            documents.insert(key, StoredDocument { version, body });
        }
        inner.version = version;
        self.counters.commits.fetch_add(1, Ordering::Relaxed);

        debug!(version, writes = write_count, "Commit applied");
        Ok(CommitOutcome::Committed { version })
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

/// Immutable view over the document map as of one version.
#[derive(Debug)]
struct MemorySnapshot {
    version: u64,
    documents: Arc<DocumentMap>,
}

impl SnapshotView for MemorySnapshot {
    fn version(&self) -> u64 {
        self.version
    }

    fn get(&self, key: &DocumentKey) -> AppResult<Option<VersionedDocument>> {
        Ok(self.documents.get(key).and_then(|doc| {
            doc.body.clone().map(|body| VersionedDocument {
                version: doc.version,
                body,
            })
        }))
    }

    fn scan_prefix(&self, prefix: &str) -> AppResult<Vec<(DocumentKey, VersionedDocument)>> {
        let mut found: Vec<(DocumentKey, VersionedDocument)> = self
            .documents
            .iter()
            .filter(|(key, _)| key.has_prefix(prefix))
            .filter_map(|(key, doc)| {
                doc.body.clone().map(|body| {
                    (
                        key.clone(),
                        VersionedDocument {
                            version: doc.version,
                            body,
                        },
                    )
                })
            })
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found)
    }
}
