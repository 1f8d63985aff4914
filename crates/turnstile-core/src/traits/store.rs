//! Transactional document store contract.
//!
//! The engines never talk to a database directly. They run transaction
//! bodies against a [`SnapshotView`] and hand the resulting read and write
//! sets to [`DocumentStore::commit`], which either applies every write
//! atomically or reports the key that a concurrent committer changed first.
//!
//! # Conflict rule
//!
//! Every stored document carries the store version that last wrote it
//! (deletes included). A [`CommitRequest`] taken at snapshot version `s`
//! is rejected if any key in its read set or write set now carries a
//! version greater than `s`. This is first-committer-wins over the union of
//! both sets, which gives serializable outcomes for the engines' bodies.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// Key of a document in the store.
///
/// Keys are `/`-separated paths such as `resource/{id}/waitlist/{actor}`,
/// so that related documents share a scannable prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentKey(String);

impl DocumentKey {
    /// Create a key from its path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The key path.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key lies under `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document body together with the store version that last wrote it.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedDocument {
    /// Store version of the commit that produced this body.
    pub version: u64,
    /// The document body.
    pub body: serde_json::Value,
}

/// A buffered mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert or replace the document.
    Put(serde_json::Value),
    /// Remove the document.
    Delete,
}

/// Everything a store needs to validate and apply one transaction.
#[derive(Debug, Clone, Default)]
pub struct CommitRequest {
    /// Version of the snapshot the transaction body read from.
    pub snapshot_version: u64,
    /// Keys the body read, whether or not a document was present.
    pub read_set: Vec<DocumentKey>,
    /// Mutations in application order. A key appears at most once.
    pub writes: Vec<(DocumentKey, WriteOp)>,
}

/// Result of a commit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// All writes became visible at `version`.
    Committed {
        /// The new store version.
        version: u64,
    },
    /// A concurrent transaction committed `key` after our snapshot.
    /// Nothing was written.
    Conflict {
        /// First conflicting key found.
        key: DocumentKey,
    },
}

/// A consistent, point-in-time view of the store.
pub trait SnapshotView: Send + Sync + fmt::Debug {
    /// Store version this snapshot reflects.
    fn version(&self) -> u64;

    /// Read a single document. `None` if absent at this version.
    fn get(&self, key: &DocumentKey) -> AppResult<Option<VersionedDocument>>;

    /// Read every live document whose key starts with `prefix`, ordered by key.
    fn scan_prefix(&self, prefix: &str) -> AppResult<Vec<(DocumentKey, VersionedDocument)>>;
}

/// A document store offering snapshot reads and validated atomic commits.
///
/// Implementations must guarantee that a commit's writes become visible
/// all at once or not at all, and must apply the conflict rule described
/// in the module docs.
#[async_trait]
pub trait DocumentStore: Send + Sync + fmt::Debug + 'static {
    /// Take a snapshot of the latest committed state.
    async fn snapshot(&self) -> AppResult<Arc<dyn SnapshotView>>;

    /// Validate `request` against the latest committed state and apply it.
    async fn commit(&self, request: CommitRequest) -> AppResult<CommitOutcome>;

    /// Check that the store backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
