//! Core traits defined in `turnstile-core` and implemented by other crates.

pub mod clock;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{
    CommitOutcome, CommitRequest, DocumentKey, DocumentStore, SnapshotView, VersionedDocument,
    WriteOp,
};
