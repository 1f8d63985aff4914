//! # turnstile-store
//!
//! Optimistic transaction machinery layered over a
//! [`DocumentStore`](turnstile_core::traits::DocumentStore):
//!
//! - [`Transaction`]: read/write-set tracking over one snapshot
//! - [`TransactionRunner`]: re-executes a transaction body on commit
//!   conflict, bounded by the configured retry budget
//! - [`MemoryDocumentStore`]: versioned, copy-on-write in-process store
//!   (feature `memory`, on by default)

#[cfg(feature = "memory")]
pub mod memory;
pub mod runner;
pub mod transaction;

#[cfg(feature = "memory")]
pub use memory::{MemoryDocumentStore, StoreStats};
pub use runner::TransactionRunner;
pub use transaction::Transaction;
