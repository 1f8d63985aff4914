//! # turnstile-engine
//!
//! The three concurrency-safe operations Turnstile exposes to request
//! handlers. Each operation opens exactly one optimistic transaction,
//! computes the next state from what it read, and commits atomically;
//! conflicts are retried by the [`TransactionRunner`](turnstile_store::TransactionRunner).
//!
//! Engines are stateless and cheap to clone. They receive the store,
//! configuration, and clock at construction time.

pub mod admission;
pub mod engines;
pub mod idempotency;
pub mod token;

pub use admission::{AdmissionEngine, AdmissionOutcome};
pub use engines::Engines;
pub use idempotency::{IdempotencyGuard, RunOnce};
pub use token::{Redemption, TokenRedeemer};
