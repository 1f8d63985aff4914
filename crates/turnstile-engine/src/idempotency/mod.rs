//! At-most-once execution of side-effecting operations.

pub mod guard;

pub use guard::{IdempotencyGuard, RunOnce};
