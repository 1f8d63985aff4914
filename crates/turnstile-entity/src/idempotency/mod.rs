//! Idempotency keys, records, and the side-effecting operations they guard.

pub mod key;
pub mod model;

pub use key::{Fingerprint, IdempotencyKey};
pub use model::{GuardedOperation, IdempotencyRecord, OperationPayload, OperationStatus};
