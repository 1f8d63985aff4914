//! Engine bundle wired to one store.

use std::sync::Arc;

use turnstile_core::config::EngineConfig;
use turnstile_core::traits::{Clock, DocumentStore};
use turnstile_store::TransactionRunner;

use crate::admission::AdmissionEngine;
use crate::idempotency::IdempotencyGuard;
use crate::token::TokenRedeemer;

/// All engines sharing one transaction runner.
#[derive(Debug, Clone)]
pub struct Engines {
    /// Capacity reservation.
    pub admission: AdmissionEngine,
    /// At-most-once operations.
    pub idempotency: IdempotencyGuard,
    /// Single-use tokens.
    pub tokens: TokenRedeemer,
    runner: Arc<TransactionRunner>,
}

impl Engines {
    /// Build every engine over `store` with the given configuration and clock.
    pub fn new(store: Arc<dyn DocumentStore>, config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let runner = Arc::new(TransactionRunner::new(store, config.transaction.clone()));
        Self {
            admission: AdmissionEngine::new(Arc::clone(&runner), Arc::clone(&clock)),
            idempotency: IdempotencyGuard::new(
                Arc::clone(&runner),
                Arc::clone(&clock),
                config.idempotency.clone(),
            ),
            tokens: TokenRedeemer::new(Arc::clone(&runner), clock),
            runner,
        }
    }

    /// The shared transaction runner.
    pub fn runner(&self) -> &Arc<TransactionRunner> {
        &self.runner
    }
}
