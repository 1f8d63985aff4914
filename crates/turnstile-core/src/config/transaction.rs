//! Optimistic transaction retry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Retry discipline applied by the transaction runner when a commit
/// loses a race against a concurrent writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// Number of re-executions allowed after the first attempt before the
    /// call fails with `TransactionAborted`.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff before the first retry, in milliseconds. Doubles per attempt.
    /// `0` yields to the scheduler instead of sleeping.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    /// Upper bound on a single backoff, in milliseconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

impl TransactionConfig {
    /// Upper bound of the backoff window before retry number `attempt` (1-based).
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let millis = self
            .initial_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }

    pub(crate) fn validate(&self) -> Result<(), AppError> {
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(AppError::configuration(format!(
                "transaction.initial_backoff_ms ({}) exceeds transaction.max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }
}

fn default_max_retries() -> u32 {
    32
}

fn default_initial_backoff() -> u64 {
    1
}

fn default_max_backoff() -> u64 {
    25
}
