//! Idempotency key derivation configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Settings for deriving deterministic idempotency keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyConfig {
    /// Width of the time bucket folded into derived keys, in seconds.
    ///
    /// Identical requests inside one bucket collide; the same request in a
    /// later bucket is treated as a new operation.
    #[serde(default = "default_time_bucket")]
    pub time_bucket_seconds: u64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            time_bucket_seconds: default_time_bucket(),
        }
    }
}

impl IdempotencyConfig {
    pub(crate) fn validate(&self) -> Result<(), AppError> {
        if self.time_bucket_seconds == 0 {
            return Err(AppError::configuration(
                "idempotency.time_bucket_seconds must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn default_time_bucket() -> u64 {
    60
}
