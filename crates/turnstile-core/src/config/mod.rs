//! Engine configuration schemas.
//!
//! Configuration is deserialized from TOML files and environment variables
//! via the `config` crate, then handed to each engine at construction time.
//! Nothing here is process-wide state.

pub mod idempotency;
pub mod logging;
pub mod transaction;

use serde::{Deserialize, Serialize};

use self::idempotency::IdempotencyConfig;
use self::logging::LoggingConfig;
use self::transaction::TransactionConfig;

use crate::error::AppError;

/// Root configuration.
///
/// Top-level deserialization target for the merged configuration sources
/// (default.toml, environment overlay, `TURNSTILE__*` variables).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Optimistic transaction retry settings.
    #[serde(default)]
    pub transaction: TransactionConfig,
    /// Idempotency key derivation settings.
    #[serde(default)]
    pub idempotency: IdempotencyConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from TOML files and the environment.
    ///
    /// Merges `config/default`, an environment-specific overlay
    /// `config/{env}`, and environment variables prefixed with `TURNSTILE`
    /// (sections separated by `__`). Every source is optional.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("TURNSTILE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Load configuration from a single TOML file.
    pub fn from_file(path: &str) -> Result<Self, AppError> {
        let loaded: Self = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject settings the engines cannot operate with.
    pub fn validate(&self) -> Result<(), AppError> {
        self.transaction.validate()?;
        self.idempotency.validate()?;
        Ok(())
    }
}
