//! Idempotency key type and deterministic key derivation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use turnstile_core::error::AppError;

/// Maximum accepted key length in bytes.
pub const MAX_KEY_LEN: usize = 256;

/// A caller-supplied key identifying one logical operation.
///
/// Accepted keys are 1 to 256 characters drawn from `[A-Za-z0-9:_.-]`.
/// Logically identical requests must produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Validate and wrap a caller-supplied key.
    pub fn new(raw: impl Into<String>) -> Result<Self, AppError> {
        let raw = raw.into();
        if raw.is_empty() || raw.len() > MAX_KEY_LEN {
            return Err(AppError::validation(format!(
                "Idempotency key must be 1..={MAX_KEY_LEN} characters, got {}",
                raw.len()
            )));
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '.' | '-')))
        {
            return Err(AppError::validation(format!(
                "Idempotency key contains invalid character '{bad}'"
            )));
        }
        Ok(Self(raw))
    }

    /// Derive a key from a request fingerprint and the time bucket `at` falls in.
    ///
    /// Repeats of the same request inside one bucket produce the same key.
    pub fn derive(fingerprint: &Fingerprint, bucket_seconds: u64, at: DateTime<Utc>) -> Self {
        let bucket = at.timestamp().div_euclid(bucket_seconds.max(1) as i64);

        let mut hasher = Sha256::new();
        for part in [
            fingerprint.operation.as_str(),
            fingerprint.actor.as_str(),
            fingerprint.target.as_str(),
        ] {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part.as_bytes());
        }
        hasher.update(fingerprint.amount_minor.to_be_bytes());
        hasher.update(bucket.to_be_bytes());
        let digest = hasher.finalize();

        let prefix: String = fingerprint
            .operation
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
            .take(32)
            .collect();
        Self(format!("{prefix}:{}", hex::encode(digest)))
    }

    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for IdempotencyKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IdempotencyKey> for String {
    fn from(key: IdempotencyKey) -> Self {
        key.0
    }
}

/// The identity-bearing parts of a request, hashed into a derived key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Operation type, e.g. `"payment"`.
    pub operation: String,
    /// Who is asking.
    pub actor: String,
    /// What the operation targets.
    pub target: String,
    /// Amount in minor units (e.g. cents).
    pub amount_minor: i64,
}
