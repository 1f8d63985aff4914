//! Convenience result type alias for Turnstile.

use crate::error::AppError;

/// A specialized `Result` type for Turnstile operations.
pub type AppResult<T> = Result<T, AppError>;
