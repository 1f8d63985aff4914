//! Unified error types for Turnstile.
//!
//! Every crate maps its failures into [`AppError`] so that engine callers
//! see one error type and can branch on [`ErrorKind`].

use std::fmt;
use thiserror::Error;

/// Error categories surfaced by the engines and the store layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Store contention outlasted the retry budget. Transient.
    TransactionAborted,
    /// The token was already redeemed by a different actor.
    AlreadyRedeemed,
    /// The token is unknown, expired, or revoked.
    NotRedeemable,
    /// Input was malformed and rejected before a transaction was opened.
    Validation,
    /// The requested document does not exist.
    NotFound,
    /// A create collided with an existing document.
    Conflict,
    /// A document could not be encoded or decoded.
    Serialization,
    /// Configuration could not be loaded or is inconsistent.
    Configuration,
    /// An internal invariant was violated.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransactionAborted => write!(f, "TRANSACTION_ABORTED"),
            Self::AlreadyRedeemed => write!(f, "ALREADY_REDEEMED"),
            Self::NotRedeemable => write!(f, "NOT_REDEEMABLE"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified error used throughout Turnstile.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a transaction-aborted error.
    pub fn transaction_aborted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransactionAborted, message)
    }

    /// Create an already-redeemed error.
    pub fn already_redeemed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyRedeemed, message)
    }

    /// Create a not-redeemable error.
    pub fn not_redeemable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotRedeemable, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether the caller may retry the same call later with backoff.
    ///
    /// Only store contention is transient; business-rule failures are
    /// permanent for the given inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::TransactionAborted)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
