//! Redeemable token document model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use turnstile_core::types::{ActorId, TokenId};

use super::status::TokenStatus;

/// A single-use credential that exactly one actor may redeem.
///
/// Issued externally, changed at most once by redemption or revocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemableToken {
    /// Unique token identifier.
    pub id: TokenId,
    /// Lifecycle state.
    pub status: TokenStatus,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
    /// Redemption must fail at or after this instant.
    pub expires_at: DateTime<Utc>,
}

impl RedeemableToken {
    /// A freshly issued token.
    pub fn issued(id: TokenId, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: TokenStatus::Issued,
            issued_at,
            expires_at,
        }
    }

    /// Whether the token has expired as of `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// The actor that redeemed the token, if any.
    pub fn redeemed_by(&self) -> Option<ActorId> {
        match self.status {
            TokenStatus::Redeemed { redeemed_by, .. } => Some(redeemed_by),
            _ => None,
        }
    }
}
