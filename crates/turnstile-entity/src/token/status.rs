//! Token lifecycle states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use turnstile_core::types::ActorId;

/// Lifecycle of a redeemable token.
///
/// `Issued` is the only state that can change. `Redeemed` and `Revoked` are
/// terminal; the redeemer is recorded inside `Redeemed` so it cannot exist
/// without the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TokenStatus {
    /// Valid and unclaimed.
    Issued,
    /// Claimed by exactly one actor.
    Redeemed {
        /// The winning actor.
        redeemed_by: ActorId,
        /// When the redemption committed.
        redeemed_at: DateTime<Utc>,
    },
    /// Withdrawn by the issuer before anyone redeemed it.
    Revoked {
        /// When the token was revoked.
        revoked_at: DateTime<Utc>,
    },
}
