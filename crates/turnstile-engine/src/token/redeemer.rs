//! Single-use token redemption.
//!
//! Among concurrent claimants exactly one moves the token from `Issued` to
//! `Redeemed`. The others read the token again after their commit
//! conflicts, see the winner, and fail with `AlreadyRedeemed`. The winner
//! may repeat the call and gets the same answer without another write.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use turnstile_core::error::AppError;
use turnstile_core::result::AppResult;
use turnstile_core::traits::Clock;
use turnstile_core::types::{ActorId, TokenId};
use turnstile_entity::keys;
use turnstile_entity::token::{RedeemableToken, TokenStatus};
use turnstile_store::TransactionRunner;

/// A successful redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    /// The redeemed token.
    pub token_id: TokenId,
    /// The actor that won the token.
    pub redeemed_by: ActorId,
    /// When the winning redemption committed.
    pub redeemed_at: DateTime<Utc>,
    /// False when the winner repeated an earlier redemption.
    pub first_redemption: bool,
}

/// Issues, revokes and redeems single-use tokens.
#[derive(Debug, Clone)]
pub struct TokenRedeemer {
    runner: Arc<TransactionRunner>,
    clock: Arc<dyn Clock>,
}

impl TokenRedeemer {
    /// Creates a new token redeemer.
    pub fn new(runner: Arc<TransactionRunner>, clock: Arc<dyn Clock>) -> Self {
        Self { runner, clock }
    }

    /// Issue a token that can be redeemed until `expires_at`.
    pub async fn issue(
        &self,
        token_id: TokenId,
        expires_at: DateTime<Utc>,
    ) -> AppResult<RedeemableToken> {
        token_id.ensure_valid()?;
        let now = self.clock.now();
        if expires_at <= now {
            return Err(AppError::validation(format!(
                "Token expiry {expires_at} is not in the future"
            )));
        }

        let token = self
            .runner
            .transact("issue_token", |txn| {
                let key = keys::token(token_id);
                if txn.get::<RedeemableToken>(&key)?.is_some() {
                    return Err(AppError::conflict(format!("Token {token_id} already exists")));
                }
                let token = RedeemableToken::issued(token_id, now, expires_at);
                txn.put(key, &token)?;
                Ok(token)
            })
            .await?;

        info!(token_id = %token_id, expires_at = %expires_at, "Token issued");
        Ok(token)
    }

    /// Revoke an unredeemed token. Revoking twice is a no-op.
    pub async fn revoke(&self, token_id: TokenId) -> AppResult<RedeemableToken> {
        token_id.ensure_valid()?;
        let now = self.clock.now();

        let (token, changed) = self
            .runner
            .transact("revoke_token", |txn| {
                let key = keys::token(token_id);
                let mut token: RedeemableToken = txn
                    .get(&key)?
                    .ok_or_else(|| AppError::not_found(format!("Token {token_id} does not exist")))?;
                match token.status {
                    TokenStatus::Issued => {
                        token.status = TokenStatus::Revoked { revoked_at: now };
                        txn.put(key, &token)?;
                        Ok((token, true))
                    }
                    TokenStatus::Revoked { .. } => Ok((token, false)),
                    TokenStatus::Redeemed { .. } => Err(AppError::already_redeemed(format!(
                        "Token {token_id} was redeemed and can no longer be revoked"
                    ))),
                }
            })
            .await?;

        if changed {
            info!(token_id = %token_id, "Token revoked");
        }
        Ok(token)
    }

    /// Redeem `token_id` on behalf of `actor_id`.
    pub async fn redeem(&self, token_id: TokenId, actor_id: ActorId) -> AppResult<Redemption> {
        token_id.ensure_valid()?;
        actor_id.ensure_valid()?;
        let now = self.clock.now();

        let redemption = self
            .runner
            .transact("redeem", |txn| {
                let key = keys::token(token_id);
                let mut token: RedeemableToken = txn.get(&key)?.ok_or_else(|| {
                    AppError::not_redeemable(format!("Token {token_id} does not exist"))
                })?;

                match token.status {
                    TokenStatus::Redeemed {
                        redeemed_by,
                        redeemed_at,
                    } if redeemed_by == actor_id => Ok(Redemption {
                        token_id,
                        redeemed_by,
                        redeemed_at,
                        first_redemption: false,
                    }),
                    TokenStatus::Redeemed { .. } => Err(AppError::already_redeemed(format!(
                        "Token {token_id} was redeemed by another actor"
                    ))),
                    TokenStatus::Revoked { .. } => Err(AppError::not_redeemable(format!(
                        "Token {token_id} has been revoked"
                    ))),
                    TokenStatus::Issued if token.is_expired_at(now) => {
                        Err(AppError::not_redeemable(format!(
                            "Token {token_id} expired at {}",
                            token.expires_at
                        )))
                    }
                    TokenStatus::Issued => {
                        token.status = TokenStatus::Redeemed {
                            redeemed_by: actor_id,
                            redeemed_at: now,
                        };
                        txn.put(key, &token)?;
                        Ok(Redemption {
                            token_id,
                            redeemed_by: actor_id,
                            redeemed_at: now,
                            first_redemption: true,
                        })
                    }
                }
            })
            .await?;

        if redemption.first_redemption {
            info!(token_id = %token_id, actor_id = %actor_id, "Token redeemed");
        } else {
            debug!(token_id = %token_id, actor_id = %actor_id, "Repeat redemption by winner");
        }
        Ok(redemption)
    }

    /// Read a token.
    pub async fn token(&self, token_id: TokenId) -> AppResult<RedeemableToken> {
        token_id.ensure_valid()?;
        self.runner
            .transact("get_token", |txn| {
                txn.get(&keys::token(token_id))?
                    .ok_or_else(|| AppError::not_found(format!("Token {token_id} does not exist")))
            })
            .await
    }
}
