//! Redemption drill.

use chrono::{DateTime, Duration, Utc};
use clap::Args;
use serde::Serialize;

use turnstile_core::error::{AppError, ErrorKind};
use turnstile_core::types::{ActorId, TokenId};
use turnstile_entity::token::RedeemableToken;
use turnstile_store::StoreStats;

use super::{Drill, join_callers};
use crate::output;

/// Arguments for the redemption drill
#[derive(Debug, Args)]
pub struct RedeemArgs {
    /// Distinct actors claiming the token concurrently
    #[arg(long, default_value_t = 2)]
    pub claimants: u32,

    /// Token lifetime in seconds
    #[arg(long, default_value_t = 300)]
    pub ttl_seconds: i64,
}

#[derive(Debug, Serialize)]
struct RedeemReport {
    token: RedeemableToken,
    claimants: u32,
    winners: Vec<ActorId>,
    already_redeemed: usize,
    errors: Vec<String>,
    store: StoreStats,
}

/// Run the redemption drill
pub async fn execute(args: &RedeemArgs, drill: &Drill) -> Result<(), AppError> {
    let tokens = drill.engines.tokens.clone();
    let token_id = TokenId::new();
    tokens
        .issue(token_id, expiry_after(Utc::now(), args.ttl_seconds)?)
        .await?;

    let tasks = (0..args.claimants)
        .map(|_| {
            let tokens = tokens.clone();
            tokio::spawn(async move { tokens.redeem(token_id, ActorId::new()).await })
        })
        .collect();

    let mut winners = Vec::new();
    let mut already_redeemed = 0;
    let mut errors = Vec::new();
    for result in join_callers(tasks).await? {
        match result {
            Ok(redemption) => winners.push(redemption.redeemed_by),
            Err(e) if e.kind == ErrorKind::AlreadyRedeemed => already_redeemed += 1,
            Err(e) => errors.push(e.to_string()),
        }
    }

    output::print_report(&RedeemReport {
        token: tokens.token(token_id).await?,
        claimants: args.claimants,
        winners,
        already_redeemed,
        errors,
        store: drill.store.stats(),
    })
}

/// The instant `ttl_seconds` after `now`, rejecting lifetimes chrono
/// cannot represent.
fn expiry_after(now: DateTime<Utc>, ttl_seconds: i64) -> Result<DateTime<Utc>, AppError> {
    Duration::try_seconds(ttl_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            AppError::validation(format!("Token lifetime of {ttl_seconds}s is out of range"))
        })
}
