//! Integration tests for single-use token redemption.

mod helpers;

use chrono::Duration;

use turnstile_core::error::ErrorKind;
use turnstile_core::types::{ActorId, TokenId};
use turnstile_engine::Redemption;
use turnstile_entity::token::TokenStatus;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_claimants_one_winner() {
    let app = helpers::TestApp::new();
    let tokens = app.engines.tokens.clone();
    let token_id = TokenId::new();
    tokens
        .issue(token_id, helpers::start() + Duration::minutes(5))
        .await
        .unwrap();

    let tasks = (0..2)
        .map(|_| {
            let tokens = tokens.clone();
            tokio::spawn(async move { tokens.redeem(token_id, ActorId::new()).await })
        })
        .collect();
    let outcomes = helpers::join(tasks).await;

    let winners: Vec<&Redemption> = outcomes.iter().filter_map(|o| o.as_ref().ok()).collect();
    let losers: Vec<ErrorKind> = outcomes
        .iter()
        .filter_map(|o| o.as_ref().err().map(|e| e.kind))
        .collect();

    assert_eq!(winners.len(), 1);
    assert_eq!(losers, vec![ErrorKind::AlreadyRedeemed]);
    assert!(winners[0].first_redemption);

    let token = tokens.token(token_id).await.unwrap();
    assert_eq!(token.redeemed_by(), Some(winners[0].redeemed_by));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_claimants_one_winner() {
    let app = helpers::TestApp::new();
    let tokens = app.engines.tokens.clone();
    let token_id = TokenId::new();
    tokens
        .issue(token_id, helpers::start() + Duration::minutes(5))
        .await
        .unwrap();

    let tasks = (0..16)
        .map(|_| {
            let tokens = tokens.clone();
            tokio::spawn(async move { tokens.redeem(token_id, ActorId::new()).await })
        })
        .collect();
    let outcomes = helpers::join(tasks).await;

    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .filter_map(|o| o.as_ref().err())
            .all(|e| e.kind == ErrorKind::AlreadyRedeemed)
    );
}

#[tokio::test]
async fn test_winner_repeat_changes_nothing() {
    let app = helpers::TestApp::new();
    let tokens = app.engines.tokens.clone();
    let token_id = TokenId::new();
    let actor = ActorId::new();
    tokens
        .issue(token_id, helpers::start() + Duration::minutes(5))
        .await
        .unwrap();

    let first = tokens.redeem(token_id, actor).await.unwrap();
    let stats = app.store.stats();
    let again = tokens.redeem(token_id, actor).await.unwrap();

    assert!(!again.first_redemption);
    assert_eq!(again.redeemed_at, first.redeemed_at);
    assert_eq!(app.store.stats(), stats);
}

#[tokio::test]
async fn test_expired_token_is_not_redeemable() {
    let app = helpers::TestApp::new();
    let tokens = app.engines.tokens.clone();
    let token_id = TokenId::new();
    tokens
        .issue(token_id, helpers::start() + Duration::minutes(5))
        .await
        .unwrap();

    app.clock.advance(Duration::minutes(6));
    let err = tokens.redeem(token_id, ActorId::new()).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::NotRedeemable);
    assert_eq!(
        tokens.token(token_id).await.unwrap().status,
        TokenStatus::Issued
    );
}

#[tokio::test]
async fn test_revoked_token_is_not_redeemable() {
    let app = helpers::TestApp::new();
    let tokens = app.engines.tokens.clone();
    let token_id = TokenId::new();
    tokens
        .issue(token_id, helpers::start() + Duration::minutes(5))
        .await
        .unwrap();
    tokens.revoke(token_id).await.unwrap();

    let err = tokens.redeem(token_id, ActorId::new()).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::NotRedeemable);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_losing_claimants_see_winner_on_retry() {
    let app = helpers::TestApp::with_callers(4);
    let tokens = app.engines.tokens.clone();
    let token_id = TokenId::new();
    tokens
        .issue(token_id, helpers::start() + Duration::minutes(5))
        .await
        .unwrap();

    app.lockstep.arm();
    let tasks = (0..4)
        .map(|_| {
            let tokens = tokens.clone();
            tokio::spawn(async move { tokens.redeem(token_id, ActorId::new()).await })
        })
        .collect();
    let outcomes = helpers::join(tasks).await;

    // All four read the token as issued. The three rejected commits were
    // retried, found it redeemed and gave up without writing.
    let stats = app.store.stats();
    assert_eq!(stats.conflicts, 3);
    assert_eq!(stats.commits, 2);

    let winners: Vec<&Redemption> = outcomes.iter().filter_map(|o| o.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert!(
        outcomes
            .iter()
            .filter_map(|o| o.as_ref().err())
            .all(|e| e.kind == ErrorKind::AlreadyRedeemed)
    );
    assert_eq!(
        tokens.token(token_id).await.unwrap().redeemed_by(),
        Some(winners[0].redeemed_by)
    );
}
