//! Integration tests for at-most-once operations.

mod helpers;

use chrono::Duration;
use serde_json::json;

use turnstile_engine::RunOnce;
use turnstile_entity::idempotency::{
    Fingerprint, IdempotencyKey, OperationPayload, OperationStatus,
};

fn fingerprint() -> Fingerprint {
    Fingerprint {
        operation: "payment".to_string(),
        actor: "user-42".to_string(),
        target: "invoice-7".to_string(),
        amount_minor: 9_900,
    }
}

fn payload() -> OperationPayload {
    OperationPayload::new("payment", json!({ "amount_minor": 9_900 }))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_create_one_record() {
    let app = helpers::TestApp::new();
    let guard = app.engines.idempotency.clone();
    let key = guard.derive_key(&fingerprint());

    let tasks = (0..5)
        .map(|_| {
            let guard = guard.clone();
            let key = key.clone();
            tokio::spawn(async move { guard.run_once(&key, payload()).await })
        })
        .collect();
    let outcomes: Vec<RunOnce> = helpers::join(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let result_id = outcomes[0].result_id;
    assert!(outcomes.iter().all(|o| o.result_id == result_id));
    assert_eq!(outcomes.iter().filter(|o| o.created).count(), 1);

    let record = guard.record(&key).await.unwrap().unwrap();
    assert_eq!(record.result_id, result_id);
    let operation = guard.operation(result_id).await.unwrap().unwrap();
    assert_eq!(operation.status, OperationStatus::Pending);

    // One record plus one guarded operation.
    assert_eq!(app.store.stats().documents, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_keys_do_not_interfere() {
    let app = helpers::TestApp::new();
    let guard = app.engines.idempotency.clone();

    let tasks = (0..8)
        .map(|i| {
            let guard = guard.clone();
            let key = IdempotencyKey::new(format!("transfer:batch-{}", i % 4)).unwrap();
            tokio::spawn(async move { guard.run_once(&key, payload()).await })
        })
        .collect();
    let outcomes: Vec<RunOnce> = helpers::join(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(outcomes.iter().filter(|o| o.created).count(), 4);
    for i in 0..4 {
        assert_eq!(outcomes[i].result_id, outcomes[i + 4].result_id);
    }
    assert_eq!(app.store.stats().documents, 8);
}

#[tokio::test]
async fn test_sequential_repeat_leaves_state_unchanged() {
    let app = helpers::TestApp::new();
    let guard = app.engines.idempotency.clone();
    let key = guard.derive_key(&fingerprint());

    let first = guard.run_once(&key, payload()).await.unwrap();
    let stats = app.store.stats();
    let second = guard.run_once(&key, payload()).await.unwrap();

    assert_eq!(first.result_id, second.result_id);
    assert!(first.created);
    assert!(!second.created);
    assert_eq!(app.store.stats(), stats);
}

#[tokio::test]
async fn test_next_time_bucket_is_a_new_operation() {
    let app = helpers::TestApp::new();
    let guard = app.engines.idempotency.clone();

    let first_key = guard.derive_key(&fingerprint());
    let first = guard.run_once(&first_key, payload()).await.unwrap();

    app.clock.advance(Duration::minutes(2));
    let later_key = guard.derive_key(&fingerprint());
    let later = guard.run_once(&later_key, payload()).await.unwrap();

    assert_ne!(first_key, later_key);
    assert_ne!(first.result_id, later.result_id);
    assert!(later.created);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_losing_callers_adopt_winning_record() {
    let app = helpers::TestApp::with_callers(4);
    let guard = app.engines.idempotency.clone();
    let key = guard.derive_key(&fingerprint());

    app.lockstep.arm();
    let tasks = (0..4)
        .map(|_| {
            let guard = guard.clone();
            let key = key.clone();
            tokio::spawn(async move { guard.run_once(&key, payload()).await })
        })
        .collect();
    let outcomes: Vec<RunOnce> = helpers::join(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    // All four saw no record; three commits were rejected and their retries
    // found the winner's record without writing.
    let stats = app.store.stats();
    assert_eq!(stats.conflicts, 3);
    assert_eq!(stats.commits, 1);
    assert_eq!(stats.documents, 2);

    let winner = outcomes.iter().find(|o| o.created).unwrap().result_id;
    assert_eq!(outcomes.iter().filter(|o| o.created).count(), 1);
    assert!(outcomes.iter().all(|o| o.result_id == winner));
    assert_eq!(guard.record(&key).await.unwrap().unwrap().result_id, winner);
}
