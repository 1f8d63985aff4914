//! Integration tests for capacity reservation under contention.

mod helpers;

use turnstile_core::types::{ActorId, ResourceId};
use turnstile_engine::AdmissionOutcome;
use turnstile_entity::resource::ParticipantState;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_slot_ten_actors() {
    let app = helpers::TestApp::new();
    let engine = app.engines.admission.clone();
    let rid = ResourceId::new();
    engine.create_resource(rid, 1).await.unwrap();

    let actors: Vec<ActorId> = (0..10).map(|_| ActorId::new()).collect();
    let tasks = actors
        .iter()
        .map(|&actor| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.request_admission(rid, actor).await })
        })
        .collect();
    let outcomes: Vec<AdmissionOutcome> = helpers::join(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let admitted = outcomes
        .iter()
        .filter(|o| **o == AdmissionOutcome::Admitted)
        .count();
    let mut positions: Vec<u64> = outcomes.iter().filter_map(|o| o.position()).collect();
    positions.sort_unstable();

    assert_eq!(admitted, 1);
    assert_eq!(positions, (1..=9).collect::<Vec<u64>>());

    let resource = engine.resource(rid).await.unwrap();
    assert_eq!(resource.admitted_count, 1);
    assert_eq!(resource.waitlist_count, 9);
    assert_eq!(resource.waitlist_sequence, 9);

    let waitlist = engine.waitlist(rid).await.unwrap();
    assert_eq!(waitlist.len(), 9);
    assert!(waitlist.windows(2).all(|w| w[0].position < w[1].position));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_capacity_never_exceeded() {
    let app = helpers::TestApp::new();
    let engine = app.engines.admission.clone();
    let rid = ResourceId::new();
    engine.create_resource(rid, 5).await.unwrap();

    let tasks = (0..40)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.request_admission(rid, ActorId::new()).await })
        })
        .collect();
    let outcomes = helpers::join(tasks).await;

    let admitted = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(AdmissionOutcome::Admitted)))
        .count();
    let mut positions: Vec<u64> = outcomes
        .iter()
        .filter_map(|o| o.as_ref().ok().and_then(|o| o.position()))
        .collect();
    positions.sort_unstable();

    assert_eq!(admitted, 5);
    assert_eq!(positions, (1..=35).collect::<Vec<u64>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_repeated_requests_are_idempotent() {
    let app = helpers::TestApp::new();
    let engine = app.engines.admission.clone();
    let rid = ResourceId::new();
    let admitted = ActorId::new();
    let queued = ActorId::new();
    engine.create_resource(rid, 1).await.unwrap();
    engine.request_admission(rid, admitted).await.unwrap();
    engine.request_admission(rid, queued).await.unwrap();

    let before = engine.resource(rid).await.unwrap();
    let stats = app.store.stats();

    // Many concurrent repeats by the same two actors change nothing.
    let tasks = (0..10)
        .map(|i| {
            let engine = engine.clone();
            let actor = if i % 2 == 0 { admitted } else { queued };
            tokio::spawn(async move { engine.request_admission(rid, actor).await })
        })
        .collect();
    for (i, outcome) in helpers::join(tasks).await.into_iter().enumerate() {
        let expected = if i % 2 == 0 {
            AdmissionOutcome::Admitted
        } else {
            AdmissionOutcome::Waitlisted { position: 1 }
        };
        assert_eq!(outcome.unwrap(), expected);
    }

    assert_eq!(engine.resource(rid).await.unwrap(), before);
    assert_eq!(app.store.stats().version, stats.version);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_withdraw_then_lazy_promotion() {
    let app = helpers::TestApp::new();
    let engine = app.engines.admission.clone();
    let rid = ResourceId::new();
    let holder = ActorId::new();
    let first = ActorId::new();
    let second = ActorId::new();
    engine.create_resource(rid, 1).await.unwrap();
    engine.request_admission(rid, holder).await.unwrap();
    engine.request_admission(rid, first).await.unwrap();
    engine.request_admission(rid, second).await.unwrap();

    assert_eq!(
        engine.withdraw(rid, holder).await.unwrap(),
        ParticipantState::Admitted
    );
    let resource = engine.resource(rid).await.unwrap();
    assert_eq!(resource.admitted_count, 0);
    assert_eq!(resource.waitlist_count, 2);
    assert_eq!(
        engine.participant_state(rid, first).await.unwrap(),
        ParticipantState::Waitlisted
    );

    // The freed slot goes to whoever asks first, not to the queue head.
    let outcome = engine.request_admission(rid, second).await.unwrap();
    assert_eq!(outcome, AdmissionOutcome::Admitted);
    assert_eq!(
        engine.request_admission(rid, first).await.unwrap(),
        AdmissionOutcome::Waitlisted { position: 1 }
    );

    let resource = engine.resource(rid).await.unwrap();
    assert_eq!(resource.admitted_count, 1);
    assert_eq!(resource.waitlist_count, 1);
    assert_eq!(
        engine.participant_state(rid, holder).await.unwrap(),
        ParticipantState::NotRequested
    );
    // The promoted actor's waitlist entry stays behind as a tombstone.
    assert_eq!(app.store.stats().tombstones, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_admissions_on_one_snapshot() {
    let app = helpers::TestApp::with_callers(4);
    let engine = app.engines.admission.clone();
    let rid = ResourceId::new();
    engine.create_resource(rid, 2).await.unwrap();

    app.lockstep.arm();
    let tasks = (0..4)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.request_admission(rid, ActorId::new()).await })
        })
        .collect();
    let outcomes: Vec<AdmissionOutcome> = helpers::join(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    // All four saw two free slots; only one commit could use that view.
    assert!(app.store.stats().conflicts >= 3);
    let admitted = outcomes
        .iter()
        .filter(|o| **o == AdmissionOutcome::Admitted)
        .count();
    let mut positions: Vec<u64> = outcomes.iter().filter_map(|o| o.position()).collect();
    positions.sort_unstable();
    assert_eq!(admitted, 2);
    assert_eq!(positions, vec![1, 2]);

    let resource = engine.resource(rid).await.unwrap();
    assert_eq!(resource.admitted_count, 2);
    assert_eq!(resource.waitlist_count, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_waitlisters_reallocate_positions() {
    let app = helpers::TestApp::with_callers(3);
    let engine = app.engines.admission.clone();
    let rid = ResourceId::new();
    engine.create_resource(rid, 1).await.unwrap();
    engine.request_admission(rid, ActorId::new()).await.unwrap();

    app.lockstep.arm();
    let tasks = (0..3)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.request_admission(rid, ActorId::new()).await })
        })
        .collect();
    let mut positions: Vec<u64> = helpers::join(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().position().unwrap())
        .collect();
    positions.sort_unstable();

    // Every caller first allocated position 1; the losers retried and took
    // the next free positions.
    assert!(app.store.stats().conflicts >= 2);
    assert_eq!(positions, vec![1, 2, 3]);

    let resource = engine.resource(rid).await.unwrap();
    assert_eq!(resource.waitlist_sequence, 3);
    assert_eq!(resource.waitlist_count, 3);
    assert_eq!(engine.waitlist(rid).await.unwrap().len(), 3);
}
