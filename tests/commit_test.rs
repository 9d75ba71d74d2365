//! End-to-end tests for committing a draft workout.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{bench, harness, squat, FakeBackend, Harness};
use serde_json::json;
use tokio::sync::{Barrier, Notify};
use tokio::time::timeout;
use workout_tracker::mirror::{EXERCISES_KEY, NAME_KEY, SETS_KEY};
use workout_tracker::{
    CommitError, CommitPhase, KeyValueStore, SetField, ValidationError, WorkoutSet,
};

const USER: Option<i64> = Some(3);

/// Leg Day with one real set and one blank row on exercise 5.
fn leg_day(h: &Harness) {
    h.draft.set_name("Leg Day");
    h.draft.add_exercise(squat()).unwrap();
    h.draft.update_set(5, 1, SetField::Reps(10));
    h.draft.update_set(5, 1, SetField::Weight(40.0));
    h.draft.add_set(5);
}

fn assert_persisted(h: &Harness) {
    for key in [EXERCISES_KEY, SETS_KEY, NAME_KEY] {
        assert!(h.store.get(key).unwrap().is_some(), "{key} should still be stored");
    }
}

#[tokio::test]
async fn test_commit_saves_workout_and_retained_sets() {
    let h = harness(FakeBackend::responding(json!({"id": 42})), USER);
    leg_day(&h);

    let workout = h.pipeline.commit().await.unwrap();

    assert_eq!(workout.id, 42);
    assert_eq!(workout.total_weight, 400.0);

    let created = h.backend.workouts();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].user_id, 3);
    assert_eq!(created[0].name, "Leg Day");
    assert_eq!(created[0].total_weight, 400.0);
    assert_eq!(created[0].status, "completed");

    assert_eq!(
        h.backend.saved_sets(),
        vec![WorkoutSet {
            exercise_id: 5,
            workout_id: 42,
            set_id: 1,
            reps: 10,
            weight: 40.0,
        }]
    );

    assert!(h.draft.snapshot().is_empty());
    assert!(h.store.is_empty());
    assert_eq!(h.pipeline.phase(), CommitPhase::Done);
}

#[tokio::test]
async fn test_commit_renumbers_each_bucket_after_dropping_blank_rows() {
    let h = harness(FakeBackend::responding(json!({"workout_id": 9})), USER);
    h.draft.set_name("Full Body");
    h.draft.add_exercise(squat()).unwrap();
    h.draft.add_exercise(bench()).unwrap();
    h.draft.add_set(5);
    h.draft.update_set(5, 2, SetField::Reps(5));
    h.draft.update_set(5, 2, SetField::Weight(100.0));
    h.draft.add_set(8);
    h.draft.add_set(8);
    h.draft.update_set(8, 3, SetField::Reps(8));
    h.draft.update_set(8, 3, SetField::Weight(60.0));

    let workout = h.pipeline.commit().await.unwrap();
    assert_eq!(workout.id, 9);
    assert_eq!(workout.total_weight, 980.0);

    let mut sent: Vec<(i64, u32, u32)> = h
        .backend
        .saved_sets()
        .iter()
        .map(|s| (s.exercise_id, s.set_id, s.reps))
        .collect();
    sent.sort();
    assert_eq!(sent, vec![(5, 1, 5), (8, 1, 8)]);
    assert!(h.backend.saved_sets().iter().all(|s| s.workout_id == 9));
}

#[tokio::test]
async fn test_commit_rejects_workout_without_real_sets() {
    let h = harness(FakeBackend::responding(json!({"id": 42})), USER);
    h.draft.set_name("Leg Day");
    h.draft.add_exercise(squat()).unwrap();
    let before = h.draft.snapshot();

    let err = h.pipeline.commit().await.unwrap_err();

    assert!(matches!(err, CommitError::Validation(ValidationError::NoCompletedSets)));
    assert_eq!(h.draft.snapshot(), before);
    assert!(h.backend.workouts().is_empty());
    assert_eq!(h.pipeline.phase(), CommitPhase::Idle);
}

#[tokio::test]
async fn test_commit_rejects_blank_name() {
    let h = harness(FakeBackend::responding(json!({"id": 42})), USER);
    leg_day(&h);
    h.draft.set_name("  ");

    let err = h.pipeline.commit().await.unwrap_err();

    assert!(matches!(err, CommitError::Validation(ValidationError::MissingName)));
    assert!(h.backend.workouts().is_empty());
}

#[tokio::test]
async fn test_commit_rejects_empty_exercise_list() {
    let h = harness(FakeBackend::responding(json!({"id": 42})), USER);
    h.draft.set_name("Rest Day");

    let err = h.pipeline.commit().await.unwrap_err();

    assert!(matches!(err, CommitError::Validation(ValidationError::NoExercises)));
}

#[tokio::test]
async fn test_commit_requires_signed_in_user() {
    for user in [None, Some(0), Some(-4)] {
        let h = harness(FakeBackend::responding(json!({"id": 42})), user);
        leg_day(&h);

        let err = h.pipeline.commit().await.unwrap_err();

        assert!(matches!(err, CommitError::Unauthenticated));
        assert!(h.backend.workouts().is_empty());
        assert_persisted(&h);
    }
}

#[tokio::test]
async fn test_commit_resolves_id_from_textual_body() {
    let h = harness(FakeBackend::responding(json!(r#"{"data":{"id":7}}"#)), USER);
    leg_day(&h);

    let workout = h.pipeline.commit().await.unwrap();

    assert_eq!(workout.id, 7);
    assert_eq!(h.backend.saved_sets()[0].workout_id, 7);
}

#[tokio::test]
async fn test_commit_reports_unreadable_response() {
    let h = harness(FakeBackend::responding(json!({"status": "ok"})), USER);
    leg_day(&h);
    let before = h.draft.snapshot();

    let err = h.pipeline.commit().await.unwrap_err();

    assert!(matches!(err, CommitError::ResponseShape { .. }));
    assert_eq!(h.backend.workouts().len(), 1);
    assert!(h.backend.saved_sets().is_empty());
    assert_eq!(h.draft.snapshot(), before);
    assert_persisted(&h);
}

#[tokio::test]
async fn test_commit_keeps_draft_when_creation_fails() {
    let h = harness(FakeBackend::unavailable(), USER);
    leg_day(&h);
    let before = h.draft.snapshot();

    let err = h.pipeline.commit().await.unwrap_err();

    match err {
        CommitError::Network(source) => assert!(source.to_string().contains("503")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.draft.snapshot(), before);
    assert_persisted(&h);
    assert_eq!(h.pipeline.phase(), CommitPhase::Idle);
}

#[tokio::test]
async fn test_partial_set_failure_keeps_draft() {
    let h = harness(FakeBackend::responding(json!({"id": 42})).failing_set(5, 2), USER);
    h.draft.set_name("Leg Day");
    h.draft.add_exercise(squat()).unwrap();
    h.draft.update_set(5, 1, SetField::Reps(10));
    h.draft.update_set(5, 1, SetField::Weight(40.0));
    h.draft.add_set(5);
    h.draft.update_set(5, 2, SetField::Reps(8));
    h.draft.update_set(5, 2, SetField::Weight(45.0));
    let before = h.draft.snapshot();

    let err = h.pipeline.commit().await.unwrap_err();

    match err {
        CommitError::PartialSave {
            workout_id,
            saved,
            total,
            ..
        } => {
            assert_eq!(workout_id, 42);
            assert_eq!(saved, 1);
            assert_eq!(total, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.backend.saved_sets().len(), 1);
    assert_eq!(h.draft.snapshot(), before);
    assert_persisted(&h);
    assert_eq!(h.pipeline.phase(), CommitPhase::Idle);
}

#[tokio::test]
async fn test_second_commit_while_running_is_refused() {
    let gate = Arc::new(Notify::new());
    let h = harness(FakeBackend::responding(json!({"id": 42})).gated(gate.clone()), USER);
    leg_day(&h);

    let mut phase = h.pipeline.subscribe_phase();
    let pipeline = h.pipeline.clone();
    let first = tokio::spawn(async move { pipeline.commit().await });

    phase
        .wait_for(|p| *p == CommitPhase::CreatingWorkout)
        .await
        .unwrap();
    let err = h.pipeline.commit().await.unwrap_err();
    assert!(matches!(err, CommitError::InProgress));

    gate.notify_one();
    let workout = first.await.unwrap().unwrap();
    assert_eq!(workout.id, 42);
    assert_eq!(h.backend.workouts().len(), 1);
}

#[tokio::test]
async fn test_set_saves_are_in_flight_together() {
    // both saves and this test must reach the barrier before any save returns
    let barrier = Arc::new(Barrier::new(3));
    let h = harness(
        FakeBackend::responding(json!({"id": 42})).joined_sets(barrier.clone()),
        USER,
    );
    h.draft.set_name("Full Body");
    h.draft.add_exercise(squat()).unwrap();
    h.draft.add_exercise(bench()).unwrap();
    for id in [5, 8] {
        h.draft.update_set(id, 1, SetField::Reps(5));
        h.draft.update_set(id, 1, SetField::Weight(50.0));
    }

    let mut phase = h.pipeline.subscribe_phase();
    let pipeline = h.pipeline.clone();
    let commit = tokio::spawn(async move { pipeline.commit().await });

    let workout = timeout(Duration::from_secs(5), async {
        phase
            .wait_for(|p| *p == CommitPhase::SavingSets { saved: 0, total: 2 })
            .await
            .unwrap();
        barrier.wait().await;
        commit.await.unwrap()
    })
    .await
    .expect("set saves were not issued concurrently")
    .unwrap();

    assert_eq!(workout.id, 42);
    assert_eq!(h.backend.saved_sets().len(), 2);
    assert_eq!(h.pipeline.phase(), CommitPhase::Done);
}

#[tokio::test]
async fn test_saving_progress_counts_successful_sets() {
    let gate = Arc::new(Barrier::new(2));
    let h = harness(
        FakeBackend::responding(json!({"id": 42})).joined_sets(gate.clone()),
        USER,
    );
    leg_day(&h);

    let mut phase = h.pipeline.subscribe_phase();
    let pipeline = h.pipeline.clone();
    let commit = tokio::spawn(async move { pipeline.commit().await });

    phase
        .wait_for(|p| *p == CommitPhase::SavingSets { saved: 0, total: 1 })
        .await
        .unwrap();
    gate.wait().await;
    phase
        .wait_for(|p| matches!(p, CommitPhase::SavingSets { saved: 1, total: 1 } | CommitPhase::Done))
        .await
        .unwrap();

    commit.await.unwrap().unwrap();
    assert_eq!(h.pipeline.phase(), CommitPhase::Done);
}

#[tokio::test]
async fn test_retry_after_failure_succeeds() {
    let h = harness(FakeBackend::responding(json!({"id": 42})), USER);
    h.draft.set_name("Leg Day");
    h.draft.add_exercise(squat()).unwrap();

    assert!(h.pipeline.commit().await.is_err());

    h.draft.update_set(5, 1, SetField::Reps(10));
    h.draft.update_set(5, 1, SetField::Weight(40.0));
    let workout = h.pipeline.commit().await.unwrap();
    assert_eq!(workout.total_weight, 400.0);
}

#[tokio::test]
async fn test_cancel_discards_draft_without_network() {
    let h = harness(FakeBackend::responding(json!({"id": 42})), USER);
    leg_day(&h);

    h.pipeline.cancel();

    assert!(h.draft.snapshot().is_empty());
    assert!(h.store.is_empty());
    assert!(h.backend.workouts().is_empty());
    assert!(h.backend.saved_sets().is_empty());
}
